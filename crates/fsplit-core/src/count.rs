//! 预统计：总字符数 / 总行数
use encoding_rs::Encoding;
use std::path::Path;

use crate::error::Result;
use crate::stream::DecodedStream;

/// 每轮消费的字符数上限，与读块大小同量级
const COUNT_STEP: u64 = 4096;

/// 统计文件解码后的总字符数
/// 坏字节计为替换符，一个字符；统计因此总能给出结果。
pub fn count_chars(path: &Path, encoding: &'static Encoding) -> Result<u64> {
    let mut stream = DecodedStream::open(path, encoding)?;
    let mut total: u64 = 0;
    loop {
        let chunk = stream.read_chars(COUNT_STEP)?;
        if chunk.is_empty() {
            break;
        }
        total += chunk.chars().count() as u64;
    }
    Ok(total)
}

/// 统计文件的总行数（最后一行无结尾换行也算一行）
pub fn count_lines(path: &Path, encoding: &'static Encoding) -> Result<u64> {
    let mut stream = DecodedStream::open(path, encoding)?;
    let mut total: u64 = 0;
    while stream.next_line()?.is_some() {
        total += 1;
    }
    Ok(total)
}

#[cfg(test)]
mod tests {
    use super::*;
    use encoding_rs::{GBK, UTF_8};
    use std::io::Write;

    fn write_temp(name: &str, bytes: &[u8]) -> std::path::PathBuf {
        let path = std::env::temp_dir().join(format!("fsplit-count-{name}"));
        let mut f = std::fs::File::create(&path).unwrap();
        f.write_all(bytes).unwrap();
        path
    }

    #[test]
    fn chars_counts_scalars_not_bytes() {
        // 8 个汉字加一个换行，共 9 个字符，远少于字节数
        let path = write_temp("chars", "字符数不是字节数\n".as_bytes());
        assert_eq!(count_chars(&path, UTF_8).unwrap(), 9);
    }

    #[test]
    fn chars_under_gbk() {
        let (bytes, _, _) = GBK.encode("你好ab");
        let path = write_temp("gbk", &bytes);
        assert_eq!(count_chars(&path, GBK).unwrap(), 4);
    }

    #[test]
    fn lines_with_and_without_trailing_newline() {
        let path = write_temp("lines-a", b"a\nb\nc\n");
        assert_eq!(count_lines(&path, UTF_8).unwrap(), 3);
        let path = write_temp("lines-b", b"a\nb\nc");
        assert_eq!(count_lines(&path, UTF_8).unwrap(), 3);
    }

    #[test]
    fn empty_file_counts_zero() {
        let path = write_temp("zero", b"");
        assert_eq!(count_chars(&path, UTF_8).unwrap(), 0);
        assert_eq!(count_lines(&path, UTF_8).unwrap(), 0);
    }
}
