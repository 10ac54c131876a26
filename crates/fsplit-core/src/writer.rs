//! 分片文件写出（编号命名 + 输出编码）
use encoding_rs::{Encoder, EncoderResult, Encoding};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::error::{Result, SplitError};
use crate::options::UnencodablePolicy;

/// 编码输出缓冲大小（字节）
const ENCODE_BUF_LEN: usize = 4096;

/// 无法用输出编码表示的字符写成的占位符
const PLACEHOLDER: &[u8] = b"?";

/// 一个已写完的分片
#[derive(Debug)]
pub(crate) struct PartInfo {
    pub(crate) path: PathBuf,
    /// 解码域的字符数（与日志、总量核对一致）
    pub(crate) chars: u64,
}

/// 分片写出器：持有目录、基础名与输出编码，按 1 起始的编号落盘
/// 命名规则 `{base}_part{N}{ext}`，编号连续无空洞。
pub(crate) struct ChunkWriter {
    dir: PathBuf,
    stem: String,
    ext: String,
    encoding: &'static Encoding,
    policy: UnencodablePolicy,
}

impl ChunkWriter {
    pub(crate) fn new(
        output_dir: &Path,
        input_path: &Path,
        encoding: &'static Encoding,
        policy: UnencodablePolicy,
    ) -> Self {
        let file_name = input_path
            .file_name()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        // 与 splitext 同语义：扩展名含点，隐藏文件名整体视作基础名
        let (stem, ext) = match file_name.rfind('.') {
            Some(i) if i > 0 => (file_name[..i].to_string(), file_name[i..].to_string()),
            _ => (file_name, String::new()),
        };
        Self {
            dir: output_dir.to_path_buf(),
            stem,
            ext,
            encoding,
            policy,
        }
    }

    fn part_path(&self, index: u64) -> PathBuf {
        self.dir.join(format!("{}_part{}{}", self.stem, index, self.ext))
    }

    /// 打开一个分片供增量写入；行数模式跨多次写入持有这个句柄
    pub(crate) fn open_part(&self, index: u64) -> Result<PartFile> {
        let path = self.part_path(index);
        let file = File::create(&path)?;
        Ok(PartFile {
            out: BufWriter::new(file),
            encoder: self.encoding.new_encoder(),
            encoding_name: self.encoding.name(),
            policy: self.policy,
            path,
            chars: 0,
        })
    }

    /// 整片写出：打开、编码、写入、关闭都在这一步内完成
    pub(crate) fn write_part(&self, index: u64, text: &str) -> Result<PartInfo> {
        let mut part = self.open_part(index)?;
        part.write_str(text)?;
        part.finish()
    }
}

/// 写入中的分片文件；`finish` 冲刷编码器的收尾序列并关闭
pub(crate) struct PartFile {
    out: BufWriter<File>,
    encoder: Encoder,
    encoding_name: &'static str,
    policy: UnencodablePolicy,
    path: PathBuf,
    chars: u64,
}

impl PartFile {
    pub(crate) fn write_str(&mut self, text: &str) -> Result<()> {
        self.chars += text.chars().count() as u64;
        self.encode(text, false)
    }

    pub(crate) fn finish(mut self) -> Result<PartInfo> {
        self.encode("", true)?;
        self.out.flush()?;
        Ok(PartInfo {
            path: self.path,
            chars: self.chars,
        })
    }

    fn encode(&mut self, text: &str, last: bool) -> Result<()> {
        let mut buf = [0u8; ENCODE_BUF_LEN];
        let mut src = text;
        loop {
            let (result, read, written) =
                self.encoder
                    .encode_from_utf8_without_replacement(src, &mut buf, last);
            self.out.write_all(&buf[..written])?;
            src = &src[read..];
            match result {
                EncoderResult::InputEmpty => return Ok(()),
                EncoderResult::OutputFull => continue,
                EncoderResult::Unmappable(ch) => match self.policy {
                    UnencodablePolicy::Replace => self.out.write_all(PLACEHOLDER)?,
                    UnencodablePolicy::Fail => {
                        return Err(SplitError::Unencodable {
                            ch,
                            encoding: self.encoding_name,
                        })
                    }
                },
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use encoding_rs::{GBK, UTF_8, WINDOWS_1252};
    use std::fs;

    fn test_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("fsplit-writer-{name}"));
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn part_naming_keeps_extension() {
        let dir = test_dir("naming");
        let w = ChunkWriter::new(
            &dir,
            Path::new("/in/novel.txt"),
            UTF_8,
            UnencodablePolicy::Replace,
        );
        let info = w.write_part(3, "abc").unwrap();
        assert_eq!(info.path, dir.join("novel_part3.txt"));
        assert_eq!(info.chars, 3);
    }

    #[test]
    fn part_naming_without_extension() {
        let dir = test_dir("noext");
        let w = ChunkWriter::new(&dir, Path::new("README"), UTF_8, UnencodablePolicy::Replace);
        let info = w.write_part(1, "x").unwrap();
        assert_eq!(info.path, dir.join("README_part1"));
    }

    #[test]
    fn gbk_output_bytes() {
        let dir = test_dir("gbk");
        let w = ChunkWriter::new(
            &dir,
            Path::new("a.txt"),
            GBK,
            UnencodablePolicy::Replace,
        );
        let info = w.write_part(1, "你好").unwrap();
        assert_eq!(fs::read(&info.path).unwrap(), vec![0xC4, 0xE3, 0xBA, 0xC3]);
        assert_eq!(info.chars, 2);
    }

    #[test]
    fn unencodable_becomes_placeholder() {
        let dir = test_dir("replace");
        let w = ChunkWriter::new(
            &dir,
            Path::new("a.txt"),
            WINDOWS_1252,
            UnencodablePolicy::Replace,
        );
        let info = w.write_part(1, "a汉b").unwrap();
        assert_eq!(fs::read(&info.path).unwrap(), b"a?b");
        // 字符数按解码域统计，占位替换不影响它
        assert_eq!(info.chars, 3);
    }

    #[test]
    fn unencodable_fails_under_fail_policy() {
        let dir = test_dir("fail");
        let w = ChunkWriter::new(
            &dir,
            Path::new("a.txt"),
            WINDOWS_1252,
            UnencodablePolicy::Fail,
        );
        match w.write_part(1, "a汉b") {
            Err(SplitError::Unencodable { ch, .. }) => assert_eq!(ch, '汉'),
            other => panic!("期望 Unencodable 错误，得到 {other:?}"),
        }
    }

    #[test]
    fn incremental_part_matches_whole_write() {
        let dir = test_dir("incremental");
        let w = ChunkWriter::new(&dir, Path::new("a.log"), GBK, UnencodablePolicy::Replace);
        let mut part = w.open_part(1).unwrap();
        part.write_str("第一行\n").unwrap();
        part.write_str("第二行\n").unwrap();
        let info = part.finish().unwrap();
        let whole = w.write_part(2, "第一行\n第二行\n").unwrap();
        assert_eq!(
            fs::read(&info.path).unwrap(),
            fs::read(&whole.path).unwrap()
        );
        assert_eq!(info.chars, whole.chars);
    }
}
