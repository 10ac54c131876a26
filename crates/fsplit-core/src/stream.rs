//! 流式解码读取（按块解码，不整读文件）
use encoding_rs::{CoderResult, Decoder, Encoding};
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use crate::error::Result;

/// 每次从底层读取的块大小（字节）
const BLOCK_LEN: usize = 4096;

/// 以指定编码流式解码一个字节源
/// - 坏字节按替换符（U+FFFD）恢复，解码总能进行到底。
/// - `next_line` 返回含结尾 `\n` 的整行（`\r\n` 原样保留在行内）；
///   `read_chars` 按字符数取文本，与行边界无关。
/// - 不做 BOM 处理：BOM 若存在，按普通字符解码、计数、写出。
pub(crate) struct DecodedStream<R: Read> {
    reader: R,
    decoder: Decoder,
    block: [u8; BLOCK_LEN],
    /// 已解码但尚未被消费的文本
    pending: String,
    eof: bool,
}

impl DecodedStream<BufReader<File>> {
    pub(crate) fn open(path: &Path, encoding: &'static Encoding) -> Result<Self> {
        let file = File::open(path)?;
        Ok(Self::new(BufReader::new(file), encoding))
    }
}

impl<R: Read> DecodedStream<R> {
    pub(crate) fn new(reader: R, encoding: &'static Encoding) -> Self {
        Self {
            reader,
            decoder: encoding.new_decoder_without_bom_handling(),
            block: [0u8; BLOCK_LEN],
            pending: String::new(),
            eof: false,
        }
    }

    /// 读取并解码下一块；到 EOF 时冲刷解码器中的残余序列
    fn fill(&mut self) -> Result<()> {
        let n = self.reader.read(&mut self.block)?;
        if n == 0 {
            // 末尾的半截多字节序列在这里变成替换符
            loop {
                let needed = self.decoder.max_utf8_buffer_length(0).unwrap_or(16);
                self.pending.reserve(needed.max(4));
                let (result, _, _) = self.decoder.decode_to_string(&[], &mut self.pending, true);
                if matches!(result, CoderResult::InputEmpty) {
                    break;
                }
            }
            self.eof = true;
            return Ok(());
        }

        let mut src = &self.block[..n];
        loop {
            let needed = self
                .decoder
                .max_utf8_buffer_length(src.len())
                .unwrap_or(src.len() * 3 + 4);
            self.pending.reserve(needed);
            let (result, read, _replaced) =
                self.decoder.decode_to_string(src, &mut self.pending, false);
            src = &src[read..];
            match result {
                CoderResult::InputEmpty => break,
                CoderResult::OutputFull => continue,
            }
        }
        Ok(())
    }

    /// 下一行，含结尾换行符；流结束返回 None
    pub(crate) fn next_line(&mut self) -> Result<Option<String>> {
        loop {
            if let Some(pos) = self.pending.find('\n') {
                let line: String = self.pending.drain(..=pos).collect();
                return Ok(Some(line));
            }
            if self.eof {
                if self.pending.is_empty() {
                    return Ok(None);
                }
                // 无结尾换行的最后一行
                return Ok(Some(std::mem::take(&mut self.pending)));
            }
            self.fill()?;
        }
    }

    /// 取至多 `n` 个字符；流耗尽时返回的文本可能更短（或为空）
    pub(crate) fn read_chars(&mut self, n: u64) -> Result<String> {
        let mut out = String::new();
        let mut taken: u64 = 0;
        while taken < n {
            if self.pending.is_empty() {
                if self.eof {
                    break;
                }
                self.fill()?;
                continue;
            }
            let need = (n - taken) as usize;
            let pending_chars = self.pending.chars().count();
            if pending_chars <= need {
                out.push_str(&self.pending);
                self.pending.clear();
                taken += pending_chars as u64;
            } else {
                // nth(need) 必然存在：pending 的字符数大于 need
                let cut = self
                    .pending
                    .char_indices()
                    .nth(need)
                    .map(|(i, _)| i)
                    .unwrap_or(self.pending.len());
                out.push_str(&self.pending[..cut]);
                self.pending.drain(..cut);
                taken += need as u64;
            }
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use encoding_rs::{GBK, UTF_8};

    fn stream_of(bytes: &[u8], enc: &'static Encoding) -> DecodedStream<std::io::Cursor<Vec<u8>>> {
        DecodedStream::new(std::io::Cursor::new(bytes.to_vec()), enc)
    }

    #[test]
    fn lines_keep_terminators() {
        let mut s = stream_of(b"ab\r\ncd\nend", UTF_8);
        assert_eq!(s.next_line().unwrap().as_deref(), Some("ab\r\n"));
        assert_eq!(s.next_line().unwrap().as_deref(), Some("cd\n"));
        assert_eq!(s.next_line().unwrap().as_deref(), Some("end"));
        assert_eq!(s.next_line().unwrap(), None);
    }

    #[test]
    fn read_chars_crosses_block_boundary() {
        let text = "x".repeat(BLOCK_LEN + 100);
        let mut s = stream_of(text.as_bytes(), UTF_8);
        assert_eq!(s.read_chars(7).unwrap().len(), 7);
        let rest = s.read_chars(u64::MAX).unwrap();
        assert_eq!(rest.len(), BLOCK_LEN + 100 - 7);
        assert!(s.read_chars(1).unwrap().is_empty());
    }

    #[test]
    fn gbk_bytes_decode_to_chars() {
        let (bytes, _, _) = GBK.encode("你好，世界\n第二行\n");
        let mut s = stream_of(&bytes, GBK);
        assert_eq!(s.next_line().unwrap().as_deref(), Some("你好，世界\n"));
        assert_eq!(s.next_line().unwrap().as_deref(), Some("第二行\n"));
        assert_eq!(s.next_line().unwrap(), None);
    }

    #[test]
    fn malformed_bytes_become_replacement_chars() {
        // 0xFF 不是合法 UTF-8 首字节
        let mut s = stream_of(b"a\xFFb", UTF_8);
        assert_eq!(s.read_chars(10).unwrap(), "a\u{FFFD}b");
    }

    #[test]
    fn truncated_multibyte_at_eof_is_replaced() {
        // "你" 的 UTF-8 是三个字节，这里只给前两个
        let mut s = stream_of(&[0xE4, 0xBD], UTF_8);
        assert_eq!(s.read_chars(10).unwrap(), "\u{FFFD}");
    }

    #[test]
    fn multibyte_split_across_blocks_decodes_whole() {
        // 用多字节字符填满并跨越块边界，确认解码器状态跨块保持
        let text = "汉".repeat(BLOCK_LEN / 2);
        let mut s = stream_of(text.as_bytes(), UTF_8);
        let all = s.read_chars(u64::MAX).unwrap();
        assert_eq!(all, text);
    }
}
