//! 编码解析（自动检测 / 同输入 / 系统默认）
use chardetng::EncodingDetector;
use encoding_rs::{Encoding, UTF_8};
use std::fs::File;
use std::io::Read;
use std::path::Path;

use crate::error::Result;
use crate::options::{InputEncodingChoice, OutputEncodingChoice};
use crate::sinks::LogSink;

/// 自动检测时读取的文件头部采样长度（字节）
const DETECT_SAMPLE_LEN: usize = 4096;

/// 解析后的具体编码对；一次请求只计算一次，此后不变
#[derive(Debug, Clone, Copy)]
pub struct ResolvedEncodings {
    pub input: &'static Encoding,
    pub output: &'static Encoding,
}

/// 把请求中的符号编码落实为具体编码
/// - Auto：对文件头部采样做统计检测，空文件退回 UTF-8，并记录日志。
/// - SameAsInput：等于解析后的输入编码。
/// - SystemDefault：取宿主默认文本编码，并记录日志。
/// - 输出侧经 `output_encoding()` 归一化，UTF-16 一类仅解码的编码落到 UTF-8，
///   保证后续总能拿到编码器。
///
/// 本步骤不会致命失败：任何情况下都解析出一对可用编码。
pub(crate) fn resolve_encodings(
    input_path: &Path,
    input: InputEncodingChoice,
    output: OutputEncodingChoice,
    log: &mut dyn LogSink,
) -> Result<ResolvedEncodings> {
    let input_enc = match input {
        InputEncodingChoice::Named(e) => e,
        InputEncodingChoice::Auto => {
            let detected = detect_encoding(input_path)?;
            log.log(&format!("自动检测到编码: {}", detected.name()));
            detected
        }
    };

    let output_enc = match output {
        OutputEncodingChoice::Named(e) => e,
        OutputEncodingChoice::SameAsInput => input_enc,
        OutputEncodingChoice::SystemDefault => {
            let e = system_default_encoding();
            log.log(&format!("输出编码使用系统默认: {}", e.name()));
            e
        }
    };

    Ok(ResolvedEncodings {
        input: input_enc,
        output: output_enc.output_encoding(),
    })
}

/// 对文件头部采样并运行统计检测器
fn detect_encoding(path: &Path) -> Result<&'static Encoding> {
    let mut file = File::open(path)?;
    let mut sample = vec![0u8; DETECT_SAMPLE_LEN];
    let mut filled = 0usize;
    // File::read 允许短读，循环填满采样或到 EOF
    loop {
        let n = file.read(&mut sample[filled..])?;
        if n == 0 {
            break;
        }
        filled += n;
        if filled == sample.len() {
            break;
        }
    }
    if filled == 0 {
        return Ok(UTF_8);
    }

    let mut detector = EncodingDetector::new();
    // 采样短于上限说明整个文件都已看完
    detector.feed(&sample[..filled], filled < DETECT_SAMPLE_LEN);
    Ok(detector.guess(None, true))
}

/// 宿主默认文本编码：按 POSIX 惯例查 locale 的 codeset 后缀，查不到退回 UTF-8
fn system_default_encoding() -> &'static Encoding {
    for key in ["LC_ALL", "LC_CTYPE", "LANG"] {
        if let Ok(value) = std::env::var(key) {
            if let Some((_, codeset)) = value.split_once('.') {
                let codeset = codeset.split('@').next().unwrap_or(codeset);
                if let Some(e) = Encoding::for_label(codeset.as_bytes()) {
                    return e.output_encoding();
                }
            }
        }
    }
    UTF_8
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sinks::MemorySink;
    use encoding_rs::GBK;
    use std::io::Write;

    fn write_temp(name: &str, bytes: &[u8]) -> std::path::PathBuf {
        let path = std::env::temp_dir().join(format!("fsplit-enc-{name}"));
        let mut f = File::create(&path).unwrap();
        f.write_all(bytes).unwrap();
        path
    }

    #[test]
    fn named_passthrough_and_same_as_input() {
        let path = write_temp("named", b"hello");
        let mut sink = MemorySink::default();
        let resolved = resolve_encodings(
            &path,
            InputEncodingChoice::Named(GBK),
            OutputEncodingChoice::SameAsInput,
            &mut sink,
        )
        .unwrap();
        assert_eq!(resolved.input, GBK);
        assert_eq!(resolved.output, GBK);
        // 未发生自动检测或系统默认解析时不产生日志
        assert!(sink.lines.is_empty());
    }

    #[test]
    fn auto_detect_utf8_text() {
        let text = "编码检测需要一些非 ASCII 的样本文本。".repeat(8);
        let path = write_temp("utf8", text.as_bytes());
        let mut sink = MemorySink::default();
        let resolved = resolve_encodings(
            &path,
            InputEncodingChoice::Auto,
            OutputEncodingChoice::SameAsInput,
            &mut sink,
        )
        .unwrap();
        assert_eq!(resolved.input, UTF_8);
        assert!(sink.lines[0].starts_with("自动检测到编码: "));
    }

    #[test]
    fn auto_detect_gbk_reproduces_text() {
        let text = "这是一个用于统计编码检测的中文样本，内容足够长以便检测器有把握。".repeat(8);
        let (bytes, _, _) = GBK.encode(&text);
        let path = write_temp("gbk", &bytes);
        let mut sink = MemorySink::default();
        let resolved = resolve_encodings(
            &path,
            InputEncodingChoice::Auto,
            OutputEncodingChoice::SameAsInput,
            &mut sink,
        )
        .unwrap();
        // 不钉死检测器给出的名字，只要求按它解码能复原样本
        let (decoded, _, _) = resolved.input.decode(&bytes);
        assert_eq!(decoded, text);
    }

    #[test]
    fn empty_file_falls_back_to_utf8() {
        let path = write_temp("empty", b"");
        let mut sink = MemorySink::default();
        let resolved = resolve_encodings(
            &path,
            InputEncodingChoice::Auto,
            OutputEncodingChoice::SameAsInput,
            &mut sink,
        )
        .unwrap();
        assert_eq!(resolved.input, UTF_8);
    }

    #[test]
    fn utf16_output_is_normalized_to_utf8() {
        let path = write_temp("u16", b"abc");
        let mut sink = MemorySink::default();
        let resolved = resolve_encodings(
            &path,
            InputEncodingChoice::Named(encoding_rs::UTF_16LE),
            OutputEncodingChoice::SameAsInput,
            &mut sink,
        )
        .unwrap();
        assert_eq!(resolved.input, encoding_rs::UTF_16LE);
        assert_eq!(resolved.output, UTF_8);
    }
}
