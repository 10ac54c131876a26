//! 分割请求与结果类型（模块）
use encoding_rs::Encoding;
use std::path::PathBuf;

/// 整行装箱的溢出策略
/// - Strict：行永不拆开；装不下的行整体推迟到下一分片。
/// - Flexible：先追加再判断，分片可以在追加了越界行之后立即关闭。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineOverflow {
    Strict,
    Flexible,
}

/// 分割模式及其大小参数
#[derive(Debug, Clone)]
pub enum SplitMode {
    /// 按固定字符数分割
    /// - `line_aware` 为 None 时是原始模式，行可能在中间被截断；
    /// - 为 Some 时按整行装箱，溢出策略见 [`LineOverflow`]。
    FixedChars {
        chars_per_file: u64,
        line_aware: Option<LineOverflow>,
    },
    /// 按固定行数分割，与字符长度无关
    LineCount { lines_per_file: u64 },
    /// 均分为恰好 N 份，余数依次分给最前面的分片
    Partition { total_parts: u64 },
    /// 在每个正则命中处切开
    /// - `keep_delimiter` 为 true 时命中文本单独成片，否则丢弃。
    Regex { pattern: String, keep_delimiter: bool },
}

/// 输入编码的请求形式
#[derive(Debug, Clone, Copy)]
pub enum InputEncodingChoice {
    /// 采样文件头部自动检测
    Auto,
    Named(&'static Encoding),
}

impl InputEncodingChoice {
    /// 从用户标签解析："auto" 或任一已知编码名（如 "utf-8"、"gbk"）
    pub fn parse_label(label: &str) -> Option<Self> {
        if label.eq_ignore_ascii_case("auto") {
            return Some(Self::Auto);
        }
        Encoding::for_label(label.trim().as_bytes()).map(Self::Named)
    }
}

/// 输出编码的请求形式
#[derive(Debug, Clone, Copy)]
pub enum OutputEncodingChoice {
    /// 与解析后的输入编码一致
    SameAsInput,
    /// 宿主系统的默认文本编码
    SystemDefault,
    Named(&'static Encoding),
}

impl OutputEncodingChoice {
    /// 从用户标签解析："same"（同输入）、"system"（系统默认）或具体编码名
    pub fn parse_label(label: &str) -> Option<Self> {
        if label.eq_ignore_ascii_case("same") {
            return Some(Self::SameAsInput);
        }
        if label.eq_ignore_ascii_case("system") {
            return Some(Self::SystemDefault);
        }
        Encoding::for_label(label.trim().as_bytes()).map(Self::Named)
    }
}

/// 输出编码无法表示字符时的处理策略
/// - Replace：写入占位符 `?` 并继续（默认）。
/// - Fail：作为致命错误向上传播。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnencodablePolicy {
    Replace,
    Fail,
}

/// 一次分割请求；在单次运行期间不可变
#[derive(Debug, Clone)]
pub struct SplitRequest {
    pub input_path: PathBuf,
    pub output_dir: PathBuf,
    pub mode: SplitMode,
    pub input_encoding: InputEncodingChoice,
    pub output_encoding: OutputEncodingChoice,
    pub on_unencodable: UnencodablePolicy,
}

/// 分割结果（便于调用方打印）
#[derive(Debug, Default, Clone, Copy)]
pub struct SplitOutcome {
    /// 实际创建的分片文件数
    pub files_created: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use encoding_rs::{GBK, UTF_8};

    #[test]
    fn input_labels_parse() {
        assert!(matches!(
            InputEncodingChoice::parse_label("AUTO"),
            Some(InputEncodingChoice::Auto)
        ));
        assert!(matches!(
            InputEncodingChoice::parse_label("gbk"),
            Some(InputEncodingChoice::Named(e)) if e == GBK
        ));
        assert!(InputEncodingChoice::parse_label("not-an-encoding").is_none());
    }

    #[test]
    fn output_labels_parse() {
        assert!(matches!(
            OutputEncodingChoice::parse_label("same"),
            Some(OutputEncodingChoice::SameAsInput)
        ));
        assert!(matches!(
            OutputEncodingChoice::parse_label("system"),
            Some(OutputEncodingChoice::SystemDefault)
        ));
        assert!(matches!(
            OutputEncodingChoice::parse_label("utf-8"),
            Some(OutputEncodingChoice::Named(e)) if e == UTF_8
        ));
    }
}
