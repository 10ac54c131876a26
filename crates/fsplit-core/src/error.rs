//! 错误分类（对外暴露）
use std::path::PathBuf;
use thiserror::Error;

/// 分割过程中的致命错误
/// - 解码错误不在此列：坏字节以替换符恢复，不中断运行。
/// - `Unencodable` 仅在请求选择了 Fail 策略时出现。
#[derive(Debug, Error)]
pub enum SplitError {
    /// 输入路径不是常规文件（在创建输出目录之前检出）
    #[error("文件不存在: {0}")]
    InputNotFound(PathBuf),

    /// 大小参数、份数等非法（在任何 I/O 之前检出）
    #[error("参数无效: {0}")]
    InvalidParameter(String),

    /// 正则表达式无法编译（构造期失败，而非运行期）
    #[error("正则表达式无效: {0}")]
    InvalidPattern(#[from] regex::Error),

    /// 输出编码无法表示某个字符（仅 Fail 策略）
    #[error("字符 {ch:?} 无法以 {encoding} 编码")]
    Unencodable { ch: char, encoding: &'static str },

    /// 写分片或读输入时的底层 I/O 失败；已写出的分片不回滚
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, SplitError>;
