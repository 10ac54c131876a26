//! 文本文件分割引擎（核心库）
//!
//! 设计要点：
//! - 单次前向流式遍历输入，按 4KB 块解码，不把文件整读进内存。
//! - 编码请求是闭合的选择类型：自动检测对文件头部采样做统计检测，
//!   “同输入”与“系统默认”在运行开始时落实为具体编码，此后不变。
//! - 坏字节以替换符（U+FFFD）恢复，解码总能进行到底；输出编码无法
//!   表示的字符按请求策略写占位符或作为致命错误传播。
//! - 进度与日志只经注入的窄接口汇报，核心不依赖任何表现层；
//!   回调在引擎所在线程同步触发，跨线程转发由调用方负责。
//! - 分片命名 `{base}_part{N}{ext}`，编号自 1 起连续无空洞。

mod count;
mod encoding;
mod error;
mod options;
mod sinks;
mod split;
mod stream;
mod writer;

// 对外暴露的公共接口
pub use count::{count_chars, count_lines};
pub use error::{Result, SplitError};
pub use options::{
    InputEncodingChoice, LineOverflow, OutputEncodingChoice, SplitMode, SplitOutcome,
    SplitRequest, UnencodablePolicy,
};
pub use sinks::{LogSink, MemorySink, NullSink, ProgressSink};
pub use split::run;
