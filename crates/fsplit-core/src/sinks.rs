//! 进度与日志回调接口
//!
//! 引擎只向这两个窄接口汇报，不依赖任何表现层；
//! 回调在引擎所在线程同步调用，跨线程转发由调用方负责。

/// 进度回调：每写出一个分片至少调用一次，
/// 单次运行内百分比单调不减，结束时到达 100。
pub trait ProgressSink {
    fn progress(&mut self, percent: f64);
}

/// 日志回调：编码解析结果、总量统计、每个分片的创建记录等
pub trait LogSink {
    fn log(&mut self, message: &str);
}

/// 空实现：调用方不关心进度/日志时使用
pub struct NullSink;

impl ProgressSink for NullSink {
    fn progress(&mut self, _percent: f64) {}
}

impl LogSink for NullSink {
    fn log(&mut self, _message: &str) {}
}

// 闭包可直接充当回调，与 GUI 时代传 lambda 的用法对齐
impl<F: FnMut(f64)> ProgressSink for F {
    fn progress(&mut self, percent: f64) {
        self(percent)
    }
}

impl<F: FnMut(&str)> LogSink for F {
    fn log(&mut self, message: &str) {
        self(message)
    }
}

/// 缓冲收集器：把两路回调攒在内存里，测试与批处理场景使用
#[derive(Debug, Default)]
pub struct MemorySink {
    pub percents: Vec<f64>,
    pub lines: Vec<String>,
}

impl ProgressSink for MemorySink {
    fn progress(&mut self, percent: f64) {
        self.percents.push(percent);
    }
}

impl LogSink for MemorySink {
    fn log(&mut self, message: &str) {
        self.lines.push(message.to_string());
    }
}
