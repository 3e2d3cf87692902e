//! 日志器实现（no_std + alloc 兼容）

use crate::record::{Level, Record};
use crate::span::{Span, SpanId};
use alloc::boxed::Box;
use alloc::sync::Arc;
use alloc::vec::Vec;
use core::sync::atomic::{AtomicU64, AtomicU8, Ordering};

// 使用 spin::Mutex 替代 std::sync::Mutex
use crate::ring_buffer::spin::Mutex;

/// 日志输出目标trait
pub trait LogSink: Send + Sync {
    /// 写入日志记录
    fn write(&self, record: &Record);
}

/// 日志器配置和状态
pub struct Logger {
    /// 当前日志级别（原子存储）
    level: AtomicU8,
    /// 输出目标列表
    sinks: Mutex<Vec<Box<dyn LogSink>>>,
    /// Span栈（用于跟踪嵌套调用）
    span_stack: Mutex<Vec<Span>>,
    /// 下一个Span ID
    next_span_id: AtomicU64,
}

impl Logger {
    /// 创建新的日志器
    pub fn new(level: Level) -> Arc<Self> {
        Arc::new(Logger {
            level: AtomicU8::new(level as u8),
            sinks: Mutex::new(Vec::new()),
            span_stack: Mutex::new(Vec::new()),
            next_span_id: AtomicU64::new(1),
        })
    }

    /// 添加输出目标
    pub fn with_sink<S: LogSink + 'static>(self: Arc<Self>, sink: S) -> Arc<Self> {
        {
            let mut sinks = self.sinks.lock();
            sinks.push(Box::new(sink));
        }
        self
    }

    /// 动态设置日志级别
    pub fn set_level(&self, level: Level) {
        self.level.store(level as u8, Ordering::Relaxed);
    }

    /// 获取当前日志级别
    pub fn level(&self) -> Level {
        Level::from_u8(self.level.load(Ordering::Relaxed)).unwrap_or(Level::Info)
    }

    /// 检查指定级别是否启用
    pub fn is_enabled(&self, level: Level) -> bool {
        level >= self.level()
    }

    /// 记录日志（内部方法）
    #[inline(never)]
    pub fn log(
        &self,
        level: Level,
        target: &'static str,
        message: impl Into<alloc::string::String>,
    ) {
        if !self.is_enabled(level) {
            return;
        }

        let mut record = Record::new(level, target, message);

        // 附加当前span ID（如果有）
        let stack = self.span_stack.lock();
        if let Some(span) = stack.last() {
            record = record.with_span(span.id.0);
        }

        // 写入所有sink
        let sinks = self.sinks.lock();
        for sink in sinks.iter() {
            sink.write(&record);
        }
    }

    /// 进入一个新的span，返回守卫对象
    pub fn enter_span(self: &Arc<Self>, name: &'static str) -> SpanGuard {
        let id = SpanId(self.next_span_id.fetch_add(1, Ordering::Relaxed));
        let span = Span::new(id, name);

        let mut stack = self.span_stack.lock();
        stack.push(span);

        SpanGuard {
            logger: Arc::clone(self),
        }
    }

    /// 获取当前span栈深度
    pub fn span_depth(&self) -> usize {
        self.span_stack.lock().len()
    }

    /// 创建禁用日志的no-op日志器（用于测试或禁用场景）
    pub fn noop() -> Arc<Self> {
        Self::new(Level::Error) // Error级别，且没有任何sink
    }

    /// 添加 sink（内部方法，用于 config）
    pub fn add_sink<S: LogSink + 'static>(&self, sink: S) {
        let mut sinks = self.sinks.lock();
        sinks.push(Box::new(sink));
    }
}

/// Span守卫，退出时自动弹出span栈
pub struct SpanGuard {
    logger: Arc<Logger>,
}

impl Drop for SpanGuard {
    fn drop(&mut self) {
        let mut stack = self.logger.span_stack.lock();
        stack.pop();
    }
}

// 为Arc<Logger>实现LogSink，支持链式日志器
impl LogSink for Arc<Logger> {
    fn write(&self, record: &Record) {
        self.log(record.level, record.target, record.message.clone());
    }
}

#[cfg(feature = "std")]
/// 标准输出sink
pub struct StdoutSink;

#[cfg(feature = "std")]
impl LogSink for StdoutSink {
    fn write(&self, record: &Record) {
        println!("{}", record.format());
    }
}

#[cfg(feature = "std")]
/// 标准错误sink
pub struct StderrSink;

#[cfg(feature = "std")]
impl LogSink for StderrSink {
    fn write(&self, record: &Record) {
        eprintln!("{}", record.format());
    }
}

#[cfg(feature = "std")]
/// 文件sink
pub struct FileSink {
    file: std::sync::Mutex<std::fs::File>,
}

#[cfg(feature = "std")]
impl FileSink {
    /// 创建文件sink（追加模式）
    pub fn new(path: impl AsRef<std::path::Path>) -> std::io::Result<Self> {
        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)?;

        Ok(FileSink {
            file: std::sync::Mutex::new(file),
        })
    }
}

#[cfg(feature = "std")]
impl LogSink for FileSink {
    #[inline(never)]
    fn write(&self, record: &Record) {
        use std::io::Write;
        if let Ok(mut file) = self.file.lock() {
            let _ = writeln!(file, "{}", record.format());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ring_buffer::LogRingBuffer;

    #[test]
    fn test_logger_level_switch() {
        let logger = Logger::new(Level::Info);
        assert!(!logger.is_enabled(Level::Debug));

        logger.set_level(Level::Trace);
        assert!(logger.is_enabled(Level::Debug));
    }

    #[test]
    fn test_logger_writes_to_sink() {
        let ring = LogRingBuffer::new(10);
        let logger = Logger::new(Level::Debug).with_sink(ring.clone());

        logger.log(Level::Info, "lumo::vm", "hello");
        logger.log(Level::Trace, "lumo::vm", "filtered");

        let records = ring.dump_records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].message, "hello");
    }

    #[test]
    fn test_span_guard_pops_on_drop() {
        let logger = Logger::new(Level::Debug);
        assert_eq!(logger.span_depth(), 0);
        {
            let guard = logger.enter_span("collect");
            assert_eq!(logger.span_depth(), 1);
            drop(guard);
        }
        assert_eq!(logger.span_depth(), 0);
    }

    #[test]
    fn test_record_carries_span_id() {
        let ring = LogRingBuffer::new(10);
        let logger = Logger::new(Level::Debug).with_sink(ring.clone());

        let guard = logger.enter_span("execute");
        logger.log(Level::Debug, "lumo::vm", "inside span");
        drop(guard);

        let records = ring.dump_records();
        assert!(records[0].span_id.is_some());
    }
}
