//! 日志配置（std 平台专用）
//!
//! 提供便捷的日志初始化配置。

use crate::logger::LogSink;
use crate::record::Record;
use crate::{Level, LogRingBuffer, Logger};
use alloc::sync::Arc;
#[cfg(feature = "file")]
use std::io::Write;

/// 文件sink
#[cfg(feature = "file")]
struct FileSink {
    file: std::sync::Mutex<std::fs::File>,
}

#[cfg(feature = "file")]
impl FileSink {
    /// 创建文件sink（追加模式）
    fn new(path: impl AsRef<std::path::Path>) -> std::io::Result<Self> {
        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)?;

        Ok(FileSink {
            file: std::sync::Mutex::new(file),
        })
    }
}

#[cfg(feature = "file")]
impl LogSink for FileSink {
    fn write(&self, record: &Record) {
        if let Ok(mut file) = self.file.lock() {
            let _ = writeln!(file, "{}", record.format());
        }
    }
}

/// 日志输出目标配置
#[derive(Clone, Debug, PartialEq)]
pub enum OutputConfig {
    /// 输出到标准输出
    #[cfg(feature = "stdout")]
    Stdout,
    /// 输出到标准错误
    #[cfg(feature = "stderr")]
    Stderr,
    /// 输出到文件（路径）
    #[cfg(feature = "file")]
    File(alloc::string::String),
    /// 输出到环形缓冲区（容量）
    RingBuffer(usize),
}

/// 日志配置
///
/// 用于一键初始化日志系统
///
/// # 示例
///
/// ```
/// use lumo_log::{LogConfig, Level};
///
/// let config = LogConfig::new(Level::Debug)
///     .with_ring_buffer(10000);
///
/// let (logger, ring) = config.init();
/// ```
#[derive(Clone, Debug)]
pub struct LogConfig {
    /// 日志级别
    pub level: Level,
    /// 输出目标列表
    pub outputs: alloc::vec::Vec<OutputConfig>,
    /// 是否启用 span 跟踪
    pub enable_span: bool,
}

impl LogConfig {
    /// 创建默认配置（指定级别，无输出）
    pub fn new(level: Level) -> Self {
        LogConfig {
            level,
            outputs: alloc::vec::Vec::new(),
            enable_span: true,
        }
    }

    /// 开发环境推荐配置
    ///
    /// - Debug 级别
    /// - 输出到 stdout
    /// - 环形缓冲区 10000 条（用于崩溃转储）
    #[cfg(feature = "stdout")]
    pub fn dev() -> Self {
        LogConfig {
            level: Level::Debug,
            outputs: alloc::vec![OutputConfig::Stdout, OutputConfig::RingBuffer(10000)],
            enable_span: true,
        }
    }

    /// 生产环境推荐配置
    ///
    /// - Warn 级别
    /// - 输出到 stderr
    /// - 环形缓冲区 1000 条
    #[cfg(feature = "stderr")]
    pub fn production() -> Self {
        LogConfig {
            level: Level::Warn,
            outputs: alloc::vec![OutputConfig::Stderr, OutputConfig::RingBuffer(1000)],
            enable_span: false,
        }
    }

    /// 测试环境配置（静默）
    ///
    /// - Error 级别
    /// - 无输出（noop）
    pub fn test() -> Self {
        LogConfig {
            level: Level::Error,
            outputs: alloc::vec::Vec::new(),
            enable_span: false,
        }
    }

    /// 添加 stdout 输出
    #[cfg(feature = "stdout")]
    pub fn with_stdout(mut self) -> Self {
        if !self.outputs.contains(&OutputConfig::Stdout) {
            self.outputs.push(OutputConfig::Stdout);
        }
        self
    }

    /// 添加 stderr 输出
    #[cfg(feature = "stderr")]
    pub fn with_stderr(mut self) -> Self {
        if !self.outputs.contains(&OutputConfig::Stderr) {
            self.outputs.push(OutputConfig::Stderr);
        }
        self
    }

    /// 添加文件输出
    #[cfg(feature = "file")]
    pub fn with_file(mut self, path: impl Into<alloc::string::String>) -> Self {
        self.outputs.push(OutputConfig::File(path.into()));
        self
    }

    /// 添加环形缓冲区输出
    pub fn with_ring_buffer(mut self, capacity: usize) -> Self {
        self.outputs.push(OutputConfig::RingBuffer(capacity));
        self
    }

    /// 禁用 span 跟踪
    pub fn without_span(mut self) -> Self {
        self.enable_span = false;
        self
    }

    /// 初始化日志系统
    ///
    /// 返回 (logger, Option<ring_buffer>)
    /// 如果配置了环形缓冲区，会返回它（用于崩溃转储）
    pub fn init(self) -> (Arc<Logger>, Option<Arc<LogRingBuffer>>) {
        let logger = Logger::new(self.level);
        let mut ring_buffer: Option<Arc<LogRingBuffer>> = None;

        for output in self.outputs {
            match output {
                #[cfg(feature = "stdout")]
                OutputConfig::Stdout => {
                    logger.add_sink(StdoutSinkAdapter);
                }
                #[cfg(feature = "stderr")]
                OutputConfig::Stderr => {
                    logger.add_sink(StderrSinkAdapter);
                }
                #[cfg(feature = "file")]
                OutputConfig::File(path) => {
                    if let Ok(sink) = FileSink::new(&path) {
                        logger.add_sink(sink);
                    }
                }
                OutputConfig::RingBuffer(capacity) => {
                    let ring = LogRingBuffer::new(capacity);
                    ring_buffer = Some(Arc::clone(&ring));
                    logger.add_sink(ring);
                }
            }
        }

        (logger, ring_buffer)
    }
}

// 内部适配器类型，用于简化 API

#[cfg(feature = "stdout")]
struct StdoutSinkAdapter;

#[cfg(feature = "stdout")]
impl LogSink for StdoutSinkAdapter {
    fn write(&self, record: &Record) {
        println!("{}", record.format());
    }
}

#[cfg(feature = "stderr")]
struct StderrSinkAdapter;

#[cfg(feature = "stderr")]
impl LogSink for StderrSinkAdapter {
    fn write(&self, record: &Record) {
        eprintln!("{}", record.format());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_builder() {
        let config = LogConfig::new(Level::Info).with_ring_buffer(128).without_span();
        assert_eq!(config.level, Level::Info);
        assert_eq!(config.outputs.len(), 1);
        assert!(!config.enable_span);
    }

    #[test]
    fn test_init_returns_ring_buffer() {
        let (logger, ring) = LogConfig::new(Level::Debug).with_ring_buffer(16).init();
        assert!(ring.is_some());

        logger.log(Level::Info, "lumo::cli", "startup");
        let ring = ring.unwrap();
        assert_eq!(ring.stats().record_count, 1);
    }

    #[test]
    fn test_test_config_is_silent() {
        let config = LogConfig::test();
        assert_eq!(config.level, Level::Error);
        assert!(config.outputs.is_empty());
    }
}
