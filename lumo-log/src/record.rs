//! 日志记录定义（no_std 兼容）

use core::fmt;

/// 日志级别
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
#[repr(u8)]
pub enum Level {
    /// 最详细的跟踪信息（逐指令级别）
    Trace = 0,
    /// 调试信息
    Debug = 1,
    /// 一般信息
    Info = 2,
    /// 警告
    Warn = 3,
    /// 错误
    Error = 4,
}

impl Level {
    /// 将级别转换为字符串
    pub const fn as_str(&self) -> &'static str {
        match self {
            Level::Trace => "TRACE",
            Level::Debug => "DEBUG",
            Level::Info => "INFO",
            Level::Warn => "WARN",
            Level::Error => "ERROR",
        }
    }

    /// 从u8解析级别
    pub const fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Level::Trace),
            1 => Some(Level::Debug),
            2 => Some(Level::Info),
            3 => Some(Level::Warn),
            4 => Some(Level::Error),
            _ => None,
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// 单条日志记录（no_std 兼容，使用 String 需要 alloc）
#[cfg(feature = "alloc")]
pub struct Record {
    /// Unix时间戳（毫秒）- 从某个固定起点开始
    pub timestamp_ms: u64,
    /// 日志级别
    pub level: Level,
    /// 模块路径（编译期确定）
    pub target: &'static str,
    /// 格式化后的消息
    pub message: alloc::string::String,
    /// 可选的调用链ID
    pub span_id: Option<u64>,
}

#[cfg(feature = "alloc")]
impl Record {
    /// 创建新记录
    pub fn new(
        level: Level,
        target: &'static str,
        message: impl Into<alloc::string::String>,
    ) -> Self {
        Self {
            timestamp_ms: current_timestamp_ms(),
            level,
            target,
            message: message.into(),
            span_id: None,
        }
    }

    /// 创建带span ID的记录
    pub fn with_span(mut self, span_id: u64) -> Self {
        self.span_id = Some(span_id);
        self
    }

    /// 格式化记录为字符串
    pub fn format(&self) -> alloc::string::String {
        let span_info = match self.span_id {
            Some(id) => alloc::format!(" [span={id}]"),
            None => alloc::string::String::new(),
        };

        alloc::format!(
            "[{}] {} {}{}: {}",
            format_timestamp(self.timestamp_ms),
            self.level,
            self.target,
            span_info,
            self.message
        )
    }
}

#[cfg(feature = "alloc")]
impl Clone for Record {
    fn clone(&self) -> Self {
        Self {
            timestamp_ms: self.timestamp_ms,
            level: self.level,
            target: self.target,
            message: self.message.clone(),
            span_id: self.span_id,
        }
    }
}

#[cfg(feature = "alloc")]
impl core::fmt::Debug for Record {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Record")
            .field("timestamp_ms", &self.timestamp_ms)
            .field("level", &self.level)
            .field("target", &self.target)
            .field("message", &self.message)
            .field("span_id", &self.span_id)
            .finish()
    }
}

#[cfg(feature = "alloc")]
impl PartialEq for Record {
    fn eq(&self, other: &Self) -> bool {
        self.timestamp_ms == other.timestamp_ms
            && self.level == other.level
            && self.target == other.target
            && self.message == other.message
            && self.span_id == other.span_id
    }
}

#[cfg(feature = "std")]
fn current_timestamp_ms() -> u64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

#[cfg(all(feature = "alloc", not(feature = "std")))]
static MONOTONIC_COUNTER: core::sync::atomic::AtomicU64 = core::sync::atomic::AtomicU64::new(0);

#[cfg(all(feature = "alloc", not(feature = "std")))]
fn current_timestamp_ms() -> u64 {
    // no_std 环境下使用单调递增计数器作为时间戳
    // 实际项目应该接入硬件时钟
    MONOTONIC_COUNTER.fetch_add(1, core::sync::atomic::Ordering::Relaxed)
}

/// 格式化时间戳为 HH:MM:SS.mmm
#[cfg(feature = "alloc")]
fn format_timestamp(timestamp_ms: u64) -> alloc::string::String {
    let total_secs = timestamp_ms / 1000;
    let millis = timestamp_ms % 1000;
    let secs = total_secs % 60;
    let mins = (total_secs / 60) % 60;
    let hours = (total_secs / 3600) % 24;
    alloc::format!("{hours:02}:{mins:02}:{secs:02}.{millis:03}")
}
