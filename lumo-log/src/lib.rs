//! lumo-log - 结构化日志系统
//!
//! 为 Lumo 运行时设计的结构化日志系统，特点：
//! - **无平台耦合**：支持 `no_std` + `alloc`，通过 feature flag 选择平台
//! - **显式传递**：无全局 logger，配置通过代码传入
//! - **非阻塞**：日志不卡执行主线程，满了覆盖旧数据
//! - **崩溃恢复**：环形缓冲区保留最后 N 条日志，供故障转储
//!
//! # 平台支持
//!
//! | Feature | 说明 | 适用场景 |
//! |---------|------|----------|
//! | `std` (默认) | 完整标准库支持 | 桌面/服务器 |
//! | `alloc` | 仅分配器，无std | 嵌入式 |
//! | `wasm` | Web 平台支持 | 浏览器 |
//!
//! # 快速开始
//!
//! ## 标准平台
//!
//! ```toml
//! [dependencies]
//! lumo-log = { version = "0.1", features = ["stdout", "stderr", "file"] }
//! ```
//!
//! ```ignore
//! use lumo_log::{LogConfig, debug};
//!
//! let (logger, ring) = LogConfig::dev().init();
//! debug!(logger, "运行时启动成功");
//! ```
//!
//! ## no_std + alloc 平台
//!
//! ```toml
//! [dependencies]
//! lumo-log = { version = "0.1", default-features = false, features = ["alloc"] }
//! ```
//!
//! ```ignore
//! use lumo_log::{Logger, Level, LogRingBuffer, debug};
//!
//! // 仅支持环形缓冲区（无stdout/stderr）
//! let ring = LogRingBuffer::new(1000);
//! let logger = Logger::new(Level::Debug).with_sink(ring);
//! debug!(logger, "嵌入式日志");
//! ```

#![cfg_attr(not(feature = "std"), no_std)]

#[cfg(feature = "alloc")]
extern crate alloc;

// 核心模块（所有平台通用）
mod macros;
mod record;
mod span;

// 条件编译模块
#[cfg(feature = "alloc")]
mod ring_buffer;

#[cfg(any(feature = "std", feature = "alloc"))]
mod logger;

// 平台特定配置
#[cfg(feature = "std")]
mod config;

#[cfg(feature = "wasm")]
mod wasm;

// 核心导出（所有平台）
pub use record::{Level, Record};

// 宏通过 #[macro_export] 自动导出到 crate 根：
// trace!, debug!, info!, warn!, error!, log!

// 条件导出
#[cfg(feature = "alloc")]
pub use ring_buffer::{LogRingBuffer, RingBufferStats};

#[cfg(any(feature = "std", feature = "alloc"))]
pub use logger::{LogSink, Logger};

#[cfg(feature = "std")]
pub use logger::{FileSink, StderrSink, StdoutSink};

#[cfg(feature = "std")]
pub use config::{LogConfig, OutputConfig};

#[cfg(feature = "wasm")]
pub use wasm::{WasmConfig, WasmLogger};

pub use span::{Span, SpanId};

/// 日志结果类型
#[cfg(feature = "std")]
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(not(feature = "std"))]
pub type Result<T> = core::result::Result<T, Error>;

/// 日志系统错误类型
#[cfg(feature = "std")]
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// 环形缓冲区已满（非覆盖模式下）
    #[error("Ring buffer full")]
    BufferFull,
    /// IO错误（仅std平台）
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    /// 序列化错误
    #[error("Serialize error: {0}")]
    Serialize(&'static str),
    /// 不支持的操作
    #[error("Operation not supported on this platform")]
    Unsupported,
}

/// 日志系统错误类型（no_std 平台）
#[cfg(not(feature = "std"))]
#[derive(Debug)]
pub enum Error {
    /// 环形缓冲区已满（非覆盖模式下）
    BufferFull,
    /// 序列化错误
    Serialize(&'static str),
    /// 不支持的操作
    Unsupported,
}

#[cfg(not(feature = "std"))]
impl core::fmt::Display for Error {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Error::BufferFull => write!(f, "Ring buffer full"),
            Error::Serialize(msg) => write!(f, "Serialize error: {msg}"),
            Error::Unsupported => write!(f, "Operation not supported on this platform"),
        }
    }
}
