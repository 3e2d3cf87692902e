//! Lumo 运行时 (Runtime 层)
//!
//! 为 core 层类型提供执行语义：
//! - `Vm` 调度循环与异常交付
//! - `Heap` 标记清除回收器
//! - `Cursor` 可挂起/恢复的执行游标
//! - 内存流设备与原生函数

// ==================== 运行时模块 ====================

/// 执行游标与保护区域
pub mod cursor;

/// 垃圾回收堆
pub mod heap;

/// 堆对象
pub mod object;

/// 回收根集
pub mod roots;

/// 内存流设备
pub mod stream;

/// 虚拟机
pub mod vm;

// ==================== 公共导出 ====================

pub use cursor::{Cursor, HandlerEntry, ProtectKind, Resume};
pub use heap::{Heap, HeapError, HeapStats};
pub use object::{ExcData, HeapObj};
pub use roots::{NoRoots, RootSource, SliceRoots, VmRoots};
pub use stream::{MemoryStream, StreamCaps, StreamError};
pub use vm::{NativeFn, Outcome, Vm};

// 堆句柄定义在 core 层，这里一并导出方便运行时使用方
pub use crate::core::HeapId;
