//! API 类型定义
//!
//! 执行的输出类型。

use lumo_core::{HeapStats, Value};

/// 执行输出
#[derive(Debug, Clone)]
pub struct ExecuteOutput {
    /// 返回值（堆引用仅在产生它的 VM 存活期间有意义）
    pub value: Value,
    /// 返回值的文本渲染（VM 释放后仍可用）
    pub rendered: String,
    /// 执行结束时的堆统计
    pub stats: HeapStats,
}
