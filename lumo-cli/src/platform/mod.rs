//! 平台相关输出
//!
//! 命令行友好的错误与堆状态打印。

mod cli;

pub use cli::{print_exception_report, print_heap_report};
