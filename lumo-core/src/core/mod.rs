//! Lumo 核心类型 (Core 层)
//!
//! 纯数据类型定义，无 IO、无运行时状态：
//! - `Value`: 运行时统一值表示（封闭枚举）
//! - `TokenId` / `TokenTable`: 标识符驻留池
//! - `OpCode`: 字节码指令集
//! - `Unit`: 已编译单元（指令流 + 常量池 + 元数据）
//! - `Fault` / `Raised`: 致命错误与语言级异常的载体
//!
//! Runtime 层（`crate::runtime`）为这些类型提供执行语义。

// ==================== 基础类型 ====================

/// 运行时值表示
pub mod value;
pub use value::{HeapId, NativeId, Value};

/// 标识符驻留
pub mod token;
pub use token::{TokenId, TokenTable};

/// 字节码指令集
pub mod bytecode;
pub use bytecode::OpCode;

/// 已编译单元
pub mod unit;
pub use unit::{Constant, Unit};

/// 错误类型
pub mod error;
pub use error::{Fault, Raised};
