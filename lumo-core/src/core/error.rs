//! 错误类型 (Core 层)
//!
//! 两条独立的错误通道：
//! - `Raised`：脚本级异常，携带异常值，可被 SetupExcept 保护区域捕获
//! - `Fault`：解释器级致命错误，不参与异常分发，直接终止执行

use super::value::Value;

/// 脚本级异常（控制流载体）
///
/// 沿 `Result` 的 `Err` 分支向外传播，遇到保护区域时被消耗。
/// 不实现 `std::error::Error`：它不是宿主错误，而是受控的控制流。
#[derive(Debug, Clone, PartialEq)]
pub struct Raised {
    /// 异常值（通常为 `Value::Ref` 指向堆上的异常对象）
    pub value: Value,
}

impl Raised {
    pub fn new(value: Value) -> Self {
        Self { value }
    }
}

/// 解释器级致命错误
///
/// 表示字节码流或解释器自身状态已不可信，任何保护区域都不得捕获。
#[derive(Debug, Clone, PartialEq)]
pub enum Fault {
    /// 指令流损坏（操作数越过流尾或 ip 越界）
    CorruptStream { offset: usize },
    /// 未知操作码
    UnknownOpcode { byte: u8, offset: usize },
    /// 操作数栈下溢
    StackUnderflow { offset: usize },
    /// 操作数栈超出配置上限
    StackOverflow { limit: usize },
    /// 保护区域栈下溢（PopBlock/PopExcept 时无已建立的保护区域）
    HandlerUnderflow { offset: usize },
    /// 保护区域嵌套超出配置上限
    HandlerOverflow { limit: usize },
    /// 常量池下标越界
    BadConstIndex { index: usize },
    /// 单元标识符表下标越界
    BadTokenIndex { index: usize },
    /// 局部变量槽位越界
    BadLocalSlot { slot: usize },
    /// 堆引用指向已释放或不存在的块
    DanglingRef { id: u32 },
    /// 回收器重入（回收过程中再次触发分配）
    ReentrantCollect,
    /// 对未挂起的游标执行恢复
    NotSuspended,
}

impl std::fmt::Display for Fault {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Fault::CorruptStream { offset } => {
                write!(f, "corrupt bytecode stream at offset {offset}")
            }
            Fault::UnknownOpcode { byte, offset } => {
                write!(f, "unknown opcode 0x{byte:02X} at offset {offset}")
            }
            Fault::StackUnderflow { offset } => {
                write!(f, "operand stack underflow at offset {offset}")
            }
            Fault::StackOverflow { limit } => {
                write!(f, "operand stack overflow (limit {limit})")
            }
            Fault::HandlerUnderflow { offset } => {
                write!(f, "handler stack underflow at offset {offset}")
            }
            Fault::HandlerOverflow { limit } => {
                write!(f, "handler stack overflow (limit {limit})")
            }
            Fault::BadConstIndex { index } => {
                write!(f, "constant index {index} out of range")
            }
            Fault::BadTokenIndex { index } => {
                write!(f, "token index {index} out of range")
            }
            Fault::BadLocalSlot { slot } => {
                write!(f, "local slot {slot} out of range")
            }
            Fault::DanglingRef { id } => {
                write!(f, "dangling heap reference (block {id})")
            }
            Fault::ReentrantCollect => {
                write!(f, "allocation during collection")
            }
            Fault::NotSuspended => {
                write!(f, "resume on a cursor that is not suspended")
            }
        }
    }
}

impl std::error::Error for Fault {}
