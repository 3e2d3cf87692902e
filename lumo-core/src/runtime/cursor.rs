//! 执行游标（Runtime 层）
//!
//! 一帧的全部可恢复状态。纯数据：不持有堆或单元的引用，
//! 挂起时整体交还宿主，恢复时原样传回。

use crate::core::{Unit, Value};

/// 保护区域类别
///
/// Except 捕获后异常即视为已处理；Finally 块退出时
/// 若仍携带异常则继续向外抛出。
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProtectKind {
    Except,
    Finally,
}

/// 保护区域条目（严格嵌套，后建立者先退出）
#[derive(Clone, Debug, PartialEq)]
pub struct HandlerEntry {
    pub kind: ProtectKind,
    /// 异常交付时跳转的指令偏移
    pub resume_ip: usize,
    /// 建立保护区域时的 state 长度（交付时精确截断恢复）
    pub saved_depth: usize,
    /// 已进入处理器体内
    pub in_handler: bool,
    /// 正在处理的异常（仅 in_handler 时有效，否则为 None）
    pub prev_exc: Value,
}

/// 执行游标
///
/// `state` 前 `n_locals` 个槽位是快速局部变量，其余为操作数栈。
/// 两者共用一个向量，根集枚举时整体可见。
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Cursor {
    /// 下一条指令的偏移
    pub ip: usize,
    /// 局部变量 + 操作数栈
    pub state: Vec<Value>,
    pub n_locals: usize,
    /// 保护区域栈
    pub handlers: Vec<HandlerEntry>,
    /// 由 yield 挂起置位，恢复时清除
    pub suspended: bool,
}

impl Cursor {
    /// 为单元创建初始游标：参数填入局部槽位前缀，其余补 None
    pub fn new(unit: &Unit, args: &[Value]) -> Self {
        let n_locals = (unit.n_locals as usize).max(args.len());
        let mut state = Vec::with_capacity(n_locals + 8);
        state.extend_from_slice(args);
        state.resize(n_locals, Value::None);
        Self {
            ip: 0,
            state,
            n_locals,
            handlers: Vec::new(),
            suspended: false,
        }
    }

    /// 操作数栈深度（不含局部槽位）
    pub fn depth(&self) -> usize {
        self.state.len().saturating_sub(self.n_locals)
    }
}

/// 恢复挂起游标时注入的输入
#[derive(Clone, Debug, PartialEq)]
pub enum Resume {
    /// 作为 yield 表达式的结果压栈后继续
    Value(Value),
    /// 视同 yield 指令自身抛出了该异常
    Raise(Value),
}
