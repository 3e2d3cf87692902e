//! 虚拟机（Runtime 层）
//!
//! 单逻辑控制流的字节码解释器。执行产生三态结果：正常返回、
//! 未捕获异常逃逸、在 yield 处挂起（游标交还宿主）。
//!
//! 错误分两条通道：语言级异常走 `VmError::Raise`，在保护区域
//! 处消耗；解释器级致命错误走 `VmError::Fatal`，任何保护区域
//! 都不得捕获，直接以 `Err(Fault)` 返回宿主。

mod execution;
mod handlers;
mod natives;
mod operators;

use std::collections::HashMap;
use std::sync::Arc;

use lumo_config::{HeapConfig, RuntimeOptions, VmLimits};
use lumo_log::{info, Logger};

use crate::core::token::TOK_TYPE_ERROR;
use crate::core::{Fault, HeapId, NativeId, Raised, TokenId, TokenTable, Unit, Value};

use super::cursor::{Cursor, Resume};
use super::heap::{Heap, HeapError, HeapStats};
use super::object::{ExcData, HeapObj};
use super::roots::VmRoots;

/// 一次执行的最终结果
#[derive(Clone, Debug, PartialEq)]
pub enum Outcome {
    /// 正常返回
    Return(Value),
    /// 未捕获异常逃逸
    Raised(Value),
    /// 在 yield 处挂起；游标整体交还宿主，恢复时传回
    Suspended { cursor: Cursor, value: Value },
}

/// 原生函数签名
///
/// 参数只读且仍驻留在操作数栈上，分配期间对回收器可见。
/// 返回的异常沿正常交付路径进入保护区域。
pub type NativeFn = fn(&mut Vm, &Cursor, &[Value]) -> Result<Value, Raised>;

#[derive(Clone, Copy)]
pub(crate) struct NativeEntry {
    pub name: &'static str,
    pub func: NativeFn,
}

/// 调度循环的单步去向
pub(crate) enum Flow {
    Continue,
    Return(Value),
    Suspend(Value),
}

/// 指令执行的内部错误通道
#[derive(Debug)]
pub(crate) enum VmError {
    /// 语言级异常（可被保护区域消耗）
    Raise(Value),
    /// 致命错误（不可捕获）
    Fatal(Fault),
}

impl From<Raised> for VmError {
    fn from(raised: Raised) -> Self {
        VmError::Raise(raised.value)
    }
}

impl From<Fault> for VmError {
    fn from(fault: Fault) -> Self {
        VmError::Fatal(fault)
    }
}

/// 字节码虚拟机
pub struct Vm {
    pub(crate) heap: Heap,
    pub(crate) tokens: TokenTable,
    pub(crate) globals: HashMap<TokenId, Value>,
    pub(crate) natives: Vec<NativeEntry>,
    pub(crate) limits: VmLimits,
    pub(crate) options: RuntimeOptions,
    pub(crate) logger: Arc<Logger>,
}

impl Vm {
    pub fn new() -> Self {
        Self::with_config(
            &HeapConfig::default(),
            &VmLimits::default(),
            &RuntimeOptions::default(),
        )
    }

    pub fn with_config(heap: &HeapConfig, limits: &VmLimits, options: &RuntimeOptions) -> Self {
        let mut vm = Self {
            heap: Heap::new(heap),
            tokens: TokenTable::new(),
            globals: HashMap::new(),
            natives: Vec::new(),
            limits: limits.clone(),
            options: options.clone(),
            logger: Logger::new(lumo_log::Level::Error),
        };
        vm.install_builtins();
        vm
    }

    /// 挂接日志器（同时传递给堆）
    pub fn with_logger(mut self, logger: Arc<Logger>) -> Self {
        self.heap.set_logger(logger.clone());
        self.logger = logger;
        self
    }

    // ==================== 宿主入口 ====================

    /// 一次性执行：创建游标并运行到返回、异常逃逸或挂起
    pub fn execute(&mut self, unit: &Unit) -> Result<Outcome, Fault> {
        self.execute_with_args(unit, &[])
    }

    /// 带参数执行：参数填入局部槽位前缀
    pub fn execute_with_args(&mut self, unit: &Unit, args: &[Value]) -> Result<Outcome, Fault> {
        info!(
            self.logger,
            "execute unit '{}' ({} bytes)",
            unit.name,
            unit.code.len()
        );
        let cur = Cursor::new(unit, args);
        if args.len() != unit.n_args as usize {
            let raised = self.raise(
                &cur,
                TOK_TYPE_ERROR,
                format!(
                    "unit '{}' takes {} argument(s), got {}",
                    unit.name,
                    unit.n_args,
                    args.len()
                ),
            );
            return Ok(Outcome::Raised(raised.value));
        }
        self.run(unit, cur)
    }

    /// 恢复挂起的游标
    ///
    /// 注入值作为 yield 表达式的结果压栈；注入异常则视同
    /// yield 指令自身抛出，走正常交付路径。
    pub fn resume(
        &mut self,
        unit: &Unit,
        mut cursor: Cursor,
        injected: Resume,
    ) -> Result<Outcome, Fault> {
        if !cursor.suspended {
            return Err(Fault::NotSuspended);
        }
        cursor.suspended = false;
        info!(
            self.logger,
            "resume unit '{}' at ip={}", unit.name, cursor.ip
        );

        match injected {
            Resume::Value(v) => self.push(&mut cursor, v)?,
            Resume::Raise(v) => {
                let exc = self.coerce_exception(&cursor, v)?;
                match self.deliver(&mut cursor, exc)? {
                    None => {}
                    Some(escaped) => return Ok(Outcome::Raised(escaped)),
                }
            }
        }
        self.run(unit, cursor)
    }

    /// 宿主触发一轮回收，根集取自游标与全局变量
    pub fn collect(&mut self, cursor: &Cursor) -> Result<usize, Fault> {
        let Vm { heap, globals, .. } = self;
        let roots = VmRoots { cursor, globals };
        heap.collect(&roots).map_err(|_| Fault::ReentrantCollect)
    }

    // ==================== 嵌入方 API ====================

    /// 注册原生函数并绑定为同名全局
    pub fn register_native(&mut self, name: &'static str, func: NativeFn) -> NativeId {
        let id = NativeId(self.natives.len() as u16);
        self.natives.push(NativeEntry { name, func });
        let tok = self.tokens.intern(name);
        self.globals.insert(tok, Value::Native(id));
        id
    }

    pub fn set_global(&mut self, name: &str, value: Value) {
        let tok = self.tokens.intern(name);
        self.globals.insert(tok, value);
    }

    pub fn get_global(&self, name: &str) -> Option<Value> {
        let tok = self.tokens.lookup(name)?;
        self.globals.get(&tok).copied()
    }

    pub fn heap(&self) -> &Heap {
        &self.heap
    }

    pub fn heap_mut(&mut self) -> &mut Heap {
        &mut self.heap
    }

    pub fn heap_stats(&self) -> HeapStats {
        self.heap.stats()
    }

    pub fn tokens(&self) -> &TokenTable {
        &self.tokens
    }

    // ==================== 栈操作 ====================

    pub(crate) fn push(&self, cur: &mut Cursor, v: Value) -> Result<(), Fault> {
        if cur.state.len() >= self.limits.max_stack_depth {
            return Err(Fault::StackOverflow {
                limit: self.limits.max_stack_depth,
            });
        }
        cur.state.push(v);
        Ok(())
    }

    pub(crate) fn pop(&self, cur: &mut Cursor, offset: usize) -> Result<Value, Fault> {
        if cur.state.len() <= cur.n_locals {
            return Err(Fault::StackUnderflow { offset });
        }
        match cur.state.pop() {
            Some(v) => Ok(v),
            None => Err(Fault::StackUnderflow { offset }),
        }
    }

    /// 查看栈顶元素（distance=0 是栈顶）
    pub(crate) fn peek(&self, cur: &Cursor, distance: usize, offset: usize) -> Result<Value, Fault> {
        let len = cur.state.len();
        if len < cur.n_locals + distance + 1 {
            return Err(Fault::StackUnderflow { offset });
        }
        Ok(cur.state[len - 1 - distance])
    }

    pub(crate) fn load_local(
        &self,
        cur: &mut Cursor,
        slot: usize,
        _offset: usize,
    ) -> Result<(), Fault> {
        if slot >= cur.n_locals {
            return Err(Fault::BadLocalSlot { slot });
        }
        let v = cur.state[slot];
        self.push(cur, v)
    }

    pub(crate) fn store_local(
        &self,
        cur: &mut Cursor,
        slot: usize,
        offset: usize,
    ) -> Result<(), Fault> {
        if slot >= cur.n_locals {
            return Err(Fault::BadLocalSlot { slot });
        }
        let v = self.pop(cur, offset)?;
        cur.state[slot] = v;
        Ok(())
    }

    // ==================== 分配与抛出 ====================

    /// 分配堆对象；失败一律退化为预分配的 MemoryError 异常
    pub(crate) fn try_alloc(&mut self, cur: &Cursor, obj: HeapObj) -> Result<HeapId, Raised> {
        let Vm { heap, globals, .. } = self;
        let roots = VmRoots { cursor: cur, globals };
        match heap.alloc(obj, &roots) {
            Ok(id) => Ok(id),
            Err(_) => Err(Raised::new(Value::Ref(heap.oom_exception()))),
        }
    }

    /// 调度循环内的分配：内存耗尽转为可捕获异常，其余为致命错误
    pub(crate) fn alloc_value(&mut self, cur: &Cursor, obj: HeapObj) -> Result<HeapId, VmError> {
        let Vm { heap, globals, .. } = self;
        let roots = VmRoots { cursor: cur, globals };
        match heap.alloc(obj, &roots) {
            Ok(id) => Ok(id),
            Err(HeapError::OutOfMemory { .. }) => {
                Err(VmError::Raise(Value::Ref(heap.oom_exception())))
            }
            Err(HeapError::ReentrantCollect) => Err(VmError::Fatal(Fault::ReentrantCollect)),
            Err(HeapError::InvalidRef { id }) => Err(VmError::Fatal(Fault::DanglingRef { id })),
        }
    }

    /// 构造并抛出带消息的异常（构造失败时退化为 MemoryError）
    ///
    /// 原生函数用它来产生可被脚本捕获的错误。
    pub fn raise(
        &mut self,
        cur: &Cursor,
        kind: TokenId,
        message: impl Into<String>,
    ) -> Raised {
        let exc = HeapObj::Exception(ExcData::new(kind, Some(message.into())));
        match self.try_alloc(cur, exc) {
            Ok(id) => Raised::new(Value::Ref(id)),
            Err(fallback) => fallback,
        }
    }

    pub(crate) fn heap_obj(&self, id: HeapId) -> Result<&HeapObj, Fault> {
        self.heap.get(id).map_err(|_| Fault::DanglingRef { id: id.0 })
    }

    pub(crate) fn heap_obj_mut(&mut self, id: HeapId) -> Result<&mut HeapObj, Fault> {
        self.heap
            .get_mut(id)
            .map_err(|_| Fault::DanglingRef { id: id.0 })
    }

    // ==================== 诊断输出 ====================

    /// 值的类型名（解析堆对象）
    pub(crate) fn kind_of(&self, v: Value) -> &'static str {
        match v {
            Value::Ref(id) => match self.heap.get(id) {
                Ok(obj) => obj.kind_name(),
                Err(_) => "object",
            },
            other => other.kind_name(),
        }
    }

    /// 渲染值为显示文本
    pub fn render_value(&self, v: Value) -> String {
        self.render_depth(v, 3)
    }

    fn render_depth(&self, v: Value, depth: usize) -> String {
        match v {
            Value::None => "None".to_string(),
            Value::True => "True".to_string(),
            Value::False => "False".to_string(),
            Value::Int(n) => n.to_string(),
            Value::Token(id) => self
                .tokens
                .resolve(id)
                .unwrap_or("<token>")
                .to_string(),
            Value::Native(id) => match self.natives.get(id.index()) {
                Some(entry) => format!("<native fn {}>", entry.name),
                None => "<native fn ?>".to_string(),
            },
            Value::Ref(id) => match self.heap.get(id) {
                Ok(HeapObj::Str(s)) => s.clone(),
                Ok(HeapObj::Bytes(bytes)) => render_bytes(bytes),
                Ok(HeapObj::List(items)) => {
                    if depth == 0 {
                        return "[...]".to_string();
                    }
                    let parts: Vec<String> = items
                        .iter()
                        .map(|item| self.render_depth(*item, depth - 1))
                        .collect();
                    format!("[{}]", parts.join(", "))
                }
                Ok(HeapObj::Exception(exc)) => self.render_exception(exc),
                Ok(HeapObj::Stream(s)) => format!("<stream {} bytes>", s.remaining()),
                Ok(HeapObj::Free) | Err(_) => "<invalid ref>".to_string(),
            },
        }
    }

    pub(crate) fn render_exception(&self, exc: &ExcData) -> String {
        let kind = self.tokens.resolve(exc.kind).unwrap_or("Exception");
        match &exc.message {
            Some(msg) => format!("{kind}: {msg}"),
            None => kind.to_string(),
        }
    }

    /// 格式化异常报告：沿前因链自旧到新输出
    pub fn format_exception(&self, value: Value) -> String {
        let mut chain: Vec<&ExcData> = Vec::new();
        let mut cur = value;
        while let Value::Ref(id) = cur {
            match self.heap.get(id) {
                Ok(HeapObj::Exception(exc)) => {
                    chain.push(exc);
                    cur = exc.prev;
                }
                _ => break,
            }
            // 前因链最多展示 8 层
            if chain.len() >= 8 {
                break;
            }
        }
        if chain.is_empty() {
            return self.render_value(value);
        }

        let mut out = String::new();
        for (i, exc) in chain.iter().rev().enumerate() {
            if i > 0 {
                out.push_str(
                    "\nDuring handling of the above exception, another exception occurred:\n\n",
                );
            }
            if let Some(line) = exc.line {
                out.push_str(&format!("  line {line}\n"));
            }
            out.push_str(&self.render_exception(exc));
        }
        out
    }
}

impl Default for Vm {
    fn default() -> Self {
        Self::new()
    }
}

/// 字节串的显示形式（可打印 ASCII 原样，其余转义）
fn render_bytes(bytes: &[u8]) -> String {
    let mut out = String::from("b'");
    for &b in bytes {
        match b {
            b'\n' => out.push_str("\\n"),
            b'\t' => out.push_str("\\t"),
            b'\\' => out.push_str("\\\\"),
            b'\'' => out.push_str("\\'"),
            0x20..=0x7E => out.push(b as char),
            _ => out.push_str(&format!("\\x{b:02x}")),
        }
    }
    out.push('\'');
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::token::{TOK_VALUE_ERROR, TOK_ZERO_DIVISION_ERROR};
    use crate::core::{Constant, OpCode};

    fn expect_raised_kind(vm: &Vm, outcome: Outcome, kind: TokenId) {
        match outcome {
            Outcome::Raised(Value::Ref(id)) => match vm.heap().get(id).unwrap() {
                HeapObj::Exception(exc) => assert_eq!(exc.kind, kind),
                other => panic!("raised a non-exception object: {other:?}"),
            },
            other => panic!("expected Raised, got {other:?}"),
        }
    }

    #[test]
    fn test_push_pop() {
        let mut unit = Unit::new("t");
        unit.write_op(OpCode::LoadOne, 1);
        unit.write_op(OpCode::Pop, 1);
        unit.write_op(OpCode::LoadNone, 1);
        unit.write_op(OpCode::Return, 1);

        let mut vm = Vm::new();
        assert_eq!(vm.execute(&unit).unwrap(), Outcome::Return(Value::None));
    }

    #[test]
    fn test_arithmetic() {
        // 1 + 2
        let mut unit = Unit::new("t");
        let c1 = unit.add_constant(Constant::Int(1));
        let c2 = unit.add_constant(Constant::Int(2));
        unit.write_op_u8(OpCode::LoadConst, c1 as u8, 1);
        unit.write_op_u8(OpCode::LoadConst, c2 as u8, 1);
        unit.write_op(OpCode::Add, 1);
        unit.write_op(OpCode::Return, 1);

        let mut vm = Vm::new();
        assert_eq!(vm.execute(&unit).unwrap(), Outcome::Return(Value::Int(3)));
    }

    #[test]
    fn test_comparison() {
        // 2 > 1
        let mut unit = Unit::new("t");
        let c2 = unit.add_constant(Constant::Int(2));
        unit.write_op_u8(OpCode::LoadConst, c2 as u8, 1);
        unit.write_op(OpCode::LoadOne, 1);
        unit.write_op(OpCode::Greater, 1);
        unit.write_op(OpCode::Return, 1);

        let mut vm = Vm::new();
        assert_eq!(vm.execute(&unit).unwrap(), Outcome::Return(Value::True));
    }

    #[test]
    fn test_division_by_zero_raises() {
        let mut unit = Unit::new("t");
        unit.write_op(OpCode::LoadOne, 1);
        unit.write_op(OpCode::LoadZero, 1);
        unit.write_op(OpCode::Div, 1);
        unit.write_op(OpCode::Return, 1);

        let mut vm = Vm::new();
        let outcome = vm.execute(&unit).unwrap();
        expect_raised_kind(&vm, outcome, TOK_ZERO_DIVISION_ERROR);
    }

    #[test]
    fn test_jump_if_false() {
        // false 分支跳过 LoadFalse，落到 LoadTrue
        let mut unit = Unit::new("t");
        unit.write_op(OpCode::LoadFalse, 1);
        let jump = unit.write_jump(OpCode::JumpIfFalse, 1);
        unit.write_op(OpCode::LoadFalse, 2);
        unit.patch_jump(jump);
        unit.write_op(OpCode::LoadTrue, 3);
        unit.write_op(OpCode::Return, 3);

        let mut vm = Vm::new();
        assert_eq!(vm.execute(&unit).unwrap(), Outcome::Return(Value::True));
    }

    #[test]
    fn test_local_variables() {
        // x = 5; y = x + 3; return y
        let mut unit = Unit::new("t");
        unit.n_locals = 2;
        let c5 = unit.add_constant(Constant::Int(5));
        let c3 = unit.add_constant(Constant::Int(3));
        unit.write_op_u8(OpCode::LoadConst, c5 as u8, 1);
        unit.write_op(OpCode::StoreLocal0, 1);
        unit.write_op(OpCode::LoadLocal0, 2);
        unit.write_op_u8(OpCode::LoadConst, c3 as u8, 2);
        unit.write_op(OpCode::Add, 2);
        unit.write_op(OpCode::StoreLocal1, 2);
        unit.write_op(OpCode::LoadLocal1, 3);
        unit.write_op(OpCode::Return, 3);

        let mut vm = Vm::new();
        assert_eq!(vm.execute(&unit).unwrap(), Outcome::Return(Value::Int(8)));
    }

    #[test]
    fn test_execute_with_args() {
        // return arg0 + arg1
        let mut unit = Unit::new("t");
        unit.n_args = 2;
        unit.n_locals = 2;
        unit.write_op(OpCode::LoadLocal0, 1);
        unit.write_op(OpCode::LoadLocal1, 1);
        unit.write_op(OpCode::Add, 1);
        unit.write_op(OpCode::Return, 1);

        let mut vm = Vm::new();
        let outcome = vm
            .execute_with_args(&unit, &[Value::Int(30), Value::Int(12)])
            .unwrap();
        assert_eq!(outcome, Outcome::Return(Value::Int(42)));
    }

    #[test]
    fn test_argument_count_mismatch_raises() {
        let mut unit = Unit::new("t");
        unit.n_args = 1;
        unit.n_locals = 1;
        unit.write_op(OpCode::LoadNone, 1);
        unit.write_op(OpCode::Return, 1);

        let mut vm = Vm::new();
        let outcome = vm.execute(&unit).unwrap();
        expect_raised_kind(&vm, outcome, TOK_TYPE_ERROR);
    }

    #[test]
    fn test_try_except_catches() {
        // try { raise ValueError } except { return 42 }
        let mut unit = Unit::new("t");
        let setup = unit.write_jump(OpCode::SetupExcept, 1);
        let tok = unit.add_token("ValueError");
        unit.write_op_u8(OpCode::LoadToken, tok, 2);
        unit.write_op(OpCode::LoadNone, 2);
        unit.write_op(OpCode::NewExc, 2);
        unit.write_op(OpCode::Raise, 2);
        unit.patch_jump(setup);
        unit.write_op(OpCode::Pop, 3);
        unit.write_op(OpCode::PopExcept, 3);
        unit.write_op_i8(OpCode::LoadSmallInt, 42, 3);
        unit.write_op(OpCode::Return, 3);

        let mut vm = Vm::new();
        assert_eq!(vm.execute(&unit).unwrap(), Outcome::Return(Value::Int(42)));
    }

    #[test]
    fn test_uncaught_exception_escapes() {
        let mut unit = Unit::new("t");
        let tok = unit.add_token("ValueError");
        unit.write_op_u8(OpCode::LoadToken, tok, 1);
        unit.write_op(OpCode::LoadNone, 1);
        unit.write_op(OpCode::NewExc, 1);
        unit.write_op(OpCode::Raise, 1);

        let mut vm = Vm::new();
        let outcome = vm.execute(&unit).unwrap();
        expect_raised_kind(&vm, outcome, TOK_VALUE_ERROR);
    }

    #[test]
    fn test_yield_then_resume_with_value() {
        // yield 1; return injected + 10
        let mut unit = Unit::new("t");
        unit.write_op(OpCode::LoadOne, 1);
        unit.write_op(OpCode::Yield, 1);
        unit.write_op_i8(OpCode::LoadSmallInt, 10, 2);
        unit.write_op(OpCode::Add, 2);
        unit.write_op(OpCode::Return, 2);

        let mut vm = Vm::new();
        let (cursor, value) = match vm.execute(&unit).unwrap() {
            Outcome::Suspended { cursor, value } => (cursor, value),
            other => panic!("expected Suspended, got {other:?}"),
        };
        assert_eq!(value, Value::Int(1));
        assert!(cursor.suspended);

        let outcome = vm
            .resume(&unit, cursor, Resume::Value(Value::Int(5)))
            .unwrap();
        assert_eq!(outcome, Outcome::Return(Value::Int(15)));
    }

    #[test]
    fn test_resume_requires_suspended_cursor() {
        let unit = Unit::new("t");
        let mut vm = Vm::new();
        let cursor = Cursor::default();
        let err = vm
            .resume(&unit, cursor, Resume::Value(Value::None))
            .unwrap_err();
        assert_eq!(err, Fault::NotSuspended);
    }

    #[test]
    fn test_call_native_len() {
        // len([10, 20, 30])
        let mut unit = Unit::new("t");
        let tok = unit.add_token("len");
        unit.write_op_u8(OpCode::LoadGlobal, tok, 1);
        unit.write_op_i8(OpCode::LoadSmallInt, 10, 1);
        unit.write_op_i8(OpCode::LoadSmallInt, 20, 1);
        unit.write_op_i8(OpCode::LoadSmallInt, 30, 1);
        unit.write_op_u8(OpCode::BuildList, 3, 1);
        unit.write_op_u8(OpCode::Call, 1, 1);
        unit.write_op(OpCode::Return, 1);

        let mut vm = Vm::new();
        assert_eq!(vm.execute(&unit).unwrap(), Outcome::Return(Value::Int(3)));
    }

    #[test]
    fn test_undefined_global_raises_name_error() {
        let mut unit = Unit::new("t");
        let tok = unit.add_token("no_such_name");
        unit.write_op_u8(OpCode::LoadGlobal, tok, 1);
        unit.write_op(OpCode::Return, 1);

        let mut vm = Vm::new();
        let outcome = vm.execute(&unit).unwrap();
        expect_raised_kind(&vm, outcome, crate::core::token::TOK_NAME_ERROR);
    }

    #[test]
    fn test_unknown_opcode_is_fatal() {
        let mut unit = Unit::new("t");
        unit.code.push(0xEE);
        unit.lines.push(1);

        let mut vm = Vm::new();
        let err = vm.execute(&unit).unwrap_err();
        assert_eq!(
            err,
            Fault::UnknownOpcode {
                byte: 0xEE,
                offset: 0
            }
        );
    }

    #[test]
    fn test_running_off_stream_end_is_fatal() {
        let mut unit = Unit::new("t");
        unit.write_op(OpCode::LoadNone, 1);
        // 没有 Return，执行越过流尾

        let mut vm = Vm::new();
        let err = vm.execute(&unit).unwrap_err();
        assert_eq!(err, Fault::CorruptStream { offset: 1 });
    }

    #[test]
    fn test_render_values() {
        let mut vm = Vm::new();
        assert_eq!(vm.render_value(Value::None), "None");
        assert_eq!(vm.render_value(Value::Int(-7)), "-7");

        let cur = Cursor::default();
        let id = vm
            .try_alloc(&cur, HeapObj::Str("hi".into()))
            .unwrap();
        assert_eq!(vm.render_value(Value::Ref(id)), "hi");

        let list = vm
            .try_alloc(
                &cur,
                HeapObj::List(vec![Value::Int(1), Value::Ref(id)]),
            )
            .unwrap();
        assert_eq!(vm.render_value(Value::Ref(list)), "[1, hi]");
    }

    #[test]
    fn test_render_bytes_escapes() {
        assert_eq!(render_bytes(b"ab\n\x01"), "b'ab\\n\\x01'");
    }
}
