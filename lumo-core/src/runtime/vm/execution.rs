//! 调度循环与指令分发（Runtime 层）
//!
//! `run` 驱动游标直到终态；`step` 执行单条指令。操作数在分配
//! 前一律留在栈上，保证回收器扫描时可达，之后才弹出替换。

use lumo_log::{error, trace};

use crate::core::token::TOK_NAME_ERROR;
use crate::core::{Constant, Fault, OpCode, Unit, Value};

use super::super::cursor::{Cursor, ProtectKind};
use super::super::object::HeapObj;
use super::{Flow, Outcome, Vm, VmError};

// ==================== 操作数读取 ====================

fn read_u8(unit: &Unit, cur: &mut Cursor) -> Result<u8, Fault> {
    match unit.code.get(cur.ip) {
        Some(&byte) => {
            cur.ip += 1;
            Ok(byte)
        }
        None => Err(Fault::CorruptStream { offset: cur.ip }),
    }
}

fn read_i8(unit: &Unit, cur: &mut Cursor) -> Result<i8, Fault> {
    Ok(read_u8(unit, cur)? as i8)
}

fn read_u16(unit: &Unit, cur: &mut Cursor) -> Result<u16, Fault> {
    let lo = read_u8(unit, cur)?;
    let hi = read_u8(unit, cur)?;
    Ok(u16::from_le_bytes([lo, hi]))
}

fn read_i16(unit: &Unit, cur: &mut Cursor) -> Result<i16, Fault> {
    Ok(read_u16(unit, cur)? as i16)
}

/// 应用相对跳转，目标须落在 [0, code.len()] 内
fn apply_jump(unit: &Unit, cur: &mut Cursor, rel: i16, offset: usize) -> Result<(), Fault> {
    let target = cur.ip as i64 + rel as i64;
    if target < 0 || target as usize > unit.code.len() {
        return Err(Fault::CorruptStream { offset });
    }
    cur.ip = target as usize;
    Ok(())
}

impl Vm {
    // ==================== 调度循环 ====================

    pub(crate) fn run(&mut self, unit: &Unit, mut cur: Cursor) -> Result<Outcome, Fault> {
        loop {
            #[cfg(feature = "trace_execution")]
            self.trace_instruction(unit, &cur);
            if self.options.show_steps {
                self.log_step(unit, &cur);
            }

            let offset = cur.ip;
            match self.step(unit, &mut cur) {
                Ok(Flow::Continue) => {}
                Ok(Flow::Return(v)) => {
                    trace!(self.logger, "unit '{}' returned", unit.name);
                    return Ok(Outcome::Return(v));
                }
                Ok(Flow::Suspend(value)) => {
                    cur.suspended = true;
                    trace!(
                        self.logger,
                        "unit '{}' suspended at ip={}",
                        unit.name,
                        cur.ip
                    );
                    return Ok(Outcome::Suspended { cursor: cur, value });
                }
                Err(VmError::Raise(exc)) => {
                    self.note_line(unit, offset, exc);
                    match self.deliver(&mut cur, exc)? {
                        None => {}
                        Some(escaped) => return Ok(Outcome::Raised(escaped)),
                    }
                }
                Err(VmError::Fatal(fault)) => {
                    error!(
                        self.logger,
                        "fatal fault at offset {}: {}", offset, fault
                    );
                    return Err(fault);
                }
            }
        }
    }

    // ==================== 单指令执行 ====================

    fn step(&mut self, unit: &Unit, cur: &mut Cursor) -> Result<Flow, VmError> {
        let offset = cur.ip;
        let byte = read_u8(unit, cur)?;
        let Some(op) = OpCode::from_u8(byte) else {
            return Err(Fault::UnknownOpcode { byte, offset }.into());
        };

        match op {
            // ===== 常量加载 =====
            OpCode::LoadConst0 => self.push_const(unit, cur, 0)?,
            OpCode::LoadConst1 => self.push_const(unit, cur, 1)?,
            OpCode::LoadConst2 => self.push_const(unit, cur, 2)?,
            OpCode::LoadConst3 => self.push_const(unit, cur, 3)?,
            OpCode::LoadConst => {
                let index = read_u8(unit, cur)? as usize;
                self.push_const(unit, cur, index)?;
            }
            OpCode::LoadConstWide => {
                let index = read_u16(unit, cur)? as usize;
                self.push_const(unit, cur, index)?;
            }
            OpCode::LoadNone => self.push(cur, Value::None)?,
            OpCode::LoadTrue => self.push(cur, Value::True)?,
            OpCode::LoadFalse => self.push(cur, Value::False)?,
            OpCode::LoadZero => self.push(cur, Value::Int(0))?,
            OpCode::LoadOne => self.push(cur, Value::Int(1))?,
            OpCode::LoadSmallInt => {
                let n = read_i8(unit, cur)?;
                self.push(cur, Value::Int(n as i64))?;
            }
            OpCode::LoadToken => {
                let index = read_u8(unit, cur)? as usize;
                let name = unit
                    .tokens
                    .get(index)
                    .ok_or(Fault::BadTokenIndex { index })?;
                let tok = self.tokens.intern(name);
                self.push(cur, Value::Token(tok))?;
            }

            // ===== 栈操作 =====
            OpCode::Pop => {
                self.pop(cur, offset)?;
            }
            OpCode::Dup => {
                let v = self.peek(cur, 0, offset)?;
                self.push(cur, v)?;
            }
            OpCode::Swap => {
                let len = cur.state.len();
                if len < cur.n_locals + 2 {
                    return Err(Fault::StackUnderflow { offset }.into());
                }
                cur.state.swap(len - 1, len - 2);
            }

            // ===== 局部变量 =====
            OpCode::LoadLocal0 => self.load_local(cur, 0, offset)?,
            OpCode::LoadLocal1 => self.load_local(cur, 1, offset)?,
            OpCode::LoadLocal2 => self.load_local(cur, 2, offset)?,
            OpCode::LoadLocal3 => self.load_local(cur, 3, offset)?,
            OpCode::LoadLocal => {
                let slot = read_u8(unit, cur)? as usize;
                self.load_local(cur, slot, offset)?;
            }
            OpCode::StoreLocal0 => self.store_local(cur, 0, offset)?,
            OpCode::StoreLocal1 => self.store_local(cur, 1, offset)?,
            OpCode::StoreLocal2 => self.store_local(cur, 2, offset)?,
            OpCode::StoreLocal3 => self.store_local(cur, 3, offset)?,
            OpCode::StoreLocal => {
                let slot = read_u8(unit, cur)? as usize;
                self.store_local(cur, slot, offset)?;
            }

            // ===== 全局变量 =====
            OpCode::LoadGlobal => {
                let index = read_u8(unit, cur)? as usize;
                let name = unit
                    .tokens
                    .get(index)
                    .ok_or(Fault::BadTokenIndex { index })?;
                let tok = self.tokens.intern(name);
                match self.globals.get(&tok).copied() {
                    Some(v) => self.push(cur, v)?,
                    None => {
                        return Err(self
                            .raise(
                                cur,
                                TOK_NAME_ERROR,
                                format!("name '{name}' is not defined"),
                            )
                            .into());
                    }
                }
            }
            OpCode::StoreGlobal => {
                let index = read_u8(unit, cur)? as usize;
                let name = unit
                    .tokens
                    .get(index)
                    .ok_or(Fault::BadTokenIndex { index })?;
                let tok = self.tokens.intern(name);
                let v = self.pop(cur, offset)?;
                self.globals.insert(tok, v);
            }

            // ===== 算术运算 =====
            // 操作数先 peek 后弹出，分配期间保持可达
            OpCode::Add => {
                let b = self.peek(cur, 0, offset)?;
                let a = self.peek(cur, 1, offset)?;
                let v = self.add_values(cur, a, b)?;
                self.pop(cur, offset)?;
                self.pop(cur, offset)?;
                self.push(cur, v)?;
            }
            OpCode::Sub => {
                let b = self.pop(cur, offset)?;
                let a = self.pop(cur, offset)?;
                let v = self.sub_values(cur, a, b)?;
                self.push(cur, v)?;
            }
            OpCode::Mul => {
                let b = self.pop(cur, offset)?;
                let a = self.pop(cur, offset)?;
                let v = self.mul_values(cur, a, b)?;
                self.push(cur, v)?;
            }
            OpCode::Div => {
                let b = self.pop(cur, offset)?;
                let a = self.pop(cur, offset)?;
                let v = self.div_values(cur, a, b)?;
                self.push(cur, v)?;
            }
            OpCode::Neg => {
                let v = self.pop(cur, offset)?;
                let negated = self.neg_value(cur, v)?;
                self.push(cur, negated)?;
            }

            // ===== 比较/逻辑 =====
            OpCode::Equal => {
                let b = self.pop(cur, offset)?;
                let a = self.pop(cur, offset)?;
                self.push(cur, Value::bool_from(self.equal_values(a, b)))?;
            }
            OpCode::NotEqual => {
                let b = self.pop(cur, offset)?;
                let a = self.pop(cur, offset)?;
                self.push(cur, Value::bool_from(!self.equal_values(a, b)))?;
            }
            OpCode::Greater => {
                let b = self.pop(cur, offset)?;
                let a = self.pop(cur, offset)?;
                let ord = self.compare_values(cur, ">", a, b)?;
                self.push(cur, Value::bool_from(ord.is_gt()))?;
            }
            OpCode::GreaterEqual => {
                let b = self.pop(cur, offset)?;
                let a = self.pop(cur, offset)?;
                let ord = self.compare_values(cur, ">=", a, b)?;
                self.push(cur, Value::bool_from(ord.is_ge()))?;
            }
            OpCode::Less => {
                let b = self.pop(cur, offset)?;
                let a = self.pop(cur, offset)?;
                let ord = self.compare_values(cur, "<", a, b)?;
                self.push(cur, Value::bool_from(ord.is_lt()))?;
            }
            OpCode::LessEqual => {
                let b = self.pop(cur, offset)?;
                let a = self.pop(cur, offset)?;
                let ord = self.compare_values(cur, "<=", a, b)?;
                self.push(cur, Value::bool_from(ord.is_le()))?;
            }
            OpCode::Not => {
                let v = self.pop(cur, offset)?;
                self.push(cur, Value::bool_from(!v.is_truthy()))?;
            }

            // ===== 控制流 =====
            OpCode::Jump | OpCode::JumpBack => {
                let rel = read_i16(unit, cur)?;
                apply_jump(unit, cur, rel, offset)?;
            }
            OpCode::JumpIfFalse => {
                let rel = read_i16(unit, cur)?;
                let cond = self.pop(cur, offset)?;
                if !cond.is_truthy() {
                    apply_jump(unit, cur, rel, offset)?;
                }
            }

            // ===== 保护区域与异常 =====
            OpCode::SetupExcept => {
                let rel = read_i16(unit, cur)?;
                self.setup_handler(unit, cur, ProtectKind::Except, rel, offset)?;
            }
            OpCode::SetupFinally => {
                let rel = read_i16(unit, cur)?;
                self.setup_handler(unit, cur, ProtectKind::Finally, rel, offset)?;
            }
            OpCode::PopBlock => self.pop_block(cur, offset)?,
            OpCode::PopExcept => self.pop_except(cur, offset)?,
            OpCode::EndFinally => return self.end_finally(cur, offset),
            OpCode::NewExc => return self.new_exception(unit, cur, offset).map(|()| Flow::Continue),
            OpCode::Raise => {
                let v = self.pop(cur, offset)?;
                let exc = self.coerce_exception(cur, v)?;
                return Err(VmError::Raise(exc));
            }

            // ===== 调用与对象 =====
            OpCode::Call => {
                let argc = read_u8(unit, cur)? as usize;
                return self.call_value(cur, argc, offset);
            }
            OpCode::BuildList => {
                let n = read_u8(unit, cur)? as usize;
                if cur.state.len() < cur.n_locals + n {
                    return Err(Fault::StackUnderflow { offset }.into());
                }
                // 元素留在栈上直到分配完成
                let start = cur.state.len() - n;
                let items = cur.state[start..].to_vec();
                let id = self.alloc_value(cur, HeapObj::List(items))?;
                cur.state.truncate(start);
                self.push(cur, Value::Ref(id))?;
            }
            OpCode::IndexGet => {
                let index = self.peek(cur, 0, offset)?;
                let obj = self.peek(cur, 1, offset)?;
                let v = self.index_get(cur, obj, index)?;
                self.pop(cur, offset)?;
                self.pop(cur, offset)?;
                self.push(cur, v)?;
            }

            // ===== 挂起与终止 =====
            OpCode::Yield => {
                let v = self.pop(cur, offset)?;
                return Ok(Flow::Suspend(v));
            }
            OpCode::Return => {
                let v = self.pop(cur, offset)?;
                return Ok(Flow::Return(v));
            }

            // ===== 调试 =====
            OpCode::Print => {
                let v = self.pop(cur, offset)?;
                println!("{}", self.render_value(v));
            }
            OpCode::Invalid => {
                return Err(Fault::UnknownOpcode { byte, offset }.into());
            }
        }
        Ok(Flow::Continue)
    }

    fn push_const(&mut self, unit: &Unit, cur: &mut Cursor, index: usize) -> Result<(), VmError> {
        let constant = unit
            .constants
            .get(index)
            .ok_or(Fault::BadConstIndex { index })?;
        let v = match constant {
            Constant::None => Value::None,
            Constant::True => Value::True,
            Constant::False => Value::False,
            Constant::Int(n) => Value::Int(*n),
            Constant::Str(s) => {
                let id = self.alloc_value(cur, HeapObj::Str(s.clone()))?;
                Value::Ref(id)
            }
        };
        self.push(cur, v)?;
        Ok(())
    }

    /// 调用栈布局：[callee, arg0, .., argN-1]，返回值替换整段
    fn call_value(&mut self, cur: &mut Cursor, argc: usize, offset: usize) -> Result<Flow, VmError> {
        if cur.state.len() < cur.n_locals + argc + 1 {
            return Err(Fault::StackUnderflow { offset }.into());
        }
        let callee_idx = cur.state.len() - argc - 1;
        let callee = cur.state[callee_idx];

        match callee {
            Value::Native(nid) => {
                // 注册表缺失条目说明解释器状态已不可信
                let entry = self
                    .natives
                    .get(nid.index())
                    .copied()
                    .ok_or(Fault::CorruptStream { offset })?;
                trace!(self.logger, "call native {} argc={}", entry.name, argc);

                // 参数保留在栈上传入，原生函数分配期间保持可达
                let result = {
                    let args = &cur.state[callee_idx + 1..];
                    (entry.func)(self, cur, args)
                };
                match result {
                    Ok(v) => {
                        cur.state.truncate(callee_idx);
                        self.push(cur, v)?;
                        Ok(Flow::Continue)
                    }
                    Err(raised) => Err(VmError::Raise(raised.value)),
                }
            }
            other => {
                let kind = self.kind_of(other);
                Err(self
                    .raise(
                        cur,
                        crate::core::token::TOK_TYPE_ERROR,
                        format!("'{kind}' object is not callable"),
                    )
                    .into())
            }
        }
    }

    fn log_step(&self, unit: &Unit, cur: &Cursor) {
        if let Some(&byte) = unit.code.get(cur.ip) {
            if let Some(op) = OpCode::from_u8(byte) {
                trace!(
                    self.logger,
                    "ip={:04} {} depth={}",
                    cur.ip,
                    op.name(),
                    cur.depth()
                );
            }
        }
    }

    /// 逐指令打印栈内容与反汇编（仅 trace_execution 特性）
    #[cfg(feature = "trace_execution")]
    fn trace_instruction(&self, unit: &Unit, cur: &Cursor) {
        if cur.ip >= unit.code.len() {
            return;
        }
        print!("          ");
        for v in &cur.state {
            print!("[ {} ]", self.render_value(*v));
        }
        println!();
        unit.disassemble_instruction(cur.ip);
    }
}
