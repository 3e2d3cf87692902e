//! 保护区域与异常交付（Runtime 层）
//!
//! 交付协议：弹出最内层未进入处理器体的条目，把 state 精确截断
//! 回建立时的长度，压入异常值并跳转；条目以 in_handler 置位回压，
//! 处理器体内再次抛出时据此把旧异常挂为新异常的前因并继续向外。

use lumo_log::{debug, trace};

use crate::core::token::TOK_TYPE_ERROR;
use crate::core::{Fault, Unit, Value};

use super::super::cursor::{Cursor, HandlerEntry, ProtectKind};
use super::super::object::{ExcData, HeapObj};
use super::{Flow, Vm, VmError};

impl Vm {
    /// 建立保护区域，记录当前栈深以便交付时精确恢复
    pub(super) fn setup_handler(
        &self,
        unit: &Unit,
        cur: &mut Cursor,
        kind: ProtectKind,
        rel: i16,
        offset: usize,
    ) -> Result<(), Fault> {
        if cur.handlers.len() >= self.limits.max_handler_depth {
            return Err(Fault::HandlerOverflow {
                limit: self.limits.max_handler_depth,
            });
        }
        let target = cur.ip as i64 + rel as i64;
        if target < 0 || target as usize > unit.code.len() {
            return Err(Fault::CorruptStream { offset });
        }
        cur.handlers.push(HandlerEntry {
            kind,
            resume_ip: target as usize,
            saved_depth: cur.state.len(),
            in_handler: false,
            prev_exc: Value::None,
        });
        Ok(())
    }

    /// 交付异常
    ///
    /// 返回 `Ok(None)` 表示已进入某个处理器体继续执行；
    /// `Ok(Some(exc))` 表示无处捕获，异常逃逸给宿主。
    pub(super) fn deliver(&mut self, cur: &mut Cursor, exc: Value) -> Result<Option<Value>, Fault> {
        loop {
            let Some(entry) = cur.handlers.pop() else {
                debug!(
                    self.logger,
                    "exception escaped: {}",
                    self.render_value(exc)
                );
                return Ok(Some(exc));
            };

            if entry.in_handler {
                // 处理器体内再次抛出：旧异常成为新异常的前因，继续向外交付
                self.chain_exception(exc, entry.prev_exc)?;
                continue;
            }

            if cur.state.len() < entry.saved_depth {
                return Err(Fault::StackUnderflow { offset: cur.ip });
            }
            cur.state.truncate(entry.saved_depth);
            cur.state.push(exc);
            cur.ip = entry.resume_ip;
            trace!(
                self.logger,
                "exception delivered to ip={} depth={}",
                entry.resume_ip,
                entry.saved_depth
            );
            cur.handlers.push(HandlerEntry {
                in_handler: true,
                prev_exc: exc,
                ..entry
            });
            return Ok(None);
        }
    }

    /// 把 context 挂为 exc 的前因（仅当 exc 是异常对象且尚无前因）
    fn chain_exception(&mut self, exc: Value, context: Value) -> Result<(), Fault> {
        if context.is_none() || context == exc {
            return Ok(());
        }
        if let Value::Ref(id) = exc {
            if let HeapObj::Exception(data) = self.heap_obj_mut(id)? {
                if data.prev.is_none() {
                    data.prev = context;
                }
            }
        }
        Ok(())
    }

    /// 抛出值必须是堆上的异常对象，否则替换为 TypeError
    pub(super) fn coerce_exception(&mut self, cur: &Cursor, v: Value) -> Result<Value, Fault> {
        let is_exc = match v {
            Value::Ref(id) => matches!(self.heap_obj(id)?, HeapObj::Exception(_)),
            _ => false,
        };
        if is_exc {
            return Ok(v);
        }
        let kind = self.kind_of(v);
        Ok(self
            .raise(
                cur,
                TOK_TYPE_ERROR,
                format!("exceptions must be exception objects, not '{kind}'"),
            )
            .value)
    }

    /// 构造异常对象：弹出消息与种类，压入新异常
    pub(super) fn new_exception(
        &mut self,
        unit: &Unit,
        cur: &mut Cursor,
        offset: usize,
    ) -> Result<(), VmError> {
        let msg_v = self.peek(cur, 0, offset)?;
        let kind_v = self.peek(cur, 1, offset)?;

        let Some(kind) = kind_v.as_token() else {
            let k = self.kind_of(kind_v);
            return Err(self
                .raise(
                    cur,
                    TOK_TYPE_ERROR,
                    format!("exception kind must be a token, not '{k}'"),
                )
                .into());
        };
        let message = match msg_v {
            Value::None => None,
            Value::Ref(id) => {
                let text = match self.heap_obj(id)? {
                    HeapObj::Str(s) => Some(s.clone()),
                    _ => None,
                };
                match text {
                    Some(text) => Some(text),
                    None => {
                        let k = self.kind_of(msg_v);
                        return Err(self
                            .raise(
                                cur,
                                TOK_TYPE_ERROR,
                                format!("exception message must be str or None, not '{k}'"),
                            )
                            .into());
                    }
                }
            }
            other => {
                let k = other.kind_name();
                return Err(self
                    .raise(
                        cur,
                        TOK_TYPE_ERROR,
                        format!("exception message must be str or None, not '{k}'"),
                    )
                    .into());
            }
        };

        let mut exc = ExcData::new(kind, message);
        exc.line = unit.line_at(offset);
        let id = self.alloc_value(cur, HeapObj::Exception(exc))?;
        self.pop(cur, offset)?;
        self.pop(cur, offset)?;
        self.push(cur, Value::Ref(id))?;
        Ok(())
    }

    /// 正常离开保护体
    pub(super) fn pop_block(&self, cur: &mut Cursor, offset: usize) -> Result<(), Fault> {
        match cur.handlers.pop() {
            Some(entry) if !entry.in_handler => Ok(()),
            Some(_) => Err(Fault::CorruptStream { offset }),
            None => Err(Fault::HandlerUnderflow { offset }),
        }
    }

    /// 正常离开 except 处理器体
    pub(super) fn pop_except(&self, cur: &mut Cursor, offset: usize) -> Result<(), Fault> {
        match cur.handlers.pop() {
            Some(entry) if entry.in_handler && entry.kind == ProtectKind::Except => Ok(()),
            Some(_) => Err(Fault::CorruptStream { offset }),
            None => Err(Fault::HandlerUnderflow { offset }),
        }
    }

    /// finally 块结束：TOS 为 None 则落空，为异常对象则续传
    pub(super) fn end_finally(&mut self, cur: &mut Cursor, offset: usize) -> Result<Flow, VmError> {
        let v = self.pop(cur, offset)?;
        match v {
            Value::None => Ok(Flow::Continue),
            Value::Ref(id) => {
                let is_exc = matches!(self.heap_obj(id)?, HeapObj::Exception(_));
                if !is_exc {
                    return Err(Fault::CorruptStream { offset }.into());
                }
                match cur.handlers.pop() {
                    Some(entry) if entry.in_handler && entry.kind == ProtectKind::Finally => {
                        Err(VmError::Raise(v))
                    }
                    Some(_) => Err(Fault::CorruptStream { offset }.into()),
                    None => Err(Fault::HandlerUnderflow { offset }.into()),
                }
            }
            _ => Err(Fault::CorruptStream { offset }.into()),
        }
    }

    /// 给异常补记抛出位置的行号（尽力而为）
    pub(super) fn note_line(&mut self, unit: &Unit, offset: usize, exc: Value) {
        if let Value::Ref(id) = exc {
            if let Ok(HeapObj::Exception(data)) = self.heap.get_mut(id) {
                if data.line.is_none() {
                    data.line = unit.line_at(offset);
                }
            }
        }
    }
}
