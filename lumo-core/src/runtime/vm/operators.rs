//! 运算符语义（Runtime 层）
//!
//! 整数运算全部检查溢出；除法向负无穷取整，与余数符号约定一致。
//! 类型不匹配抛 TypeError，均为语言级异常。

use std::cmp::Ordering;

use crate::core::token::{TOK_INDEX_ERROR, TOK_TYPE_ERROR, TOK_VALUE_ERROR, TOK_ZERO_DIVISION_ERROR};
use crate::core::{Raised, Value};

use super::super::cursor::Cursor;
use super::super::object::HeapObj;
use super::{Vm, VmError};

/// 下标解析：负值从尾部回绕
fn resolve_index(index: i64, len: usize) -> Option<usize> {
    let len = len as i64;
    let resolved = if index < 0 { index + len } else { index };
    if (0..len).contains(&resolved) {
        Some(resolved as usize)
    } else {
        None
    }
}

/// 读取阶段的结果，与后续的分配/抛出阶段分离
enum Fetched {
    Direct(Value),
    CharStr(String),
    OutOfRange,
    NotSubscriptable,
}

impl Vm {
    pub(crate) fn add_values(&mut self, cur: &Cursor, a: Value, b: Value) -> Result<Value, VmError> {
        match (a, b) {
            (Value::Int(x), Value::Int(y)) => match x.checked_add(y) {
                Some(n) => Ok(Value::Int(n)),
                None => Err(self.raise(cur, TOK_VALUE_ERROR, "integer overflow").into()),
            },
            (Value::Ref(ia), Value::Ref(ib)) => {
                let joined = match (self.heap_obj(ia)?, self.heap_obj(ib)?) {
                    (HeapObj::Str(x), HeapObj::Str(y)) => Some(HeapObj::Str(format!("{x}{y}"))),
                    (HeapObj::Bytes(x), HeapObj::Bytes(y)) => {
                        Some(HeapObj::Bytes([x.as_slice(), y.as_slice()].concat()))
                    }
                    (HeapObj::List(x), HeapObj::List(y)) => {
                        Some(HeapObj::List([x.as_slice(), y.as_slice()].concat()))
                    }
                    _ => None,
                };
                match joined {
                    Some(obj) => {
                        let id = self.alloc_value(cur, obj)?;
                        Ok(Value::Ref(id))
                    }
                    None => Err(self.type_error_bin(cur, "+", a, b).into()),
                }
            }
            _ => Err(self.type_error_bin(cur, "+", a, b).into()),
        }
    }

    pub(crate) fn sub_values(&mut self, cur: &Cursor, a: Value, b: Value) -> Result<Value, VmError> {
        match (a, b) {
            (Value::Int(x), Value::Int(y)) => match x.checked_sub(y) {
                Some(n) => Ok(Value::Int(n)),
                None => Err(self.raise(cur, TOK_VALUE_ERROR, "integer overflow").into()),
            },
            _ => Err(self.type_error_bin(cur, "-", a, b).into()),
        }
    }

    pub(crate) fn mul_values(&mut self, cur: &Cursor, a: Value, b: Value) -> Result<Value, VmError> {
        match (a, b) {
            (Value::Int(x), Value::Int(y)) => match x.checked_mul(y) {
                Some(n) => Ok(Value::Int(n)),
                None => Err(self.raise(cur, TOK_VALUE_ERROR, "integer overflow").into()),
            },
            _ => Err(self.type_error_bin(cur, "*", a, b).into()),
        }
    }

    /// 整数除法，商向负无穷取整
    pub(crate) fn div_values(&mut self, cur: &Cursor, a: Value, b: Value) -> Result<Value, VmError> {
        match (a, b) {
            (Value::Int(x), Value::Int(y)) => {
                if y == 0 {
                    return Err(self
                        .raise(cur, TOK_ZERO_DIVISION_ERROR, "division by zero")
                        .into());
                }
                if x == i64::MIN && y == -1 {
                    return Err(self.raise(cur, TOK_VALUE_ERROR, "integer overflow").into());
                }
                let q = x.wrapping_div(y);
                let r = x.wrapping_rem(y);
                let floored = if r != 0 && (r < 0) != (y < 0) { q - 1 } else { q };
                Ok(Value::Int(floored))
            }
            _ => Err(self.type_error_bin(cur, "/", a, b).into()),
        }
    }

    pub(crate) fn neg_value(&mut self, cur: &Cursor, v: Value) -> Result<Value, VmError> {
        match v {
            Value::Int(n) => match n.checked_neg() {
                Some(n) => Ok(Value::Int(n)),
                None => Err(self.raise(cur, TOK_VALUE_ERROR, "integer overflow").into()),
            },
            _ => {
                let kind = self.kind_of(v);
                Err(self
                    .raise(
                        cur,
                        TOK_TYPE_ERROR,
                        format!("bad operand type for unary -: '{kind}'"),
                    )
                    .into())
            }
        }
    }

    /// 相等判定：标量按结构，字符串/字节串按内容，容器按标识
    pub(crate) fn equal_values(&self, a: Value, b: Value) -> bool {
        match (a, b) {
            (Value::Ref(x), Value::Ref(y)) => {
                if x == y {
                    return true;
                }
                match (self.heap.get(x), self.heap.get(y)) {
                    (Ok(HeapObj::Str(s1)), Ok(HeapObj::Str(s2))) => s1 == s2,
                    (Ok(HeapObj::Bytes(b1)), Ok(HeapObj::Bytes(b2))) => b1 == b2,
                    _ => false,
                }
            }
            _ => a == b,
        }
    }

    /// 排序比较：整数之间、字符串之间可比，其余抛 TypeError
    pub(crate) fn compare_values(
        &mut self,
        cur: &Cursor,
        op: &'static str,
        a: Value,
        b: Value,
    ) -> Result<Ordering, VmError> {
        match (a, b) {
            (Value::Int(x), Value::Int(y)) => Ok(x.cmp(&y)),
            (Value::Ref(x), Value::Ref(y)) => {
                let ord = match (self.heap_obj(x)?, self.heap_obj(y)?) {
                    (HeapObj::Str(s1), HeapObj::Str(s2)) => Some(s1.cmp(s2)),
                    (HeapObj::Bytes(b1), HeapObj::Bytes(b2)) => Some(b1.cmp(b2)),
                    _ => None,
                };
                match ord {
                    Some(ord) => Ok(ord),
                    None => Err(self.type_error_bin(cur, op, a, b).into()),
                }
            }
            _ => Err(self.type_error_bin(cur, op, a, b).into()),
        }
    }

    /// 下标读取：列表取元素，字符串取单字符，字节串取整数
    pub(crate) fn index_get(
        &mut self,
        cur: &Cursor,
        obj: Value,
        index: Value,
    ) -> Result<Value, VmError> {
        let kind = self.kind_of(obj);
        let Value::Ref(id) = obj else {
            return Err(self
                .raise(
                    cur,
                    TOK_TYPE_ERROR,
                    format!("'{kind}' object is not subscriptable"),
                )
                .into());
        };
        let Value::Int(idx) = index else {
            let ik = self.kind_of(index);
            return Err(self
                .raise(
                    cur,
                    TOK_TYPE_ERROR,
                    format!("indices must be int, not '{ik}'"),
                )
                .into());
        };

        let fetched = match self.heap_obj(id)? {
            HeapObj::List(items) => match resolve_index(idx, items.len()) {
                Some(i) => Fetched::Direct(items[i]),
                None => Fetched::OutOfRange,
            },
            HeapObj::Str(s) => {
                let count = s.chars().count();
                match resolve_index(idx, count).and_then(|i| s.chars().nth(i)) {
                    Some(c) => Fetched::CharStr(c.to_string()),
                    None => Fetched::OutOfRange,
                }
            }
            HeapObj::Bytes(bytes) => match resolve_index(idx, bytes.len()) {
                Some(i) => Fetched::Direct(Value::Int(bytes[i] as i64)),
                None => Fetched::OutOfRange,
            },
            _ => Fetched::NotSubscriptable,
        };

        match fetched {
            Fetched::Direct(v) => Ok(v),
            Fetched::CharStr(s) => {
                let sid = self.alloc_value(cur, HeapObj::Str(s))?;
                Ok(Value::Ref(sid))
            }
            Fetched::OutOfRange => Err(self
                .raise(cur, TOK_INDEX_ERROR, format!("{kind} index out of range"))
                .into()),
            Fetched::NotSubscriptable => Err(self
                .raise(
                    cur,
                    TOK_TYPE_ERROR,
                    format!("'{kind}' object is not subscriptable"),
                )
                .into()),
        }
    }

    fn type_error_bin(&mut self, cur: &Cursor, op: &str, a: Value, b: Value) -> Raised {
        let ka = self.kind_of(a);
        let kb = self.kind_of(b);
        self.raise(
            cur,
            TOK_TYPE_ERROR,
            format!("unsupported operand types for {op}: '{ka}' and '{kb}'"),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_index_wraps_negative() {
        assert_eq!(resolve_index(0, 3), Some(0));
        assert_eq!(resolve_index(2, 3), Some(2));
        assert_eq!(resolve_index(-1, 3), Some(2));
        assert_eq!(resolve_index(-3, 3), Some(0));
        assert_eq!(resolve_index(3, 3), None);
        assert_eq!(resolve_index(-4, 3), None);
        assert_eq!(resolve_index(0, 0), None);
    }

    #[test]
    fn test_floor_division() {
        let mut vm = Vm::new();
        let cur = Cursor::default();
        let div = |vm: &mut Vm, a: i64, b: i64| {
            match vm.div_values(&cur, Value::Int(a), Value::Int(b)) {
                Ok(Value::Int(n)) => n,
                other => panic!("unexpected division result: {other:?}"),
            }
        };
        assert_eq!(div(&mut vm, 7, 2), 3);
        assert_eq!(div(&mut vm, -7, 2), -4);
        assert_eq!(div(&mut vm, 7, -2), -4);
        assert_eq!(div(&mut vm, -7, -2), 3);
        assert_eq!(div(&mut vm, 6, 3), 2);
        assert_eq!(div(&mut vm, -6, 3), -2);
    }

    #[test]
    fn test_string_equality_by_content() {
        let mut vm = Vm::new();
        let cur = Cursor::default();
        let a = vm.try_alloc(&cur, HeapObj::Str("abc".into())).unwrap();
        let b = vm.try_alloc(&cur, HeapObj::Str("abc".into())).unwrap();
        let c = vm.try_alloc(&cur, HeapObj::Str("abd".into())).unwrap();
        assert!(vm.equal_values(Value::Ref(a), Value::Ref(b)));
        assert!(!vm.equal_values(Value::Ref(a), Value::Ref(c)));
    }

    #[test]
    fn test_list_equality_by_identity() {
        let mut vm = Vm::new();
        let cur = Cursor::default();
        let a = vm.try_alloc(&cur, HeapObj::List(vec![Value::Int(1)])).unwrap();
        let b = vm.try_alloc(&cur, HeapObj::List(vec![Value::Int(1)])).unwrap();
        assert!(vm.equal_values(Value::Ref(a), Value::Ref(a)));
        assert!(!vm.equal_values(Value::Ref(a), Value::Ref(b)));
    }
}
