//! 回收根集（Runtime 层）
//!
//! 精确协作式根：持有堆句柄的一方负责枚举自己全部可能指向堆的值，
//! 回收器不扫描宿主栈、不猜测指针。没有被枚举到且未被钉住的对象
//! 一律视为可回收。

use std::collections::HashMap;

use crate::core::{TokenId, Value};

use super::cursor::Cursor;

/// 根集提供者
pub trait RootSource {
    /// 对每个根值调用一次 `visit`（非引用值会被回收器忽略）
    fn trace_roots(&self, visit: &mut dyn FnMut(Value));
}

/// 空根集（只有钉住的对象存活）
pub struct NoRoots;

impl RootSource for NoRoots {
    fn trace_roots(&self, _visit: &mut dyn FnMut(Value)) {}
}

/// 值切片根集（测试和宿主嵌入常用）
pub struct SliceRoots<'a>(pub &'a [Value]);

impl RootSource for SliceRoots<'_> {
    fn trace_roots(&self, visit: &mut dyn FnMut(Value)) {
        for v in self.0 {
            visit(*v);
        }
    }
}

/// VM 根集视图：游标全部状态 + 全局变量表
///
/// 游标的 state 含局部变量与操作数栈，保护区域条目里
/// 正在处理的异常也必须保活。
pub struct VmRoots<'a> {
    pub cursor: &'a Cursor,
    pub globals: &'a HashMap<TokenId, Value>,
}

impl RootSource for VmRoots<'_> {
    fn trace_roots(&self, visit: &mut dyn FnMut(Value)) {
        for v in &self.cursor.state {
            visit(*v);
        }
        for entry in &self.cursor.handlers {
            visit(entry.prev_exc);
        }
        for v in self.globals.values() {
            visit(*v);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::HeapId;

    fn collect_refs(source: &dyn RootSource) -> Vec<HeapId> {
        let mut out = Vec::new();
        source.trace_roots(&mut |v| {
            if let Value::Ref(id) = v {
                out.push(id);
            }
        });
        out
    }

    #[test]
    fn test_no_roots_is_empty() {
        assert!(collect_refs(&NoRoots).is_empty());
    }

    #[test]
    fn test_slice_roots() {
        let values = [Value::Int(1), Value::Ref(HeapId(4)), Value::None];
        let refs = collect_refs(&SliceRoots(&values));
        assert_eq!(refs, vec![HeapId(4)]);
    }

    #[test]
    fn test_vm_roots_cover_stack_handlers_and_globals() {
        use super::super::cursor::{HandlerEntry, ProtectKind};

        let mut cursor = Cursor::default();
        cursor.state.push(Value::Ref(HeapId(1)));
        cursor.handlers.push(HandlerEntry {
            kind: ProtectKind::Except,
            resume_ip: 0,
            saved_depth: 0,
            in_handler: true,
            prev_exc: Value::Ref(HeapId(2)),
        });

        let mut globals = HashMap::new();
        globals.insert(TokenId(9), Value::Ref(HeapId(3)));

        let refs = collect_refs(&VmRoots {
            cursor: &cursor,
            globals: &globals,
        });
        assert!(refs.contains(&HeapId(1)));
        assert!(refs.contains(&HeapId(2)));
        assert!(refs.contains(&HeapId(3)));
    }
}
