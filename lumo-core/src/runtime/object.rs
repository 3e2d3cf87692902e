//! 堆对象（Runtime 层）
//!
//! 所有引用类型的统一存储表示。`Value::Ref` 指向的就是这里的变体。

use crate::core::{TokenId, Value};

use super::stream::MemoryStream;

/// 异常对象数据
#[derive(Clone, Debug, PartialEq)]
pub struct ExcData {
    /// 异常类别（驻留标识符，如 ValueError）
    pub kind: TokenId,
    pub message: Option<String>,
    /// 前因异常链（处理异常期间再次抛出时由交付逻辑填写）
    pub prev: Value,
    /// 抛出位置的源行号
    pub line: Option<usize>,
}

impl ExcData {
    pub fn new(kind: TokenId, message: Option<String>) -> Self {
        Self {
            kind,
            message,
            prev: Value::None,
            line: None,
        }
    }
}

/// 堆上存储的引用类型对象
#[derive(Clone, Debug, PartialEq)]
pub enum HeapObj {
    /// 空闲槽位（已回收，等待复用）
    Free,
    Str(String),
    Bytes(Vec<u8>),
    List(Vec<Value>),
    Exception(ExcData),
    Stream(MemoryStream),
}

impl HeapObj {
    /// 枚举对象内部持有的所有值（标记阶段使用）
    pub fn trace_children(&self, visit: &mut dyn FnMut(Value)) {
        match self {
            HeapObj::List(items) => {
                for item in items {
                    visit(*item);
                }
            }
            HeapObj::Exception(exc) => visit(exc.prev),
            // 字符串、字节串、流无内部引用
            HeapObj::Free | HeapObj::Str(_) | HeapObj::Bytes(_) | HeapObj::Stream(_) => {}
        }
    }

    /// 类型名（用于错误消息）
    pub fn kind_name(&self) -> &'static str {
        match self {
            HeapObj::Free => "free",
            HeapObj::Str(_) => "str",
            HeapObj::Bytes(_) => "bytes",
            HeapObj::List(_) => "list",
            HeapObj::Exception(_) => "exception",
            HeapObj::Stream(_) => "stream",
        }
    }
}
