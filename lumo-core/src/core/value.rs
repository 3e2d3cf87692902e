//! 运行时值表示（Core 层）
//!
//! 封闭枚举：小整数、驻留标识符、单例、堆句柄四类，
//! 由类型系统保证自描述，无需位运算即可区分。

use super::token::TokenId;

/// 堆句柄（指向堆块的稳定索引，对象不移动，回收前一直有效）
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct HeapId(pub u32);

impl HeapId {
    /// 转换为槽位下标
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// 原生函数句柄（指向 VM 原生函数表的下标，不参与垃圾回收）
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct NativeId(pub u16);

impl NativeId {
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// 运行时值 (机器字大小)
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Value {
    /// 单例: 空值
    None,
    /// 单例: 真
    True,
    /// 单例: 假
    False,
    /// 小整数
    Int(i64),
    /// 驻留标识符
    Token(TokenId),
    /// 堆对象句柄
    Ref(HeapId),
    /// 原生函数句柄
    Native(NativeId),
}

impl Value {
    // ==================== 构造方法 ====================

    /// 创建布尔值
    #[inline]
    pub fn bool_from(b: bool) -> Self {
        if b {
            Value::True
        } else {
            Value::False
        }
    }

    /// 创建小整数
    #[inline]
    pub fn int(n: i64) -> Self {
        Value::Int(n)
    }

    // ==================== 类型判断 ====================

    /// 是否为空值
    #[inline]
    pub fn is_none(&self) -> bool {
        matches!(self, Value::None)
    }

    /// 是否为布尔值
    #[inline]
    pub fn is_bool(&self) -> bool {
        matches!(self, Value::True | Value::False)
    }

    /// 是否为小整数
    #[inline]
    pub fn is_int(&self) -> bool {
        matches!(self, Value::Int(_))
    }

    /// 是否为驻留标识符
    #[inline]
    pub fn is_token(&self) -> bool {
        matches!(self, Value::Token(_))
    }

    /// 是否为堆句柄
    #[inline]
    pub fn is_ref(&self) -> bool {
        matches!(self, Value::Ref(_))
    }

    /// 是否为真值（False、None 和 0 为假）
    #[inline]
    pub fn is_truthy(&self) -> bool {
        !matches!(self, Value::False | Value::None | Value::Int(0))
    }

    // ==================== 解包方法 ====================

    /// 解包为小整数
    #[inline]
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(n) => Some(*n),
            _ => None,
        }
    }

    /// 解包为布尔值
    #[inline]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::True => Some(true),
            Value::False => Some(false),
            _ => None,
        }
    }

    /// 解包为驻留标识符
    #[inline]
    pub fn as_token(&self) -> Option<TokenId> {
        match self {
            Value::Token(id) => Some(*id),
            _ => None,
        }
    }

    /// 解包为堆句柄
    #[inline]
    pub fn as_ref_id(&self) -> Option<HeapId> {
        match self {
            Value::Ref(id) => Some(*id),
            _ => None,
        }
    }

    /// 类型名（用于错误消息）
    pub fn kind_name(&self) -> &'static str {
        match self {
            Value::None => "none",
            Value::True | Value::False => "bool",
            Value::Int(_) => "int",
            Value::Token(_) => "token",
            Value::Ref(_) => "object",
            Value::Native(_) => "native",
        }
    }
}
