//! 标识符驻留池（Core 层）
//!
//! 同一字符串只存一份，值层面只携带 `TokenId`。
//! 池本身存普通数据，不进 GC 堆，因此天然是常驻根。

use std::collections::HashMap;

/// 驻留标识符 ID
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TokenId(pub u16);

// ==================== 预置异常种类 ====================
// 固定 ID，运行时直接引用，顺序与 WELL_KNOWN 一致

pub const TOK_EXCEPTION: TokenId = TokenId(0);
pub const TOK_TYPE_ERROR: TokenId = TokenId(1);
pub const TOK_VALUE_ERROR: TokenId = TokenId(2);
pub const TOK_MEMORY_ERROR: TokenId = TokenId(3);
pub const TOK_OS_ERROR: TokenId = TokenId(4);
pub const TOK_ZERO_DIVISION_ERROR: TokenId = TokenId(5);
pub const TOK_INDEX_ERROR: TokenId = TokenId(6);
pub const TOK_NAME_ERROR: TokenId = TokenId(7);
pub const TOK_STOP_ITERATION: TokenId = TokenId(8);
pub const TOK_UNSUPPORTED_OPERATION: TokenId = TokenId(9);

const WELL_KNOWN: &[&str] = &[
    "Exception",
    "TypeError",
    "ValueError",
    "MemoryError",
    "OSError",
    "ZeroDivisionError",
    "IndexError",
    "NameError",
    "StopIteration",
    "UnsupportedOperation",
];

/// 驻留池统计信息
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct TokenStats {
    /// 驻留的标识符数量
    pub count: usize,
    /// 字符串数据总字节数
    pub bytes: usize,
}

/// 标识符驻留池
#[derive(Debug)]
pub struct TokenTable {
    names: Vec<String>,
    index: HashMap<String, TokenId>,
}

impl TokenTable {
    /// 创建驻留池，预置常用异常种类
    pub fn new() -> Self {
        let mut table = Self {
            names: Vec::with_capacity(WELL_KNOWN.len()),
            index: HashMap::new(),
        };
        for name in WELL_KNOWN {
            table.intern(name);
        }
        table
    }

    /// 驻留一个标识符，重复驻留返回同一 ID
    pub fn intern(&mut self, name: &str) -> TokenId {
        if let Some(id) = self.index.get(name) {
            return *id;
        }
        let id = TokenId(self.names.len() as u16);
        self.names.push(name.to_string());
        self.index.insert(name.to_string(), id);
        id
    }

    /// 查询已驻留的标识符
    pub fn lookup(&self, name: &str) -> Option<TokenId> {
        self.index.get(name).copied()
    }

    /// 解析 ID 对应的字符串
    pub fn resolve(&self, id: TokenId) -> Option<&str> {
        self.names.get(id.0 as usize).map(|s| s.as_str())
    }

    /// 统计信息（用于 mem-info 报告）
    pub fn stats(&self) -> TokenStats {
        TokenStats {
            count: self.names.len(),
            bytes: self.names.iter().map(|s| s.len()).sum(),
        }
    }
}

impl Default for TokenTable {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_well_known_ids_are_stable() {
        let table = TokenTable::new();
        assert_eq!(table.resolve(TOK_EXCEPTION), Some("Exception"));
        assert_eq!(table.resolve(TOK_TYPE_ERROR), Some("TypeError"));
        assert_eq!(table.resolve(TOK_MEMORY_ERROR), Some("MemoryError"));
        assert_eq!(
            table.resolve(TOK_UNSUPPORTED_OPERATION),
            Some("UnsupportedOperation")
        );
    }

    #[test]
    fn test_intern_deduplicates() {
        let mut table = TokenTable::new();
        let a = table.intern("spam");
        let b = table.intern("spam");
        assert_eq!(a, b);
        assert_eq!(table.resolve(a), Some("spam"));
    }

    #[test]
    fn test_intern_well_known_returns_preset_id() {
        let mut table = TokenTable::new();
        assert_eq!(table.intern("ValueError"), TOK_VALUE_ERROR);
    }

    #[test]
    fn test_lookup_missing() {
        let table = TokenTable::new();
        assert_eq!(table.lookup("no_such_name"), None);
    }

    #[test]
    fn test_stats_counts_bytes() {
        let mut table = TokenTable::new();
        let before = table.stats();
        table.intern("abcd");
        let after = table.stats();
        assert_eq!(after.count, before.count + 1);
        assert_eq!(after.bytes, before.bytes + 4);
    }
}
