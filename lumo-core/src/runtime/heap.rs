//! 垃圾回收堆（Runtime 层）
//!
//! 标记清除式分配器。分配在块数触顶时触发一次回收，回收后仍不足
//! 则报告 OutOfMemory，由 VM 转换为可捕获的 MemoryError 异常。
//! 槽位 0 在构造时预留给该异常对象并钉住，保证内存耗尽时仍有
//! 异常可抛。

use std::sync::Arc;

use lumo_log::{debug, Logger};

use lumo_config::HeapConfig;

use crate::core::token::TOK_MEMORY_ERROR;
use crate::core::{HeapId, Value};

use super::object::{ExcData, HeapObj};
use super::roots::RootSource;

/// 堆相关错误
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HeapError {
    /// 回收一次后仍无可用块
    OutOfMemory { limit: usize },
    /// 无效句柄（已回收或越界）
    InvalidRef { id: u32 },
    /// 回收过程中再次进入分配或回收
    ReentrantCollect,
}

impl std::fmt::Display for HeapError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HeapError::OutOfMemory { limit } => {
                write!(f, "out of memory ({limit} blocks exhausted)")
            }
            HeapError::InvalidRef { id } => write!(f, "invalid heap reference (block {id})"),
            HeapError::ReentrantCollect => write!(f, "reentrant collection"),
        }
    }
}

impl std::error::Error for HeapError {}

/// 堆使用统计
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct HeapStats {
    /// 当前活跃块数
    pub blocks_used: usize,
    /// 空闲列表中的块数
    pub blocks_free: usize,
    /// 历史峰值活跃块数
    pub peak_blocks: usize,
    /// 累计回收次数
    pub collections: u64,
    /// 最近一次回收释放的块数
    pub freed_last: usize,
}

/// 带垃圾回收的堆
pub struct Heap {
    // 核心存储：(对象数据, 标记状态)
    slots: Vec<(HeapObj, bool)>,
    // 空闲槽位管理
    free_slots: Vec<usize>,
    is_free: Vec<bool>,
    // 块数上限
    max_blocks: usize,
    // 回收重入保护
    collecting: bool,
    // 钉住的对象：始终视为根
    pinned: Vec<HeapId>,
    oom_exception: HeapId,
    // 统计
    peak_blocks: usize,
    collections: u64,
    freed_last: usize,
    logger: Arc<Logger>,
}

impl Heap {
    pub fn new(config: &HeapConfig) -> Self {
        let mut heap = Self {
            slots: Vec::new(),
            free_slots: Vec::new(),
            is_free: Vec::new(),
            max_blocks: config.max_blocks,
            collecting: false,
            pinned: Vec::new(),
            oom_exception: HeapId(0),
            peak_blocks: 0,
            collections: 0,
            freed_last: 0,
            logger: Logger::new(lumo_log::Level::Error),
        };

        // 预分配内存耗尽异常，绕过上限检查
        let exc = ExcData::new(TOK_MEMORY_ERROR, Some("memory allocation failed".into()));
        let id = heap.push_raw(HeapObj::Exception(exc));
        heap.pinned.push(id);
        heap.oom_exception = id;
        heap
    }

    pub fn set_logger(&mut self, logger: Arc<Logger>) {
        self.logger = logger;
    }

    /// 预分配的内存耗尽异常（钉住，永不回收）
    pub fn oom_exception(&self) -> HeapId {
        self.oom_exception
    }

    /// 钉住对象：即使没有任何根可达也不回收
    pub fn pin(&mut self, id: HeapId) {
        if !self.pinned.contains(&id) {
            self.pinned.push(id);
        }
    }

    fn push_raw(&mut self, obj: HeapObj) -> HeapId {
        self.slots.push((obj, false));
        self.is_free.push(false);
        HeapId((self.slots.len() - 1) as u32)
    }

    fn active_blocks(&self) -> usize {
        self.slots.len() - self.free_slots.len()
    }

    /// 分配对象（块数触顶时先回收一次，仍不足则报错）
    pub fn alloc(&mut self, obj: HeapObj, roots: &dyn RootSource) -> Result<HeapId, HeapError> {
        if self.collecting {
            return Err(HeapError::ReentrantCollect);
        }

        if self.active_blocks() + 1 > self.max_blocks {
            self.collect(roots)?;
            if self.active_blocks() + 1 > self.max_blocks {
                return Err(HeapError::OutOfMemory {
                    limit: self.max_blocks,
                });
            }
        }

        // 复用空闲槽位或追加新槽
        let id = if let Some(idx) = self.free_slots.pop() {
            self.slots[idx] = (obj, false);
            self.is_free[idx] = false;
            HeapId(idx as u32)
        } else {
            self.push_raw(obj)
        };

        self.peak_blocks = self.peak_blocks.max(self.active_blocks());
        Ok(id)
    }

    /// 通过句柄获取不可变对象引用
    pub fn get(&self, id: HeapId) -> Result<&HeapObj, HeapError> {
        let idx = id.index();
        if idx >= self.slots.len() || self.is_free[idx] {
            return Err(HeapError::InvalidRef { id: id.0 });
        }
        Ok(&self.slots[idx].0)
    }

    /// 通过句柄获取可变对象引用
    pub fn get_mut(&mut self, id: HeapId) -> Result<&mut HeapObj, HeapError> {
        let idx = id.index();
        if idx >= self.slots.len() || self.is_free[idx] {
            return Err(HeapError::InvalidRef { id: id.0 });
        }
        Ok(&mut self.slots[idx].0)
    }

    /// 执行一轮回收（标记 + 清除），返回释放的块数
    pub fn collect(&mut self, roots: &dyn RootSource) -> Result<usize, HeapError> {
        if self.collecting {
            return Err(HeapError::ReentrantCollect);
        }
        let scope = CollectScope::enter(self);
        scope.heap.mark(roots);
        let freed = scope.heap.sweep();
        scope.heap.collections += 1;
        scope.heap.freed_last = freed;
        drop(scope);

        debug!(
            self.logger,
            "collect pass freed {} blocks, {} live",
            freed,
            self.active_blocks()
        );
        Ok(freed)
    }

    /// 标记阶段：从根集与钉住对象出发，迭代标记所有可达对象
    fn mark(&mut self, roots: &dyn RootSource) {
        for (_, marked) in &mut self.slots {
            *marked = false;
        }

        let mut worklist: Vec<usize> = Vec::new();
        roots.trace_roots(&mut |v| {
            if let Value::Ref(id) = v {
                worklist.push(id.index());
            }
        });
        for id in &self.pinned {
            worklist.push(id.index());
        }

        while let Some(idx) = worklist.pop() {
            if idx >= self.slots.len() || self.is_free[idx] || self.slots[idx].1 {
                continue;
            }
            let entry = &mut self.slots[idx];
            entry.1 = true;
            entry.0.trace_children(&mut |v| {
                if let Value::Ref(id) = v {
                    worklist.push(id.index());
                }
            });
        }
    }

    /// 清除阶段：回收未标记对象，槽位进入空闲列表
    fn sweep(&mut self) -> usize {
        let mut freed = 0;
        for idx in 0..self.slots.len() {
            if !self.slots[idx].1 && !self.is_free[idx] {
                // 释放对象本体，槽位保留复用
                self.slots[idx].0 = HeapObj::Free;
                self.is_free[idx] = true;
                self.free_slots.push(idx);
                freed += 1;
            }
        }
        freed
    }

    pub fn stats(&self) -> HeapStats {
        HeapStats {
            blocks_used: self.active_blocks(),
            blocks_free: self.free_slots.len(),
            peak_blocks: self.peak_blocks,
            collections: self.collections,
            freed_last: self.freed_last,
        }
    }

    #[cfg(test)]
    pub(crate) fn force_collecting(&mut self, on: bool) {
        self.collecting = on;
    }
}

/// 回收作用域：进入时置位 collecting，离开时（含 panic 展开）复位
struct CollectScope<'a> {
    heap: &'a mut Heap,
}

impl<'a> CollectScope<'a> {
    fn enter(heap: &'a mut Heap) -> Self {
        heap.collecting = true;
        CollectScope { heap }
    }
}

impl Drop for CollectScope<'_> {
    fn drop(&mut self) {
        self.heap.collecting = false;
    }
}
