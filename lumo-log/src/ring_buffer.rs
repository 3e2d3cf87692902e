//! 日志专用环形缓冲区（no_std + alloc 兼容）

use crate::logger::LogSink;
use crate::record::Record;
use alloc::collections::VecDeque;
use alloc::sync::Arc;
use alloc::vec::Vec;
use core::sync::atomic::{AtomicUsize, Ordering};

/// 环形缓冲区统计信息
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct RingBufferStats {
    /// 当前记录数
    pub record_count: usize,
    /// 因缓冲区满而丢弃的记录数
    pub dropped_count: usize,
    /// 缓冲区容量
    pub capacity: usize,
}

/// 日志环形缓冲区
///
/// 当缓冲区满时，新记录会覆盖最旧的记录（FIFO）
pub struct LogRingBuffer {
    inner: spin::Mutex<VecDeque<Record>>,
    capacity: usize,
    dropped: AtomicUsize,
}

impl LogRingBuffer {
    /// 创建新的环形缓冲区
    pub fn new(capacity: usize) -> Arc<Self> {
        Arc::new(LogRingBuffer {
            inner: spin::Mutex::new(VecDeque::with_capacity(capacity)),
            capacity,
            dropped: AtomicUsize::new(0),
        })
    }

    /// 写入记录（满了则覆盖旧数据）
    fn push(&self, record: Record) {
        let mut inner = self.inner.lock();
        if inner.len() >= self.capacity {
            inner.pop_front();
            self.dropped.fetch_add(1, Ordering::Relaxed);
        }
        inner.push_back(record);
    }

    /// 获取当前所有记录（按时间顺序）
    pub fn dump_records(&self) -> Vec<Record> {
        let inner = self.inner.lock();
        inner.iter().cloned().collect()
    }

    /// 将日志转储为字符串
    pub fn dump(&self) -> alloc::string::String {
        let records = self.dump_records();
        records
            .iter()
            .map(|r| r.format())
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// 清空缓冲区
    pub fn clear(&self) {
        let mut inner = self.inner.lock();
        inner.clear();
        self.dropped.store(0, Ordering::Relaxed);
    }

    /// 获取统计信息
    pub fn stats(&self) -> RingBufferStats {
        RingBufferStats {
            record_count: self.inner.lock().len(),
            dropped_count: self.dropped.load(Ordering::Relaxed),
            capacity: self.capacity,
        }
    }
}

impl LogSink for Arc<LogRingBuffer> {
    fn write(&self, record: &Record) {
        self.push(record.clone());
    }
}

pub(crate) mod spin {
    //! 简单的自旋锁实现（no_std 兼容）

    use core::cell::UnsafeCell;
    use core::ops::{Deref, DerefMut};
    use core::sync::atomic::{AtomicBool, Ordering};

    pub struct Mutex<T> {
        locked: AtomicBool,
        data: UnsafeCell<T>,
    }

    unsafe impl<T: Send> Send for Mutex<T> {}
    unsafe impl<T: Send> Sync for Mutex<T> {}

    pub struct MutexGuard<'a, T> {
        mutex: &'a Mutex<T>,
    }

    impl<T> Mutex<T> {
        pub const fn new(data: T) -> Self {
            Mutex {
                locked: AtomicBool::new(false),
                data: UnsafeCell::new(data),
            }
        }

        pub fn lock(&self) -> MutexGuard<'_, T> {
            // 简单自旋锁
            while self
                .locked
                .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
                .is_err()
            {
                core::hint::spin_loop();
            }
            MutexGuard { mutex: self }
        }

        fn unlock(&self) {
            self.locked.store(false, Ordering::Release);
        }
    }

    impl<'a, T> Deref for MutexGuard<'a, T> {
        type Target = T;
        fn deref(&self) -> &T {
            unsafe { &*self.mutex.data.get() }
        }
    }

    impl<'a, T> DerefMut for MutexGuard<'a, T> {
        fn deref_mut(&mut self) -> &mut T {
            unsafe { &mut *self.mutex.data.get() }
        }
    }

    impl<'a, T> Drop for MutexGuard<'a, T> {
        fn drop(&mut self) {
            self.mutex.unlock();
        }
    }
}
