//! 读写自旋锁
//!
//! 适用于“初始化阶段写、运行时只读”的全局表（例如文件系统驱动注册表、
//! 根挂载点）。读者之间不互斥，写者独占；不关中断。

use core::hint;
use core::sync::atomic::{AtomicUsize, Ordering};

use lock_api::{GuardSend, RawRwLock};

const WRITER: usize = 1;
const READER: usize = 2;

/// 原始读写自旋锁
///
/// 状态字最低位表示写者，其余位是读者计数（每个读者占 [`READER`]）。
#[derive(Debug)]
pub struct RawRwSpinLock {
    state: AtomicUsize,
}

impl RawRwSpinLock {
    /// 创建一个未上锁的读写锁
    pub const fn new() -> Self {
        Self {
            state: AtomicUsize::new(0),
        }
    }
}

impl Default for RawRwSpinLock {
    fn default() -> Self {
        Self::new()
    }
}

// SAFETY: 写者只在 state == 0 时进入；读者只在没有写者时增加计数。
unsafe impl RawRwLock for RawRwSpinLock {
    #[allow(clippy::declare_interior_mutable_const)]
    const INIT: Self = Self::new();

    type GuardMarker = GuardSend;

    fn lock_shared(&self) {
        while !self.try_lock_shared() {
            hint::spin_loop();
        }
    }

    fn try_lock_shared(&self) -> bool {
        let prev = self.state.fetch_add(READER, Ordering::Acquire);
        if prev & WRITER != 0 {
            self.state.fetch_sub(READER, Ordering::Release);
            false
        } else {
            true
        }
    }

    unsafe fn unlock_shared(&self) {
        self.state.fetch_sub(READER, Ordering::Release);
    }

    fn lock_exclusive(&self) {
        while !self.try_lock_exclusive() {
            while self.state.load(Ordering::Relaxed) != 0 {
                hint::spin_loop();
            }
        }
    }

    fn try_lock_exclusive(&self) -> bool {
        self.state
            .compare_exchange(0, WRITER, Ordering::Acquire, Ordering::Relaxed)
            .is_ok()
    }

    unsafe fn unlock_exclusive(&self) {
        self.state.fetch_and(!WRITER, Ordering::Release);
    }
}

/// 读写锁
pub type RwLock<T> = lock_api::RwLock<RawRwSpinLock, T>;

/// [`RwLock`] 的读保护器
pub type RwLockReadGuard<'a, T> = lock_api::RwLockReadGuard<'a, RawRwSpinLock, T>;

/// [`RwLock`] 的写保护器
pub type RwLockWriteGuard<'a, T> = lock_api::RwLockWriteGuard<'a, RawRwSpinLock, T>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rwlock_readers_share() {
        let lock = RwLock::new(5);
        let a = lock.read();
        let b = lock.read();
        assert_eq!(*a + *b, 10);
        assert!(lock.try_write().is_none());
    }

    #[test]
    fn test_rwlock_writer_excludes_readers() {
        let lock = RwLock::new(0);
        {
            let mut w = lock.write();
            *w = 7;
            assert!(lock.try_read().is_none());
        }
        assert_eq!(*lock.read(), 7);
    }
}
