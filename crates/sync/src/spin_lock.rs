//! 自旋锁
//!
//! [`RawSpinLock`] 实现 [`lock_api::RawMutex`]：获取锁前关闭本地中断，
//! 释放锁后恢复。进入临界区前的中断状态保存在锁自身中，
//! 因为同一时刻只有持锁者会读写它。

use core::hint;
use core::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use lock_api::{GuardSend, RawMutex};

use crate::arch_ops;

/// 关中断的原始自旋锁
///
/// 不可重入：持锁时再次 `lock()` 会死锁。
/// 嵌套持有不同的锁时必须按获取的逆序释放，否则中断状态会被错误恢复。
#[derive(Debug)]
pub struct RawSpinLock {
    locked: AtomicBool,
    /// 持锁者进入临界区前的中断状态
    saved_flags: AtomicUsize,
}

impl RawSpinLock {
    /// 创建一个未上锁的原始自旋锁
    pub const fn new() -> Self {
        Self {
            locked: AtomicBool::new(false),
            saved_flags: AtomicUsize::new(0),
        }
    }

    fn try_acquire(&self) -> bool {
        self.locked
            .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
            .is_ok()
    }
}

impl Default for RawSpinLock {
    fn default() -> Self {
        Self::new()
    }
}

// SAFETY: locked 标志通过 Acquire/Release 的 CAS 保证同一时刻只有一个持有者。
unsafe impl RawMutex for RawSpinLock {
    #[allow(clippy::declare_interior_mutable_const)]
    const INIT: Self = Self::new();

    type GuardMarker = GuardSend;

    fn lock(&self) {
        // SAFETY: 返回的 flags 会在 unlock 中原样恢复
        let flags = unsafe { arch_ops().read_and_disable_interrupts() };
        while !self.try_acquire() {
            while self.locked.load(Ordering::Relaxed) {
                hint::spin_loop();
            }
        }
        self.saved_flags.store(flags, Ordering::Relaxed);
    }

    fn try_lock(&self) -> bool {
        // SAFETY: 获取失败时立即恢复，成功时由 unlock 恢复
        let flags = unsafe { arch_ops().read_and_disable_interrupts() };
        if self.try_acquire() {
            self.saved_flags.store(flags, Ordering::Relaxed);
            true
        } else {
            unsafe { arch_ops().restore_interrupts(flags) };
            false
        }
    }

    unsafe fn unlock(&self) {
        let flags = self.saved_flags.load(Ordering::Relaxed);
        self.locked.store(false, Ordering::Release);
        // SAFETY: flags 由持锁时的 lock/try_lock 保存
        unsafe { arch_ops().restore_interrupts(flags) };
    }
}

/// 提供对数据的互斥访问的自旋锁
///
/// # 示例
/// ```ignore
/// let lock = SpinLock::new(0);
/// {
///     let mut guard = lock.lock();
///     *guard += 1;
/// } // 离开作用域，自动释放锁并恢复中断
/// ```
pub type SpinLock<T> = lock_api::Mutex<RawSpinLock, T>;

/// [`SpinLock`] 的 RAII 保护器
pub type SpinLockGuard<'a, T> = lock_api::MutexGuard<'a, RawSpinLock, T>;
