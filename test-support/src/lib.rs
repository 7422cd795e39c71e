//! 测试支持 crate
//!
//! 提供 Mock 实现和测试工具

#![no_std]

pub mod mock;

use core::sync::atomic::{AtomicUsize, Ordering};

// 0 = uninit, 1 = initializing, 2 = ready
static SYNC_INIT: AtomicUsize = AtomicUsize::new(0);

/// 注册 Mock 的 [`sync::ArchOps`]，可重复调用
///
/// 测试线程并行运行，只有第一个调用者真正注册，其余等待注册完成。
pub fn init_sync_arch_ops() {
    match SYNC_INIT.compare_exchange(0, 1, Ordering::AcqRel, Ordering::Acquire) {
        Ok(_) => {
            // Safety: tests use a single global mock ArchOps.
            unsafe { sync::register_arch_ops(&mock::arch::MOCK_ARCH_OPS) };
            SYNC_INIT.store(2, Ordering::Release);
        }
        Err(_) => {
            while SYNC_INIT.load(Ordering::Acquire) != 2 {
                core::hint::spin_loop();
            }
        }
    }
}
