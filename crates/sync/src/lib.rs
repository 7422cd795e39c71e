//! 同步原语
//!
//! 向 VFS 及文件系统驱动提供自旋锁与读写锁。
//!
//! 两种锁都以 [`lock_api`] 的原始锁 trait 实现，对外暴露的是
//! `lock_api::Mutex` / `lock_api::RwLock` 的类型别名，因此 `lock()`、
//! `read()`、`write()` 的用法与 RAII guard 语义和标准库一致。
//!
//! # 架构依赖
//!
//! [`SpinLock`] 在持锁期间关闭本地中断，中断控制通过 [`ArchOps`] trait 抽象。
//! 使用前必须调用 [`register_arch_ops`] 注册实现。

#![no_std]

mod rwlock;
mod spin_lock;

pub use rwlock::{RawRwSpinLock, RwLock, RwLockReadGuard, RwLockWriteGuard};
pub use spin_lock::{RawSpinLock, SpinLock, SpinLockGuard};

use core::sync::atomic::{AtomicUsize, Ordering};

/// 架构相关操作的 trait
///
/// 由内核实现并注册，提供本地中断控制
pub trait ArchOps: Send + Sync {
    /// 读取并禁用中断，返回之前的状态
    ///
    /// # Safety
    /// 调用者必须确保在适当的上下文中调用
    unsafe fn read_and_disable_interrupts(&self) -> usize;

    /// 恢复中断状态
    ///
    /// # Safety
    /// flags 必须是之前 read_and_disable_interrupts 返回的值
    unsafe fn restore_interrupts(&self, flags: usize);
}

/// 全局架构操作实例（存储 fat pointer 的两个部分）
static ARCH_OPS_DATA: AtomicUsize = AtomicUsize::new(0);
static ARCH_OPS_VTABLE: AtomicUsize = AtomicUsize::new(0);

/// 注册架构操作实现
///
/// # Safety
/// 必须在单线程环境下调用，且只能调用一次
pub unsafe fn register_arch_ops(ops: &'static dyn ArchOps) {
    let ptr = ops as *const dyn ArchOps;
    // SAFETY: fat pointer 的布局是 (data, vtable)
    let (data, vtable) = unsafe { core::mem::transmute::<*const dyn ArchOps, (usize, usize)>(ptr) };
    ARCH_OPS_DATA.store(data, Ordering::Release);
    ARCH_OPS_VTABLE.store(vtable, Ordering::Release);
}

/// 获取架构操作实例
#[inline]
pub(crate) fn arch_ops() -> &'static dyn ArchOps {
    let data = ARCH_OPS_DATA.load(Ordering::Acquire);
    let vtable = ARCH_OPS_VTABLE.load(Ordering::Acquire);
    if data == 0 {
        panic!("sync: ArchOps not registered, call register_arch_ops first");
    }
    // SAFETY: data 和 vtable 是通过 register_arch_ops 设置的有效指针
    unsafe { &*core::mem::transmute::<(usize, usize), *const dyn ArchOps>((data, vtable)) }
}
