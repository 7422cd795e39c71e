//! FS 运行时操作 trait 定义和注册
//!
//! 此模块定义了具体文件系统需要的外部依赖接口，通过 trait 抽象实现与内核其余部分的解耦。
//! 目前只有控制台设备需要：devfs 的 `console` 节点经由这里读写真正的终端。

use core::sync::atomic::{AtomicUsize, Ordering};

/// FS 运行时操作
///
/// 内核需要实现此 trait 并在调用 [`crate::init_rootfs`] 之前注册。
pub trait FsOps: Send + Sync {
    /// 读取一个控制台输入字节，没有输入时返回 `None`
    fn console_getchar(&self) -> Option<u8>;

    /// 输出一个字节到控制台
    fn console_putchar(&self, c: u8);

    /// 输出字符串到控制台
    fn console_write_str(&self, s: &str);
}

// ========== FsOps 注册 ==========

static FS_OPS_DATA: AtomicUsize = AtomicUsize::new(0);
static FS_OPS_VTABLE: AtomicUsize = AtomicUsize::new(0);

/// 注册 FS 操作实现
///
/// # Safety
/// 必须在单线程环境下调用，且只能调用一次
pub unsafe fn register_fs_ops(ops: &'static dyn FsOps) {
    let ptr = ops as *const dyn FsOps;
    // SAFETY: 将 fat pointer 拆分为 data 和 vtable 两部分存储
    let (data, vtable) =
        unsafe { core::mem::transmute::<*const dyn FsOps, (usize, usize)>(ptr) };
    FS_OPS_DATA.store(data, Ordering::Release);
    FS_OPS_VTABLE.store(vtable, Ordering::Release);
}

/// 获取已注册的 FS 操作实现
///
/// # Panics
/// 如果尚未调用 [`register_fs_ops`] 注册实现，则 panic
#[inline]
pub fn fs_ops() -> &'static dyn FsOps {
    let data = FS_OPS_DATA.load(Ordering::Acquire);
    let vtable = FS_OPS_VTABLE.load(Ordering::Acquire);
    if data == 0 {
        #[cfg(test)]
        {
            extern crate test_support;
            return &test_support::mock::fs::MOCK_FS_OPS;
        }
        #[cfg(not(test))]
        panic!("fs: FsOps not registered");
    }
    // SAFETY: 重组 fat pointer
    unsafe { &*core::mem::transmute::<(usize, usize), *const dyn FsOps>((data, vtable)) }
}
