//! 根文件系统启动流程

use lazy_static::lazy_static;
use vfs::{FsError, Vfs};

use crate::config::{DEVFS_DEVICE, RAMDISK_DEVICE, RAMFS_MAX_BYTES};
use crate::{DevFs, RamFs};

lazy_static! {
    /// 内核全局的 VFS 实例
    pub static ref VFS: Vfs = Vfs::new();
}

/// 注册内置驱动并挂载根文件系统
///
/// 依次注册 `ramfs` 与 `devfs`，把内存盘挂到 "/"，再把设备文件系统挂到 "/dev"。
pub fn init_rootfs(vfs: &Vfs) -> Result<(), FsError> {
    vfs.load_fs(RamFs::new(RAMFS_MAX_BYTES))?;
    vfs.load_fs(DevFs::new())?;

    vfs.mount(RAMDISK_DEVICE, "/", "ramfs")?;
    vfs.mount(DEVFS_DEVICE, "/dev", "devfs")?;

    log::info!("fs: rootfs ready ({} mounts)", vfs.mounts().len());
    Ok(())
}
