//! 启动时根文件系统的配置

/// 根内存盘的容量上限（字节）
pub const RAMFS_MAX_BYTES: usize = 16 * 1024 * 1024;

/// 根内存盘的设备名
pub const RAMDISK_DEVICE: &str = "ramdisk0";

/// devfs 的设备名
pub const DEVFS_DEVICE: &str = "devfs";
