//! VFS 编译期配置常量

/// 单个路径组件的最大长度，与目录项的名字字段一致
pub const NAME_MAX: usize = uapi::fs::NAME_MAX;

/// 匿名管道环形缓冲区容量（字节）
pub const PIPE_CAPACITY: usize = 4096;

/// 匿名设备号使用的主设备号（与 Linux 的 UNNAMED_MAJOR 一致）
///
/// 每个挂载实例以及管道文件系统各占一个次设备号。
pub const ANON_MAJOR: u32 = 0;

/// 文件系统驱动注册表的容量上限
pub const MAX_DRIVERS: usize = 16;
