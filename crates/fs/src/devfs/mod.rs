//! Devfs - 设备文件系统
//!
//! 挂载后提供一个只读的扁平目录，里面是固定的字符设备节点：
//!
//! - `null`、`zero`、`random`、`urandom`：内存设备（主设备号 1）
//! - `console`：控制台（主设备号 5），读写经由 [`crate::FsOps`] 转发到真正的终端

mod devfs;
mod devices;

pub use devfs::{DevFs, DevfsNode};
