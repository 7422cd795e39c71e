//! Ramfs - 内存文件系统
//!
//! 该模块提供一个**完全驻留在内存中的文件系统**，作为启动时的根文件系统。
//! 每次挂载都得到一棵独立的树；容量上限由 [`RamFs::new`] 的参数决定。

mod inode;
mod ramfs;

pub use inode::RamfsNode;
pub use ramfs::RamFs;
