//! 内核虚拟文件系统层
//!
//! 此 crate 把多个挂载的文件系统驱动统一到一个层次化的路径命名空间和
//! 一套文件句柄抽象之下，包括：
//!
//! - [`Vfs`] - 上下文句柄，所有操作都是它的方法
//! - [`Inode`] / [`InodeOps`] - 内存中的文件系统对象及驱动的节点操作
//! - [`Tnode`] - 目录树中的命名边
//! - [`InodeStore`] - 以 `(设备号, 索引)` 为键的 Inode 缓存
//! - [`Mount`] / [`SuperBlock`] / [`FsDriver`] - 挂载树与驱动注册
//! - [`File`] / [`FileOps`] - 文件句柄层
//! - 路径解析引擎与匿名管道
//!
//! # 引用计数
//!
//! Inode 的引用计数等于它的所有者数量：打开的 [`File`] 加上指向它的 [`Tnode`]。
//! Inode Store 的槽位不计入其中。计数只会在 `unlink`/`rmdir`/`close` 中归零，
//! 归零时 Inode 被回收（移出 Inode Store，释放其子缓存），且只回收一次。

#![no_std]

extern crate alloc;

pub mod config;
pub mod dev;
pub mod error;
pub mod impls;

mod dir;
mod file;
mod inode;
mod mount;
mod path;
mod pipe;
mod store;
mod tnode;
mod vfs;

// Re-export error
pub use error::FsError;

// Re-export dev
pub use dev::{major, makedev, minor};

// Re-export inode
pub use inode::{DevId, FileMode, Inode, InodeDesc, InodeId, InodeOps, InodeType};

// Re-export tnode
pub use tnode::{ROOT_NAME, Tnode};

// Re-export store
pub use store::InodeStore;

// Re-export mount
pub use mount::{FsDriver, Mount, MountInfo, SuperBlock};

// Re-export path
pub use path::{check_name, split_path};

// Re-export file
pub use file::{File, FileOps};

// Re-export vfs
pub use vfs::Vfs;

// Re-export uapi types for convenience
pub use uapi::fcntl::{OpenFlags, SeekWhence};
pub use uapi::fs::{Dirent, Stat};
