//! # 文件系统模块 (FS)
//!
//! 本模块提供具体的文件系统驱动，通过实现 VFS 的 `FsDriver`、`InodeOps` 与
//! `FileOps` trait 与虚拟文件系统层集成，并负责启动时的根文件系统装配。
//!
//! ## 支持的文件系统
//!
//! - **[ramfs]**: 内存文件系统，作为根文件系统
//! - **[devfs]**: 字符设备文件系统，挂载在 `/dev`
//!
//! 匿名管道由 VFS 内部的 pipefs 提供，不在这里注册。

#![no_std]
#![doc = "文件系统实现"]

extern crate alloc;

mod boot;
pub mod config;
pub mod devfs;
pub mod ops;
pub mod ramfs;

pub use boot::{VFS, init_rootfs};
pub use devfs::{DevFs, DevfsNode};
pub use ops::{FsOps, fs_ops, register_fs_ops};
pub use ramfs::{RamFs, RamfsNode};
