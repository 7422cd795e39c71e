//! VFS 上下文
//!
//! [`Vfs`] 持有驱动注册表、全局根挂载、Inode Store 以及匿名管道文件系统。
//! 所有对外操作都是它的方法，分散在 `path`、`mount`、`file`、`dir`、`pipe`
//! 各模块的 `impl Vfs` 块中。内核使用 `fs` crate 中的全局实例，测试各自构造。

use alloc::sync::Arc;
use alloc::vec::Vec;
use core::sync::atomic::{AtomicU32, Ordering};

use sync::RwLock;

use crate::config::ANON_MAJOR;
use crate::dev::makedev;
use crate::impls::PipeFs;
use crate::{DevId, FsDriver, FsError, Inode, InodeId, InodeStore, Mount, Tnode};

/// VFS 上下文句柄
pub struct Vfs {
    pub(crate) drivers: RwLock<Vec<Arc<dyn FsDriver>>>,
    /// 全局根；名字为 "/" 的挂载记录
    pub(crate) root: RwLock<Option<Arc<Mount>>>,
    pub(crate) store: InodeStore,
    next_minor: AtomicU32,
    pub(crate) pipes: PipeFs,
}

impl Default for Vfs {
    fn default() -> Self {
        Self::new()
    }
}

impl Vfs {
    /// 创建空的 VFS（没有驱动，也没有根）
    pub fn new() -> Self {
        // 次设备号 1 留给管道文件系统
        let pipe_dev = makedev(ANON_MAJOR, 1);
        Self {
            drivers: RwLock::new(Vec::new()),
            root: RwLock::new(None),
            store: InodeStore::new(),
            next_minor: AtomicU32::new(2),
            pipes: PipeFs::new(pipe_dev),
        }
    }

    /// 全局根 Tnode
    pub fn root(&self) -> Result<Arc<Tnode>, FsError> {
        self.root
            .read()
            .as_ref()
            .map(|m| m.root().clone())
            .ok_or(FsError::NotFound)
    }

    /// 全局根挂载记录
    pub fn root_mount(&self) -> Option<Arc<Mount>> {
        self.root.read().clone()
    }

    /// Inode Store
    pub fn inode_store(&self) -> &InodeStore {
        &self.store
    }

    /// 分配一个匿名设备号
    pub(crate) fn alloc_dev(&self) -> DevId {
        makedev(ANON_MAJOR, self.next_minor.fetch_add(1, Ordering::Relaxed))
    }

    /// 由文件句柄记录的身份找回 Inode
    pub(crate) fn inode_of(&self, id: InodeId) -> Result<Arc<Inode>, FsError> {
        self.store.get(id).ok_or(FsError::BadFileDescriptor)
    }

    /// 释放一个所有者，计数归零时回收 Inode
    pub(crate) fn release(&self, inode: &Arc<Inode>) {
        if inode.dec_ref() == 0 {
            self.free(inode);
        }
    }

    /// 回收 Inode：移出 Inode Store 并释放其缓存的子 Tnode
    fn free(&self, inode: &Arc<Inode>) {
        if !inode.mark_freed() {
            log::warn!("vfs: inode {:?} freed twice", inode.id());
            return;
        }
        self.store.evict(inode);
        let orphans = {
            let mut cache = inode.children().lock();
            cache.complete = false;
            core::mem::take(&mut cache.entries)
        };
        for child in orphans {
            self.release(child.inode());
        }
        log::debug!("vfs: freed inode {:?}", inode.id());
    }

    /// 找到目录自身的 Tnode
    ///
    /// 依次检查：全局根的自引用、父目录的子缓存、父目录下的挂载点
    /// （以及根切换后被降级的旧根）。
    pub(crate) fn tnode_of(&self, inode: &Arc<Inode>) -> Result<Arc<Tnode>, FsError> {
        let parent = inode.parent().ok_or(FsError::NotFound)?;
        if Arc::ptr_eq(parent.inode(), inode) {
            return Ok(parent);
        }
        let dir = parent.inode();
        if let Some(tnode) = dir
            .children()
            .lock()
            .entries
            .iter()
            .find(|t| Arc::ptr_eq(t.inode(), inode))
            .cloned()
        {
            return Ok(tnode);
        }
        dir.mounts()
            .into_iter()
            .map(|m| m.root().clone())
            .find(|t| Arc::ptr_eq(t.inode(), inode))
            .ok_or(FsError::NotFound)
    }
}
