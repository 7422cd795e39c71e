//! Inode Store
//!
//! 以 `(设备号, 索引)` 为键的全局 Inode 缓存，保证同一个磁盘对象在内存中
//! 只有一个 [`Inode`]。缓存槽位不计入 Inode 的引用计数：一旦最后一个所有者
//! 离开（`free`），或者调用者在没有建立所有权的情况下归还临时持有（`put`），
//! 槽位即被清除。
//!
//! 槽位本身持有强引用 `Arc<Inode>`，因此必须由 `free`/`put` 显式清除，不会随所有者离开自动失效。

use alloc::sync::Arc;

use hashbrown::HashMap;
use sync::SpinLock;

use crate::{FsError, Inode, InodeDesc, InodeId};

/// 全局 Inode 缓存
pub struct InodeStore {
    slots: SpinLock<HashMap<InodeId, Arc<Inode>>>,
}

impl Default for InodeStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InodeStore {
    /// 创建空缓存
    pub fn new() -> Self {
        Self {
            slots: SpinLock::new(HashMap::new()),
        }
    }

    /// 查找已缓存的 Inode
    pub fn get(&self, id: InodeId) -> Option<Arc<Inode>> {
        self.slots.lock().get(&id).cloned()
    }

    /// 取得 `id` 对应的规范 Inode，不存在时用 `desc` 创建并缓存
    ///
    /// 命中缓存时 `desc` 被丢弃。
    pub fn get_or_create(&self, id: InodeId, desc: InodeDesc) -> Result<Arc<Inode>, FsError> {
        let mut slots = self.slots.lock();
        if let Some(inode) = slots.get(&id) {
            return Ok(inode.clone());
        }
        slots.try_reserve(1)?;
        let inode = Arc::new(Inode::from_desc(id.dev, desc));
        slots.insert(id, inode.clone());
        Ok(inode)
    }

    /// 归还临时持有：Inode 没有任何所有者时清除槽位
    pub fn put(&self, inode: &Arc<Inode>) {
        if inode.ref_count() == 0 {
            self.evict(inode);
        }
    }

    /// 清除槽位（仅当槽位中正是这个 Inode）
    pub(crate) fn evict(&self, inode: &Arc<Inode>) {
        let mut slots = self.slots.lock();
        if slots
            .get(&inode.id())
            .is_some_and(|cached| Arc::ptr_eq(cached, inode))
        {
            slots.remove(&inode.id());
        }
    }

    /// 是否缓存了 `id`
    pub fn contains(&self, id: InodeId) -> bool {
        self.slots.lock().contains_key(&id)
    }

    /// 缓存的 Inode 数量
    pub fn len(&self) -> usize {
        self.slots.lock().len()
    }

    /// 缓存是否为空
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
