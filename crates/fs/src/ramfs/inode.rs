//! Ramfs 节点实现
//!
//! [`RamfsNode`] 同时充当驱动侧的目录树节点和 VFS 的 [`InodeOps`]：
//! 目录用 `BTreeMap` 按名字保存子节点，普通文件的内容是一段连续的字节数组。

use alloc::collections::BTreeMap;
use alloc::string::String;
use alloc::sync::{Arc, Weak};
use alloc::vec::Vec;
use core::any::Any;

use sync::SpinLock;
use vfs::{
    FileMode, FileOps, FsError, Inode, InodeDesc, InodeOps, InodeType, OpenFlags, Stat, Tnode,
};

/// Ramfs 统计信息（同一挂载实例内共享）
#[derive(Debug, Clone)]
pub struct RamfsStats {
    /// 文件内容占用的总字节数
    pub used_bytes: usize,

    /// 最大允许的字节数（0 表示无限制）
    pub max_bytes: usize,

    /// 下一个节点索引
    pub next_index: u64,
}

impl RamfsStats {
    pub(crate) fn new(max_bytes: usize) -> Self {
        Self {
            used_bytes: 0,
            max_bytes,
            next_index: 1,
        }
    }
}

/// Ramfs 节点
pub struct RamfsNode {
    index: u64,
    kind: InodeType,

    /// 权限位（不含类型位）
    mode: SpinLock<FileMode>,

    /// 文件内容（仅对普通文件有效）
    data: SpinLock<Vec<u8>>,

    /// 父目录（弱引用，避免循环引用）
    parent: Weak<RamfsNode>,

    /// 子节点（仅对目录有效）
    children: SpinLock<BTreeMap<String, Arc<RamfsNode>>>,

    /// 统计信息（共享引用）
    stats: Arc<SpinLock<RamfsStats>>,

    /// 指向自身的弱引用
    self_ref: Weak<RamfsNode>,
}

impl RamfsNode {
    fn new(
        index: u64,
        kind: InodeType,
        mode: FileMode,
        parent: Weak<RamfsNode>,
        stats: Arc<SpinLock<RamfsStats>>,
    ) -> Arc<Self> {
        Arc::new_cyclic(|me| Self {
            index,
            kind,
            mode: SpinLock::new(mode.permissions()),
            data: SpinLock::new(Vec::new()),
            parent,
            children: SpinLock::new(BTreeMap::new()),
            stats,
            self_ref: me.clone(),
        })
    }

    /// 创建根目录
    pub(crate) fn new_root(stats: Arc<SpinLock<RamfsStats>>) -> Arc<Self> {
        let index = Self::alloc_index(&stats);
        Self::new(
            index,
            InodeType::Directory,
            FileMode::from_bits_truncate(0o755),
            Weak::new(),
            stats,
        )
    }

    fn alloc_index(stats: &SpinLock<RamfsStats>) -> u64 {
        let mut stats = stats.lock();
        let index = stats.next_index;
        stats.next_index += 1;
        index
    }

    /// 节点索引
    pub fn index(&self) -> u64 {
        self.index
    }

    /// 文件内容长度
    pub fn len(&self) -> usize {
        self.data.lock().len()
    }

    /// 文件内容是否为空
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// 生成交给 VFS 的节点描述
    pub(crate) fn desc(self: &Arc<Self>) -> InodeDesc {
        InodeDesc {
            index: self.index,
            kind: self.kind,
            mode: *self.mode.lock(),
            size: self.len(),
            ops: self.clone(),
        }
    }

    fn this(&self) -> Result<Arc<Self>, FsError> {
        self.self_ref.upgrade().ok_or(FsError::IoError)
    }

    fn reserve_bytes(&self, bytes: usize) -> Result<(), FsError> {
        let mut stats = self.stats.lock();
        let used = stats.used_bytes.checked_add(bytes).ok_or(FsError::NoSpace)?;
        if stats.max_bytes != 0 && used > stats.max_bytes {
            return Err(FsError::NoSpace);
        }
        stats.used_bytes = used;
        Ok(())
    }

    fn release_bytes(&self, bytes: usize) {
        let mut stats = self.stats.lock();
        stats.used_bytes = stats.used_bytes.saturating_sub(bytes);
    }

    /// 扩展内容到 `len` 字节，新增部分补零
    fn grow(&self, data: &mut Vec<u8>, len: usize) -> Result<(), FsError> {
        let extra = len - data.len();
        self.reserve_bytes(extra)?;
        if let Err(e) = data.try_reserve(extra) {
            self.release_bytes(extra);
            return Err(e.into());
        }
        data.resize(len, 0);
        Ok(())
    }

    fn add_child(&self, name: &str, kind: InodeType, mode: FileMode) -> Result<InodeDesc, FsError> {
        if self.kind != InodeType::Directory {
            return Err(FsError::NotDirectory);
        }

        let mut children = self.children.lock();
        if children.contains_key(name) {
            return Err(FsError::AlreadyExists);
        }

        let index = Self::alloc_index(&self.stats);
        let node = RamfsNode::new(index, kind, mode, self.self_ref.clone(), self.stats.clone());
        children.insert(String::from(name), node.clone());
        drop(children);

        Ok(node.desc())
    }

    /// 从 `offset` 处读取，越过末尾返回 0
    pub fn read_at(&self, offset: usize, buf: &mut [u8]) -> Result<usize, FsError> {
        if self.kind != InodeType::File {
            return Err(FsError::IsDirectory);
        }

        let data = self.data.lock();
        if offset >= data.len() {
            return Ok(0);
        }
        let n = buf.len().min(data.len() - offset);
        buf[..n].copy_from_slice(&data[offset..offset + n]);
        Ok(n)
    }

    /// 在 `offset` 处写入；写到末尾之外时先补零扩展
    pub fn write_at(&self, offset: usize, buf: &[u8]) -> Result<usize, FsError> {
        if self.kind != InodeType::File {
            return Err(FsError::IsDirectory);
        }

        let end = offset.checked_add(buf.len()).ok_or(FsError::InvalidArgument)?;
        let mut data = self.data.lock();
        if end > data.len() {
            self.grow(&mut data, end)?;
        }
        data[offset..end].copy_from_slice(buf);
        Ok(buf.len())
    }

    /// 原生截断
    pub fn truncate_to(&self, len: usize) -> Result<(), FsError> {
        if self.kind != InodeType::File {
            return Err(FsError::IsDirectory);
        }

        let mut data = self.data.lock();
        let old = data.len();
        if len > old {
            self.grow(&mut data, len)?;
        } else {
            data.truncate(len);
            data.shrink_to_fit();
            self.release_bytes(old - len);
        }
        Ok(())
    }

    fn remove_child(&self, target: &Tnode, want_dir: bool) -> Result<Arc<RamfsNode>, FsError> {
        let mut children = self.children.lock();
        let child = children.get(target.name()).ok_or(FsError::NotFound)?;

        match (want_dir, child.kind == InodeType::Directory) {
            (false, true) => return Err(FsError::IsDirectory),
            (true, false) => return Err(FsError::NotDirectory),
            (true, true) if !child.children.lock().is_empty() => {
                return Err(FsError::DirectoryNotEmpty);
            }
            _ => {}
        }

        children.remove(target.name()).ok_or(FsError::NotFound)
    }
}

impl Drop for RamfsNode {
    fn drop(&mut self) {
        // 内容随最后一个引用一起释放，已删除但仍打开的文件继续占用容量
        let len = self.data.get_mut().len();
        if len != 0 {
            self.release_bytes(len);
        }
    }
}

impl InodeOps for RamfsNode {
    fn lookup(&self, name: &str) -> Result<Option<InodeDesc>, FsError> {
        if self.kind != InodeType::Directory {
            return Err(FsError::NotDirectory);
        }
        let child = self.children.lock().get(name).cloned();
        Ok(child.map(|c| c.desc()))
    }

    fn enumerate(&self) -> Result<Vec<(String, InodeDesc)>, FsError> {
        if self.kind != InodeType::Directory {
            return Err(FsError::NotDirectory);
        }

        let this = self.this()?;
        let parent = self.parent.upgrade().unwrap_or_else(|| this.clone());
        let children: Vec<(String, Arc<RamfsNode>)> = self
            .children
            .lock()
            .iter()
            .map(|(name, child)| (name.clone(), child.clone()))
            .collect();

        let mut entries = Vec::new();
        entries.try_reserve(children.len() + 2)?;
        entries.push((String::from("."), this.desc()));
        entries.push((String::from(".."), parent.desc()));
        for (name, child) in children {
            entries.push((name, child.desc()));
        }
        Ok(entries)
    }

    fn create(&self, name: &str, mode: FileMode) -> Result<InodeDesc, FsError> {
        self.add_child(name, InodeType::File, mode)
    }

    fn mkdir(&self, name: &str, mode: FileMode) -> Result<InodeDesc, FsError> {
        self.add_child(name, InodeType::Directory, mode)
    }

    fn unlink(&self, target: &Tnode) -> Result<(), FsError> {
        self.remove_child(target, false).map(|_| ())
    }

    fn rmdir(&self, target: &Tnode) -> Result<(), FsError> {
        self.remove_child(target, true).map(|_| ())
    }

    fn chmod(&self, mode: FileMode) -> Result<(), FsError> {
        *self.mode.lock() = mode.permissions();
        Ok(())
    }

    fn open(&self, _inode: &Inode, _flags: OpenFlags) -> Result<Option<Arc<dyn FileOps>>, FsError> {
        if self.kind == InodeType::Directory {
            return Ok(None);
        }
        Ok(Some(Arc::new(RamfsFile { node: self.this()? })))
    }

    fn stat(&self, _inode: &Inode, stat: &mut Stat) {
        if self.kind == InodeType::Directory {
            let subdirs = self
                .children
                .lock()
                .values()
                .filter(|c| c.kind == InodeType::Directory)
                .count();
            stat.st_nlink = 2 + subdirs as u32;
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// 打开的 ramfs 普通文件
struct RamfsFile {
    node: Arc<RamfsNode>,
}

impl FileOps for RamfsFile {
    fn read(&self, offset: usize, buf: &mut [u8]) -> Result<usize, FsError> {
        self.node.read_at(offset, buf)
    }

    fn write(&self, offset: usize, buf: &[u8]) -> Result<usize, FsError> {
        self.node.write_at(offset, buf)
    }

    fn truncate(&self, len: usize) -> Result<(), FsError> {
        self.node.truncate_to(len)
    }
}
