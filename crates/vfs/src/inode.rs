//! Inode 抽象层
//!
//! [`Inode`] 是 VFS 内存中的文件系统对象：身份 `(设备号, 索引)`、类型与权限、
//! 长度、显式引用计数、指向父 [`Tnode`] 的反向引用、按需填充的子 Tnode 缓存，
//! 以及挂在它下面的 [`Mount`] 列表。
//!
//! 具体的存储语义由驱动通过 [`InodeOps`] trait 对象提供，VFS 只负责维护
//! 树结构与引用计数。驱动返回的新节点以 [`InodeDesc`] 描述，
//! 由 VFS 经 [`crate::InodeStore`] 规范化为唯一的 `Arc<Inode>`。

use alloc::string::String;
use alloc::sync::{Arc, Weak};
use alloc::vec::Vec;
use core::any::Any;
use core::fmt;
use core::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use sync::SpinLock;
use uapi::fcntl::OpenFlags;
use uapi::fs::Stat;

use crate::{FileOps, FsError, Mount, Tnode};

/// 设备号
pub type DevId = u64;

/// Inode 身份：同一 `(dev, index)` 在内存中只存在一个 [`Inode`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct InodeId {
    /// 所属文件系统实例的设备号
    pub dev: DevId,
    /// 文件系统内的索引号
    pub index: u64,
}

impl InodeId {
    /// 构造 Inode 身份
    pub const fn new(dev: DevId, index: u64) -> Self {
        Self { dev, index }
    }
}

/// 文件类型
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InodeType {
    /// 普通文件
    File,
    /// 目录
    Directory,
    /// 字符设备
    CharDevice,
    /// 命名管道 / 匿名管道
    Fifo,
}

impl InodeType {
    /// 对应的 `S_IFMT` 类型位
    pub fn type_bits(self) -> FileMode {
        match self {
            InodeType::File => FileMode::S_IFREG,
            InodeType::Directory => FileMode::S_IFDIR,
            InodeType::CharDevice => FileMode::S_IFCHR,
            InodeType::Fifo => FileMode::S_IFIFO,
        }
    }
}

bitflags::bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    /// 文件权限和类型（与 POSIX 兼容）
    pub struct FileMode: u32 {
        // 文件类型掩码
        /// 文件类型掩码
        const S_IFMT   = 0o170000;
        /// 普通文件
        const S_IFREG  = 0o100000;
        /// 目录
        const S_IFDIR  = 0o040000;
        /// 字符设备
        const S_IFCHR  = 0o020000;
        /// FIFO
        const S_IFIFO  = 0o010000;

        /// 用户读
        const S_IRUSR  = 0o400;
        /// 用户写
        const S_IWUSR  = 0o200;
        /// 用户执行
        const S_IXUSR  = 0o100;
        /// 组读
        const S_IRGRP  = 0o040;
        /// 组写
        const S_IWGRP  = 0o020;
        /// 组执行
        const S_IXGRP  = 0o010;
        /// 其他读
        const S_IROTH  = 0o004;
        /// 其他写
        const S_IWOTH  = 0o002;
        /// 其他执行
        const S_IXOTH  = 0o001;

        /// Set UID
        const S_ISUID  = 0o4000;
        /// Set GID
        const S_ISGID  = 0o2000;
        /// Sticky bit
        const S_ISVTX  = 0o1000;
    }
}

impl FileMode {
    /// 全部权限位（含 suid/sgid/sticky）
    pub const PERM_MASK: u32 = 0o7777;

    /// 只保留权限位
    pub fn permissions(self) -> FileMode {
        FileMode::from_bits_truncate(self.bits() & Self::PERM_MASK)
    }

    /// 只保留类型位
    pub fn file_type(self) -> FileMode {
        self & FileMode::S_IFMT
    }
}

/// 驱动产生的新节点描述
///
/// 由 `lookup`/`enumerate`/`create`/`mkdir`/`mount` 返回，VFS 据此在
/// Inode Store 中取得或创建规范 Inode。若该 `(dev, index)` 已在缓存中，
/// 描述里的 `ops` 被丢弃，沿用已缓存的 Inode。
pub struct InodeDesc {
    /// 文件系统内的索引号
    pub index: u64,
    /// 文件类型
    pub kind: InodeType,
    /// 权限位（类型位由 `kind` 决定）
    pub mode: FileMode,
    /// 初始字节长度
    pub size: usize,
    /// 驱动的节点操作对象
    pub ops: Arc<dyn InodeOps>,
}

impl fmt::Debug for InodeDesc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InodeDesc")
            .field("index", &self.index)
            .field("kind", &self.kind)
            .field("mode", &self.mode)
            .field("size", &self.size)
            .finish()
    }
}

/// 驱动提供的节点操作（inode-operations）
///
/// 每个方法都有默认实现，驱动只覆盖自己支持的能力：
/// 缺失的变更类操作返回 [`FsError::InvalidArgument`]，
/// `chmod` 默认 [`FsError::PermissionDenied`]，`ioctl` 默认 [`FsError::NotSupported`]。
pub trait InodeOps: Send + Sync + Any {
    /// 在目录中查找名为 `name` 的子项，不存在时返回 `Ok(None)`
    fn lookup(&self, _name: &str) -> Result<Option<InodeDesc>, FsError> {
        Ok(None)
    }

    /// 完整枚举目录（即不带名字的 lookup）
    ///
    /// 可以包含 "." 与 ".."，VFS 不会缓存这两项。
    fn enumerate(&self) -> Result<Vec<(String, InodeDesc)>, FsError> {
        Ok(Vec::new())
    }

    /// 在目录中创建普通文件
    fn create(&self, _name: &str, _mode: FileMode) -> Result<InodeDesc, FsError> {
        Err(FsError::InvalidArgument)
    }

    /// 在目录中创建子目录
    fn mkdir(&self, _name: &str, _mode: FileMode) -> Result<InodeDesc, FsError> {
        Err(FsError::InvalidArgument)
    }

    /// 删除本目录下的非目录项 `target`
    fn unlink(&self, _target: &Tnode) -> Result<(), FsError> {
        Err(FsError::InvalidArgument)
    }

    /// 删除本目录下的空子目录 `target`
    fn rmdir(&self, _target: &Tnode) -> Result<(), FsError> {
        Err(FsError::InvalidArgument)
    }

    /// 修改权限；`mode` 已由 VFS 合成为“原类型位 | 新权限位”
    fn chmod(&self, _mode: FileMode) -> Result<(), FsError> {
        Err(FsError::PermissionDenied)
    }

    /// 打开节点，返回文件级操作对象
    ///
    /// 返回 `None` 表示不提供文件操作：目录将使用 VFS 默认的目录读取器，
    /// 其他类型的读写返回 [`FsError::InvalidArgument`]。
    fn open(&self, _inode: &Inode, _flags: OpenFlags) -> Result<Option<Arc<dyn FileOps>>, FsError> {
        Ok(None)
    }

    /// 补充 VFS 已填好的元数据（例如设备号）
    fn stat(&self, _inode: &Inode, _stat: &mut Stat) {}

    /// 设备特定的控制操作
    fn ioctl(&self, _request: u32, _arg: usize) -> Result<isize, FsError> {
        Err(FsError::NotSupported)
    }

    /// 向下转型为 &dyn Any
    fn as_any(&self) -> &dyn Any;
}

impl dyn InodeOps {
    /// 尝试获取具体驱动类型的引用
    pub fn downcast_ref<T: InodeOps>(&self) -> Option<&T> {
        self.as_any().downcast_ref::<T>()
    }
}

/// 目录的子 Tnode 缓存
#[derive(Default)]
pub(crate) struct ChildCache {
    /// 已知的子项，按发现顺序排列
    pub(crate) entries: Vec<Arc<Tnode>>,
    /// 是否已经做过完整枚举；为真时缓存即为权威结果
    pub(crate) complete: bool,
}

impl ChildCache {
    pub(crate) fn find(&self, name: &str) -> Option<Arc<Tnode>> {
        self.entries.iter().find(|t| t.name() == name).cloned()
    }
}

/// VFS 内存中的 Inode
pub struct Inode {
    id: InodeId,
    kind: InodeType,
    mode: SpinLock<FileMode>,
    size: AtomicUsize,
    /// 所有者数量：打开的 File 加上引用它的 Tnode
    refs: SpinLock<usize>,
    freed: AtomicBool,
    /// 父目录的 Tnode；全局根指向自己的 Tnode
    parent: SpinLock<Weak<Tnode>>,
    children: SpinLock<ChildCache>,
    mounts: SpinLock<Vec<Arc<Mount>>>,
    ops: Arc<dyn InodeOps>,
}

impl fmt::Debug for Inode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Inode")
            .field("id", &self.id)
            .field("kind", &self.kind)
            .field("mode", &self.mode())
            .field("size", &self.size())
            .field("refs", &self.ref_count())
            .finish()
    }
}

impl Inode {
    /// 由驱动描述构造 Inode（引用计数为 0，尚未挂入树）
    pub(crate) fn from_desc(dev: DevId, desc: InodeDesc) -> Self {
        let mode = desc.mode.permissions() | desc.kind.type_bits();
        Self {
            id: InodeId::new(dev, desc.index),
            kind: desc.kind,
            mode: SpinLock::new(mode),
            size: AtomicUsize::new(desc.size),
            refs: SpinLock::new(0),
            freed: AtomicBool::new(false),
            parent: SpinLock::new(Weak::new()),
            children: SpinLock::new(ChildCache::default()),
            mounts: SpinLock::new(Vec::new()),
            ops: desc.ops,
        }
    }

    /// Inode 身份
    pub fn id(&self) -> InodeId {
        self.id
    }

    /// 文件类型
    pub fn kind(&self) -> InodeType {
        self.kind
    }

    /// 是否为目录
    pub fn is_dir(&self) -> bool {
        self.kind == InodeType::Directory
    }

    /// 类型位与权限位
    pub fn mode(&self) -> FileMode {
        *self.mode.lock()
    }

    pub(crate) fn set_mode(&self, mode: FileMode) {
        *self.mode.lock() = mode;
    }

    /// 字节长度
    pub fn size(&self) -> usize {
        self.size.load(Ordering::Acquire)
    }

    pub(crate) fn set_size(&self, size: usize) {
        self.size.store(size, Ordering::Release);
    }

    /// 写入越过末尾时扩展长度
    pub(crate) fn grow_to(&self, end: usize) {
        self.size.fetch_max(end, Ordering::AcqRel);
    }

    /// 驱动操作对象
    pub fn ops(&self) -> &Arc<dyn InodeOps> {
        &self.ops
    }

    /// 当前引用计数
    pub fn ref_count(&self) -> usize {
        *self.refs.lock()
    }

    /// 是否已被释放（引用计数曾经归零）
    pub fn is_freed(&self) -> bool {
        self.freed.load(Ordering::Acquire)
    }

    pub(crate) fn inc_ref(&self) -> usize {
        let mut refs = self.refs.lock();
        *refs += 1;
        *refs
    }

    /// 递减引用计数并返回剩余值
    pub(crate) fn dec_ref(&self) -> usize {
        let mut refs = self.refs.lock();
        if *refs == 0 {
            log::error!("vfs: refcount underflow on inode {:?}", self.id);
            return 0;
        }
        *refs -= 1;
        *refs
    }

    /// 标记为已释放；只有第一次调用返回真
    pub(crate) fn mark_freed(&self) -> bool {
        self.freed
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    /// 父目录的 Tnode
    pub fn parent(&self) -> Option<Arc<Tnode>> {
        self.parent.lock().upgrade()
    }

    pub(crate) fn set_parent(&self, parent: Weak<Tnode>) {
        *self.parent.lock() = parent;
    }

    pub(crate) fn children(&self) -> &SpinLock<ChildCache> {
        &self.children
    }

    /// 已缓存的子 Tnode 快照
    pub fn cached_children(&self) -> Vec<Arc<Tnode>> {
        self.children.lock().entries.clone()
    }

    /// 挂在本 Inode 下的挂载点快照
    pub fn mounts(&self) -> Vec<Arc<Mount>> {
        self.mounts.lock().clone()
    }

    /// 按名字查找挂在本 Inode 下的挂载点（线性扫描，首个匹配）
    pub fn find_mount(&self, name: &str) -> Option<Arc<Mount>> {
        self.mounts.lock().iter().find(|m| m.name() == name).cloned()
    }

    pub(crate) fn has_mounts(&self) -> bool {
        !self.mounts.lock().is_empty()
    }

    /// 追加挂载点，同名时返回 [`FsError::AlreadyExists`]
    pub(crate) fn attach_mount(&self, mount: Arc<Mount>) -> Result<(), FsError> {
        let mut mounts = self.mounts.lock();
        if mounts.iter().any(|m| m.name() == mount.name()) {
            return Err(FsError::AlreadyExists);
        }
        mounts.try_reserve(1)?;
        mounts.push(mount);
        Ok(())
    }
}
