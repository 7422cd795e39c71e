//! 文件句柄层
//!
//! [`File`] 是一次 open 产生的会话：读写位置、由访问模式得到的读写能力、
//! 自己的引用计数（`dup` 增加），以及驱动在 `open` 时给出的 [`FileOps`]。
//! File 不直接持有 Inode，而是记住 `(dev, index)`，需要时回 Inode Store 查找；
//! Inode 的存活由 open 时增加的引用计数保证。

use alloc::sync::Arc;
use alloc::vec::Vec;
use core::fmt;

use sync::SpinLock;
use uapi::fcntl::{OpenFlags, SeekWhence};
use uapi::fs::Dirent;

use crate::{FileMode, FsError, Inode, InodeId, InodeType, Vfs};

/// 驱动提供的文件级操作（file-operations）
///
/// `offset` 是调用时 File 的读写位置；流式设备可以忽略它。
pub trait FileOps: Send + Sync {
    /// 从 `offset` 处读取
    fn read(&self, _offset: usize, _buf: &mut [u8]) -> Result<usize, FsError> {
        Err(FsError::InvalidArgument)
    }

    /// 在 `offset` 处写入
    fn write(&self, _offset: usize, _buf: &[u8]) -> Result<usize, FsError> {
        Err(FsError::InvalidArgument)
    }

    /// 原生截断；返回 [`FsError::NotSupported`] 时 VFS 使用通用的读-补零-重写实现
    fn truncate(&self, _len: usize) -> Result<(), FsError> {
        Err(FsError::NotSupported)
    }

    /// 最后一个引用关闭时调用
    fn close(&self) {}

    /// `clone_file` 复制句柄时调用，用于端点计数等簿记
    fn on_clone(&self) -> Result<(), FsError> {
        Ok(())
    }

    /// 设备特定的控制操作
    fn ioctl(&self, _request: u32, _arg: usize) -> Result<isize, FsError> {
        Err(FsError::NotSupported)
    }
}

struct FileState {
    pos: usize,
    refs: usize,
}

/// 打开的文件
pub struct File {
    id: InodeId,
    flags: OpenFlags,
    state: SpinLock<FileState>,
    ops: Option<Arc<dyn FileOps>>,
}

impl fmt::Debug for File {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock();
        f.debug_struct("File")
            .field("inode", &self.id)
            .field("flags", &self.flags)
            .field("pos", &state.pos)
            .field("refs", &state.refs)
            .finish()
    }
}

impl File {
    fn new(id: InodeId, flags: OpenFlags, pos: usize, ops: Option<Arc<dyn FileOps>>) -> Self {
        Self {
            id,
            flags,
            state: SpinLock::new(FileState { pos, refs: 1 }),
            ops,
        }
    }

    /// 所指 Inode 的身份
    pub fn inode_id(&self) -> InodeId {
        self.id
    }

    /// 打开标志
    pub fn flags(&self) -> OpenFlags {
        self.flags
    }

    /// 是否可读
    pub fn readable(&self) -> bool {
        self.flags.readable()
    }

    /// 是否可写
    pub fn writable(&self) -> bool {
        self.flags.writable()
    }

    /// 当前读写位置
    pub fn position(&self) -> usize {
        self.state.lock().pos
    }

    /// 句柄引用计数
    pub fn ref_count(&self) -> usize {
        self.state.lock().refs
    }

    /// 是否已经完全关闭
    pub fn is_closed(&self) -> bool {
        self.ref_count() == 0
    }

    /// 读出位置，句柄已关闭时失败
    fn live_pos(&self) -> Result<usize, FsError> {
        let state = self.state.lock();
        if state.refs == 0 {
            return Err(FsError::BadFileDescriptor);
        }
        Ok(state.pos)
    }

    fn set_pos(&self, pos: usize) {
        self.state.lock().pos = pos;
    }
}

impl Vfs {
    /// 按路径打开文件
    ///
    /// `mode` 只在 `O_CREAT` 创建新文件时使用。
    pub fn open(&self, path: &str, flags: OpenFlags, mode: FileMode) -> Result<Arc<File>, FsError> {
        if !flags.is_valid_access() {
            return Err(FsError::InvalidArgument);
        }

        let tnode = match self.resolve(path) {
            Ok(tnode) => {
                if flags.contains(OpenFlags::O_CREAT | OpenFlags::O_EXCL) {
                    return Err(FsError::AlreadyExists);
                }
                tnode
            }
            Err(FsError::NotFound) if flags.contains(OpenFlags::O_CREAT) => {
                self.create(path, mode)?
            }
            Err(e) => return Err(e),
        };

        if flags.contains(OpenFlags::O_DIRECTORY) && !tnode.inode().is_dir() {
            return Err(FsError::NotDirectory);
        }
        self.open_inode(tnode.inode(), flags)
    }

    /// 打开一个已解析的 Inode
    pub fn open_inode(&self, inode: &Arc<Inode>, flags: OpenFlags) -> Result<Arc<File>, FsError> {
        if inode.is_dir() && flags.writable() {
            return Err(FsError::IsDirectory);
        }

        let ops = match inode.ops().open(inode, flags) {
            Ok(ops) => ops,
            Err(e) => {
                self.store.put(inode);
                return Err(e);
            }
        };
        inode.inc_ref();
        let pos = if flags.contains(OpenFlags::O_APPEND) {
            inode.size()
        } else {
            0
        };
        let file = Arc::new(File::new(inode.id(), flags, pos, ops));
        self.store.put(inode);

        if flags.contains(OpenFlags::O_TRUNC) && flags.writable() && inode.kind() == InodeType::File {
            if let Err(e) = self.truncate(&file, 0) {
                self.close(&file)?;
                return Err(e);
            }
        }
        Ok(file)
    }

    /// 从当前位置读取
    ///
    /// 普通文件的读取不会越过 Inode 的长度。没有驱动文件操作的目录
    /// 使用默认的目录读取器，每次返回一条 [`Dirent`]。
    pub fn read(&self, file: &File, buf: &mut [u8]) -> Result<usize, FsError> {
        let pos = file.live_pos()?;
        if !file.readable() {
            return Err(FsError::BadFileDescriptor);
        }
        let inode = self.inode_of(file.id)?;

        let Some(ops) = &file.ops else {
            if inode.is_dir() {
                return self.read_dir_entry(file, &inode, pos, buf);
            }
            return Err(FsError::InvalidArgument);
        };

        let buf = if inode.kind() == InodeType::File {
            let avail = inode.size().saturating_sub(pos);
            let len = buf.len().min(avail);
            &mut buf[..len]
        } else {
            buf
        };
        let n = ops.read(pos, buf)?;
        file.set_pos(pos + n);
        Ok(n)
    }

    /// 在当前位置写入（`O_APPEND` 时先移到末尾）
    pub fn write(&self, file: &File, buf: &[u8]) -> Result<usize, FsError> {
        let mut pos = file.live_pos()?;
        if !file.writable() {
            return Err(FsError::BadFileDescriptor);
        }
        let inode = self.inode_of(file.id)?;
        let ops = file.ops.as_ref().ok_or(FsError::InvalidArgument)?;

        let regular = inode.kind() == InodeType::File;
        if regular && file.flags.contains(OpenFlags::O_APPEND) {
            pos = inode.size();
        }
        let n = ops.write(pos, buf)?;
        if regular {
            inode.grow_to(pos + n);
        }
        file.set_pos(pos + n);
        Ok(n)
    }

    /// 移动读写位置，结果必须落在 `0..=长度` 之内
    pub fn seek(&self, file: &File, offset: isize, whence: SeekWhence) -> Result<usize, FsError> {
        let pos = file.live_pos()?;
        let inode = self.inode_of(file.id)?;
        let size = inode.size();
        let base = match whence {
            SeekWhence::Set => 0,
            SeekWhence::Cur => pos,
            SeekWhence::End => size,
        };
        let new_pos = base
            .checked_add_signed(offset)
            .ok_or(FsError::InvalidArgument)?;
        if new_pos > size {
            return Err(FsError::InvalidArgument);
        }
        file.set_pos(new_pos);
        Ok(new_pos)
    }

    /// 关闭一个引用；最后一个引用关闭时调用驱动 `close` 并释放 Inode
    pub fn close(&self, file: &File) -> Result<(), FsError> {
        let last = {
            let mut state = file.state.lock();
            if state.refs == 0 {
                return Err(FsError::BadFileDescriptor);
            }
            state.refs -= 1;
            state.refs == 0
        };
        if !last {
            return Ok(());
        }

        if let Some(ops) = &file.ops {
            ops.close();
        }
        let inode = self.inode_of(file.id)?;
        self.release(&inode);
        Ok(())
    }

    /// 复制描述符：同一个 File，引用计数加一
    pub fn dup(&self, file: &Arc<File>) -> Result<Arc<File>, FsError> {
        let mut state = file.state.lock();
        if state.refs == 0 {
            return Err(FsError::BadFileDescriptor);
        }
        state.refs += 1;
        drop(state);
        Ok(file.clone())
    }

    /// 复制整个句柄（fork 时复制描述符表）
    ///
    /// 新 File 拷贝位置与能力，Inode 引用计数加一，驱动的 `on_clone` 负责自身簿记。
    pub fn clone_file(&self, file: &File) -> Result<Arc<File>, FsError> {
        let pos = file.live_pos()?;
        let inode = self.inode_of(file.id)?;
        if let Some(ops) = &file.ops {
            ops.on_clone()?;
        }
        inode.inc_ref();
        Ok(Arc::new(File::new(file.id, file.flags, pos, file.ops.clone())))
    }

    /// 截断或扩展文件到 `len` 字节，不改变读写位置
    pub fn truncate(&self, file: &File, len: usize) -> Result<(), FsError> {
        file.live_pos()?;
        if !file.writable() {
            return Err(FsError::InvalidArgument);
        }
        let inode = self.inode_of(file.id)?;
        if inode.is_dir() {
            return Err(FsError::IsDirectory);
        }
        // 管道与字符设备是流，没有长度可改
        if inode.kind() != InodeType::File {
            return Err(FsError::InvalidArgument);
        }
        let ops = file.ops.as_ref().ok_or(FsError::InvalidArgument)?;

        match ops.truncate(len) {
            Ok(()) => {}
            Err(FsError::NotSupported) => truncate_by_rewrite(&**ops, &inode, len)?,
            Err(e) => return Err(e),
        }
        inode.set_size(len);
        Ok(())
    }

    /// 先交给文件操作，不支持时再交给节点操作
    pub fn ioctl(&self, file: &File, request: u32, arg: usize) -> Result<isize, FsError> {
        file.live_pos()?;
        if let Some(ops) = &file.ops {
            match ops.ioctl(request, arg) {
                Err(FsError::NotSupported) => {}
                result => return result,
            }
        }
        let inode = self.inode_of(file.id)?;
        inode.ops().ioctl(request, arg)
    }

    /// 默认目录读取器
    ///
    /// 位置是游标：0 为 "."，1 为 ".."，其后是缓存的子项，最后是挂载点。
    fn read_dir_entry(
        &self,
        file: &File,
        inode: &Arc<Inode>,
        pos: usize,
        buf: &mut [u8],
    ) -> Result<usize, FsError> {
        if buf.len() < Dirent::SIZE {
            return Err(FsError::InvalidArgument);
        }

        let id = inode.id();
        let entry = match pos {
            0 => Dirent::new(id.dev, id.index, ".").ok_or(FsError::NameTooLong)?,
            1 => {
                let parent = inode.parent().ok_or(FsError::NotFound)?;
                let pid = parent.inode().id();
                Dirent::new(pid.dev, pid.index, "..").ok_or(FsError::NameTooLong)?
            }
            n => {
                let dir = self.tnode_of(inode)?;
                self.populate(&dir)?;
                let children = inode.cached_children();
                let k = n - 2;
                if let Some(child) = children.get(k) {
                    let cid = child.inode().id();
                    Dirent::new(cid.dev, cid.index, child.name())
                        .ok_or(FsError::NameTooLong)?
                } else {
                    let mounts = inode.mounts();
                    let mount = mounts.get(k - children.len()).ok_or(FsError::NotFound)?;
                    let mid = mount.root().inode().id();
                    Dirent::new(mid.dev, mid.index, mount.name())
                        .ok_or(FsError::NameTooLong)?
                }
            }
        };

        let n = entry.write_to(buf).ok_or(FsError::InvalidArgument)?;
        file.set_pos(pos + 1);
        Ok(n)
    }
}

/// 通用截断：读出前 `len` 字节（不足补零），再从头整体重写
///
/// 不是原子操作：中途失败会留下部分重写的内容。缩短时驱动里超出部分的
/// 数据仍在，但 VFS 以 Inode 长度为界，读取不会越过新长度。
fn truncate_by_rewrite(ops: &dyn FileOps, inode: &Inode, len: usize) -> Result<(), FsError> {
    let mut content = Vec::new();
    content.try_reserve_exact(len)?;
    content.resize(len, 0u8);

    let keep = len.min(inode.size());
    let mut done = 0;
    while done < keep {
        let n = ops.read(done, &mut content[done..keep])?;
        if n == 0 {
            break;
        }
        done += n;
    }

    let mut written = 0;
    while written < len {
        let n = ops.write(written, &content[written..])?;
        if n == 0 {
            return Err(FsError::NoSpace);
        }
        written += n;
    }
    log::debug!(
        "vfs: truncated inode {:?} to {} bytes by rewrite",
        inode.id(),
        len
    );
    Ok(())
}
