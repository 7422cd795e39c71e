//! 目录变更操作：create / mkdir / unlink / rmdir / chmod，以及 stat
//!
//! 这些操作先解析父目录、委托驱动，成功后再更新子 Tnode 缓存与引用计数。
//! 它们不是事务性的：驱动成功而后续步骤失败时不会回滚。

use alloc::string::String;
use alloc::sync::Arc;

use uapi::fs::Stat;

use crate::path::split_path;
use crate::{File, FileMode, FsError, Inode, Tnode, Vfs};

impl Vfs {
    /// 解析待创建项的父目录，并确认名字可用
    fn prepare_new(&self, path: &str) -> Result<(Arc<Tnode>, String), FsError> {
        let (parent_path, name) = split_path(path)?;
        let parent = self.resolve(&parent_path)?;
        if !parent.inode().is_dir() {
            return Err(FsError::NotDirectory);
        }
        self.check_vacant(&parent, &name)?;
        Ok((parent, name))
    }

    /// 创建普通文件
    pub fn create(&self, path: &str, mode: FileMode) -> Result<Arc<Tnode>, FsError> {
        let (parent, name) = self.prepare_new(path)?;
        let desc = parent.inode().ops().create(&name, mode.permissions())?;
        self.adopt(&parent, &name, desc)
    }

    /// 创建目录
    pub fn mkdir(&self, path: &str, mode: FileMode) -> Result<Arc<Tnode>, FsError> {
        let (parent, name) = self.prepare_new(path)?;
        let desc = parent.inode().ops().mkdir(&name, mode.permissions())?;
        self.adopt(&parent, &name, desc)
    }

    /// 删除非目录项
    pub fn unlink(&self, path: &str) -> Result<(), FsError> {
        let target = self.resolve(path)?;
        let inode = target.inode().clone();
        if inode.is_dir() {
            return Err(FsError::IsDirectory);
        }
        let parent = inode.parent().ok_or(FsError::NotFound)?;

        parent.inode().ops().unlink(&target)?;
        self.detach(&parent, &target);
        self.release(&inode);
        Ok(())
    }

    /// 删除空目录
    ///
    /// 文件系统的根（全局根、挂载根、被降级的旧根）返回 [`FsError::Busy`]。
    pub fn rmdir(&self, path: &str) -> Result<(), FsError> {
        let target = self.resolve(path)?;
        let inode = target.inode().clone();
        if !inode.is_dir() {
            return Err(FsError::NotDirectory);
        }
        let parent = inode.parent().ok_or(FsError::NotFound)?;
        if is_fs_root(&parent, &target) {
            return Err(FsError::Busy);
        }

        self.populate(&target)?;
        if inode.has_mounts() || !inode.children().lock().entries.is_empty() {
            return Err(FsError::DirectoryNotEmpty);
        }

        parent.inode().ops().rmdir(&target)?;
        self.detach(&parent, &target);
        self.release(&inode);
        Ok(())
    }

    /// 修改权限位，保留原有类型位
    pub fn chmod(&self, path: &str, mode: FileMode) -> Result<(), FsError> {
        let target = self.resolve(path)?;
        let inode = target.inode();
        let new_mode = inode.mode().file_type() | mode.permissions();
        inode.ops().chmod(new_mode)?;
        inode.set_mode(new_mode);
        Ok(())
    }

    /// 按路径查询元数据
    pub fn stat(&self, path: &str) -> Result<Stat, FsError> {
        let target = self.resolve(path)?;
        Ok(stat_inode(target.inode()))
    }

    /// 按句柄查询元数据
    pub fn fstat(&self, file: &File) -> Result<Stat, FsError> {
        if file.is_closed() {
            return Err(FsError::BadFileDescriptor);
        }
        let inode = self.inode_of(file.inode_id())?;
        Ok(stat_inode(&inode))
    }

    /// 从父目录的子缓存中摘除 `target`
    fn detach(&self, parent: &Arc<Tnode>, target: &Arc<Tnode>) {
        parent
            .inode()
            .children()
            .lock()
            .entries
            .retain(|t| !Arc::ptr_eq(t, target));
    }
}

fn is_fs_root(parent: &Arc<Tnode>, target: &Arc<Tnode>) -> bool {
    Arc::ptr_eq(parent, target) || parent.inode().id().dev != target.inode().id().dev
}

fn stat_inode(inode: &Inode) -> Stat {
    let id = inode.id();
    let mut stat = Stat {
        st_dev: id.dev,
        st_ino: id.index,
        st_mode: inode.mode().bits(),
        st_nlink: 1,
        st_rdev: 0,
        st_size: inode.size() as u64,
    };
    inode.ops().stat(inode, &mut stat);
    stat
}
