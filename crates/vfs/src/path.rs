//! 路径解析引擎
//!
//! 从全局根 Tnode 出发，逐个组件地走完绝对路径：
//!
//! - `.` 不做任何操作，`..` 沿 Inode 的父 Tnode 反向引用回退（根的父是自己）
//! - 普通名字先线性扫描当前 Inode 的挂载列表，命中则切换到该挂载的根 Tnode；
//!   否则查子 Tnode 缓存，最后才调用驱动的 `lookup`
//!
//! 解析过程中不持有跨步骤的锁，依赖系统调用层的串行化。

use alloc::string::String;
use alloc::sync::Arc;

use crate::config::NAME_MAX;
use crate::{FsError, InodeDesc, InodeId, Tnode, Vfs};

/// 检查单个路径组件的长度
pub fn check_name(name: &str) -> Result<(), FsError> {
    if name.len() > NAME_MAX {
        return Err(FsError::NameTooLong);
    }
    Ok(())
}

/// 将绝对路径分割为父目录部分和最后一个组件
///
/// 末尾带斜杠、相对路径、根本身以及以 `.`/`..` 结尾的路径返回
/// [`FsError::InvalidArgument`]。
pub fn split_path(path: &str) -> Result<(String, String), FsError> {
    if !path.starts_with('/') {
        return Err(FsError::InvalidArgument);
    }
    // 如果路径以斜杠结尾，说明是目录而非文件，返回错误
    if path.ends_with('/') {
        return Err(FsError::InvalidArgument);
    }

    let pos = path.rfind('/').ok_or(FsError::InvalidArgument)?;
    let name = &path[pos + 1..];
    if name == "." || name == ".." {
        return Err(FsError::InvalidArgument);
    }
    check_name(name)?;

    let dir = path[..pos].trim_end_matches('/');
    let dir = if dir.is_empty() { "/" } else { dir };
    Ok((String::from(dir), String::from(name)))
}

impl Vfs {
    /// 将绝对路径解析为 Tnode
    pub fn resolve(&self, path: &str) -> Result<Arc<Tnode>, FsError> {
        if !path.starts_with('/') || path == "//" {
            return Err(FsError::InvalidArgument);
        }

        let mut current = self.root()?;
        for name in path.split('/').filter(|s| !s.is_empty()) {
            current = self.walk_component(&current, name)?;
        }

        if path.len() > 1 && path.ends_with('/') && !current.inode().is_dir() {
            return Err(FsError::InvalidArgument);
        }
        Ok(current)
    }

    /// 解析单个路径组件
    ///
    /// `resolve(dirname(p))` 之后再对 `basename(p)` 调用本函数，
    /// 得到的 Tnode 与 `resolve(p)` 相同。
    pub fn walk_component(&self, base: &Arc<Tnode>, name: &str) -> Result<Arc<Tnode>, FsError> {
        let dir = base.inode();
        if !dir.is_dir() {
            return Err(FsError::NotFound);
        }
        match name {
            "." => Ok(base.clone()),
            ".." => dir.parent().ok_or(FsError::NotFound),
            _ => {
                check_name(name)?;
                // 挂载点遮蔽磁盘上的同名项
                if let Some(mount) = dir.find_mount(name) {
                    return Ok(mount.root().clone());
                }
                self.lookup(base, name)
            }
        }
    }

    /// 在目录中按名字查找子 Tnode（不看挂载列表）
    ///
    /// 先扫描子缓存；缓存已完整时不再询问驱动。
    pub fn lookup(&self, dir: &Arc<Tnode>, name: &str) -> Result<Arc<Tnode>, FsError> {
        let inode = dir.inode();
        if !inode.is_dir() {
            return Err(FsError::NotDirectory);
        }
        {
            let cache = inode.children().lock();
            if let Some(child) = cache.find(name) {
                return Ok(child);
            }
            if cache.complete {
                return Err(FsError::NotFound);
            }
        }

        match inode.ops().lookup(name)? {
            Some(desc) => self.adopt(dir, name, desc),
            None => Err(FsError::NotFound),
        }
    }

    /// 不带名字的 lookup：完整枚举目录并标记缓存为完整
    ///
    /// 驱动返回的 "." 与 ".." 不进入缓存。
    pub fn populate(&self, dir: &Arc<Tnode>) -> Result<(), FsError> {
        let inode = dir.inode();
        if !inode.is_dir() {
            return Err(FsError::NotDirectory);
        }
        if inode.children().lock().complete {
            return Ok(());
        }

        for (name, desc) in inode.ops().enumerate()? {
            if name == "." || name == ".." {
                continue;
            }
            self.adopt(dir, &name, desc)?;
        }
        inode.children().lock().complete = true;
        Ok(())
    }

    /// 将驱动描述的新节点挂入 `dir` 的子缓存
    ///
    /// 通过 Inode Store 取得规范 Inode，新 Tnode 持有一个引用。
    /// 若同名子项已在缓存中（并发填充），直接返回已有的 Tnode。
    pub(crate) fn adopt(
        &self,
        dir: &Arc<Tnode>,
        name: &str,
        desc: InodeDesc,
    ) -> Result<Arc<Tnode>, FsError> {
        let id = InodeId::new(dir.inode().id().dev, desc.index);
        let inode = self.store.get_or_create(id, desc)?;

        let mut cache = dir.inode().children().lock();
        if let Some(existing) = cache.find(name) {
            drop(cache);
            self.store.put(&inode);
            return Ok(existing);
        }
        if let Err(e) = cache.entries.try_reserve(1) {
            drop(cache);
            self.store.put(&inode);
            return Err(e.into());
        }

        let tnode = Arc::new(Tnode::new(String::from(name), inode.clone()));
        inode.inc_ref();
        inode.set_parent(Arc::downgrade(dir));
        cache.entries.push(tnode.clone());
        drop(cache);

        self.store.put(&inode);
        Ok(tnode)
    }

    /// 确认 `name` 在 `dir` 下既不是挂载点也不是已有子项
    pub(crate) fn check_vacant(&self, dir: &Arc<Tnode>, name: &str) -> Result<(), FsError> {
        if dir.inode().find_mount(name).is_some() {
            return Err(FsError::AlreadyExists);
        }
        self.populate(dir)?;
        if dir.inode().children().lock().find(name).is_some() {
            return Err(FsError::AlreadyExists);
        }
        Ok(())
    }
}

/// 拼接挂载路径
pub(crate) fn join_path(dir: &str, name: &str) -> String {
    let mut path = String::from(dir);
    if !path.ends_with('/') {
        path.push('/');
    }
    path.push_str(name);
    path
}
