//! 挂载管理
//!
//! 文件系统驱动先通过 [`Vfs::load_fs`] 注册，之后才能被 [`Vfs::mount`] 按名字挂载。
//! 每次挂载分配一个新的匿名设备号，驱动据此返回根节点描述，VFS 再组装
//! [`SuperBlock`] 与 [`Mount`] 记录。
//!
//! 在已有根的情况下挂载到 "/" 不会卸载旧根：旧根被降级为以其驱动名命名的
//! 挂载点，挂到新根 Inode 的挂载列表下，于是原先的路径都可以经
//! `/<旧驱动名>/...` 继续访问。

use alloc::string::String;
use alloc::sync::{Arc, Weak};
use alloc::vec::Vec;
use core::fmt;

use sync::SpinLock;

use crate::config::MAX_DRIVERS;
use crate::path::{join_path, split_path};
use crate::tnode::ROOT_NAME;
use crate::{DevId, FsError, Inode, InodeDesc, InodeId, Tnode, Vfs};

/// 文件系统驱动
pub trait FsDriver: Send + Sync {
    /// 驱动名（挂载时的文件系统类型）
    fn name(&self) -> &'static str;

    /// 为设备 `device` 创建一个文件系统实例，返回其根目录描述
    ///
    /// `dev` 是 VFS 为这个实例分配的设备号。
    fn mount(&self, dev: DevId, device: &str) -> Result<InodeDesc, FsError>;
}

/// 每个已挂载文件系统实例一份：设备号与根 Tnode
pub struct SuperBlock {
    dev: DevId,
    root: Arc<Tnode>,
}

impl SuperBlock {
    /// 设备号
    pub fn dev(&self) -> DevId {
        self.dev
    }

    /// 根 Tnode
    pub fn root(&self) -> &Arc<Tnode> {
        &self.root
    }
}

/// 挂载记录
pub struct Mount {
    name: String,
    device: String,
    driver: Arc<dyn FsDriver>,
    sb: Arc<SuperBlock>,
    /// 逻辑父目录；只在根切换时被改写一次
    parent: SpinLock<Weak<Inode>>,
}

impl Mount {
    fn new(
        name: &str,
        device: &str,
        driver: Arc<dyn FsDriver>,
        sb: Arc<SuperBlock>,
        parent: Weak<Inode>,
    ) -> Self {
        Self {
            name: String::from(name),
            device: String::from(device),
            driver,
            sb,
            parent: SpinLock::new(parent),
        }
    }

    /// 挂载名（父目录下的路径组件）
    pub fn name(&self) -> &str {
        &self.name
    }

    /// 后备设备路径
    pub fn device(&self) -> &str {
        &self.device
    }

    /// 驱动
    pub fn driver(&self) -> &Arc<dyn FsDriver> {
        &self.driver
    }

    /// 文件系统类型名
    pub fn fs_type(&self) -> &'static str {
        self.driver.name()
    }

    /// 超级块
    pub fn superblock(&self) -> &Arc<SuperBlock> {
        &self.sb
    }

    /// 被挂载文件系统的根 Tnode
    pub fn root(&self) -> &Arc<Tnode> {
        &self.sb.root
    }

    /// 逻辑父 Inode
    pub fn parent(&self) -> Option<Arc<Inode>> {
        self.parent.lock().upgrade()
    }

    fn set_parent(&self, parent: Weak<Inode>) {
        *self.parent.lock() = parent;
    }
}

impl fmt::Debug for Mount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Mount")
            .field("name", &self.name)
            .field("device", &self.device)
            .field("fs_type", &self.fs_type())
            .field("dev", &self.sb.dev)
            .finish()
    }
}

/// 挂载信息（`/proc/mounts` 的一行）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MountInfo {
    /// 挂载路径
    pub path: String,
    /// 后备设备
    pub device: String,
    /// 文件系统类型
    pub fs_type: &'static str,
    /// 设备号
    pub dev: DevId,
}

impl Vfs {
    /// 注册文件系统驱动
    pub fn load_fs(&self, driver: Arc<dyn FsDriver>) -> Result<(), FsError> {
        let mut drivers = self.drivers.write();
        if drivers.iter().any(|d| d.name() == driver.name()) {
            return Err(FsError::AlreadyExists);
        }
        if drivers.len() >= MAX_DRIVERS {
            return Err(FsError::NoSpace);
        }
        drivers.try_reserve(1)?;
        log::info!("vfs: registered filesystem driver {}", driver.name());
        drivers.push(driver);
        Ok(())
    }

    fn find_driver(&self, name: &str) -> Option<Arc<dyn FsDriver>> {
        self.drivers.read().iter().find(|d| d.name() == name).cloned()
    }

    /// 挂载 `fs_type` 类型的文件系统到 `target`
    pub fn mount(&self, device: &str, target: &str, fs_type: &str) -> Result<(), FsError> {
        let driver = self.find_driver(fs_type).ok_or(FsError::NoDevice)?;
        if target == ROOT_NAME {
            return self.mount_root(device, driver);
        }

        let (parent_path, name) = split_path(target)?;
        let parent = self.resolve(&parent_path)?;
        if !parent.inode().is_dir() {
            return Err(FsError::NotFound);
        }
        self.check_vacant(&parent, &name)?;

        let dev = self.alloc_dev();
        let desc = driver.mount(dev, device)?;
        let sb = self.build_superblock(dev, desc)?;
        sb.root.inode().set_parent(Arc::downgrade(&parent));

        let mount = Arc::new(Mount::new(
            &name,
            device,
            driver,
            sb.clone(),
            Arc::downgrade(parent.inode()),
        ));
        if let Err(e) = parent.inode().attach_mount(mount) {
            self.release(sb.root.inode());
            return Err(e);
        }
        log::info!("vfs: mounted {} ({}) at {} dev={:#x}", fs_type, device, target, dev);
        Ok(())
    }

    /// 挂载到 "/"，必要时降级旧根
    fn mount_root(&self, device: &str, driver: Arc<dyn FsDriver>) -> Result<(), FsError> {
        let dev = self.alloc_dev();
        let desc = driver.mount(dev, device)?;
        let sb = self.build_superblock(dev, desc)?;
        let fs_type = driver.name();
        let new_root = Arc::new(Mount::new(ROOT_NAME, device, driver, sb.clone(), Weak::new()));

        let mut slot = self.root.write();
        if let Some(old) = slot.as_ref() {
            let new_inode = sb.root.inode();
            let demoted = Arc::new(Mount::new(
                old.fs_type(),
                old.device(),
                old.driver.clone(),
                old.sb.clone(),
                Arc::downgrade(new_inode),
            ));
            if let Err(e) = new_inode.attach_mount(demoted) {
                drop(slot);
                self.release(new_inode);
                return Err(e);
            }

            let old_inode = old.root().inode();
            old_inode.set_parent(Arc::downgrade(&sb.root));
            for mount in old_inode.mounts() {
                mount.set_parent(Arc::downgrade(new_inode));
            }
            log::info!(
                "vfs: root swapped to {} ({}), previous root {} now at /{}",
                fs_type,
                device,
                old.fs_type(),
                old.fs_type()
            );
        } else {
            log::info!("vfs: mounted {} ({}) as root dev={:#x}", fs_type, device, dev);
        }
        *slot = Some(new_root);
        Ok(())
    }

    /// 由驱动的根描述组装超级块
    ///
    /// 根 Inode 的父引用先指向自己的 Tnode，挂到别处时由调用者改写。
    fn build_superblock(&self, dev: DevId, desc: InodeDesc) -> Result<Arc<SuperBlock>, FsError> {
        let id = InodeId::new(dev, desc.index);
        let inode = self.store.get_or_create(id, desc)?;
        inode.inc_ref();
        let root = Arc::new_cyclic(|this: &Weak<Tnode>| {
            inode.set_parent(this.clone());
            Tnode::new(String::from(ROOT_NAME), inode.clone())
        });
        Ok(Arc::new(SuperBlock { dev, root }))
    }

    /// 列出全部挂载，按目录树深度优先
    pub fn mounts(&self) -> Vec<MountInfo> {
        let mut out = Vec::new();
        if let Some(root) = self.root_mount() {
            out.push(MountInfo {
                path: String::from(ROOT_NAME),
                device: String::from(root.device()),
                fs_type: root.fs_type(),
                dev: root.sb.dev,
            });
            collect_mounts(root.root(), ROOT_NAME, &mut out);
        }
        out
    }
}

fn collect_mounts(dir: &Arc<Tnode>, path: &str, out: &mut Vec<MountInfo>) {
    let inode = dir.inode();
    for mount in inode.mounts() {
        let mount_path = join_path(path, mount.name());
        out.push(MountInfo {
            path: mount_path.clone(),
            device: String::from(mount.device()),
            fs_type: mount.fs_type(),
            dev: mount.sb.dev,
        });
        collect_mounts(mount.root(), &mount_path, out);
    }
    for child in inode.cached_children() {
        if child.inode().is_dir() {
            collect_mounts(&child, &join_path(path, child.name()), out);
        }
    }
}
