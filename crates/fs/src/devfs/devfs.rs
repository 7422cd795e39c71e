//! Devfs 驱动与节点

use alloc::string::String;
use alloc::sync::{Arc, Weak};
use alloc::vec::Vec;
use core::any::Any;

use sync::SpinLock;
use vfs::dev::{chrdev_major, mem_minor};
use vfs::{
    DevId, FileMode, FileOps, FsDriver, FsError, Inode, InodeDesc, InodeOps, InodeType,
    OpenFlags, Stat, makedev,
};

use super::devices::open_device;

/// 根目录之外的固定节点：名字、主设备号、次设备号、权限
const DEVICES: &[(&str, u32, u32, u32)] = &[
    ("null", chrdev_major::MEM, mem_minor::NULL, 0o666),
    ("zero", chrdev_major::MEM, mem_minor::ZERO, 0o666),
    ("random", chrdev_major::MEM, mem_minor::RANDOM, 0o666),
    ("urandom", chrdev_major::MEM, mem_minor::URANDOM, 0o666),
    ("console", chrdev_major::CONSOLE, 1, 0o600),
];

const ROOT_INDEX: u64 = 1;

/// Devfs 节点：根目录或一个字符设备
pub struct DevfsNode {
    index: u64,
    /// 设备号，根目录为 0
    rdev: u64,
    mode: SpinLock<FileMode>,
    /// 根目录下的设备节点（仅根目录非空）
    entries: Vec<(&'static str, Arc<DevfsNode>)>,
    self_ref: Weak<DevfsNode>,
}

impl DevfsNode {
    fn new_device(index: u64, rdev: u64, mode: u32) -> Arc<Self> {
        Arc::new_cyclic(|me| Self {
            index,
            rdev,
            mode: SpinLock::new(FileMode::from_bits_truncate(mode)),
            entries: Vec::new(),
            self_ref: me.clone(),
        })
    }

    fn new_root() -> Arc<Self> {
        let entries = DEVICES
            .iter()
            .zip(ROOT_INDEX + 1..)
            .map(|(&(name, major, minor, mode), index)| {
                (name, Self::new_device(index, makedev(major, minor), mode))
            })
            .collect();
        Arc::new_cyclic(|me| Self {
            index: ROOT_INDEX,
            rdev: 0,
            mode: SpinLock::new(FileMode::from_bits_truncate(0o755)),
            entries,
            self_ref: me.clone(),
        })
    }

    fn is_root(&self) -> bool {
        self.index == ROOT_INDEX
    }

    /// 设备号
    pub fn rdev(&self) -> u64 {
        self.rdev
    }

    fn desc(self: &Arc<Self>) -> InodeDesc {
        InodeDesc {
            index: self.index,
            kind: if self.is_root() {
                InodeType::Directory
            } else {
                InodeType::CharDevice
            },
            mode: *self.mode.lock(),
            size: 0,
            ops: self.clone(),
        }
    }
}

impl InodeOps for DevfsNode {
    fn lookup(&self, name: &str) -> Result<Option<InodeDesc>, FsError> {
        Ok(self
            .entries
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, node)| node.desc()))
    }

    fn enumerate(&self) -> Result<Vec<(String, InodeDesc)>, FsError> {
        if !self.is_root() {
            return Err(FsError::NotDirectory);
        }
        let this = self.self_ref.upgrade().ok_or(FsError::IoError)?;

        let mut out = Vec::new();
        out.try_reserve(self.entries.len() + 2)?;
        out.push((String::from("."), this.desc()));
        out.push((String::from(".."), this.desc()));
        for (name, node) in &self.entries {
            out.push((String::from(*name), node.desc()));
        }
        Ok(out)
    }

    fn chmod(&self, mode: FileMode) -> Result<(), FsError> {
        *self.mode.lock() = mode.permissions();
        Ok(())
    }

    fn open(&self, _inode: &Inode, _flags: OpenFlags) -> Result<Option<Arc<dyn FileOps>>, FsError> {
        if self.is_root() {
            return Ok(None);
        }
        open_device(self.rdev).map(Some)
    }

    fn stat(&self, _inode: &Inode, stat: &mut Stat) {
        stat.st_rdev = self.rdev;
        if self.is_root() {
            stat.st_nlink = 2;
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Devfs 文件系统驱动
///
/// 每次挂载都得到同一组设备节点的新副本；节点的权限修改只在本实例内可见。
pub struct DevFs;

impl DevFs {
    /// 创建新的 devfs 驱动
    pub fn new() -> Arc<Self> {
        Arc::new(Self)
    }
}

impl FsDriver for DevFs {
    fn name(&self) -> &'static str {
        "devfs"
    }

    fn mount(&self, dev: DevId, device: &str) -> Result<InodeDesc, FsError> {
        log::debug!("devfs: new instance for {} (dev {:#x})", device, dev);
        Ok(DevfsNode::new_root().desc())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_root_lists_devices() {
        test_support::init_sync_arch_ops();
        let root = DevfsNode::new_root();
        let names: Vec<String> = root
            .enumerate()
            .unwrap()
            .into_iter()
            .map(|(name, _)| name)
            .collect();
        assert_eq!(names, [".", "..", "null", "zero", "random", "urandom", "console"]);

        let null = root.lookup("null").unwrap().unwrap();
        assert_eq!(null.kind, InodeType::CharDevice);
        assert_eq!(null.mode, FileMode::from_bits_truncate(0o666));
        assert!(root.lookup("sda").unwrap().is_none());
    }

    #[test]
    fn test_device_numbers() {
        test_support::init_sync_arch_ops();
        let root = DevfsNode::new_root();
        let rdev = |name: &str| {
            root.entries
                .iter()
                .find(|(n, _)| *n == name)
                .map(|(_, node)| node.rdev())
                .unwrap()
        };
        assert_eq!(rdev("null"), makedev(1, 3));
        assert_eq!(rdev("zero"), makedev(1, 5));
        assert_eq!(rdev("random"), makedev(1, 8));
        assert_eq!(rdev("console"), makedev(5, 1));
    }

    #[test]
    fn test_mutators_are_rejected() {
        test_support::init_sync_arch_ops();
        let root = DevfsNode::new_root();
        assert_eq!(
            root.create("x", FileMode::empty()).unwrap_err(),
            FsError::InvalidArgument
        );
        assert_eq!(
            root.mkdir("x", FileMode::empty()).unwrap_err(),
            FsError::InvalidArgument
        );
    }
}
