//! Ramfs 驱动

use alloc::string::String;
use alloc::sync::Arc;
use alloc::vec::Vec;

use sync::SpinLock;
use vfs::{DevId, FsDriver, FsError, InodeDesc};

use super::inode::{RamfsNode, RamfsStats};

struct RamfsInstance {
    dev: DevId,
    device: String,
    stats: Arc<SpinLock<RamfsStats>>,
}

/// Ramfs 文件系统驱动
///
/// 驱动本身只保存容量配置；每次挂载创建一棵新的目录树，
/// 树由 VFS 持有的根 Inode 保持存活。
pub struct RamFs {
    /// 每个实例的容量上限（字节）
    max_bytes: usize,

    instances: SpinLock<Vec<RamfsInstance>>,
}

impl RamFs {
    /// 创建新的 ramfs 驱动
    ///
    /// # 参数
    ///
    /// - `max_bytes`: 每个挂载实例的最大容量（字节），0 表示无限制
    pub fn new(max_bytes: usize) -> Arc<Self> {
        Arc::new(Self {
            max_bytes,
            instances: SpinLock::new(Vec::new()),
        })
    }

    /// 获取实例已使用的容量（字节）
    pub fn used_size(&self, dev: DevId) -> Option<usize> {
        self.instances
            .lock()
            .iter()
            .find(|inst| inst.dev == dev)
            .map(|inst| inst.stats.lock().used_bytes)
    }

    /// 获取每个实例的总容量（字节，0 表示无限制）
    pub fn total_size(&self) -> usize {
        self.max_bytes
    }

    /// 挂载过的设备名
    pub fn devices(&self) -> Vec<String> {
        self.instances
            .lock()
            .iter()
            .map(|inst| inst.device.clone())
            .collect()
    }
}

impl FsDriver for RamFs {
    fn name(&self) -> &'static str {
        "ramfs"
    }

    fn mount(&self, dev: DevId, device: &str) -> Result<InodeDesc, FsError> {
        let stats = Arc::new(SpinLock::new(RamfsStats::new(self.max_bytes)));
        let root = RamfsNode::new_root(stats.clone());

        let mut instances = self.instances.lock();
        instances.try_reserve(1)?;
        instances.push(RamfsInstance {
            dev,
            device: String::from(device),
            stats,
        });
        drop(instances);

        log::debug!("ramfs: new instance for {} (dev {:#x})", device, dev);
        Ok(root.desc())
    }
}
