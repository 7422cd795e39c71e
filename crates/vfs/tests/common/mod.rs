//! 集成测试共用的内存文件系统驱动
//!
//! `MemFs` 故意不实现原生截断，用来覆盖 VFS 的通用截断路径；
//! 它还统计驱动 `lookup`/`enumerate` 的调用次数，用来检查子缓存行为。

#![allow(dead_code)]

use std::any::Any;
use std::collections::BTreeMap;
use std::string::{String, ToString};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::vec::Vec;

use vfs::{
    DevId, FileMode, FileOps, FsDriver, FsError, Inode, InodeDesc, InodeOps, InodeType,
    OpenFlags, Tnode, Vfs,
};

pub const IOCTL_MAGIC: u32 = 0x4d46;

struct Node {
    kind: InodeType,
    mode: FileMode,
    children: BTreeMap<String, u64>,
    data: Vec<u8>,
}

/// 一个挂载实例
pub struct MemInstance {
    nodes: Mutex<BTreeMap<u64, Node>>,
    next_index: AtomicU64,
    pub lookups: AtomicUsize,
    pub enumerates: AtomicUsize,
    pub device: String,
    pub dev: DevId,
}

impl MemInstance {
    fn new(dev: DevId, device: &str) -> Arc<Self> {
        let mut nodes = BTreeMap::new();
        nodes.insert(
            1,
            Node {
                kind: InodeType::Directory,
                mode: FileMode::from_bits_truncate(0o755),
                children: BTreeMap::new(),
                data: Vec::new(),
            },
        );
        Arc::new(Self {
            nodes: Mutex::new(nodes),
            next_index: AtomicU64::new(2),
            lookups: AtomicUsize::new(0),
            enumerates: AtomicUsize::new(0),
            device: device.to_string(),
            dev,
        })
    }

    fn desc(self: &Arc<Self>, index: u64) -> InodeDesc {
        let nodes = self.nodes.lock().unwrap();
        let node = &nodes[&index];
        InodeDesc {
            index,
            kind: node.kind,
            mode: node.mode,
            size: node.data.len(),
            ops: Arc::new(MemNode {
                fs: self.clone(),
                index,
            }),
        }
    }

    fn add(self: &Arc<Self>, parent: u64, name: &str, kind: InodeType, mode: FileMode) -> Result<InodeDesc, FsError> {
        let index = self.next_index.fetch_add(1, Ordering::Relaxed);
        {
            let mut nodes = self.nodes.lock().unwrap();
            let dir = nodes.get_mut(&parent).ok_or(FsError::NotFound)?;
            if dir.children.contains_key(name) {
                return Err(FsError::AlreadyExists);
            }
            dir.children.insert(name.to_string(), index);
            nodes.insert(
                index,
                Node {
                    kind,
                    mode,
                    children: BTreeMap::new(),
                    data: Vec::new(),
                },
            );
        }
        Ok(self.desc(index))
    }

    /// 驱动侧的文件内容
    pub fn contents(&self, index: u64) -> Vec<u8> {
        self.nodes.lock().unwrap()[&index].data.clone()
    }

    /// 驱动侧是否还有这个节点
    pub fn exists(&self, index: u64) -> bool {
        self.nodes.lock().unwrap().contains_key(&index)
    }
}

struct MemNode {
    fs: Arc<MemInstance>,
    index: u64,
}

impl MemNode {
    fn remove_child(&self, target: &Tnode, want_dir: bool) -> Result<(), FsError> {
        let mut nodes = self.fs.nodes.lock().unwrap();
        let child = *nodes[&self.index]
            .children
            .get(target.name())
            .ok_or(FsError::NotFound)?;
        let node = &nodes[&child];
        if want_dir && !node.children.is_empty() {
            return Err(FsError::DirectoryNotEmpty);
        }
        nodes
            .get_mut(&self.index)
            .ok_or(FsError::NotFound)?
            .children
            .remove(target.name());
        nodes.remove(&child);
        Ok(())
    }
}

impl InodeOps for MemNode {
    fn lookup(&self, name: &str) -> Result<Option<InodeDesc>, FsError> {
        self.fs.lookups.fetch_add(1, Ordering::Relaxed);
        let index = self.fs.nodes.lock().unwrap()[&self.index]
            .children
            .get(name)
            .copied();
        Ok(index.map(|i| self.fs.desc(i)))
    }

    fn enumerate(&self) -> Result<Vec<(String, InodeDesc)>, FsError> {
        self.fs.enumerates.fetch_add(1, Ordering::Relaxed);
        let children: Vec<(String, u64)> = self.fs.nodes.lock().unwrap()[&self.index]
            .children
            .iter()
            .map(|(n, i)| (n.clone(), *i))
            .collect();
        let mut out = vec![
            (".".to_string(), self.fs.desc(self.index)),
            ("..".to_string(), self.fs.desc(self.index)),
        ];
        for (name, index) in children {
            out.push((name, self.fs.desc(index)));
        }
        Ok(out)
    }

    fn create(&self, name: &str, mode: FileMode) -> Result<InodeDesc, FsError> {
        self.fs.add(self.index, name, InodeType::File, mode)
    }

    fn mkdir(&self, name: &str, mode: FileMode) -> Result<InodeDesc, FsError> {
        self.fs.add(self.index, name, InodeType::Directory, mode)
    }

    fn unlink(&self, target: &Tnode) -> Result<(), FsError> {
        self.remove_child(target, false)
    }

    fn rmdir(&self, target: &Tnode) -> Result<(), FsError> {
        self.remove_child(target, true)
    }

    fn chmod(&self, mode: FileMode) -> Result<(), FsError> {
        if let Some(node) = self.fs.nodes.lock().unwrap().get_mut(&self.index) {
            node.mode = mode;
        }
        Ok(())
    }

    fn open(&self, inode: &Inode, _flags: OpenFlags) -> Result<Option<Arc<dyn FileOps>>, FsError> {
        if inode.is_dir() {
            return Ok(None);
        }
        Ok(Some(Arc::new(MemFile {
            fs: self.fs.clone(),
            index: self.index,
            closes: AtomicUsize::new(0),
        })))
    }

    fn ioctl(&self, request: u32, _arg: usize) -> Result<isize, FsError> {
        if request == IOCTL_MAGIC {
            Ok(self.index as isize)
        } else {
            Err(FsError::NotSupported)
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

struct MemFile {
    fs: Arc<MemInstance>,
    index: u64,
    closes: AtomicUsize,
}

impl FileOps for MemFile {
    fn read(&self, offset: usize, buf: &mut [u8]) -> Result<usize, FsError> {
        let nodes = self.fs.nodes.lock().unwrap();
        let data = &nodes.get(&self.index).ok_or(FsError::IoError)?.data;
        if offset >= data.len() {
            return Ok(0);
        }
        let n = buf.len().min(data.len() - offset);
        buf[..n].copy_from_slice(&data[offset..offset + n]);
        Ok(n)
    }

    fn write(&self, offset: usize, buf: &[u8]) -> Result<usize, FsError> {
        let mut nodes = self.fs.nodes.lock().unwrap();
        let data = &mut nodes.get_mut(&self.index).ok_or(FsError::IoError)?.data;
        if data.len() < offset + buf.len() {
            data.resize(offset + buf.len(), 0);
        }
        data[offset..offset + buf.len()].copy_from_slice(buf);
        Ok(buf.len())
    }

    fn close(&self) {
        self.closes.fetch_add(1, Ordering::Relaxed);
    }
}

/// 内存文件系统驱动；每次挂载产生一个新实例
pub struct MemFs {
    name: &'static str,
    pub instances: Mutex<Vec<Arc<MemInstance>>>,
}

impl MemFs {
    pub fn new(name: &'static str) -> Arc<Self> {
        Arc::new(Self {
            name,
            instances: Mutex::new(Vec::new()),
        })
    }

    /// 最近一次挂载的实例
    pub fn last(&self) -> Arc<MemInstance> {
        self.instances.lock().unwrap().last().unwrap().clone()
    }
}

impl FsDriver for MemFs {
    fn name(&self) -> &'static str {
        self.name
    }

    fn mount(&self, dev: DevId, device: &str) -> Result<InodeDesc, FsError> {
        let inst = MemInstance::new(dev, device);
        let desc = inst.desc(1);
        self.instances.lock().unwrap().push(inst);
        Ok(desc)
    }
}

/// 注册 `memfs` 并挂载为根
pub fn setup() -> (Vfs, Arc<MemFs>) {
    test_support::init_sync_arch_ops();
    let vfs = Vfs::new();
    let memfs = MemFs::new("memfs");
    vfs.load_fs(memfs.clone()).unwrap();
    vfs.mount("ram0", "/", "memfs").unwrap();
    (vfs, memfs)
}

pub fn mode(bits: u32) -> FileMode {
    FileMode::from_bits_truncate(bits)
}
