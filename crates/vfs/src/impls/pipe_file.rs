//! 匿名管道文件系统
//!
//! 每个管道是管道文件系统中的一个 Fifo Inode，节点操作持有共享的环形缓冲区。
//! 读端和写端是同一个 Inode 上的两次 open，各自得到一个 [`PipeEnd`] 文件操作对象。
//! 端点计数由 `open`/`on_clone` 增加、`close` 减少，用于检测对端是否已经全部关闭。

use alloc::collections::VecDeque;
use alloc::sync::Arc;
use core::any::Any;
use core::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

use sync::SpinLock;
use uapi::fcntl::{F_GETPIPE_SZ, F_SETPIPE_SZ, OpenFlags};

use crate::config::PIPE_CAPACITY;
use crate::{DevId, FileMode, FileOps, FsError, Inode, InodeDesc, InodeId, InodeOps, InodeType};

/// 管道环形缓冲区
///
/// 容量默认 [`PIPE_CAPACITY`]（POSIX 最小 512 字节）。
struct PipeRingBuffer {
    buffer: VecDeque<u8>,
    capacity: usize,
}

impl PipeRingBuffer {
    const MIN_CAPACITY: usize = 4096;
    const MAX_CAPACITY: usize = 1048576;

    fn new(capacity: usize) -> Self {
        Self {
            buffer: VecDeque::new(),
            capacity,
        }
    }

    fn set_capacity(&mut self, new_capacity: usize) -> Result<(), FsError> {
        if !(Self::MIN_CAPACITY..=Self::MAX_CAPACITY).contains(&new_capacity) {
            return Err(FsError::InvalidArgument);
        }
        if new_capacity < self.buffer.len() {
            return Err(FsError::Busy);
        }
        self.capacity = new_capacity;
        Ok(())
    }

    /// 空管道返回 0
    fn read(&mut self, buf: &mut [u8]) -> usize {
        let nread = buf.len().min(self.buffer.len());
        for (dst, src) in buf.iter_mut().zip(self.buffer.drain(..nread)) {
            *dst = src;
        }
        nread
    }

    /// 满管道返回 0
    fn write(&mut self, buf: &[u8]) -> Result<usize, FsError> {
        let available = self.capacity - self.buffer.len();
        let nwrite = buf.len().min(available);
        self.buffer.try_reserve(nwrite)?;
        self.buffer.extend(&buf[..nwrite]);
        Ok(nwrite)
    }
}

/// 一个管道的共享状态
struct PipeShared {
    ring: SpinLock<PipeRingBuffer>,
    readers: AtomicUsize,
    writers: AtomicUsize,
}

impl PipeShared {
    fn attach(&self, readable: bool, writable: bool) {
        if readable {
            self.readers.fetch_add(1, Ordering::AcqRel);
        }
        if writable {
            self.writers.fetch_add(1, Ordering::AcqRel);
        }
    }

    fn detach(&self, readable: bool, writable: bool) {
        if readable {
            self.readers.fetch_sub(1, Ordering::AcqRel);
        }
        if writable {
            self.writers.fetch_sub(1, Ordering::AcqRel);
        }
    }
}

/// 管道文件系统：只负责分配管道 Inode
pub struct PipeFs {
    dev: DevId,
    next_index: AtomicU64,
}

impl PipeFs {
    pub(crate) fn new(dev: DevId) -> Self {
        Self {
            dev,
            next_index: AtomicU64::new(1),
        }
    }

    /// 管道文件系统的设备号
    pub fn dev(&self) -> DevId {
        self.dev
    }

    /// 分配一个新管道
    pub(crate) fn alloc(&self) -> (InodeId, InodeDesc) {
        let index = self.next_index.fetch_add(1, Ordering::Relaxed);
        let desc = InodeDesc {
            index,
            kind: InodeType::Fifo,
            mode: FileMode::S_IRUSR | FileMode::S_IWUSR,
            size: 0,
            ops: Arc::new(PipeNode::new(PIPE_CAPACITY)),
        };
        (InodeId::new(self.dev, index), desc)
    }
}

/// 管道 Inode 的节点操作
pub struct PipeNode {
    shared: Arc<PipeShared>,
}

impl PipeNode {
    fn new(capacity: usize) -> Self {
        Self {
            shared: Arc::new(PipeShared {
                ring: SpinLock::new(PipeRingBuffer::new(capacity)),
                readers: AtomicUsize::new(0),
                writers: AtomicUsize::new(0),
            }),
        }
    }

    /// 仍然打开的读端数量
    pub fn readers(&self) -> usize {
        self.shared.readers.load(Ordering::Acquire)
    }

    /// 仍然打开的写端数量
    pub fn writers(&self) -> usize {
        self.shared.writers.load(Ordering::Acquire)
    }

    /// 缓冲区中待读的字节数
    pub fn pending(&self) -> usize {
        self.shared.ring.lock().buffer.len()
    }
}

impl InodeOps for PipeNode {
    fn open(&self, _inode: &Inode, flags: OpenFlags) -> Result<Option<Arc<dyn FileOps>>, FsError> {
        let end = PipeEnd {
            shared: self.shared.clone(),
            readable: flags.readable(),
            writable: flags.writable(),
        };
        self.shared.attach(end.readable, end.writable);
        Ok(Some(Arc::new(end)))
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// 管道端点
///
/// 特点:
/// - 流式设备，忽略读写位置
/// - 写端在没有读端时返回 [`FsError::BrokenPipe`]
/// - 不阻塞：空管道读返回 0，满管道写返回 0
pub struct PipeEnd {
    shared: Arc<PipeShared>,
    readable: bool,
    writable: bool,
}

impl FileOps for PipeEnd {
    fn read(&self, _offset: usize, buf: &mut [u8]) -> Result<usize, FsError> {
        if !self.readable {
            return Err(FsError::BadFileDescriptor);
        }
        Ok(self.shared.ring.lock().read(buf))
    }

    fn write(&self, _offset: usize, buf: &[u8]) -> Result<usize, FsError> {
        if !self.writable {
            return Err(FsError::BadFileDescriptor);
        }
        if self.shared.readers.load(Ordering::Acquire) == 0 {
            return Err(FsError::BrokenPipe);
        }
        self.shared.ring.lock().write(buf)
    }

    fn close(&self) {
        self.shared.detach(self.readable, self.writable);
    }

    fn on_clone(&self) -> Result<(), FsError> {
        self.shared.attach(self.readable, self.writable);
        Ok(())
    }

    fn ioctl(&self, request: u32, arg: usize) -> Result<isize, FsError> {
        match request {
            F_GETPIPE_SZ => Ok(self.shared.ring.lock().capacity as isize),
            F_SETPIPE_SZ => {
                self.shared.ring.lock().set_capacity(arg)?;
                Ok(arg as isize)
            }
            _ => Err(FsError::NotSupported),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ring_buffer_wraps_and_bounds() {
        let mut ring = PipeRingBuffer::new(4096);
        let data = [7u8; 5000];
        assert_eq!(ring.write(&data).unwrap(), 4096);
        assert_eq!(ring.write(b"x").unwrap(), 0);

        let mut out = [0u8; 100];
        assert_eq!(ring.read(&mut out), 100);
        assert!(out.iter().all(|&b| b == 7));
        assert_eq!(ring.write(b"abc").unwrap(), 3);
        assert_eq!(ring.buffer.len(), 3999);
    }

    #[test]
    fn test_ring_buffer_empty_read() {
        let mut ring = PipeRingBuffer::new(4096);
        let mut out = [0u8; 8];
        assert_eq!(ring.read(&mut out), 0);
    }

    #[test]
    fn test_set_capacity_limits() {
        let mut ring = PipeRingBuffer::new(4096);
        assert_eq!(ring.set_capacity(100), Err(FsError::InvalidArgument));
        assert_eq!(ring.set_capacity(2 * 1048576), Err(FsError::InvalidArgument));
        assert!(ring.set_capacity(8192).is_ok());
        assert_eq!(ring.capacity, 8192);
    }
}
