//! 字符设备的文件级操作

use alloc::sync::Arc;

use sync::SpinLock;
use vfs::dev::{chrdev_major, major, mem_minor, minor};
use vfs::{FileOps, FsError};

use crate::ops::fs_ops;

/// 按设备号选出设备实现
pub(super) fn open_device(rdev: u64) -> Result<Arc<dyn FileOps>, FsError> {
    let ops: Arc<dyn FileOps> = match (major(rdev), minor(rdev)) {
        (chrdev_major::MEM, mem_minor::NULL) => Arc::new(NullDevice),
        (chrdev_major::MEM, mem_minor::ZERO) => Arc::new(ZeroDevice),
        (chrdev_major::MEM, mem_minor::RANDOM | mem_minor::URANDOM) => {
            Arc::new(RandomDevice::new())
        }
        (chrdev_major::CONSOLE, _) => Arc::new(ConsoleDevice),
        _ => return Err(FsError::NoDevice),
    };
    Ok(ops)
}

/// /dev/null：读到 EOF，写入全部丢弃
struct NullDevice;

impl FileOps for NullDevice {
    fn read(&self, _offset: usize, _buf: &mut [u8]) -> Result<usize, FsError> {
        Ok(0)
    }

    fn write(&self, _offset: usize, buf: &[u8]) -> Result<usize, FsError> {
        Ok(buf.len())
    }
}

/// /dev/zero：读出全零，写入全部丢弃
struct ZeroDevice;

impl FileOps for ZeroDevice {
    fn read(&self, _offset: usize, buf: &mut [u8]) -> Result<usize, FsError> {
        buf.fill(0);
        Ok(buf.len())
    }

    fn write(&self, _offset: usize, buf: &[u8]) -> Result<usize, FsError> {
        Ok(buf.len())
    }
}

/// /dev/random 与 /dev/urandom
///
/// 简单实现：线性同余发生器，固定种子，状态跟随打开的文件。
struct RandomDevice {
    seed: SpinLock<u32>,
}

impl RandomDevice {
    const SEED: u32 = 12345;

    fn new() -> Self {
        Self {
            seed: SpinLock::new(Self::SEED),
        }
    }
}

impl FileOps for RandomDevice {
    fn read(&self, _offset: usize, buf: &mut [u8]) -> Result<usize, FsError> {
        let mut seed = self.seed.lock();
        for byte in buf.iter_mut() {
            *seed = seed.wrapping_mul(1103515245).wrapping_add(12345);
            *byte = (*seed >> 16) as u8;
        }
        Ok(buf.len())
    }

    fn write(&self, _offset: usize, _buf: &[u8]) -> Result<usize, FsError> {
        Err(FsError::NoDevice)
    }
}

/// 控制台
///
/// 读取不阻塞：取走当前可用的输入，遇到换行即返回。
struct ConsoleDevice;

impl FileOps for ConsoleDevice {
    fn read(&self, _offset: usize, buf: &mut [u8]) -> Result<usize, FsError> {
        let mut count = 0;
        while count < buf.len() {
            let Some(ch) = fs_ops().console_getchar() else {
                break;
            };
            buf[count] = ch;
            count += 1;
            if ch == b'\n' {
                break;
            }
        }
        Ok(count)
    }

    fn write(&self, _offset: usize, buf: &[u8]) -> Result<usize, FsError> {
        match core::str::from_utf8(buf) {
            Ok(s) => fs_ops().console_write_str(s),
            Err(_) => buf.iter().for_each(|&c| fs_ops().console_putchar(c)),
        }
        Ok(buf.len())
    }
}
