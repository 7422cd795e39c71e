//! FS 相关操作的 Mock 实现
//!
//! 注意：这里不直接依赖 `fs` crate（避免循环依赖）。
//! `fs` crate 在 `cfg(test)` 下为这些类型实现其 trait（例如 `FsOps`）。

use core::sync::atomic::{AtomicU8, AtomicUsize, Ordering};

/// Mock 的 FS 运行时操作
///
/// 控制台输出只计数不保存；控制台输入恒定返回 `input`。
pub struct MockFsOps {
    pub written: AtomicUsize,
    pub input: AtomicU8,
}

impl MockFsOps {
    pub const fn new() -> Self {
        Self {
            written: AtomicUsize::new(0),
            input: AtomicU8::new(b'\n'),
        }
    }

    /// 累计写到控制台的字节数
    pub fn written(&self) -> usize {
        self.written.load(Ordering::Relaxed)
    }
}

impl Default for MockFsOps {
    fn default() -> Self {
        Self::new()
    }
}

/// 全局 Mock 实例
pub static MOCK_FS_OPS: MockFsOps = MockFsOps::new();
