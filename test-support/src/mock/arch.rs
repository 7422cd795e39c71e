//! 架构相关操作的 Mock 实现

/// Mock 架构操作
///
/// 测试在宿主机线程上运行，没有真正的中断可关，两个操作都是空操作。
pub struct MockArchOps;

impl MockArchOps {
    pub const fn new() -> Self {
        Self
    }
}

impl Default for MockArchOps {
    fn default() -> Self {
        Self::new()
    }
}

impl sync::ArchOps for MockArchOps {
    unsafe fn read_and_disable_interrupts(&self) -> usize {
        0
    }

    unsafe fn restore_interrupts(&self, _flags: usize) {}
}

/// 全局 Mock 实例
pub static MOCK_ARCH_OPS: MockArchOps = MockArchOps::new();
