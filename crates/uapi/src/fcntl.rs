//! open(2) / lseek(2) 相关定义

bitflags::bitflags! {
    /// open 标志位（数值与 Linux 通用 ABI 一致）
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct OpenFlags: u32 {
        const O_RDONLY    = 0o0;
        const O_WRONLY    = 0o1;
        const O_RDWR      = 0o2;
        const O_ACCMODE   = 0o3;
        const O_CREAT     = 0o100;
        const O_EXCL      = 0o200;
        const O_TRUNC     = 0o1000;
        const O_APPEND    = 0o2000;
        const O_NONBLOCK  = 0o4000;
        const O_DIRECTORY = 0o200000;
        const O_CLOEXEC   = 0o2000000;
    }
}

impl OpenFlags {
    /// 访问模式部分（O_RDONLY / O_WRONLY / O_RDWR）
    pub fn access_mode(&self) -> u32 {
        self.bits() & Self::O_ACCMODE.bits()
    }

    /// 访问模式是否合法（O_ACCMODE 的第四种取值 3 是非法的）
    pub fn is_valid_access(&self) -> bool {
        self.access_mode() != Self::O_ACCMODE.bits()
    }

    /// 按访问模式是否可读
    pub fn readable(&self) -> bool {
        let mode = self.access_mode();
        mode == Self::O_RDONLY.bits() || mode == Self::O_RDWR.bits()
    }

    /// 按访问模式是否可写
    pub fn writable(&self) -> bool {
        let mode = self.access_mode();
        mode == Self::O_WRONLY.bits() || mode == Self::O_RDWR.bits()
    }
}

/// lseek 的基准位置
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeekWhence {
    /// 从文件开头
    Set,
    /// 从当前位置
    Cur,
    /// 从文件末尾
    End,
}

/// 设置管道缓冲区容量
pub const F_SETPIPE_SZ: u32 = 1031;
/// 查询管道缓冲区容量
pub const F_GETPIPE_SZ: u32 = 1032;
