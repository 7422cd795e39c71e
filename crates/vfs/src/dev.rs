//! 设备号编解码（与 Linux `makedev`/`major`/`minor` 的 64 位编码一致）

/// 由主、次设备号构造设备号
pub const fn makedev(major: u32, minor: u32) -> u64 {
    let major = major as u64;
    let minor = minor as u64;
    ((major & 0xffff_f000) << 32)
        | ((major & 0x0000_0fff) << 8)
        | ((minor & 0xffff_ff00) << 12)
        | (minor & 0x0000_00ff)
}

/// 提取主设备号
pub const fn major(dev: u64) -> u32 {
    (((dev >> 32) & 0xffff_f000) | ((dev >> 8) & 0x0000_0fff)) as u32
}

/// 提取次设备号
pub const fn minor(dev: u64) -> u32 {
    (((dev >> 12) & 0xffff_ff00) | (dev & 0x0000_00ff)) as u32
}

/// 字符设备主设备号
pub mod chrdev_major {
    /// 内存设备（null / zero / random）
    pub const MEM: u32 = 1;
    /// 控制台
    pub const CONSOLE: u32 = 5;
}

/// `MEM` 主设备号下的次设备号
pub mod mem_minor {
    /// /dev/null
    pub const NULL: u32 = 3;
    /// /dev/zero
    pub const ZERO: u32 = 5;
    /// /dev/random
    pub const RANDOM: u32 = 8;
    /// /dev/urandom
    pub const URANDOM: u32 = 9;
}
