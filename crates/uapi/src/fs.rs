//! 文件元数据与目录项记录

/// 单个文件名的最大字节数
pub const NAME_MAX: usize = 255;

/// 目录项中文件名字段的字节数（含结尾的 NUL）
pub const DIRENT_NAME_LEN: usize = NAME_MAX + 1;

/// stat(2) 返回的文件元数据
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Stat {
    pub st_dev: u64,
    pub st_ino: u64,
    pub st_mode: u32,
    pub st_nlink: u32,
    pub st_rdev: u64,
    pub st_size: u64,
}

/// 目录读取每次返回的定长目录项
///
/// 布局：`d_dev`(8) + `d_ino`(8) + `d_name`([`DIRENT_NAME_LEN`])，共 [`Dirent::SIZE`] 字节，
/// 整数按小端序编码。任何不超过 [`NAME_MAX`] 的名字都能完整放下。
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dirent {
    pub d_dev: u64,
    pub d_ino: u64,
    pub d_name: [u8; DIRENT_NAME_LEN],
}

impl Dirent {
    /// 序列化后的字节数
    pub const SIZE: usize = 16 + DIRENT_NAME_LEN;

    /// 构造目录项，名字超过 [`NAME_MAX`] 时返回 `None`
    pub fn new(dev: u64, ino: u64, name: &str) -> Option<Self> {
        let bytes = name.as_bytes();
        if bytes.len() > NAME_MAX {
            return None;
        }
        let mut d_name = [0u8; DIRENT_NAME_LEN];
        d_name[..bytes.len()].copy_from_slice(bytes);
        Some(Self {
            d_dev: dev,
            d_ino: ino,
            d_name,
        })
    }

    /// 文件名（到第一个 NUL 为止）
    pub fn name(&self) -> &str {
        let end = self
            .d_name
            .iter()
            .position(|&b| b == 0)
            .unwrap_or(DIRENT_NAME_LEN);
        core::str::from_utf8(&self.d_name[..end]).unwrap_or("")
    }

    /// 写入 `buf` 的前 [`Dirent::SIZE`] 字节，`buf` 不足时返回 `None`
    pub fn write_to(&self, buf: &mut [u8]) -> Option<usize> {
        let out = buf.get_mut(..Self::SIZE)?;
        out[..8].copy_from_slice(&self.d_dev.to_le_bytes());
        out[8..16].copy_from_slice(&self.d_ino.to_le_bytes());
        out[16..].copy_from_slice(&self.d_name);
        Some(Self::SIZE)
    }

    /// 从字节解析目录项
    pub fn read_from(buf: &[u8]) -> Option<Self> {
        let src = buf.get(..Self::SIZE)?;
        let mut dev = [0u8; 8];
        let mut ino = [0u8; 8];
        let mut d_name = [0u8; DIRENT_NAME_LEN];
        dev.copy_from_slice(&src[..8]);
        ino.copy_from_slice(&src[8..16]);
        d_name.copy_from_slice(&src[16..]);
        Some(Self {
            d_dev: u64::from_le_bytes(dev),
            d_ino: u64::from_le_bytes(ino),
            d_name,
        })
    }
}
