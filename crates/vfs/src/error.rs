//! VFS 错误类型
//!
//! 定义了与 POSIX 兼容的文件系统错误码，可通过 [`FsError::to_errno()`] 转换为系统调用错误码。
//! 驱动返回的错误原样向上传递，VFS 自身不做重试。

use uapi::errno;

/// VFS 错误类型
///
/// 各错误码对应标准 POSIX errno 值。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FsError {
    // 文件/目录相关
    /// 文件不存在 (-ENOENT)
    NotFound,
    /// 文件或挂载点已存在 (-EEXIST)
    AlreadyExists,
    /// 不是目录 (-ENOTDIR)
    NotDirectory,
    /// 是目录 (-EISDIR)
    IsDirectory,
    /// 目录非空 (-ENOTEMPTY)
    DirectoryNotEmpty,
    /// 对象正被使用，例如文件系统根 (-EBUSY)
    Busy,

    // 权限相关
    /// 权限被拒绝 (-EACCES)
    PermissionDenied,

    // 文件句柄相关
    /// 句柄已关闭或缺少所需的读写能力 (-EBADF)
    BadFileDescriptor,

    // 参数相关
    /// 无效参数，也用于驱动缺少对应能力 (-EINVAL)
    InvalidArgument,
    /// 文件名过长 (-ENAMETOOLONG)
    NameTooLong,

    // 文件系统 / 设备相关
    /// 设备空间不足 (-ENOSPC)
    NoSpace,
    /// I/O 错误 (-EIO)
    IoError,
    /// 没有对应名字的文件系统驱动 (-ENODEV)
    NoDevice,
    /// 内存分配失败 (-ENOMEM)
    OutOfMemory,

    // 管道相关
    /// 管道破裂 (-EPIPE)
    BrokenPipe,

    // 其他
    /// 操作不支持 (-EOPNOTSUPP)
    NotSupported,
}

impl FsError {
    /// 转换为系统调用错误码（负数）
    pub fn to_errno(&self) -> isize {
        let code = match self {
            FsError::NotFound => errno::ENOENT,
            FsError::AlreadyExists => errno::EEXIST,
            FsError::NotDirectory => errno::ENOTDIR,
            FsError::IsDirectory => errno::EISDIR,
            FsError::DirectoryNotEmpty => errno::ENOTEMPTY,
            FsError::Busy => errno::EBUSY,
            FsError::PermissionDenied => errno::EACCES,
            FsError::BadFileDescriptor => errno::EBADF,
            FsError::InvalidArgument => errno::EINVAL,
            FsError::NameTooLong => errno::ENAMETOOLONG,
            FsError::NoSpace => errno::ENOSPC,
            FsError::IoError => errno::EIO,
            FsError::NoDevice => errno::ENODEV,
            FsError::OutOfMemory => errno::ENOMEM,
            FsError::BrokenPipe => errno::EPIPE,
            FsError::NotSupported => errno::EOPNOTSUPP,
        };
        -(code as isize)
    }
}

impl From<alloc::collections::TryReserveError> for FsError {
    fn from(_: alloc::collections::TryReserveError) -> Self {
        FsError::OutOfMemory
    }
}

impl From<hashbrown::TryReserveError> for FsError {
    fn from(_: hashbrown::TryReserveError) -> Self {
        FsError::OutOfMemory
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_errno_values() {
        assert_eq!(FsError::NotFound.to_errno(), -2);
        assert_eq!(FsError::AlreadyExists.to_errno(), -17);
        assert_eq!(FsError::DirectoryNotEmpty.to_errno(), -39);
        assert_eq!(FsError::NotSupported.to_errno(), -95);
        assert_eq!(FsError::OutOfMemory.to_errno(), -12);
    }
}
