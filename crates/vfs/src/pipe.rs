//! 匿名管道

use alloc::sync::Arc;

use uapi::fcntl::OpenFlags;

use crate::{File, FsError, Vfs};

impl Vfs {
    /// 创建管道，返回 `(读端, 写端)`
    ///
    /// 两个 File 共享同一个匿名 Inode，并且是它仅有的两个所有者；
    /// 不产生任何 Tnode，也不出现在路径命名空间中。
    pub fn create_pipe(&self) -> Result<(Arc<File>, Arc<File>), FsError> {
        let (id, desc) = self.pipes.alloc();
        let inode = self.store.get_or_create(id, desc)?;

        let reader = self.open_inode(&inode, OpenFlags::O_RDONLY)?;
        let writer = match self.open_inode(&inode, OpenFlags::O_WRONLY) {
            Ok(writer) => writer,
            Err(e) => {
                self.close(&reader)?;
                return Err(e);
            }
        };
        log::debug!("vfs: created pipe {:?}", id);
        Ok((reader, writer))
    }
}
