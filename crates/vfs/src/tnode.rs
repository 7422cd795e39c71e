//! Tnode：目录树中的命名边
//!
//! 名字由 Tnode 持有，Inode 只记录父 Tnode。同一个 Inode 在
//! 不同路径下出现时（例如被降级为挂载点的旧根）由不同的 Tnode 指向。

use alloc::string::String;
use alloc::sync::Arc;
use core::fmt;

use crate::Inode;

/// 文件系统根的 Tnode 名字
pub const ROOT_NAME: &str = "/";

/// 命名边：`(名字, 对 Inode 的所有权引用)`
pub struct Tnode {
    name: String,
    inode: Arc<Inode>,
}

impl Tnode {
    pub(crate) fn new(name: String, inode: Arc<Inode>) -> Self {
        Self { name, inode }
    }

    /// 名字
    pub fn name(&self) -> &str {
        &self.name
    }

    /// 指向的 Inode
    pub fn inode(&self) -> &Arc<Inode> {
        &self.inode
    }
}

impl fmt::Debug for Tnode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tnode")
            .field("name", &self.name)
            .field("inode", &self.inode.id())
            .finish()
    }
}
