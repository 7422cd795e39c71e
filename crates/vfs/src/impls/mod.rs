//! VFS 自带的驱动实现

mod pipe_file;

pub use pipe_file::{PipeEnd, PipeFs, PipeNode};
