//! Mock 实现模块
//!
//! 提供架构与文件系统运行时的 Mock 实现，用于测试

pub mod arch;
pub mod fs;
