//! Persistence Layer - 数据持久化
//!
//! 文件系统音频缓存，可选内存层

mod file_cache;
mod tiered_cache;

pub use file_cache::FileAudioCache;
pub use tiered_cache::{MemoryTierConfig, TieredAudioCache};
