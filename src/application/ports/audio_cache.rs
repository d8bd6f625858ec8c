//! Audio Cache Port - 编码后音频的持久缓存
//!
//! 内容寻址，条目一经写入不再修改，核心逻辑不做淘汰

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::{CacheKey, OutputFormat};

/// Audio Cache 错误
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("IO error: {0}")]
    IoError(String),
}

#[async_trait]
pub trait AudioCachePort: Send + Sync {
    /// 读取缓存条目，不存在时返回 None
    async fn get(
        &self,
        key: &CacheKey,
        format: OutputFormat,
    ) -> Result<Option<Vec<u8>>, CacheError>;

    /// 写入缓存条目
    ///
    /// 并发写入同一 key 时以最后一次为准
    async fn put(&self, key: &CacheKey, format: OutputFormat, data: &[u8])
        -> Result<(), CacheError>;

    /// 内存层中未过期的条目数，没有内存层时为 0
    fn memory_entries(&self) -> usize {
        0
    }
}
