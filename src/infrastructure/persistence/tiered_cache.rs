//! Tiered Cache - 内存 LRU 层 + 持久层
//!
//! 读: 内存 → 持久层（命中后回填内存）
//! 写: 持久层 → 内存（持久层失败时内存仍保留该条目）

use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use lru::LruCache;

use crate::application::ports::{AudioCachePort, CacheError};
use crate::domain::{CacheKey, OutputFormat};

/// 内存层配置
#[derive(Debug, Clone, Copy)]
pub struct MemoryTierConfig {
    /// 最大条目数
    pub capacity: NonZeroUsize,
    /// 条目存活时间
    pub ttl: Duration,
}

struct MemoryEntry {
    data: Vec<u8>,
    inserted_at: Instant,
}

type EntryMap = LruCache<(CacheKey, OutputFormat), MemoryEntry>;

pub struct TieredAudioCache {
    persistent: Arc<dyn AudioCachePort>,
    memory: Mutex<EntryMap>,
    ttl: Duration,
}

impl TieredAudioCache {
    pub fn new(persistent: Arc<dyn AudioCachePort>, config: MemoryTierConfig) -> Self {
        Self {
            persistent,
            memory: Mutex::new(LruCache::new(config.capacity)),
            ttl: config.ttl,
        }
    }

    // 临界区内没有 await，也不会 panic，中毒后直接沿用数据
    fn memory(&self) -> MutexGuard<'_, EntryMap> {
        self.memory.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn is_expired(&self, entry: &MemoryEntry) -> bool {
        entry.inserted_at.elapsed() >= self.ttl
    }

    fn memory_get(&self, key: &CacheKey, format: OutputFormat) -> Option<Vec<u8>> {
        let mut memory = self.memory();
        let id = (key.clone(), format);

        let expired = match memory.get(&id) {
            Some(entry) if !self.is_expired(entry) => return Some(entry.data.clone()),
            Some(_) => true,
            None => false,
        };
        if expired {
            memory.pop(&id);
        }
        None
    }

    fn memory_put(&self, key: &CacheKey, format: OutputFormat, data: &[u8]) {
        self.memory().put(
            (key.clone(), format),
            MemoryEntry {
                data: data.to_vec(),
                inserted_at: Instant::now(),
            },
        );
    }
}

#[async_trait]
impl AudioCachePort for TieredAudioCache {
    async fn get(
        &self,
        key: &CacheKey,
        format: OutputFormat,
    ) -> Result<Option<Vec<u8>>, CacheError> {
        if let Some(data) = self.memory_get(key, format) {
            tracing::debug!(cache_key = %key.short(), "Memory cache hit");
            return Ok(Some(data));
        }

        let data = self.persistent.get(key, format).await?;
        if let Some(data) = &data {
            self.memory_put(key, format, data);
        }
        Ok(data)
    }

    async fn put(&self, key: &CacheKey, format: OutputFormat, data: &[u8])
        -> Result<(), CacheError> {
        let result = self.persistent.put(key, format, data).await;
        self.memory_put(key, format, data);
        result
    }

    fn memory_entries(&self) -> usize {
        self.memory()
            .iter()
            .filter(|(_, entry)| !self.is_expired(entry))
            .count()
    }
}
