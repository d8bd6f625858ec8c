//! File Cache - 文件系统音频缓存
//!
//! 布局: `{cache_dir}/{cache_key}.{format}`，不维护索引

use async_trait::async_trait;
use std::io::Write;
use std::path::{Path, PathBuf};
use tokio::fs;

use crate::application::ports::{AudioCachePort, CacheError};
use crate::domain::{CacheKey, OutputFormat};

/// 文件系统音频缓存
pub struct FileAudioCache {
    /// 缓存根目录
    base_dir: PathBuf,
}

impl FileAudioCache {
    /// 创建缓存，目录不存在时自动创建
    pub async fn new(base_dir: impl AsRef<Path>) -> Result<Self, CacheError> {
        let base_dir = base_dir.as_ref().to_path_buf();

        fs::create_dir_all(&base_dir)
            .await
            .map_err(|e| CacheError::IoError(e.to_string()))?;

        Ok(Self { base_dir })
    }

    pub fn entry_path(&self, key: &CacheKey, format: OutputFormat) -> PathBuf {
        self.base_dir
            .join(format!("{}.{}", key.as_str(), format.extension()))
    }
}

#[async_trait]
impl AudioCachePort for FileAudioCache {
    async fn get(
        &self,
        key: &CacheKey,
        format: OutputFormat,
    ) -> Result<Option<Vec<u8>>, CacheError> {
        let path = self.entry_path(key, format);

        match fs::read(&path).await {
            Ok(data) => Ok(Some(data)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(CacheError::IoError(format!("{}: {}", path.display(), e))),
        }
    }

    async fn put(
        &self,
        key: &CacheKey,
        format: OutputFormat,
        data: &[u8],
    ) -> Result<(), CacheError> {
        let path = self.entry_path(key, format);
        let base_dir = self.base_dir.clone();
        let data = data.to_vec();
        let size = data.len();

        // 先写同目录临时文件再原子重命名，读者不会看到半写入的条目
        let target = path.clone();
        tokio::task::spawn_blocking(move || -> std::io::Result<()> {
            let mut tmp = tempfile::Builder::new()
                .prefix(".partial-")
                .tempfile_in(&base_dir)?;
            tmp.write_all(&data)?;
            tmp.flush()?;
            tmp.persist(&target).map_err(|e| e.error)?;
            Ok(())
        })
        .await
        .map_err(|e| CacheError::IoError(format!("cache write task failed: {}", e)))?
        .map_err(|e| CacheError::IoError(format!("{}: {}", path.display(), e)))?;

        tracing::debug!(path = %path.display(), size, "Cache entry written");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::synthesis::test_draft;
    use crate::domain::{derive_key, SynthesisRequest};

    fn key(text: &str) -> CacheKey {
        derive_key(&SynthesisRequest::validate(test_draft(text)).unwrap())
    }

    #[tokio::test]
    async fn test_put_and_get() {
        let dir = tempfile::tempdir().unwrap();
        let cache = FileAudioCache::new(dir.path()).await.unwrap();
        let k = key("hello");

        assert!(cache.get(&k, OutputFormat::Mp3).await.unwrap().is_none());

        cache.put(&k, OutputFormat::Mp3, b"ID3fake").await.unwrap();
        let data = cache.get(&k, OutputFormat::Mp3).await.unwrap();
        assert_eq!(data.as_deref(), Some(&b"ID3fake"[..]));

        // 格式是路径的一部分
        assert!(cache.get(&k, OutputFormat::Wav).await.unwrap().is_none());
        assert!(cache
            .entry_path(&k, OutputFormat::Mp3)
            .ends_with(format!("{}.mp3", k.as_str())));
    }

    #[tokio::test]
    async fn test_creates_missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("a").join("b");
        let cache = FileAudioCache::new(&nested).await.unwrap();
        assert!(nested.is_dir());
        assert!(cache
            .entry_path(&key("nested"), OutputFormat::Wav)
            .starts_with(&nested));
    }

    #[tokio::test]
    async fn test_last_writer_wins_without_leftovers() {
        let dir = tempfile::tempdir().unwrap();
        let cache = FileAudioCache::new(dir.path()).await.unwrap();
        let k = key("race");

        cache.put(&k, OutputFormat::Wav, b"first").await.unwrap();
        cache.put(&k, OutputFormat::Wav, b"second").await.unwrap();

        let data = cache.get(&k, OutputFormat::Wav).await.unwrap().unwrap();
        assert_eq!(data, b"second");
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[tokio::test]
    async fn test_deleted_entry_is_miss() {
        let dir = tempfile::tempdir().unwrap();
        let cache = FileAudioCache::new(dir.path()).await.unwrap();
        let k = key("gone");

        cache.put(&k, OutputFormat::Wav, b"data").await.unwrap();
        std::fs::remove_file(cache.entry_path(&k, OutputFormat::Wav)).unwrap();

        assert!(cache.get(&k, OutputFormat::Wav).await.unwrap().is_none());
    }
}
