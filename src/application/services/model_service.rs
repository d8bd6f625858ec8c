//! Model Service - 进程级模型单例
//!
//! 加载一次，之后通过 ModelHandle 显式传递给引擎

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::{Mutex, MutexGuard, OnceCell};

use crate::application::ports::{ModelError, SpeechModel, SpeechModelLoader};

/// 已加载模型的元信息
#[derive(Debug, Clone)]
pub struct ModelInfo {
    pub backend: &'static str,
    pub sample_rate: u32,
    pub device: String,
    pub loaded_at: DateTime<Utc>,
}

/// 模型句柄
///
/// 克隆廉价，所有克隆共享同一个模型实例和同一把锁
#[derive(Clone)]
pub struct ModelHandle {
    model: Arc<Mutex<Box<dyn SpeechModel>>>,
    info: Arc<ModelInfo>,
    closed: Arc<AtomicBool>,
}

impl ModelHandle {
    pub fn new(model: Box<dyn SpeechModel>, backend: &'static str) -> Self {
        let info = ModelInfo {
            backend,
            sample_rate: model.sample_rate(),
            device: model.device().to_string(),
            loaded_at: Utc::now(),
        };
        Self {
            model: Arc::new(Mutex::new(model)),
            info: Arc::new(info),
            closed: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn info(&self) -> &ModelInfo {
        &self.info
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// 获取模型独占访问权，所有生成在此串行化
    pub async fn lock(&self) -> MutexGuard<'_, Box<dyn SpeechModel>> {
        self.model.lock().await
    }
}

impl std::fmt::Debug for ModelHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelHandle")
            .field("info", &self.info)
            .field("closed", &self.is_closed())
            .finish()
    }
}

/// 模型服务
pub struct ModelService {
    loader: Arc<dyn SpeechModelLoader>,
    handle: OnceCell<ModelHandle>,
}

impl ModelService {
    pub fn new(loader: Arc<dyn SpeechModelLoader>) -> Self {
        Self {
            loader,
            handle: OnceCell::new(),
        }
    }

    /// 加载模型（幂等，并发调用时加载器只运行一次）
    pub async fn initialize(&self) -> Result<ModelHandle, ModelError> {
        let handle = self
            .handle
            .get_or_try_init(|| async {
                let backend = self.loader.backend();
                tracing::info!(backend, "Loading speech model");

                let model = self.loader.load().await.map_err(|e| {
                    tracing::error!(backend, error = %e, "Speech model load failed");
                    e
                })?;
                let handle = ModelHandle::new(model, backend);

                tracing::info!(
                    backend,
                    device = %handle.info().device,
                    sample_rate = handle.info().sample_rate,
                    "Speech model loaded"
                );
                Ok::<_, ModelError>(handle)
            })
            .await?;

        Ok(handle.clone())
    }

    /// 已加载的句柄
    pub fn handle(&self) -> Option<ModelHandle> {
        self.handle.get().cloned()
    }

    /// 释放模型，之后的生成请求返回 ModelUnavailable
    pub async fn shutdown(&self) -> Result<(), ModelError> {
        let Some(handle) = self.handle.get() else {
            return Ok(());
        };
        if handle.closed.swap(true, Ordering::AcqRel) {
            return Ok(());
        }

        let mut model = handle.lock().await;
        model.shutdown().await?;
        tracing::info!(backend = handle.info().backend, "Speech model released");
        Ok(())
    }
}
