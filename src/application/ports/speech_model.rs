//! Speech Model Port - 语音合成模型抽象
//!
//! 模型实例由 ModelService 持有，应用层只通过该 trait 调用

use std::path::PathBuf;

use async_trait::async_trait;
use thiserror::Error;

/// 模型错误
#[derive(Debug, Error)]
pub enum ModelError {
    #[error("Model load failed: {0}")]
    LoadFailed(String),

    #[error("Voice reference unavailable: {0}")]
    VoiceUnavailable(String),

    #[error("Inference failed: {0}")]
    InferenceFailed(String),

    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Request timeout")]
    Timeout,

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

/// 单次生成参数（不含文本）
#[derive(Debug, Clone)]
pub struct GenerationParams {
    /// 参考音频文件路径，None 使用模型内置音色
    pub voice_path: Option<PathBuf>,
    pub language: String,
    pub exaggeration: f32,
    pub temperature: f32,
    pub cfg_weight: f32,
}

/// 已加载的语音模型
///
/// 调用方负责串行化访问（`&mut self`）
#[async_trait]
pub trait SpeechModel: Send {
    /// 原生输出采样率
    fn sample_rate(&self) -> u32;

    /// 运行设备标识（cpu / cuda / 远程服务报告值）
    fn device(&self) -> &str;

    /// 设置随机种子，None 表示使用熵源
    fn set_seed(&mut self, seed: Option<u64>);

    /// 生成单个分块的波形（单声道 f32）
    async fn generate(
        &mut self,
        text: &str,
        params: &GenerationParams,
    ) -> Result<Vec<f32>, ModelError>;

    /// 释放模型资源
    async fn shutdown(&mut self) -> Result<(), ModelError> {
        Ok(())
    }
}

/// 模型加载器
///
/// 由配置选择具体后端，每个进程只调用一次
#[async_trait]
pub trait SpeechModelLoader: Send + Sync {
    /// 后端名称（日志用）
    fn backend(&self) -> &'static str;

    async fn load(&self) -> Result<Box<dyn SpeechModel>, ModelError>;
}
