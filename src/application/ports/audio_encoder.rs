//! Audio Encoder Port - PCM → 容器格式

use thiserror::Error;

use crate::domain::{AudioSegment, OutputFormat};

#[derive(Debug, Error)]
pub enum EncodeError {
    #[error("Encoder initialization failed: {0}")]
    InitFailed(String),

    #[error("Encoding failed: {0}")]
    EncodingFailed(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

/// 音频编码器
///
/// CPU 密集，调用方应在阻塞线程池中执行
pub trait AudioEncoderPort: Send + Sync {
    fn encode(&self, audio: &AudioSegment, format: OutputFormat) -> Result<Vec<u8>, EncodeError>;

    /// 从已编码数据读取时长（仅能解析头部的格式返回 Some）
    fn probe_duration_ms(&self, data: &[u8], format: OutputFormat) -> Option<u64>;
}
