//! 应用层错误定义
//!
//! 合成流程对外暴露的错误分类

use thiserror::Error;

use crate::application::ports::{EncodeError, ModelError};
use crate::domain::{AudioError, RequestError};

/// 合成错误
#[derive(Debug, Error)]
pub enum SynthesisError {
    /// 请求参数不合法，不重试
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// 语言不在白名单中
    #[error("Unsupported language: '{language}'")]
    UnsupportedLanguage {
        language: String,
        supported: Vec<&'static str>,
    },

    /// 模型生成失败，不重试
    #[error("Generation error: {0}")]
    GenerationError(String),

    /// 编码失败
    #[error("Encoding error: {0}")]
    EncodingError(String),

    /// 模型尚未加载或已关闭
    #[error("Model unavailable: {0}")]
    ModelUnavailable(String),

    /// 内部错误
    #[error("Internal error: {0}")]
    InternalError(String),
}

impl SynthesisError {
    /// 错误类型名（序列化到 error_type 字段）
    pub fn kind(&self) -> &'static str {
        match self {
            Self::ValidationError(_) => "ValidationError",
            Self::UnsupportedLanguage { .. } => "UnsupportedLanguageError",
            Self::GenerationError(_) => "GenerationError",
            Self::EncodingError(_) => "EncodingError",
            Self::ModelUnavailable(_) => "ModelUnavailableError",
            Self::InternalError(_) => "InternalError",
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::ValidationError(message.into())
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::InternalError(message.into())
    }
}

impl From<RequestError> for SynthesisError {
    fn from(err: RequestError) -> Self {
        match err {
            RequestError::Validation(message) => Self::ValidationError(message),
            RequestError::UnsupportedLanguage {
                language,
                supported,
            } => Self::UnsupportedLanguage {
                language,
                supported,
            },
        }
    }
}

impl From<ModelError> for SynthesisError {
    fn from(err: ModelError) -> Self {
        Self::GenerationError(err.to_string())
    }
}

impl From<EncodeError> for SynthesisError {
    fn from(err: EncodeError) -> Self {
        Self::EncodingError(err.to_string())
    }
}

impl From<AudioError> for SynthesisError {
    fn from(err: AudioError) -> Self {
        Self::InternalError(err.to_string())
    }
}
