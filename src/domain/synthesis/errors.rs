//! Synthesis Context - Errors

use thiserror::Error;

/// 请求校验错误
///
/// 在任何模型调用之前产生
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RequestError {
    #[error("{0}")]
    Validation(String),

    #[error("Unsupported language: '{language}'. Supported: {}", supported.join(", "))]
    UnsupportedLanguage {
        language: String,
        supported: Vec<&'static str>,
    },
}

impl RequestError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }
}
