//! HTTP Error Handling

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::Value;

use crate::application::SynthesisError;

/// 统一错误响应格式
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub errno: i32,
    pub error: String,
    pub error_type: &'static str,
    pub data: Option<Value>,
}

/// 错误码定义
pub mod errno {
    pub const BAD_REQUEST: i32 = 400;
    pub const UNPROCESSABLE: i32 = 422;
    pub const INTERNAL_ERROR: i32 = 500;
    pub const BAD_GATEWAY: i32 = 502;
    pub const SERVICE_UNAVAILABLE: i32 = 503;
}

/// API 错误
#[derive(Debug)]
pub struct ApiError(pub SynthesisError);

impl ApiError {
    fn errno(&self) -> i32 {
        match &self.0 {
            SynthesisError::ValidationError(_) => errno::BAD_REQUEST,
            SynthesisError::UnsupportedLanguage { .. } => errno::UNPROCESSABLE,
            SynthesisError::GenerationError(_) => errno::BAD_GATEWAY,
            SynthesisError::ModelUnavailable(_) => errno::SERVICE_UNAVAILABLE,
            SynthesisError::EncodingError(_) | SynthesisError::InternalError(_) => {
                errno::INTERNAL_ERROR
            }
        }
    }
}

impl From<SynthesisError> for ApiError {
    fn from(e: SynthesisError) -> Self {
        Self(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let code = self.errno();
        let message = self.0.to_string();

        if code >= errno::INTERNAL_ERROR {
            tracing::error!(errno = code, error = %message, "Synthesis failed");
        } else {
            tracing::warn!(errno = code, error = %message, "Request rejected");
        }

        let data = match &self.0 {
            SynthesisError::UnsupportedLanguage { supported, .. } => {
                Some(serde_json::json!({ "supported_languages": supported }))
            }
            _ => None,
        };

        let body = ErrorResponse {
            errno: code,
            error: message,
            error_type: self.0.kind(),
            data,
        };

        (StatusCode::OK, Json(body)).into_response()
    }
}
