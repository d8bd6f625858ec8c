//! TTS Handlers
//!
//! - POST /api/tts      原始音频 + X-* 元数据头
//! - POST /api/tts/job  `{ "input": {...} }` 作业，结果为 JSON（音频 Base64）

use axum::{
    body::{Body, Bytes},
    extract::State,
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::Value;
use std::sync::Arc;

use crate::application::{SynthesisError, SynthesisResponse};
use crate::infrastructure::http::dto::{adapt_input, TtsJobError, TtsJobResult};
use crate::infrastructure::http::error::ApiError;
use crate::infrastructure::http::state::AppState;

fn parse_body(body: &Bytes) -> Result<Value, SynthesisError> {
    serde_json::from_slice(body)
        .map_err(|e| SynthesisError::validation(format!("Invalid JSON body: {}", e)))
}

/// 头部值只允许可见 ASCII
fn header_value(value: &str) -> HeaderValue {
    let sanitized: String = value
        .chars()
        .map(|c| if c.is_ascii_graphic() || c == ' ' { c } else { '?' })
        .collect();
    HeaderValue::from_str(&sanitized).unwrap_or_else(|_| HeaderValue::from_static("?"))
}

fn audio_response(result: SynthesisResponse) -> Result<Response, ApiError> {
    let mut builder = Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, result.mime_type)
        .header(header::CONTENT_LENGTH, result.size_bytes)
        .header("X-Cache-Hit", result.cache_hit.to_string())
        .header("X-Cache-Key", header_value(&result.cache_key))
        .header("X-Device", header_value(&result.device))
        .header("X-Chunks-Processed", result.chunks_processed)
        .header("X-Generation-Ms", result.generation_time_ms)
        .header("X-Total-Ms", result.total_time_ms)
        .header("X-Language", header_value(&result.language))
        .header("X-Voice", header_value(&result.voice));

    if let Some(duration_ms) = result.audio_duration_ms {
        builder = builder.header("X-Duration-Ms", duration_ms);
    }

    builder
        .body(Body::from(result.audio))
        .map_err(|e| ApiError(SynthesisError::internal(format!("response build failed: {}", e))))
}

/// 合成并直接返回音频
pub async fn synthesize(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<Response, ApiError> {
    let input = parse_body(&body)?;
    let command = adapt_input(&input)?;
    let result = state.synthesize_handler.handle(command).await?;
    audio_response(result)
}

async fn run_job(state: &AppState, body: &Bytes) -> Result<TtsJobResult, SynthesisError> {
    let job = parse_body(body)?;
    let input = job
        .get("input")
        .ok_or_else(|| SynthesisError::validation("Missing 'input' field"))?;
    let command = adapt_input(input)?;
    let result = state.synthesize_handler.handle(command).await?;
    Ok(TtsJobResult::from(result))
}

/// 作业接口，任何失败都以 `{error, error_type}` 返回
pub async fn synthesize_job(State(state): State<Arc<AppState>>, body: Bytes) -> Response {
    match run_job(&state, &body).await {
        Ok(result) => Json(result).into_response(),
        Err(e) => {
            match &e {
                SynthesisError::ValidationError(_) | SynthesisError::UnsupportedLanguage { .. } => {
                    tracing::warn!(error_type = e.kind(), error = %e, "Job rejected")
                }
                _ => tracing::error!(error_type = e.kind(), error = %e, "Job failed"),
            }
            Json(TtsJobError::from(&e)).into_response()
        }
    }
}
