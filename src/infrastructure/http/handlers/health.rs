//! Health / Languages Handlers

use axum::{extract::State, Json};
use std::sync::Arc;

use crate::domain::SUPPORTED_LANGUAGES;
use crate::infrastructure::http::dto::{ApiResponse, HealthResponse, LanguagesResponse};
use crate::infrastructure::http::state::AppState;

/// 模型状态
pub async fn health(State(state): State<Arc<AppState>>) -> Json<ApiResponse<HealthResponse>> {
    let cache_size = state.synthesize_handler.cache_entries();
    let response = match state.model_service.handle() {
        Some(handle) if !handle.is_closed() => {
            let info = handle.info();
            HealthResponse {
                status: "ok",
                model_loaded: true,
                backend: Some(info.backend),
                device: Some(info.device.clone()),
                sample_rate: Some(info.sample_rate),
                loaded_at: Some(info.loaded_at.to_rfc3339()),
                languages: SUPPORTED_LANGUAGES.len(),
                cache_size,
            }
        }
        _ => HealthResponse {
            status: "unavailable",
            model_loaded: false,
            backend: None,
            device: None,
            sample_rate: None,
            loaded_at: None,
            languages: SUPPORTED_LANGUAGES.len(),
            cache_size,
        },
    };

    Json(ApiResponse::success(response))
}

/// 支持的语言列表
pub async fn languages(
    State(state): State<Arc<AppState>>,
) -> Json<ApiResponse<LanguagesResponse>> {
    Json(ApiResponse::success(LanguagesResponse {
        languages: SUPPORTED_LANGUAGES.to_vec(),
        default: state.synthesize_handler.defaults().language.clone(),
    }))
}
