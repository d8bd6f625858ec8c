//! HTTP Routes
//!
//! API Endpoints:
//! - /api/ping        GET   存活检查
//! - /api/health      GET   模型状态
//! - /api/languages   GET   支持的语言
//! - /api/tts         POST  合成，返回原始音频
//! - /api/tts/job     POST  作业式合成，返回 JSON

use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;

use super::handlers;
use super::state::AppState;

/// 创建所有路由
pub fn create_routes() -> Router<Arc<AppState>> {
    Router::new().nest("/api", api_routes())
}

/// API 路由
fn api_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/ping", get(handlers::ping))
        .route("/health", get(handlers::health))
        .route("/languages", get(handlers::languages))
        .route("/tts", post(handlers::synthesize))
        .route("/tts/job", post(handlers::synthesize_job))
}
