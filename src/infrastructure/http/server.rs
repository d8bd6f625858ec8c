//! HTTP Server
//!
//! Axum HTTP 服务器启动和配置

use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::middleware;
use axum::Router;
use http::header::CONTENT_TYPE;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use super::middleware::request_context_middleware;
use super::routes::create_routes;
use super::state::AppState;

/// 服务器配置
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// 请求体上限（内嵌参考音频以 Base64 传输）
    pub body_limit_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            body_limit_bytes: 20 * 1024 * 1024,
        }
    }
}

impl ServerConfig {
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// HTTP 服务器
pub struct HttpServer {
    config: ServerConfig,
    state: Arc<AppState>,
}

impl HttpServer {
    pub fn new(config: ServerConfig, state: Arc<AppState>) -> Self {
        Self { config, state }
    }

    /// 构建 Router
    pub fn router(&self) -> Router {
        // 音频元数据通过 X-* 头返回，需要对浏览器暴露
        let cors = CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers([CONTENT_TYPE])
            .expose_headers(Any)
            .max_age(std::time::Duration::from_secs(3600));

        create_routes()
            .layer(DefaultBodyLimit::max(self.config.body_limit_bytes))
            .layer(middleware::from_fn(request_context_middleware))
            .layer(TraceLayer::new_for_http())
            .layer(cors)
            .with_state(self.state.clone())
    }

    /// 启动服务器（带优雅关闭）
    pub async fn run_with_shutdown<F>(self, shutdown_signal: F) -> Result<(), std::io::Error>
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let router = self.router();
        let addr = self.config.addr();

        let listener = TcpListener::bind(&addr).await?;
        info!(addr = %listener.local_addr()?, "HTTP server listening");

        axum::serve(listener, router)
            .with_graceful_shutdown(shutdown_signal)
            .await?;

        info!("HTTP server stopped");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::{
        AudioPostProcessor, ModelService, PostProcessorConfig, SynthesisDefaults,
        SynthesisEngine, SynthesizeHandler,
    };
    use crate::infrastructure::adapters::{FakeModelConfig, FakeSpeechModelLoader, PcmEncoder};
    use crate::infrastructure::persistence::{FileAudioCache, MemoryTierConfig, TieredAudioCache};
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use base64::Engine;
    use serde_json::{json, Value};
    use tempfile::TempDir;
    use tower::util::ServiceExt;

    async fn test_router() -> (Router, TempDir, Arc<ModelService>) {
        let dir = tempfile::tempdir().unwrap();
        let model_service = Arc::new(ModelService::new(Arc::new(FakeSpeechModelLoader::new(
            FakeModelConfig::default(),
        ))));
        let engine = Arc::new(SynthesisEngine::new(model_service.initialize().await.unwrap()));
        let post_processor = Arc::new(AudioPostProcessor::new(
            Arc::new(PcmEncoder::new(128)),
            PostProcessorConfig::default(),
        ));
        let cache = Arc::new(TieredAudioCache::new(
            Arc::new(FileAudioCache::new(dir.path()).await.unwrap()),
            MemoryTierConfig {
                capacity: std::num::NonZeroUsize::new(8).unwrap(),
                ttl: std::time::Duration::from_secs(3600),
            },
        ));
        let handler =
            SynthesizeHandler::new(engine, post_processor, cache, SynthesisDefaults::default());
        let state = Arc::new(AppState::new(model_service.clone(), handler));

        (
            HttpServer::new(ServerConfig::default(), state).router(),
            dir,
            model_service,
        )
    }

    fn post_json(uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn json_body(response: axum::response::Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_ping() {
        let (router, _dir, _) = test_router().await;
        let request = Request::builder().uri("/api/ping").body(Body::empty()).unwrap();
        let body = json_body(router.oneshot(request).await.unwrap()).await;
        assert_eq!(body["status"], "ok");
        assert_eq!(body["service"], "narrate");
    }

    #[tokio::test]
    async fn test_health_reports_model_then_shutdown() {
        let (router, _dir, model_service) = test_router().await;

        let request = Request::builder().uri("/api/health").body(Body::empty()).unwrap();
        let body = json_body(router.clone().oneshot(request).await.unwrap()).await;
        assert_eq!(body["errno"], 0);
        assert_eq!(body["data"]["model_loaded"], true);
        assert_eq!(body["data"]["device"], "cpu");
        assert_eq!(body["data"]["sample_rate"], 24000);
        assert_eq!(body["data"]["languages"], 23);
        assert_eq!(body["data"]["cache_size"], 0);

        let request = post_json("/api/tts", json!({ "text": "Cached once.", "format": "wav" }));
        assert_eq!(router.clone().oneshot(request).await.unwrap().status(), StatusCode::OK);
        let request = Request::builder().uri("/api/health").body(Body::empty()).unwrap();
        let body = json_body(router.clone().oneshot(request).await.unwrap()).await;
        assert_eq!(body["data"]["cache_size"], 1);

        model_service.shutdown().await.unwrap();
        let request = Request::builder().uri("/api/health").body(Body::empty()).unwrap();
        let body = json_body(router.oneshot(request).await.unwrap()).await;
        assert_eq!(body["data"]["status"], "unavailable");
        assert_eq!(body["data"]["cache_size"], 1);
    }

    #[tokio::test]
    async fn test_languages() {
        let (router, _dir, _) = test_router().await;
        let request = Request::builder().uri("/api/languages").body(Body::empty()).unwrap();
        let body = json_body(router.oneshot(request).await.unwrap()).await;
        assert_eq!(body["data"]["default"], "en");
        assert_eq!(body["data"]["languages"].as_array().unwrap().len(), 23);
    }

    #[tokio::test]
    async fn test_tts_returns_audio_with_metadata_headers() {
        let (router, _dir, _) = test_router().await;
        let request = post_json("/api/tts", json!({ "text": "Hello world.", "format": "wav" }));

        let response = router.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let headers = response.headers().clone();
        assert_eq!(headers["content-type"], "audio/wav");
        assert_eq!(headers["x-cache-hit"], "false");
        assert_eq!(headers["x-chunks-processed"], "1");
        assert_eq!(headers["x-device"], "cpu");
        assert_eq!(headers["x-voice"], "default");
        assert!(headers.contains_key("x-duration-ms"));
        let audio = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&audio[0..4], b"RIFF");

        let request = post_json("/api/tts", json!({ "text_input": "Hello world.", "format": "wav" }));
        let response = router.oneshot(request).await.unwrap();
        assert_eq!(response.headers()["x-cache-hit"], "true");
        assert_eq!(response.headers()["x-chunks-processed"], "0");
    }

    #[tokio::test]
    async fn test_tts_validation_error_envelope() {
        let (router, _dir, _) = test_router().await;
        let request = post_json("/api/tts", json!({ "text": "Hi", "speed": 3.0 }));
        let body = json_body(router.oneshot(request).await.unwrap()).await;
        assert_eq!(body["errno"], 400);
        assert_eq!(body["error_type"], "ValidationError");
    }

    #[tokio::test]
    async fn test_tts_malformed_json() {
        let (router, _dir, _) = test_router().await;
        let request = Request::builder()
            .method("POST")
            .uri("/api/tts")
            .body(Body::from("{not json"))
            .unwrap();
        let body = json_body(router.oneshot(request).await.unwrap()).await;
        assert_eq!(body["errno"], 400);
    }

    #[tokio::test]
    async fn test_job_success_returns_base64_audio() {
        let (router, _dir, _) = test_router().await;
        let request = post_json(
            "/api/tts/job",
            json!({ "input": { "prompt": "Job text.", "format": "wav", "seed_num_input": 5 } }),
        );
        let body = json_body(router.oneshot(request).await.unwrap()).await;

        assert_eq!(body["mimetype"], "audio/wav");
        assert_eq!(body["cache_hit"], false);
        assert_eq!(body["cache_key"].as_str().unwrap().len(), 16);
        let audio = base64::engine::general_purpose::STANDARD
            .decode(body["audio"].as_str().unwrap())
            .unwrap();
        assert_eq!(audio.len() as u64, body["size_bytes"].as_u64().unwrap());
    }

    #[tokio::test]
    async fn test_job_errors_are_structured() {
        let (router, _dir, _) = test_router().await;

        let request = post_json("/api/tts/job", json!({ "text": "no input wrapper" }));
        let body = json_body(router.clone().oneshot(request).await.unwrap()).await;
        assert_eq!(body["error_type"], "ValidationError");

        let request = post_json("/api/tts/job", json!({ "input": { "text": "Hola", "language": "xx" } }));
        let body = json_body(router.oneshot(request).await.unwrap()).await;
        assert_eq!(body["error_type"], "UnsupportedLanguageError");
        assert_eq!(body["supported_languages"].as_array().unwrap().len(), 23);
    }
}
