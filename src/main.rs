//! Narrate - 带缓存的语音合成服务

use std::sync::Arc;

use narrate::application::{
    AudioCachePort, AudioPostProcessor, ModelService, SpeechModelLoader, SynthesisEngine,
    SynthesizeHandler,
};
use narrate::config::{load_config, print_config, AppConfig, ModelBackend};
use narrate::infrastructure::adapters::{
    FakeModelConfig, FakeSpeechModelLoader, HttpModelConfig, HttpSpeechModelLoader, PcmEncoder,
};
use narrate::infrastructure::http::{AppState, HttpServer, ServerConfig};
use narrate::infrastructure::persistence::{FileAudioCache, MemoryTierConfig, TieredAudioCache};

fn init_tracing(config: &AppConfig) {
    let log_filter = format!(
        "{},narrate={},tower_http=debug",
        config.log.level, config.log.level
    );
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&log_filter));

    if config.log.json {
        tracing_subscriber::fmt().json().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

async fn build_cache(config: &AppConfig) -> anyhow::Result<Arc<dyn AudioCachePort>> {
    let file_cache: Arc<dyn AudioCachePort> = Arc::new(FileAudioCache::new(&config.cache.dir).await?);
    let Some(capacity) = config.cache.memory_capacity() else {
        return Ok(file_cache);
    };
    let tier = MemoryTierConfig {
        capacity,
        ttl: config.cache.memory_ttl(),
    };
    Ok(Arc::new(TieredAudioCache::new(file_cache, tier)))
}

fn build_loader(config: &AppConfig) -> Arc<dyn SpeechModelLoader> {
    let model = &config.model;
    match model.backend {
        ModelBackend::Fake => {
            let device = match model.device.as_str() {
                "auto" => "cpu".to_string(),
                other => other.to_string(),
            };
            Arc::new(FakeSpeechModelLoader::new(FakeModelConfig {
                sample_rate: model.sample_rate,
                device,
                weights_dir: model.weights_dir.clone(),
                ..Default::default()
            }))
        }
        ModelBackend::Http => {
            let http_config = HttpModelConfig {
                device: model.device.clone(),
                ..HttpModelConfig::new(&model.url).with_timeout(model.timeout_secs)
            };
            Arc::new(HttpSpeechModelLoader::new(http_config))
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 加载配置（优先级：环境变量 > 配置文件 > 默认值）
    let config = load_config().map_err(|e| anyhow::anyhow!("Failed to load config: {}", e))?;

    init_tracing(&config);

    tracing::info!("Narrate - TTS synthesis service");
    print_config(&config);

    // 模型在启动时加载，首个请求不承担加载延迟
    let model_service = Arc::new(ModelService::new(build_loader(&config)));
    let handle = model_service
        .initialize()
        .await
        .map_err(|e| anyhow::anyhow!("Failed to load model: {}", e))?;

    let cache = build_cache(&config).await?;
    let encoder = Arc::new(PcmEncoder::new(config.audio.mp3_bitrate_kbps));
    let post_processor = Arc::new(AudioPostProcessor::new(
        encoder,
        config.audio.post_processor(),
    ));
    let engine = Arc::new(SynthesisEngine::new(handle));

    let handler = SynthesizeHandler::new(
        engine,
        post_processor,
        cache,
        config.synthesis.defaults(),
    );
    let state = Arc::new(AppState::new(model_service.clone(), handler));

    let server_config = ServerConfig {
        host: config.server.host.clone(),
        port: config.server.port,
        body_limit_bytes: config.server.max_body_bytes,
    };
    let server = HttpServer::new(server_config, state);

    tracing::info!("Starting HTTP server...");

    server
        .run_with_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "Failed to listen for ctrl-c");
            }
            tracing::info!("Received shutdown signal");
        })
        .await?;

    model_service
        .shutdown()
        .await
        .map_err(|e| anyhow::anyhow!("Failed to release model: {}", e))?;

    tracing::info!("Server shutdown complete");

    Ok(())
}
