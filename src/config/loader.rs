//! Configuration Loader
//!
//! 实现多源配置加载与合并逻辑
//!
//! 优先级（从高到低）：
//! 1. 环境变量
//! 2. 配置文件（config.toml）
//! 3. 默认值

use config::{Config, ConfigError as ConfigCrateError, Environment, File};
use std::path::Path;
use thiserror::Error;

use super::types::{AppConfig, ModelBackend};
use crate::domain::synthesis::{EXPRESSIVENESS_RANGE, GUIDANCE_RANGE, TEMPERATURE_RANGE};
use crate::domain::LanguageCode;
use crate::infrastructure::adapters::PcmEncoder;

/// 配置加载错误
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    LoadError(String),

    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}

impl From<ConfigCrateError> for ConfigError {
    fn from(err: ConfigCrateError) -> Self {
        ConfigError::LoadError(err.to_string())
    }
}

/// 配置文件搜索路径
const CONFIG_FILE_NAMES: &[&str] = &["config", "config.local"];

/// 加载应用配置
///
/// 按优先级从高到低合并配置：
/// 1. 环境变量（前缀 `NARRATE_`，层级分隔符 `__`）
/// 2. 配置文件（config.toml 或 config.local.toml）
/// 3. 默认值
///
/// # 环境变量示例
/// - `NARRATE_SERVER__PORT=8080`
/// - `NARRATE_MODEL__BACKEND=http`
/// - `NARRATE_MODEL__URL=http://gpu-box:8000`
/// - `NARRATE_CACHE__DIR=/data/tts-cache`
pub fn load_config() -> Result<AppConfig, ConfigError> {
    load_config_from_path(None)
}

/// 从指定路径加载配置
///
/// # 参数
/// - `config_path` - 可选的配置文件路径，如果为 None 则使用默认搜索路径
pub fn load_config_from_path(config_path: Option<&Path>) -> Result<AppConfig, ConfigError> {
    let mut builder = Config::builder();

    // 1. 默认值（最低优先级）
    builder = builder
        .set_default("server.host", "0.0.0.0")?
        .set_default("server.port", 8080)?
        .set_default("model.backend", "fake")?
        .set_default("model.url", "http://localhost:8000")?
        .set_default("model.timeout_secs", 300)?
        .set_default("model.device", "auto")?
        .set_default("synthesis.max_chars_per_chunk", 500)?
        .set_default("synthesis.default_format", "mp3")?
        .set_default("synthesis.default_language", "en")?
        .set_default("cache.dir", "data/cache")?
        .set_default("cache.memory_capacity", 100)?
        .set_default("cache.memory_ttl_secs", 3600)?
        .set_default("log.level", "info")?
        .set_default("log.json", false)?;

    // 2. 配置文件
    if let Some(path) = config_path {
        builder = builder.add_source(File::from(path).required(true));
    } else {
        for name in CONFIG_FILE_NAMES {
            builder = builder.add_source(File::with_name(name).required(false));
        }
    }

    // 3. 环境变量（最高优先级）
    // 例如: NARRATE_AUDIO__TRIM_SILENCE=false
    builder = builder.add_source(
        Environment::with_prefix("NARRATE")
            .prefix_separator("_")
            .separator("__")
            .try_parsing(true),
    );

    let config = builder.build()?;

    let app_config: AppConfig = config.try_deserialize().map_err(|e| {
        ConfigError::ParseError(format!("Failed to deserialize config: {}", e))
    })?;

    validate_config(&app_config)?;

    Ok(app_config)
}

/// 验证配置有效性
fn validate_config(config: &AppConfig) -> Result<(), ConfigError> {
    let invalid = |msg: &str| Err(ConfigError::ValidationError(msg.to_string()));

    if config.server.port == 0 {
        return invalid("Server port cannot be 0");
    }

    if config.model.backend == ModelBackend::Http && config.model.url.trim().is_empty() {
        return invalid("Model URL cannot be empty for the http backend");
    }

    if !matches!(config.model.device.as_str(), "auto" | "cpu" | "cuda") {
        return Err(ConfigError::ValidationError(format!(
            "Unknown model device: {} (expected auto, cpu or cuda)",
            config.model.device
        )));
    }

    if config.model.backend == ModelBackend::Fake && config.model.sample_rate == 0 {
        return invalid("Model sample rate cannot be 0");
    }

    if config.synthesis.max_chars_per_chunk == 0 {
        return invalid("max_chars_per_chunk cannot be 0");
    }

    LanguageCode::parse(&config.synthesis.default_language)
        .map_err(|e| ConfigError::ValidationError(e.to_string()))?;

    let synthesis = &config.synthesis;
    let defaults = [
        ("default_exaggeration", synthesis.default_exaggeration, &EXPRESSIVENESS_RANGE),
        ("default_temperature", synthesis.default_temperature, &TEMPERATURE_RANGE),
        ("default_guidance_weight", synthesis.default_guidance_weight, &GUIDANCE_RANGE),
    ];
    for (name, value, range) in defaults {
        if !range.contains(&value) {
            return Err(ConfigError::ValidationError(format!(
                "{} must be between {} and {}, got {}",
                name,
                range.start(),
                range.end(),
                value
            )));
        }
    }

    if !PcmEncoder::supports_bitrate(config.audio.mp3_bitrate_kbps) {
        return Err(ConfigError::ValidationError(format!(
            "Unsupported mp3_bitrate_kbps: {}",
            config.audio.mp3_bitrate_kbps
        )));
    }

    if config.cache.dir.as_os_str().is_empty() {
        return invalid("Cache directory cannot be empty");
    }

    let threshold = config.audio.silence_threshold;
    if !(threshold > 0.0 && threshold < 1.0) {
        return invalid("silence_threshold must be between 0.0 and 1.0");
    }

    if config.audio.silence_window == 0 {
        return invalid("silence_window cannot be 0");
    }

    Ok(())
}

/// 打印配置信息（用于启动时日志）
pub fn print_config(config: &AppConfig) {
    tracing::info!("=== Application Configuration ===");
    tracing::info!("Server: {}", config.server.addr());
    tracing::info!("Model Backend: {:?}", config.model.backend);
    if config.model.backend == ModelBackend::Http {
        tracing::info!("Model URL: {}", config.model.url);
        tracing::info!("Model Timeout: {}s", config.model.timeout_secs);
    }
    tracing::info!("Model Device: {}", config.model.device);
    if let Some(dir) = &config.model.weights_dir {
        tracing::info!("Model Weights: {}", dir.display());
    }
    tracing::info!(
        "Synthesis Defaults: language={} format={} max_chars={}",
        config.synthesis.default_language,
        config.synthesis.default_format,
        config.synthesis.max_chars_per_chunk
    );
    if let Some(voice) = &config.synthesis.default_voice_path {
        tracing::info!("Default Voice: {}", voice.display());
    }
    tracing::info!(
        "Audio: mp3={}kbps trim_silence={}",
        config.audio.mp3_bitrate_kbps,
        config.audio.trim_silence
    );
    tracing::info!("Cache Directory: {}", config.cache.dir.display());
    match config.cache.memory_capacity() {
        Some(capacity) => tracing::info!(
            "Memory Cache: capacity={} ttl={}s",
            capacity,
            config.cache.memory_ttl_secs
        ),
        None => tracing::info!("Memory Cache: disabled"),
    }
    tracing::info!("Log Level: {}", config.log.level);
    tracing::info!("=================================");
}
