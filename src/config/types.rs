//! Configuration Types
//!
//! 定义所有配置结构体

use serde::Deserialize;
use std::num::NonZeroUsize;
use std::path::PathBuf;
use std::time::Duration;

use crate::application::{PostProcessorConfig, SynthesisDefaults};
use crate::domain::{OutputFormat, TrimConfig, DEFAULT_MAX_CHARS};

/// 应用主配置
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    /// 服务器配置
    #[serde(default)]
    pub server: ServerConfig,

    /// 模型后端配置
    #[serde(default)]
    pub model: ModelConfig,

    /// 合成缺省参数
    #[serde(default)]
    pub synthesis: SynthesisConfig,

    /// 音频后处理配置
    #[serde(default)]
    pub audio: AudioConfig,

    /// 缓存配置
    #[serde(default)]
    pub cache: CacheConfig,

    /// 日志配置
    #[serde(default)]
    pub log: LogConfig,
}

/// 服务器配置
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// 监听地址
    #[serde(default = "default_host")]
    pub host: String,

    /// 监听端口
    #[serde(default = "default_port")]
    pub port: u16,

    /// 请求体上限（字节）
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_max_body_bytes() -> usize {
    20 * 1024 * 1024
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            max_body_bytes: default_max_body_bytes(),
        }
    }
}

impl ServerConfig {
    /// 获取服务器地址
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// 模型后端
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelBackend {
    /// 进程内确定性合成器
    #[default]
    Fake,
    /// 远程推理服务
    Http,
}

/// 模型配置
#[derive(Debug, Clone, Deserialize)]
pub struct ModelConfig {
    #[serde(default)]
    pub backend: ModelBackend,

    /// 推理服务基础 URL（http 后端）
    #[serde(default = "default_model_url")]
    pub url: String,

    /// 请求超时时间（秒）
    #[serde(default = "default_model_timeout")]
    pub timeout_secs: u64,

    /// auto / cpu / cuda
    #[serde(default = "default_device")]
    pub device: String,

    /// 本地权重目录（fake 后端加载前检查）
    #[serde(default)]
    pub weights_dir: Option<PathBuf>,

    /// fake 后端的采样率
    #[serde(default = "default_sample_rate")]
    pub sample_rate: u32,
}

fn default_model_url() -> String {
    "http://localhost:8000".to_string()
}

fn default_model_timeout() -> u64 {
    300
}

fn default_device() -> String {
    "auto".to_string()
}

fn default_sample_rate() -> u32 {
    24000
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            backend: ModelBackend::default(),
            url: default_model_url(),
            timeout_secs: default_model_timeout(),
            device: default_device(),
            weights_dir: None,
            sample_rate: default_sample_rate(),
        }
    }
}

/// 合成缺省参数
#[derive(Debug, Clone, Deserialize)]
pub struct SynthesisConfig {
    /// 每个文本块的最大字符数
    #[serde(default = "default_max_chars")]
    pub max_chars_per_chunk: usize,

    /// mp3 / wav
    #[serde(default)]
    pub default_format: OutputFormat,

    #[serde(default = "default_language")]
    pub default_language: String,

    #[serde(default = "default_exaggeration")]
    pub default_exaggeration: f32,

    #[serde(default = "default_temperature")]
    pub default_temperature: f32,

    #[serde(default = "default_guidance_weight")]
    pub default_guidance_weight: f32,

    /// 请求未指定参考音频时使用
    #[serde(default)]
    pub default_voice_path: Option<PathBuf>,
}

fn default_max_chars() -> usize {
    DEFAULT_MAX_CHARS
}

fn default_language() -> String {
    "en".to_string()
}

fn default_exaggeration() -> f32 {
    0.5
}

fn default_temperature() -> f32 {
    0.8
}

fn default_guidance_weight() -> f32 {
    0.5
}

impl Default for SynthesisConfig {
    fn default() -> Self {
        Self {
            max_chars_per_chunk: default_max_chars(),
            default_format: OutputFormat::default(),
            default_language: default_language(),
            default_exaggeration: default_exaggeration(),
            default_temperature: default_temperature(),
            default_guidance_weight: default_guidance_weight(),
            default_voice_path: None,
        }
    }
}

impl SynthesisConfig {
    /// 转换为命令处理器使用的缺省值
    pub fn defaults(&self) -> SynthesisDefaults {
        SynthesisDefaults {
            language: self.default_language.trim().to_lowercase(),
            format: self.default_format,
            exaggeration: self.default_exaggeration,
            temperature: self.default_temperature,
            guidance_weight: self.default_guidance_weight,
            voice_path: self.default_voice_path.clone(),
            max_chars_per_chunk: self.max_chars_per_chunk,
            ..Default::default()
        }
    }
}

/// 音频后处理配置
#[derive(Debug, Clone, Deserialize)]
pub struct AudioConfig {
    /// MP3 比特率（kbps）
    #[serde(default = "default_mp3_bitrate")]
    pub mp3_bitrate_kbps: u32,

    /// 是否裁剪首尾静音
    #[serde(default = "default_trim_silence")]
    pub trim_silence: bool,

    /// 静音阈值（满幅度的比例）
    #[serde(default = "default_silence_threshold")]
    pub silence_threshold: f32,

    /// 分析窗口（样本数）
    #[serde(default = "default_silence_window")]
    pub silence_window: usize,

    /// 全静音时保留的样本数
    #[serde(default = "default_min_trimmed_samples")]
    pub min_trimmed_samples: usize,
}

fn default_mp3_bitrate() -> u32 {
    128
}

fn default_trim_silence() -> bool {
    true
}

fn default_silence_threshold() -> f32 {
    0.01
}

fn default_silence_window() -> usize {
    2048
}

fn default_min_trimmed_samples() -> usize {
    100
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            mp3_bitrate_kbps: default_mp3_bitrate(),
            trim_silence: default_trim_silence(),
            silence_threshold: default_silence_threshold(),
            silence_window: default_silence_window(),
            min_trimmed_samples: default_min_trimmed_samples(),
        }
    }
}

impl AudioConfig {
    pub fn post_processor(&self) -> PostProcessorConfig {
        PostProcessorConfig {
            trim_silence: self.trim_silence,
            trim: TrimConfig {
                threshold: self.silence_threshold,
                window: self.silence_window,
                min_samples: self.min_trimmed_samples,
            },
        }
    }
}

/// 缓存配置
#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
    /// 缓存目录，条目为 `{dir}/{key}.{format}`
    #[serde(default = "default_cache_dir")]
    pub dir: PathBuf,

    /// 内存层最大条目数，0 表示关闭内存层
    #[serde(default = "default_memory_capacity")]
    pub memory_capacity: usize,

    /// 内存层条目存活时间（秒）
    #[serde(default = "default_memory_ttl")]
    pub memory_ttl_secs: u64,
}

fn default_cache_dir() -> PathBuf {
    PathBuf::from("data/cache")
}

fn default_memory_capacity() -> usize {
    100
}

fn default_memory_ttl() -> u64 {
    3600
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            dir: default_cache_dir(),
            memory_capacity: default_memory_capacity(),
            memory_ttl_secs: default_memory_ttl(),
        }
    }
}

impl CacheConfig {
    /// 内存层容量，关闭时为 None
    pub fn memory_capacity(&self) -> Option<NonZeroUsize> {
        NonZeroUsize::new(self.memory_capacity)
    }

    pub fn memory_ttl(&self) -> Duration {
        Duration::from_secs(self.memory_ttl_secs)
    }
}

/// 日志配置
#[derive(Debug, Clone, Deserialize)]
pub struct LogConfig {
    /// 日志级别
    #[serde(default = "default_log_level")]
    pub level: String,

    /// 是否启用 JSON 格式
    #[serde(default)]
    pub json: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}
