//! Synthesize Command - 合成命令与响应

use std::path::PathBuf;

use crate::domain::{OutputFormat, RequestDraft, DEFAULT_MAX_CHARS};

/// 合成命令
///
/// 字段名已由输入适配器规范化，缺失字段为 None
#[derive(Debug, Clone, Default)]
pub struct SynthesizeCommand {
    pub text: Option<String>,
    pub voice: Option<String>,
    pub language: Option<String>,
    pub format: Option<String>,
    pub speed: Option<f32>,
    pub exaggeration: Option<f32>,
    pub temperature: Option<f32>,
    pub guidance_weight: Option<f32>,
    pub seed: Option<u64>,
}

impl SynthesizeCommand {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            ..Default::default()
        }
    }

    /// 用服务端缺省值填充
    pub fn into_draft(self, defaults: &SynthesisDefaults) -> RequestDraft {
        RequestDraft {
            text: self.text,
            voice: self.voice,
            language: self.language.unwrap_or_else(|| defaults.language.clone()),
            format: self
                .format
                .unwrap_or_else(|| defaults.format.extension().to_string()),
            speed: self.speed.unwrap_or(defaults.speed),
            expressiveness: self.exaggeration.unwrap_or(defaults.exaggeration),
            temperature: self.temperature.unwrap_or(defaults.temperature),
            guidance_weight: self.guidance_weight.unwrap_or(defaults.guidance_weight),
            seed: self.seed,
        }
    }
}

/// 服务端缺省参数
#[derive(Debug, Clone)]
pub struct SynthesisDefaults {
    pub language: String,
    pub format: OutputFormat,
    pub speed: f32,
    pub exaggeration: f32,
    pub temperature: f32,
    pub guidance_weight: f32,
    /// 请求未指定参考音频时使用，不影响缓存 key
    pub voice_path: Option<PathBuf>,
    pub max_chars_per_chunk: usize,
}

impl Default for SynthesisDefaults {
    fn default() -> Self {
        Self {
            language: "en".to_string(),
            format: OutputFormat::Mp3,
            speed: 1.0,
            exaggeration: 0.5,
            temperature: 0.8,
            guidance_weight: 0.5,
            voice_path: None,
            max_chars_per_chunk: DEFAULT_MAX_CHARS,
        }
    }
}

/// 合成响应
#[derive(Debug, Clone)]
pub struct SynthesisResponse {
    pub audio: Vec<u8>,
    pub format: OutputFormat,
    pub mime_type: &'static str,
    pub size_bytes: usize,
    pub cache_hit: bool,
    /// 缓存 key 前缀（诊断用）
    pub cache_key: String,
    pub device: String,
    pub chunks_processed: usize,
    /// 仅模型生成耗时，命中缓存时为 0
    pub generation_time_ms: u64,
    pub total_time_ms: u64,
    pub audio_duration_ms: Option<u64>,
    pub language: String,
    /// 参考音频标签（default / 路径 / embedded）
    pub voice: String,
}
