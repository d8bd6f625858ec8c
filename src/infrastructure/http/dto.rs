//! Data Transfer Objects

use base64::Engine;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::application::{SynthesisError, SynthesisResponse, SynthesizeCommand};

// ============================================================================
// 统一响应结构
// ============================================================================

/// 统一 API 响应格式
#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub errno: i32,
    pub error: String,
    pub data: Option<T>,
}

impl<T: Serialize> ApiResponse<T> {
    /// 成功响应
    pub fn success(data: T) -> Self {
        Self {
            errno: 0,
            error: String::new(),
            data: Some(data),
        }
    }
}

// ============================================================================
// 输入适配器
// ============================================================================
//
// 不同客户端对同一参数使用不同字段名，按别名表顺序取第一个非 null 值

const TEXT_KEYS: &[&str] = &["text", "text_input", "prompt"];
const VOICE_KEYS: &[&str] = &["voice", "audio_prompt_path_input", "audio_prompt_path"];
const LANGUAGE_KEYS: &[&str] = &["language", "language_id"];
const FORMAT_KEYS: &[&str] = &["format", "output_format"];
const SPEED_KEYS: &[&str] = &["speed"];
const EXAGGERATION_KEYS: &[&str] = &["exaggeration", "exaggeration_input"];
const TEMPERATURE_KEYS: &[&str] = &["temperature", "temperature_input"];
const GUIDANCE_KEYS: &[&str] = &["guidance_weight", "cfg_weight", "cfgw_input"];
const SEED_KEYS: &[&str] = &["seed", "seed_num_input"];

fn lookup<'a, 'k>(
    input: &'a Map<String, Value>,
    keys: &[&'k str],
) -> Option<(&'k str, &'a Value)> {
    keys.iter().find_map(|&key| {
        input
            .get(key)
            .filter(|v| !v.is_null())
            .map(|v| (key, v))
    })
}

fn string_field(input: &Map<String, Value>, keys: &[&str]) -> Result<Option<String>, SynthesisError> {
    match lookup(input, keys) {
        None => Ok(None),
        Some((_, Value::String(s))) => Ok(Some(s.clone())),
        Some((key, other)) => Err(SynthesisError::validation(format!(
            "Invalid {}: expected a string, got {}",
            key, other
        ))),
    }
}

/// 数值字段：先按 JSON 数字，再按数字字符串
fn number_field(input: &Map<String, Value>, keys: &[&str]) -> Result<Option<f32>, SynthesisError> {
    let Some((key, value)) = lookup(input, keys) else {
        return Ok(None);
    };

    value
        .as_f64()
        .or_else(|| value.as_str().and_then(|s| s.trim().parse::<f64>().ok()))
        .map(|n| Some(n as f32))
        .ok_or_else(|| {
            SynthesisError::validation(format!("Invalid {}: expected a number, got {}", key, value))
        })
}

/// 种子：非负整数，或整数字符串
fn seed_field(input: &Map<String, Value>) -> Result<Option<u64>, SynthesisError> {
    let Some((key, value)) = lookup(input, SEED_KEYS) else {
        return Ok(None);
    };

    value
        .as_u64()
        .or_else(|| {
            value
                .as_f64()
                .filter(|f| *f >= 0.0 && f.fract() == 0.0 && *f <= u64::MAX as f64)
                .map(|f| f as u64)
        })
        .or_else(|| value.as_str().and_then(|s| s.trim().parse::<u64>().ok()))
        .map(Some)
        .ok_or_else(|| {
            SynthesisError::validation(format!(
                "Invalid {}: expected a non-negative integer, got {}",
                key, value
            ))
        })
}

/// 把任意 JSON 输入映射为规范化的合成命令
pub fn adapt_input(input: &Value) -> Result<SynthesizeCommand, SynthesisError> {
    let input = input
        .as_object()
        .ok_or_else(|| SynthesisError::validation("Input must be a JSON object"))?;

    Ok(SynthesizeCommand {
        text: string_field(input, TEXT_KEYS)?,
        voice: string_field(input, VOICE_KEYS)?,
        language: string_field(input, LANGUAGE_KEYS)?,
        format: string_field(input, FORMAT_KEYS)?,
        speed: number_field(input, SPEED_KEYS)?,
        exaggeration: number_field(input, EXAGGERATION_KEYS)?,
        temperature: number_field(input, TEMPERATURE_KEYS)?,
        guidance_weight: number_field(input, GUIDANCE_KEYS)?,
        seed: seed_field(input)?,
    })
}

// ============================================================================
// TTS DTOs
// ============================================================================

/// 作业接口的成功结果
#[derive(Debug, Serialize)]
pub struct TtsJobResult {
    /// Base64 编码的音频
    pub audio: String,
    pub mimetype: &'static str,
    pub format: String,
    pub size_bytes: usize,
    pub cache_hit: bool,
    pub cache_key: String,
    pub device: String,
    pub chunks_processed: usize,
    pub generation_time_ms: u64,
    pub total_time_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audio_duration_ms: Option<u64>,
    pub language: String,
    pub voice: String,
}

impl From<SynthesisResponse> for TtsJobResult {
    fn from(r: SynthesisResponse) -> Self {
        Self {
            audio: base64::engine::general_purpose::STANDARD.encode(&r.audio),
            mimetype: r.mime_type,
            format: r.format.extension().to_string(),
            size_bytes: r.size_bytes,
            cache_hit: r.cache_hit,
            cache_key: r.cache_key,
            device: r.device,
            chunks_processed: r.chunks_processed,
            generation_time_ms: r.generation_time_ms,
            total_time_ms: r.total_time_ms,
            audio_duration_ms: r.audio_duration_ms,
            language: r.language,
            voice: r.voice,
        }
    }
}

/// 作业接口的失败结果
#[derive(Debug, Serialize)]
pub struct TtsJobError {
    pub error: String,
    pub error_type: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub supported_languages: Option<Vec<&'static str>>,
}

impl From<&SynthesisError> for TtsJobError {
    fn from(e: &SynthesisError) -> Self {
        let supported_languages = match e {
            SynthesisError::UnsupportedLanguage { supported, .. } => Some(supported.clone()),
            _ => None,
        };
        Self {
            error: e.to_string(),
            error_type: e.kind(),
            supported_languages,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub model_loaded: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub backend: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sample_rate: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub loaded_at: Option<String>,
    pub languages: usize,
    pub cache_size: usize,
}

#[derive(Debug, Serialize)]
pub struct LanguagesResponse {
    pub languages: Vec<&'static str>,
    pub default: String,
}
