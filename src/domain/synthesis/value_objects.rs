//! Synthesis Context - Value Objects

use base64::Engine;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};

use super::errors::RequestError;

/// 模型支持的语言（显式白名单，不做推断）
pub const SUPPORTED_LANGUAGES: &[&str] = &[
    "ar", "da", "de", "el", "en", "es", "fi", "fr", "he", "hi", "it", "ja", "ko", "ms", "nl",
    "no", "pl", "pt", "ru", "sv", "sw", "tr", "zh",
];

/// 内嵌参考音频的最大字节数
pub const MAX_EMBEDDED_VOICE_BYTES: usize = 10 * 1024 * 1024;

/// 内嵌参考音频的最小字节数（WAV 头长度），更短的 Base64 串按路径处理
const MIN_EMBEDDED_VOICE_BYTES: usize = 44;

/// 语言代码
///
/// 不变量: 小写，且在 SUPPORTED_LANGUAGES 中
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct LanguageCode(String);

impl LanguageCode {
    pub fn parse(code: &str) -> Result<Self, RequestError> {
        let normalized = code.trim().to_lowercase();
        if SUPPORTED_LANGUAGES.contains(&normalized.as_str()) {
            Ok(Self(normalized))
        } else {
            Err(RequestError::UnsupportedLanguage {
                language: code.to_string(),
                supported: SUPPORTED_LANGUAGES.to_vec(),
            })
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for LanguageCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// 输出音频格式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// MP3，固定码率有损编码
    #[default]
    Mp3,
    /// WAV，16-bit PCM 无损容器
    Wav,
}

impl OutputFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Mp3 => "mp3",
            Self::Wav => "wav",
        }
    }

    pub fn mime_type(&self) -> &'static str {
        match self {
            Self::Mp3 => "audio/mpeg",
            Self::Wav => "audio/wav",
        }
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.extension())
    }
}

impl std::str::FromStr for OutputFormat {
    type Err = RequestError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "mp3" => Ok(Self::Mp3),
            "wav" => Ok(Self::Wav),
            _ => Err(RequestError::Validation(format!(
                "Invalid format: '{}' (must be 'mp3' or 'wav')",
                s
            ))),
        }
    }
}

/// 参考音频（音色克隆）
///
/// - Path: 磁盘上的音频文件，由模型直接读取
/// - Embedded: 请求内嵌的音频数据，仅在单次请求内存在，不落盘缓存
#[derive(Clone, PartialEq, Eq)]
pub enum VoiceReference {
    Path(PathBuf),
    Embedded(Vec<u8>),
}

impl VoiceReference {
    /// 解析参考音频
    ///
    /// 依次尝试：
    /// 1. 本地存在的文件路径
    /// 2. Base64 编码的音频数据（可带 `data:...;base64,` 前缀）
    /// 3. 绝对路径（由远程推理服务读取）
    pub fn resolve(raw: &str) -> Result<Self, RequestError> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(RequestError::Validation(
                "Voice reference cannot be empty".to_string(),
            ));
        }

        let voice = Self::try_local_path(raw)
            .or_else(|| Self::try_embedded(raw))
            .or_else(|| Self::try_absolute_path(raw))
            .ok_or_else(|| {
                RequestError::Validation(
                    "Voice reference is neither a readable path nor base64 audio".to_string(),
                )
            })?;

        if let Self::Embedded(data) = &voice {
            if data.len() > MAX_EMBEDDED_VOICE_BYTES {
                return Err(RequestError::Validation(format!(
                    "Embedded voice reference too large: {} bytes (max {})",
                    data.len(),
                    MAX_EMBEDDED_VOICE_BYTES
                )));
            }
        }

        Ok(voice)
    }

    fn try_local_path(raw: &str) -> Option<Self> {
        let path = Path::new(raw);
        path.is_file().then(|| Self::Path(path.to_path_buf()))
    }

    fn try_embedded(raw: &str) -> Option<Self> {
        let payload = match raw.strip_prefix("data:") {
            Some(rest) => rest.split_once(";base64,")?.1,
            None => raw,
        };
        base64::engine::general_purpose::STANDARD
            .decode(payload)
            .ok()
            .filter(|data| data.len() >= MIN_EMBEDDED_VOICE_BYTES)
            .map(Self::Embedded)
    }

    fn try_absolute_path(raw: &str) -> Option<Self> {
        raw.starts_with('/').then(|| Self::Path(PathBuf::from(raw)))
    }

    /// 用于缓存 key 的身份标识
    ///
    /// 内嵌数据只参与摘要，原始字节不会进入 key
    pub fn identity(&self) -> String {
        match self {
            Self::Path(path) => path.to_string_lossy().trim().to_string(),
            Self::Embedded(data) => format!("sha256:{}", hex::encode(Sha256::digest(data))),
        }
    }
}

impl std::fmt::Debug for VoiceReference {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Path(path) => f.debug_tuple("Path").field(path).finish(),
            Self::Embedded(data) => write!(f, "Embedded({} bytes)", data.len()),
        }
    }
}
