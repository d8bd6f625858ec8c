//! Synthesis Context - 合成请求

use std::ops::RangeInclusive;

use super::errors::RequestError;
use super::value_objects::{LanguageCode, OutputFormat, VoiceReference};

/// 单次请求文本最大字符数
pub const MAX_TEXT_CHARS: usize = 5000;

pub const SPEED_RANGE: RangeInclusive<f32> = 0.5..=2.0;
pub const EXPRESSIVENESS_RANGE: RangeInclusive<f32> = 0.0..=1.0;
pub const TEMPERATURE_RANGE: RangeInclusive<f32> = 0.05..=2.0;
pub const GUIDANCE_RANGE: RangeInclusive<f32> = 0.0..=1.0;

/// 未校验的请求草稿
///
/// 字段名已规范化，缺省值已由调用方填充
#[derive(Debug, Clone)]
pub struct RequestDraft {
    pub text: Option<String>,
    pub voice: Option<String>,
    pub language: String,
    pub format: String,
    pub speed: f32,
    pub expressiveness: f32,
    pub temperature: f32,
    pub guidance_weight: f32,
    pub seed: Option<u64>,
}

/// 已校验的合成请求
///
/// 只能通过 `SynthesisRequest::validate` 构造，持有即代表所有参数合法
#[derive(Debug, Clone)]
pub struct SynthesisRequest {
    text: String,
    voice: Option<VoiceReference>,
    language: LanguageCode,
    format: OutputFormat,
    speed: f32,
    expressiveness: f32,
    temperature: f32,
    guidance_weight: f32,
    seed: Option<u64>,
}

fn check_range(
    name: &str,
    value: f32,
    range: &RangeInclusive<f32>,
) -> Result<f32, RequestError> {
    // NaN 不在任何区间内
    if range.contains(&value) {
        Ok(value)
    } else {
        Err(RequestError::validation(format!(
            "Invalid {}: {} (must be between {} and {})",
            name,
            value,
            range.start(),
            range.end()
        )))
    }
}

impl SynthesisRequest {
    /// 校验草稿，按字段顺序返回第一个错误
    pub fn validate(draft: RequestDraft) -> Result<Self, RequestError> {
        let text = draft
            .text
            .ok_or_else(|| RequestError::validation("Text is required"))?;
        if text.trim().is_empty() {
            return Err(RequestError::validation("Text cannot be empty"));
        }
        let char_count = text.chars().count();
        if char_count > MAX_TEXT_CHARS {
            return Err(RequestError::validation(format!(
                "Text too long: {} characters (max {})",
                char_count, MAX_TEXT_CHARS
            )));
        }

        let format: OutputFormat = draft.format.parse()?;
        let speed = check_range("speed", draft.speed, &SPEED_RANGE)?;
        let expressiveness =
            check_range("exaggeration", draft.expressiveness, &EXPRESSIVENESS_RANGE)?;
        let temperature = check_range("temperature", draft.temperature, &TEMPERATURE_RANGE)?;
        let guidance_weight =
            check_range("guidance_weight", draft.guidance_weight, &GUIDANCE_RANGE)?;
        let language = LanguageCode::parse(&draft.language)?;

        let voice = match draft.voice.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(raw) => Some(VoiceReference::resolve(raw)?),
        };

        Ok(Self {
            text,
            voice,
            language,
            format,
            speed,
            expressiveness,
            temperature,
            guidance_weight,
            // seed=0 与未指定等价
            seed: draft.seed.filter(|&s| s != 0),
        })
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn voice(&self) -> Option<&VoiceReference> {
        self.voice.as_ref()
    }

    pub fn language(&self) -> &LanguageCode {
        &self.language
    }

    pub fn format(&self) -> OutputFormat {
        self.format
    }

    pub fn speed(&self) -> f32 {
        self.speed
    }

    pub fn expressiveness(&self) -> f32 {
        self.expressiveness
    }

    pub fn temperature(&self) -> f32 {
        self.temperature
    }

    pub fn guidance_weight(&self) -> f32 {
        self.guidance_weight
    }

    pub fn seed(&self) -> Option<u64> {
        self.seed
    }

    /// 替换参考音频（用于填充服务端默认音色）
    pub fn with_voice(mut self, voice: VoiceReference) -> Self {
        self.voice = Some(voice);
        self
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn draft(text: &str) -> RequestDraft {
        RequestDraft {
            text: Some(text.to_string()),
            voice: None,
            language: "en".to_string(),
            format: "mp3".to_string(),
            speed: 1.0,
            expressiveness: 0.5,
            temperature: 0.8,
            guidance_weight: 0.5,
            seed: None,
        }
    }

    fn message(err: RequestError) -> String {
        err.to_string()
    }

    #[test]
    fn test_valid_draft() {
        let request = SynthesisRequest::validate(draft("Hello world.")).unwrap();
        assert_eq!(request.text(), "Hello world.");
        assert_eq!(request.language().as_str(), "en");
        assert_eq!(request.format(), OutputFormat::Mp3);
        assert!(request.voice().is_none());
        assert!(request.seed().is_none());
    }

    #[test]
    fn test_missing_and_empty_text() {
        let mut missing = draft("");
        missing.text = None;
        assert_eq!(
            message(SynthesisRequest::validate(missing).unwrap_err()),
            "Text is required"
        );
        assert_eq!(
            message(SynthesisRequest::validate(draft("  \n ")).unwrap_err()),
            "Text cannot be empty"
        );
    }

    #[test]
    fn test_text_length_boundary() {
        assert!(SynthesisRequest::validate(draft(&"a".repeat(5000))).is_ok());

        let err = SynthesisRequest::validate(draft(&"a".repeat(5001))).unwrap_err();
        assert!(message(err).contains("5001"));
    }

    #[test]
    fn test_text_length_counts_characters_not_bytes() {
        // 每个字符 3 字节
        assert!(SynthesisRequest::validate(draft(&"语".repeat(5000))).is_ok());
    }

    #[test]
    fn test_speed_boundaries() {
        for (speed, ok) in [(0.5, true), (2.0, true), (0.49, false), (2.01, false)] {
            let mut d = draft("Hello");
            d.speed = speed;
            assert_eq!(SynthesisRequest::validate(d).is_ok(), ok, "speed={}", speed);
        }
    }

    #[test]
    fn test_nan_is_rejected() {
        let mut d = draft("Hello");
        d.expressiveness = f32::NAN;
        assert!(SynthesisRequest::validate(d).is_err());
    }

    #[test]
    fn test_expressiveness_temperature_guidance_ranges() {
        let mut d = draft("Hello");
        d.expressiveness = 1.01;
        assert!(message(SynthesisRequest::validate(d).unwrap_err()).contains("exaggeration"));

        let mut d = draft("Hello");
        d.temperature = 0.01;
        assert!(message(SynthesisRequest::validate(d).unwrap_err()).contains("temperature"));

        let mut d = draft("Hello");
        d.guidance_weight = -0.1;
        assert!(message(SynthesisRequest::validate(d).unwrap_err()).contains("guidance_weight"));
    }

    #[test]
    fn test_unsupported_format() {
        let mut d = draft("Hello");
        d.format = "flac".to_string();
        assert!(message(SynthesisRequest::validate(d).unwrap_err()).contains("flac"));
    }

    #[test]
    fn test_unknown_language() {
        let mut d = draft("Hello");
        d.language = "xx".to_string();
        assert!(matches!(
            SynthesisRequest::validate(d),
            Err(RequestError::UnsupportedLanguage { .. })
        ));
    }

    #[test]
    fn test_blank_voice_is_none_and_zero_seed_is_unseeded() {
        let mut d = draft("Hello");
        d.voice = Some("  ".to_string());
        d.seed = Some(0);
        let request = SynthesisRequest::validate(d).unwrap();
        assert!(request.voice().is_none());
        assert!(request.seed().is_none());
    }
}
