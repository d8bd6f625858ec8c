//! 缓存 key 推导
//!
//! 对规范化后的合成参数做 SHA-256，语义相同的请求得到相同的 key

use sha2::{Digest, Sha256};

use super::synthesis::SynthesisRequest;

/// 未指定参考音频时的占位身份
pub const DEFAULT_VOICE_IDENTITY: &str = "default";

/// 诊断用前缀长度
pub const SHORT_KEY_LEN: usize = 16;

/// 内容寻址的缓存 key（64 位小写十六进制）
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// 截断前缀，仅用于日志和响应
    pub fn short(&self) -> &str {
        &self.0[..SHORT_KEY_LEN]
    }
}

impl std::fmt::Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// 两位小数，-0.00 与 0.00 视为同一值
fn two_decimals(value: f32) -> String {
    let formatted = format!("{:.2}", value);
    match formatted.as_str() {
        "-0.00" => "0.00".to_string(),
        _ => formatted,
    }
}

/// 从已校验的请求推导缓存 key
///
/// 每个字段以 `长度:值` 形式编码后用 `|` 连接，文本中出现 `|` 也不会产生歧义
pub fn derive_key(request: &SynthesisRequest) -> CacheKey {
    let voice = request
        .voice()
        .map(|v| v.identity())
        .unwrap_or_else(|| DEFAULT_VOICE_IDENTITY.to_string());

    let fields = [
        request.text().trim().to_lowercase(),
        voice,
        request.language().as_str().to_string(),
        request.format().extension().to_string(),
        two_decimals(request.speed()),
        two_decimals(request.expressiveness()),
        two_decimals(request.temperature()),
        two_decimals(request.guidance_weight()),
        request.seed().unwrap_or(0).to_string(),
    ];

    let encoded = fields
        .iter()
        .map(|field| format!("{}:{}", field.chars().count(), field))
        .collect::<Vec<_>>()
        .join("|");

    CacheKey(hex::encode(Sha256::digest(encoded.as_bytes())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::synthesis::{test_draft, RequestDraft};

    fn key(draft: RequestDraft) -> CacheKey {
        derive_key(&SynthesisRequest::validate(draft).unwrap())
    }

    #[test]
    fn test_key_is_stable_hex() {
        let a = key(test_draft("Hello world."));
        let b = key(test_draft("Hello world."));
        assert_eq!(a, b);
        assert_eq!(a.as_str().len(), 64);
        assert!(a.as_str().chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
        assert_eq!(a.short(), &a.as_str()[..16]);
    }

    #[test]
    fn test_text_is_trimmed_and_lowercased() {
        assert_eq!(
            key(test_draft("Hello World.")),
            key(test_draft("  hello world.\n"))
        );
    }

    #[test]
    fn test_language_and_format_case_insensitive() {
        let mut upper = test_draft("Hello");
        upper.language = "EN".to_string();
        upper.format = "MP3".to_string();
        assert_eq!(key(upper), key(test_draft("Hello")));
    }

    #[test]
    fn test_numbers_rounded_to_two_decimals() {
        let mut a = test_draft("Hello");
        a.speed = 1.001;
        assert_eq!(key(a), key(test_draft("Hello")));

        let mut b = test_draft("Hello");
        b.speed = 1.01;
        assert_ne!(key(b), key(test_draft("Hello")));

        let zeroed = |value: f32| {
            let mut d = test_draft("Hello");
            d.expressiveness = value;
            d.guidance_weight = value;
            key(d)
        };
        assert_eq!(zeroed(-0.0), zeroed(0.0));
        assert_eq!(zeroed(-0.0), zeroed(0.001));
    }

    #[test]
    fn test_two_decimals_drops_negative_zero() {
        assert_eq!(two_decimals(-0.0), "0.00");
        assert_eq!(two_decimals(-0.001), "0.00");
        assert_eq!(two_decimals(0.5), "0.50");
        assert_eq!(two_decimals(1.234), "1.23");
    }

    #[test]
    fn test_each_audible_field_changes_key() {
        let base = key(test_draft("Hello"));
        let variants: Vec<Box<dyn Fn(&mut RequestDraft)>> = vec![
            Box::new(|d| d.text = Some("Hello!".to_string())),
            Box::new(|d| d.voice = Some("/voices/other.wav".to_string())),
            Box::new(|d| d.language = "fr".to_string()),
            Box::new(|d| d.format = "wav".to_string()),
            Box::new(|d| d.speed = 1.5),
            Box::new(|d| d.expressiveness = 0.9),
            Box::new(|d| d.temperature = 1.2),
            Box::new(|d| d.guidance_weight = 0.3),
            Box::new(|d| d.seed = Some(42)),
        ];

        for mutate in variants {
            let mut d = test_draft("Hello");
            mutate(&mut d);
            assert_ne!(key(d), base);
        }
    }

    #[test]
    fn test_separator_in_text_is_unambiguous() {
        let mut a = test_draft("a|b");
        a.voice = Some("/c".to_string());
        let mut b = test_draft("a");
        b.voice = Some("/b|/c".to_string());
        assert_ne!(key(a), key(b));
    }
}
