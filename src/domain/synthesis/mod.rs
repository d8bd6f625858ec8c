//! Synthesis Context - 合成请求限界上下文
//!
//! 职责:
//! - 请求参数校验
//! - 语言白名单
//! - 参考音频解析

mod errors;
mod request;
mod value_objects;

pub use errors::RequestError;
pub use request::{
    RequestDraft, SynthesisRequest, EXPRESSIVENESS_RANGE, GUIDANCE_RANGE, MAX_TEXT_CHARS,
    SPEED_RANGE, TEMPERATURE_RANGE,
};
pub use value_objects::{
    LanguageCode, OutputFormat, VoiceReference, MAX_EMBEDDED_VOICE_BYTES, SUPPORTED_LANGUAGES,
};

#[cfg(test)]
pub(crate) use request::tests::draft as test_draft;
