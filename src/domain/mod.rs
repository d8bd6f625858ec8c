//! Domain Layer - 领域层
//!
//! - Synthesis Context: 合成请求校验与参考音频
//! - 文本分块、缓存 key 推导、PCM 处理（纯函数）

pub mod audio;
pub mod cache_key;
pub mod synthesis;
pub mod text_chunker;

pub use audio::{AudioError, AudioSegment, TrimConfig};
pub use cache_key::{derive_key, CacheKey};
pub use synthesis::{
    LanguageCode, OutputFormat, RequestDraft, RequestError, SynthesisRequest, VoiceReference,
    SUPPORTED_LANGUAGES,
};
pub use text_chunker::{chunk_text, TextChunk, DEFAULT_MAX_CHARS};
