//! 应用层 - 用例编排
//!
//! 包含：
//! - ports: 六边形架构端口定义（SpeechModel、AudioCache、AudioEncoder）
//! - services: 模型单例、合成引擎、音频后处理
//! - commands: 合成命令及处理器
//! - error: 应用层错误定义

pub mod commands;
pub mod error;
pub mod ports;
pub mod services;

// Re-exports
pub use commands::{
    handlers::SynthesizeHandler, SynthesisDefaults, SynthesisResponse, SynthesizeCommand,
};

pub use error::SynthesisError;

pub use ports::{
    AudioCachePort, AudioEncoderPort, CacheError, EncodeError, GenerationParams, ModelError,
    SpeechModel, SpeechModelLoader,
};

pub use services::{
    AssembledAudio, AudioPostProcessor, GeneratedAudio, ModelHandle, ModelInfo, ModelService,
    PostProcessorConfig, SynthesisEngine,
};
