//! Speech Model Adapters - 模型后端实现

mod fake_speech_model;
mod http_speech_model;

pub use fake_speech_model::{FakeModelConfig, FakeSpeechModel, FakeSpeechModelLoader};
pub use http_speech_model::{HttpModelConfig, HttpSpeechModel, HttpSpeechModelLoader};
