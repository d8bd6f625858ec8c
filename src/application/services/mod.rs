//! Application Services - 模型单例、合成引擎、音频后处理

mod model_service;
mod post_processor;
mod synthesis_engine;

pub use model_service::{ModelHandle, ModelInfo, ModelService};
pub use post_processor::{AssembledAudio, AudioPostProcessor, PostProcessorConfig};
pub use synthesis_engine::{GeneratedAudio, SynthesisEngine};
