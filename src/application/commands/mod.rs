//! Commands - 写操作（合成）

pub mod handlers;
mod synthesize;

pub use synthesize::{SynthesisDefaults, SynthesisResponse, SynthesizeCommand};
