//! Audio Encoder Adapter

mod pcm_encoder;

pub use pcm_encoder::PcmEncoder;
