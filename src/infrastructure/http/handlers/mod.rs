//! HTTP Handlers

mod health;
mod ping;
mod tts;

pub use health::*;
pub use ping::*;
pub use tts::*;
