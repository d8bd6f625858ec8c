//! Application State

use std::sync::Arc;

use crate::application::{ModelService, SynthesizeHandler};

/// 应用状态
pub struct AppState {
    pub model_service: Arc<ModelService>,
    pub synthesize_handler: SynthesizeHandler,
}

impl AppState {
    pub fn new(model_service: Arc<ModelService>, synthesize_handler: SynthesizeHandler) -> Self {
        Self {
            model_service,
            synthesize_handler,
        }
    }
}
