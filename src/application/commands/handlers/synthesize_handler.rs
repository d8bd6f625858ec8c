//! Synthesize Handler - 带缓存的合成请求处理

use std::sync::Arc;
use std::time::Instant;

use tracing::Instrument;
use uuid::Uuid;

use crate::application::commands::{SynthesisDefaults, SynthesisResponse, SynthesizeCommand};
use crate::application::error::SynthesisError;
use crate::application::ports::AudioCachePort;
use crate::application::services::{AudioPostProcessor, SynthesisEngine};
use crate::domain::{chunk_text, derive_key, SynthesisRequest, VoiceReference};

/// 响应中的参考音频标签
fn voice_label(voice: Option<&VoiceReference>) -> String {
    match voice {
        None => "default".to_string(),
        Some(VoiceReference::Path(path)) => path.display().to_string(),
        Some(VoiceReference::Embedded(_)) => "embedded".to_string(),
    }
}

pub struct SynthesizeHandler {
    engine: Arc<SynthesisEngine>,
    post_processor: Arc<AudioPostProcessor>,
    cache: Arc<dyn AudioCachePort>,
    defaults: SynthesisDefaults,
}

impl SynthesizeHandler {
    pub fn new(
        engine: Arc<SynthesisEngine>,
        post_processor: Arc<AudioPostProcessor>,
        cache: Arc<dyn AudioCachePort>,
        defaults: SynthesisDefaults,
    ) -> Self {
        Self {
            engine,
            post_processor,
            cache,
            defaults,
        }
    }

    pub fn defaults(&self) -> &SynthesisDefaults {
        &self.defaults
    }

    /// 内存缓存中的条目数
    pub fn cache_entries(&self) -> usize {
        self.cache.memory_entries()
    }

    pub async fn handle(&self, cmd: SynthesizeCommand) -> Result<SynthesisResponse, SynthesisError> {
        let request_id = Uuid::new_v4();
        let span = tracing::info_span!("synthesize", %request_id);
        self.process(cmd, Instant::now()).instrument(span).await
    }

    async fn process(
        &self,
        cmd: SynthesizeCommand,
        started: Instant,
    ) -> Result<SynthesisResponse, SynthesisError> {
        let request = SynthesisRequest::validate(cmd.into_draft(&self.defaults)).map_err(|e| {
            tracing::warn!(error = %e, "Request rejected");
            SynthesisError::from(e)
        })?;

        // 缺省音色在 key 推导之后填充，key 中保持 "default"
        let key = derive_key(&request);
        let format = request.format();
        let language = request.language().to_string();
        let voice = voice_label(request.voice());

        match self.cache.get(&key, format).await {
            Ok(Some(audio)) => {
                let audio_duration_ms = self
                    .post_processor
                    .encoder()
                    .probe_duration_ms(&audio, format);
                let total_time_ms = started.elapsed().as_millis() as u64;

                tracing::info!(
                    cache_key = %key.short(),
                    bytes = audio.len(),
                    total_ms = total_time_ms,
                    "Cache hit"
                );

                return Ok(SynthesisResponse {
                    size_bytes: audio.len(),
                    audio,
                    format,
                    mime_type: format.mime_type(),
                    cache_hit: true,
                    cache_key: key.short().to_string(),
                    device: self.engine.device().to_string(),
                    chunks_processed: 0,
                    generation_time_ms: 0,
                    total_time_ms,
                    audio_duration_ms,
                    language,
                    voice,
                });
            }
            Ok(None) => {}
            Err(e) => {
                tracing::warn!(cache_key = %key.short(), error = %e, "Cache read failed, treating as miss");
            }
        }

        let request = match (request.voice(), &self.defaults.voice_path) {
            (None, Some(path)) => request.with_voice(VoiceReference::Path(path.clone())),
            _ => request,
        };

        let chunks = chunk_text(request.text(), self.defaults.max_chars_per_chunk);
        tracing::info!(
            cache_key = %key.short(),
            chunks = chunks.len(),
            chars = request.text().chars().count(),
            language = %language,
            format = %format,
            "Cache miss, synthesizing"
        );

        let generated = self.engine.generate_all(&chunks, &request).await?;
        let assembled = self
            .post_processor
            .assemble(generated.segments, format, request.speed())
            .await?;

        if let Err(e) = self.cache.put(&key, format, &assembled.data).await {
            tracing::warn!(cache_key = %key.short(), error = %e, "Cache write failed");
        }

        let total_time_ms = started.elapsed().as_millis() as u64;
        tracing::info!(
            cache_key = %key.short(),
            chunks = chunks.len(),
            bytes = assembled.data.len(),
            duration_ms = assembled.duration_ms,
            generation_ms = generated.generation_time_ms,
            total_ms = total_time_ms,
            "Synthesis completed"
        );

        Ok(SynthesisResponse {
            size_bytes: assembled.data.len(),
            audio: assembled.data,
            format,
            mime_type: format.mime_type(),
            cache_hit: false,
            cache_key: key.short().to_string(),
            device: self.engine.device().to_string(),
            chunks_processed: chunks.len(),
            generation_time_ms: generated.generation_time_ms,
            total_time_ms,
            audio_duration_ms: Some(assembled.duration_ms),
            language,
            voice,
        })
    }
}
