//! Synthesis Engine - 唯一接触模型的组件

use std::io::Write;
use std::path::PathBuf;
use std::time::Instant;

use tempfile::NamedTempFile;

use crate::application::error::SynthesisError;
use crate::application::ports::GenerationParams;
use crate::application::services::model_service::ModelHandle;
use crate::domain::{AudioSegment, SynthesisRequest, TextChunk, VoiceReference, SUPPORTED_LANGUAGES};

/// 引擎生成结果
#[derive(Debug)]
pub struct GeneratedAudio {
    pub segments: Vec<AudioSegment>,
    /// 仅模型生成耗时
    pub generation_time_ms: u64,
}

/// 请求期间有效的参考音频
///
/// Embedded 数据落到临时文件，guard 释放时删除
struct PreparedVoice {
    path: Option<PathBuf>,
    _guard: Option<NamedTempFile>,
}

pub struct SynthesisEngine {
    handle: ModelHandle,
}

impl SynthesisEngine {
    pub fn new(handle: ModelHandle) -> Self {
        Self { handle }
    }

    pub fn device(&self) -> &str {
        &self.handle.info().device
    }

    fn ensure_available(&self) -> Result<(), SynthesisError> {
        if self.handle.is_closed() {
            return Err(SynthesisError::ModelUnavailable(
                "model has been shut down".to_string(),
            ));
        }
        Ok(())
    }

    fn ensure_language(language: &str) -> Result<(), SynthesisError> {
        if SUPPORTED_LANGUAGES.contains(&language) {
            Ok(())
        } else {
            Err(SynthesisError::UnsupportedLanguage {
                language: language.to_string(),
                supported: SUPPORTED_LANGUAGES.to_vec(),
            })
        }
    }

    /// 生成单个分块
    pub async fn generate(
        &self,
        chunk: &TextChunk,
        params: &GenerationParams,
        seed: Option<u64>,
    ) -> Result<AudioSegment, SynthesisError> {
        self.ensure_available()?;
        Self::ensure_language(&params.language)?;

        let mut model = self.handle.lock().await;
        // 排队等锁期间可能已被 shutdown
        self.ensure_available()?;
        model.set_seed(seed);
        let samples = model.generate(&chunk.text, params).await.map_err(|e| {
            tracing::error!(chunk = chunk.index, error = %e, "Chunk generation failed");
            SynthesisError::from(e)
        })?;

        Ok(AudioSegment::new(samples, model.sample_rate()))
    }

    /// 生成整个请求的所有分块
    ///
    /// 持有模型锁直到最后一个分块完成，种子在第一个分块前设置一次。
    /// 任一分块失败即中止，不返回部分结果
    pub async fn generate_all(
        &self,
        chunks: &[TextChunk],
        request: &SynthesisRequest,
    ) -> Result<GeneratedAudio, SynthesisError> {
        self.ensure_available()?;
        Self::ensure_language(request.language().as_str())?;

        let voice = prepare_voice(request.voice()).await?;
        let params = GenerationParams {
            voice_path: voice.path.clone(),
            language: request.language().to_string(),
            exaggeration: request.expressiveness(),
            temperature: request.temperature(),
            cfg_weight: request.guidance_weight(),
        };

        let mut model = self.handle.lock().await;
        self.ensure_available()?;
        let started = Instant::now();
        model.set_seed(request.seed());

        let mut segments = Vec::with_capacity(chunks.len());
        for chunk in chunks {
            let chunk_started = Instant::now();
            let samples = model.generate(&chunk.text, &params).await.map_err(|e| {
                tracing::error!(
                    chunk = chunk.index,
                    total = chunks.len(),
                    error = %e,
                    "Chunk generation failed, aborting request"
                );
                SynthesisError::from(e)
            })?;

            tracing::debug!(
                chunk = chunk.index,
                chars = chunk.char_count(),
                samples = samples.len(),
                elapsed_ms = chunk_started.elapsed().as_millis() as u64,
                "Chunk generated"
            );
            segments.push(AudioSegment::new(samples, model.sample_rate()));
        }

        let generation_time_ms = started.elapsed().as_millis() as u64;
        drop(model);
        // voice 在这里释放，临时文件随之删除
        drop(voice);

        Ok(GeneratedAudio {
            segments,
            generation_time_ms,
        })
    }
}

async fn prepare_voice(voice: Option<&VoiceReference>) -> Result<PreparedVoice, SynthesisError> {
    match voice {
        None => Ok(PreparedVoice {
            path: None,
            _guard: None,
        }),
        Some(VoiceReference::Path(path)) => Ok(PreparedVoice {
            path: Some(path.clone()),
            _guard: None,
        }),
        Some(VoiceReference::Embedded(data)) => {
            let data = data.clone();
            let file = tokio::task::spawn_blocking(move || -> std::io::Result<NamedTempFile> {
                let mut file = tempfile::Builder::new()
                    .prefix("voice-")
                    .suffix(".wav")
                    .tempfile()?;
                file.write_all(&data)?;
                file.flush()?;
                Ok(file)
            })
            .await
            .map_err(|e| SynthesisError::internal(format!("voice materialization task failed: {}", e)))?
            .map_err(|e| SynthesisError::internal(format!("failed to write voice reference: {}", e)))?;

            tracing::debug!(path = %file.path().display(), "Embedded voice materialized");
            Ok(PreparedVoice {
                path: Some(file.path().to_path_buf()),
                _guard: Some(file),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::services::ModelService;
    use crate::domain::chunk_text;
    use crate::domain::synthesis::test_draft as draft;
    use crate::infrastructure::adapters::model::{FakeModelConfig, FakeSpeechModelLoader};
    use base64::Engine;
    use std::sync::Arc;

    async fn engine_with(config: FakeModelConfig) -> (SynthesisEngine, Arc<FakeSpeechModelLoader>) {
        let loader = Arc::new(FakeSpeechModelLoader::new(config));
        let service = ModelService::new(loader.clone());
        let handle = service.initialize().await.unwrap();
        (SynthesisEngine::new(handle), loader)
    }

    fn request(text: &str, seed: Option<u64>) -> SynthesisRequest {
        let mut d = draft(text);
        d.seed = seed;
        SynthesisRequest::validate(d).unwrap()
    }

    #[tokio::test]
    async fn test_seeded_generation_is_reproducible() {
        let (engine, _) = engine_with(FakeModelConfig::default()).await;
        let req = request("Reproducible audio please.", Some(42));
        let chunks = chunk_text(req.text(), 500);

        let a = engine.generate_all(&chunks, &req).await.unwrap();
        let b = engine.generate_all(&chunks, &req).await.unwrap();
        assert_eq!(a.segments, b.segments);

        let other = engine
            .generate_all(&chunks, &request("Reproducible audio please.", Some(7)))
            .await
            .unwrap();
        assert_ne!(a.segments, other.segments);
    }

    #[tokio::test]
    async fn test_failing_chunk_aborts_request() {
        let config = FakeModelConfig {
            fail_on_text: Some("explode".to_string()),
            ..Default::default()
        };
        let (engine, loader) = engine_with(config).await;
        let req = request("First part. Please explode here. Never reached.", None);
        let chunks = chunk_text(req.text(), 20);
        assert_eq!(chunks.len(), 3);

        let err = engine.generate_all(&chunks, &req).await.unwrap_err();
        assert!(matches!(err, SynthesisError::GenerationError(_)));
        // 第三个分块不再调用
        assert_eq!(loader.generate_count(), 2);
    }

    #[tokio::test]
    async fn test_unsupported_language_never_reaches_model() {
        let (engine, loader) = engine_with(FakeModelConfig::default()).await;
        let params = GenerationParams {
            voice_path: None,
            language: "xx".to_string(),
            exaggeration: 0.5,
            temperature: 0.8,
            cfg_weight: 0.5,
        };
        let chunk = TextChunk {
            index: 0,
            text: "Hello".to_string(),
        };

        let err = engine.generate(&chunk, &params, None).await.unwrap_err();
        assert!(matches!(err, SynthesisError::UnsupportedLanguage { .. }));
        assert_eq!(loader.generate_count(), 0);
    }

    #[tokio::test]
    async fn test_shutdown_while_waiting_for_lock_is_unavailable() {
        let loader = Arc::new(FakeSpeechModelLoader::new(FakeModelConfig::default()));
        let service = Arc::new(ModelService::new(loader.clone()));
        let handle = service.initialize().await.unwrap();
        let engine = Arc::new(SynthesisEngine::new(handle.clone()));

        let guard = handle.lock().await;
        let waiting = tokio::spawn({
            let engine = engine.clone();
            async move {
                let req = request("Queued behind the lock.", None);
                let chunks = chunk_text(req.text(), 500);
                engine.generate_all(&chunks, &req).await
            }
        });
        for _ in 0..4 {
            tokio::task::yield_now().await;
        }

        let shutdown = tokio::spawn({
            let service = service.clone();
            async move { service.shutdown().await }
        });
        for _ in 0..4 {
            tokio::task::yield_now().await;
        }
        assert!(handle.is_closed());
        drop(guard);

        let err = waiting.await.unwrap().unwrap_err();
        assert!(matches!(err, SynthesisError::ModelUnavailable(_)));
        assert_eq!(loader.generate_count(), 0);
        shutdown.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_embedded_voice_file_is_removed_after_request() {
        let (engine, loader) = engine_with(FakeModelConfig::default()).await;
        let encoded = base64::engine::general_purpose::STANDARD.encode(vec![3u8; 256]);
        let mut d = draft("Voice cloned line.");
        d.voice = Some(encoded);
        let req = SynthesisRequest::validate(d).unwrap();

        let chunks = chunk_text(req.text(), 500);
        engine.generate_all(&chunks, &req).await.unwrap();

        let seen = loader.last_voice_path().expect("voice path passed to model");
        assert!(seen.to_string_lossy().contains("voice-"));
        assert!(!seen.exists());
    }

    #[tokio::test]
    async fn test_embedded_voice_file_is_removed_after_failure() {
        let config = FakeModelConfig {
            fail_on_text: Some("boom".to_string()),
            ..Default::default()
        };
        let (engine, loader) = engine_with(config).await;
        let encoded = base64::engine::general_purpose::STANDARD.encode(vec![5u8; 256]);
        let mut d = draft("boom");
        d.voice = Some(encoded);
        let req = SynthesisRequest::validate(d).unwrap();

        let chunks = chunk_text(req.text(), 500);
        assert!(engine.generate_all(&chunks, &req).await.is_err());

        let seen = loader.last_voice_path().expect("voice path passed to model");
        assert!(!seen.exists());
    }
}
