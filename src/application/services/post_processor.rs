//! Audio Post-Processor - 拼接、变速、裁剪静音、编码

use std::sync::Arc;

use crate::application::error::SynthesisError;
use crate::application::ports::AudioEncoderPort;
use crate::domain::audio::{change_speed, concatenate, trim_silence};
use crate::domain::{AudioSegment, OutputFormat, TrimConfig};

/// 后处理配置
#[derive(Debug, Clone, Copy)]
pub struct PostProcessorConfig {
    pub trim_silence: bool,
    pub trim: TrimConfig,
}

impl Default for PostProcessorConfig {
    fn default() -> Self {
        Self {
            trim_silence: true,
            trim: TrimConfig::default(),
        }
    }
}

/// 编码完成的音频
#[derive(Debug, Clone)]
pub struct AssembledAudio {
    pub data: Vec<u8>,
    pub duration_ms: u64,
}

pub struct AudioPostProcessor {
    encoder: Arc<dyn AudioEncoderPort>,
    config: PostProcessorConfig,
}

impl AudioPostProcessor {
    pub fn new(encoder: Arc<dyn AudioEncoderPort>, config: PostProcessorConfig) -> Self {
        Self { encoder, config }
    }

    pub fn encoder(&self) -> &Arc<dyn AudioEncoderPort> {
        &self.encoder
    }

    /// 在阻塞线程池中组装
    pub async fn assemble(
        &self,
        segments: Vec<AudioSegment>,
        format: OutputFormat,
        speed: f32,
    ) -> Result<AssembledAudio, SynthesisError> {
        let encoder = self.encoder.clone();
        let config = self.config;

        tokio::task::spawn_blocking(move || {
            assemble_blocking(encoder.as_ref(), &config, segments, format, speed)
        })
        .await
        .map_err(|e| SynthesisError::internal(format!("assemble task failed: {}", e)))?
    }
}

/// 拼接 → 变速 → 裁剪 → 编码
fn assemble_blocking(
    encoder: &dyn AudioEncoderPort,
    config: &PostProcessorConfig,
    segments: Vec<AudioSegment>,
    format: OutputFormat,
    speed: f32,
) -> Result<AssembledAudio, SynthesisError> {
    let segment_count = segments.len();
    let merged = concatenate(segments)?;
    let merged_len = merged.len();

    let adjusted = change_speed(merged, speed)?;
    let audio = if config.trim_silence {
        trim_silence(adjusted, &config.trim)
    } else {
        adjusted
    };

    let data = encoder.encode(&audio, format).map_err(|e| {
        tracing::error!(format = %format, error = %e, "Audio encoding failed");
        SynthesisError::from(e)
    })?;

    tracing::debug!(
        segments = segment_count,
        merged_samples = merged_len,
        final_samples = audio.len(),
        speed,
        format = %format,
        bytes = data.len(),
        "Audio assembled"
    );

    Ok(AssembledAudio {
        data,
        duration_ms: audio.duration_ms(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::adapters::encoder::PcmEncoder;

    fn processor(trim: bool) -> AudioPostProcessor {
        AudioPostProcessor::new(
            Arc::new(PcmEncoder::new(128)),
            PostProcessorConfig {
                trim_silence: trim,
                ..Default::default()
            },
        )
    }

    fn tone(len: usize) -> AudioSegment {
        let samples = (0..len)
            .map(|i| (i as f32 * 0.05).sin() * 0.5)
            .collect();
        AudioSegment::new(samples, 24000)
    }

    #[tokio::test]
    async fn test_wav_assembly_concatenates_in_order() {
        let out = processor(false)
            .assemble(vec![tone(1000), tone(2000)], OutputFormat::Wav, 1.0)
            .await
            .unwrap();

        assert_eq!(&out.data[0..4], b"RIFF");
        assert_eq!(out.data.len(), 44 + 3000 * 2);
        assert_eq!(out.duration_ms, 125);
    }

    #[tokio::test]
    async fn test_speed_shortens_audio() {
        let out = processor(false)
            .assemble(vec![tone(24000)], OutputFormat::Wav, 2.0)
            .await
            .unwrap();
        assert_eq!(out.duration_ms, 500);
    }

    #[tokio::test]
    async fn test_all_silent_input_still_produces_audio() {
        let silent = AudioSegment::new(vec![0.0; 48000], 24000);
        let out = processor(true)
            .assemble(vec![silent], OutputFormat::Wav, 1.0)
            .await
            .unwrap();
        assert_eq!(out.data.len(), 44 + 100 * 2);
    }

    #[tokio::test]
    async fn test_mp3_assembly() {
        let out = processor(true)
            .assemble(vec![tone(24000)], OutputFormat::Mp3, 1.0)
            .await
            .unwrap();
        assert!(!out.data.is_empty());
        assert_ne!(&out.data[0..4], b"RIFF");
    }

    #[tokio::test]
    async fn test_no_segments_is_error() {
        assert!(processor(true)
            .assemble(vec![], OutputFormat::Wav, 1.0)
            .await
            .is_err());
    }
}
