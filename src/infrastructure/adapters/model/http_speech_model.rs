//! HTTP Speech Model - 远程推理服务
//!
//! 外部推理 API:
//! GET  {base_url}/health   -> {"sample_rate": 24000, "device": "cuda"}
//! POST {base_url}/generate -> audio/wav binary
//!
//! 参考音频在本地存在时以 Base64 随请求发送，否则按远程路径传递

use std::io::Cursor;
use std::time::Duration;

use async_trait::async_trait;
use base64::Engine;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::DecoderOptions;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

use crate::application::ports::{GenerationParams, ModelError, SpeechModel, SpeechModelLoader};
use crate::domain::audio::resample;

/// 生成请求体 (JSON)
#[derive(Debug, Serialize)]
struct GenerateHttpRequest<'a> {
    text: &'a str,
    language_id: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    audio_prompt_path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    audio_prompt_b64: Option<String>,
    exaggeration: f32,
    temperature: f32,
    cfg_weight: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    seed: Option<u64>,
}

/// 健康检查响应
#[derive(Debug, Deserialize)]
struct HealthHttpResponse {
    sample_rate: u32,
    device: String,
}

/// HTTP 模型配置
#[derive(Debug, Clone)]
pub struct HttpModelConfig {
    /// 推理服务基础 URL
    pub base_url: String,
    /// 请求超时时间（秒）
    pub timeout_secs: u64,
    /// 期望设备（auto 表示接受服务端报告值）
    pub device: String,
}

impl Default for HttpModelConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000".to_string(),
            timeout_secs: 300,
            device: "auto".to_string(),
        }
    }
}

impl HttpModelConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Default::default()
        }
    }

    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), path)
    }
}

fn map_send_error(e: reqwest::Error) -> ModelError {
    if e.is_timeout() {
        ModelError::Timeout
    } else if e.is_connect() {
        ModelError::NetworkError(format!("Cannot connect to inference service: {}", e))
    } else {
        ModelError::NetworkError(e.to_string())
    }
}

pub struct HttpSpeechModelLoader {
    config: HttpModelConfig,
}

impl HttpSpeechModelLoader {
    pub fn new(config: HttpModelConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl SpeechModelLoader for HttpSpeechModelLoader {
    fn backend(&self) -> &'static str {
        "http"
    }

    async fn load(&self) -> Result<Box<dyn SpeechModel>, ModelError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(self.config.timeout_secs))
            .build()
            .map_err(|e| ModelError::LoadFailed(e.to_string()))?;

        let health_url = self.config.url("/health");
        let response = client
            .get(&health_url)
            .timeout(Duration::from_secs(10))
            .send()
            .await
            .map_err(map_send_error)?;

        if !response.status().is_success() {
            return Err(ModelError::LoadFailed(format!(
                "inference service unhealthy: HTTP {}",
                response.status()
            )));
        }

        let health: HealthHttpResponse = response
            .json()
            .await
            .map_err(|e| ModelError::InvalidResponse(format!("health payload: {}", e)))?;

        if health.sample_rate == 0 {
            return Err(ModelError::InvalidResponse(
                "inference service reported sample_rate 0".to_string(),
            ));
        }
        if self.config.device != "auto" && self.config.device != health.device {
            tracing::warn!(
                requested = %self.config.device,
                reported = %health.device,
                "Inference service runs on a different device than requested"
            );
        }

        tracing::info!(
            url = %self.config.base_url,
            sample_rate = health.sample_rate,
            device = %health.device,
            "Connected to inference service"
        );

        Ok(Box::new(HttpSpeechModel {
            client,
            config: self.config.clone(),
            sample_rate: health.sample_rate,
            device: health.device,
            seed: None,
        }))
    }
}

pub struct HttpSpeechModel {
    client: Client,
    config: HttpModelConfig,
    sample_rate: u32,
    device: String,
    seed: Option<u64>,
}

#[async_trait]
impl SpeechModel for HttpSpeechModel {
    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn device(&self) -> &str {
        &self.device
    }

    fn set_seed(&mut self, seed: Option<u64>) {
        self.seed = seed;
    }

    async fn generate(
        &mut self,
        text: &str,
        params: &GenerationParams,
    ) -> Result<Vec<f32>, ModelError> {
        let (audio_prompt_path, audio_prompt_b64) = match &params.voice_path {
            None => (None, None),
            Some(path) => match tokio::fs::read(path).await {
                Ok(bytes) => (
                    None,
                    Some(base64::engine::general_purpose::STANDARD.encode(bytes)),
                ),
                // 本地不存在，交给推理服务按路径读取
                Err(_) => (Some(path.to_string_lossy().to_string()), None),
            },
        };

        let body = GenerateHttpRequest {
            text,
            language_id: &params.language,
            audio_prompt_path,
            audio_prompt_b64,
            exaggeration: params.exaggeration,
            temperature: params.temperature,
            cfg_weight: params.cfg_weight,
            seed: self.seed,
        };

        tracing::debug!(
            url = %self.config.url("/generate"),
            text_len = text.len(),
            language = %params.language,
            "Sending generate request"
        );

        let response = self
            .client
            .post(self.config.url("/generate"))
            .json(&body)
            .send()
            .await
            .map_err(map_send_error)?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(ModelError::InferenceFailed(format!(
                "HTTP {}: {}",
                status, error_text
            )));
        }

        let wav = response
            .bytes()
            .await
            .map_err(|e| ModelError::InvalidResponse(format!("Failed to read audio: {}", e)))?;

        let decoded = decode_wav(wav.to_vec())?;
        let mono = downmix(&decoded.samples, decoded.channels);
        Ok(resample(&mono, decoded.sample_rate, self.sample_rate))
    }
}

#[derive(Debug)]
struct DecodedWav {
    samples: Vec<f32>,
    sample_rate: u32,
    channels: usize,
}

/// 使用 symphonia 解码 WAV 为交错 f32 样本
fn decode_wav(data: Vec<u8>) -> Result<DecodedWav, ModelError> {
    let mss = MediaSourceStream::new(Box::new(Cursor::new(data)), Default::default());

    let mut hint = Hint::new();
    hint.with_extension("wav");

    let probed = symphonia::default::get_probe()
        .format(
            &hint,
            mss,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )
        .map_err(|e| ModelError::InvalidResponse(format!("Probe failed: {}", e)))?;

    let mut format = probed.format;
    let track = format
        .default_track()
        .ok_or_else(|| ModelError::InvalidResponse("No audio track found".to_string()))?;

    let sample_rate = track
        .codec_params
        .sample_rate
        .ok_or_else(|| ModelError::InvalidResponse("Unknown sample rate".to_string()))?;
    let channels = track
        .codec_params
        .channels
        .map(|c| c.count())
        .ok_or_else(|| ModelError::InvalidResponse("Unknown channel count".to_string()))?;

    let mut decoder = symphonia::default::get_codecs()
        .make(&track.codec_params, &DecoderOptions::default())
        .map_err(|e| ModelError::InvalidResponse(format!("Decoder creation failed: {}", e)))?;

    let track_id = track.id;
    let mut samples: Vec<f32> = Vec::new();

    loop {
        let packet = match format.next_packet() {
            Ok(p) => p,
            Err(symphonia::core::errors::Error::IoError(e))
                if e.kind() == std::io::ErrorKind::UnexpectedEof =>
            {
                break;
            }
            Err(e) => {
                return Err(ModelError::InvalidResponse(format!(
                    "Packet read error: {}",
                    e
                )));
            }
        };

        if packet.track_id() != track_id {
            continue;
        }

        // 丢包会让音频出现空洞，不能进入缓存
        let decoded = decoder
            .decode(&packet)
            .map_err(|e| ModelError::InvalidResponse(format!("Decode error: {}", e)))?;

        let spec = *decoded.spec();
        let num_frames = decoded.frames();
        let mut sample_buf = SampleBuffer::<f32>::new(num_frames as u64, spec);
        sample_buf.copy_interleaved_ref(decoded);
        let actual = num_frames * spec.channels.count();
        samples.extend(&sample_buf.samples()[..actual]);
    }

    Ok(DecodedWav {
        samples,
        sample_rate,
        channels,
    })
}

/// 多声道取平均
fn downmix(samples: &[f32], channels: usize) -> Vec<f32> {
    if channels <= 1 {
        return samples.to_vec();
    }
    samples
        .chunks(channels)
        .map(|frame| frame.iter().sum::<f32>() / frame.len() as f32)
        .collect()
}
