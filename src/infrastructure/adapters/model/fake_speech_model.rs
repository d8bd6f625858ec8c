//! Fake Speech Model - 进程内确定性合成器
//!
//! 不读取权重内容，按字符生成音调片段。用于测试和本地开发

use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::application::ports::{GenerationParams, ModelError, SpeechModel, SpeechModelLoader};

/// Fake 模型配置
#[derive(Debug, Clone)]
pub struct FakeModelConfig {
    pub sample_rate: u32,
    pub device: String,
    /// 每个字符的时长（毫秒）
    pub ms_per_char: u32,
    /// 文本包含该子串时生成失败
    pub fail_on_text: Option<String>,
    /// 权重目录，设置时加载前检查其存在
    pub weights_dir: Option<PathBuf>,
}

impl Default for FakeModelConfig {
    fn default() -> Self {
        Self {
            sample_rate: 24000,
            device: "cpu".to_string(),
            ms_per_char: 25,
            fail_on_text: None,
            weights_dir: None,
        }
    }
}

/// 调用统计，加载器与模型共享
#[derive(Debug, Default)]
struct FakeModelStats {
    loads: AtomicUsize,
    generations: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    last_voice: Mutex<Option<PathBuf>>,
}

/// generate 期间计入并发数，离开作用域时扣除
struct InFlight<'a>(&'a FakeModelStats);

impl<'a> InFlight<'a> {
    fn enter(stats: &'a FakeModelStats) -> Self {
        let now = stats.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        stats.max_in_flight.fetch_max(now, Ordering::SeqCst);
        Self(stats)
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}

pub struct FakeSpeechModelLoader {
    config: FakeModelConfig,
    stats: Arc<FakeModelStats>,
}

impl FakeSpeechModelLoader {
    pub fn new(config: FakeModelConfig) -> Self {
        Self {
            config,
            stats: Arc::new(FakeModelStats::default()),
        }
    }

    pub fn load_count(&self) -> usize {
        self.stats.loads.load(Ordering::SeqCst)
    }

    /// generate 调用次数（含失败）
    pub fn generate_count(&self) -> usize {
        self.stats.generations.load(Ordering::SeqCst)
    }

    /// 同时执行的 generate 调用数的峰值
    pub fn max_in_flight(&self) -> usize {
        self.stats.max_in_flight.load(Ordering::SeqCst)
    }

    /// 最近一次调用收到的参考音频路径
    pub fn last_voice_path(&self) -> Option<PathBuf> {
        self.stats
            .last_voice
            .lock()
            .ok()
            .and_then(|guard| guard.clone())
    }
}

#[async_trait]
impl SpeechModelLoader for FakeSpeechModelLoader {
    fn backend(&self) -> &'static str {
        "fake"
    }

    async fn load(&self) -> Result<Box<dyn SpeechModel>, ModelError> {
        if self.config.sample_rate == 0 {
            return Err(ModelError::LoadFailed("sample_rate must be > 0".to_string()));
        }
        if let Some(dir) = &self.config.weights_dir {
            if !tokio::fs::metadata(dir).await.is_ok_and(|m| m.is_dir()) {
                return Err(ModelError::LoadFailed(format!(
                    "weights directory not found: {}",
                    dir.display()
                )));
            }
        }
        self.stats.loads.fetch_add(1, Ordering::SeqCst);

        Ok(Box::new(FakeSpeechModel {
            config: self.config.clone(),
            rng: StdRng::from_entropy(),
            stats: self.stats.clone(),
        }))
    }
}

pub struct FakeSpeechModel {
    config: FakeModelConfig,
    rng: StdRng,
    stats: Arc<FakeModelStats>,
}

impl FakeSpeechModel {
    /// 参考音频内容决定的音色偏移（Hz）
    fn voice_tint(voice: &[u8]) -> f32 {
        let hash = voice
            .iter()
            .fold(0u32, |acc, b| acc.wrapping_mul(31).wrapping_add(*b as u32));
        (hash % 200) as f32
    }

    fn render(&mut self, text: &str, tint: f32, params: &GenerationParams) -> Vec<f32> {
        let sr = self.config.sample_rate as f32;
        let per_char = (self.config.sample_rate * self.config.ms_per_char / 1000) as usize;
        let padding = (self.config.sample_rate / 10) as usize;
        let amplitude = 0.2 + 0.5 * params.exaggeration.clamp(0.0, 1.0);

        let mut samples = vec![0.0f32; padding];
        for ch in text.chars() {
            if ch.is_whitespace() {
                samples.extend(std::iter::repeat(0.0).take(per_char));
                continue;
            }

            let jitter: f32 = self.rng.gen_range(-1.0..1.0) * 0.05 * params.temperature;
            let freq = 180.0 + (ch as u32 % 40) as f32 * 12.0 + tint;
            let gain = amplitude * (1.0 + jitter);
            samples.extend((0..per_char).map(|i| {
                let t = i as f32 / sr;
                gain * (2.0 * std::f32::consts::PI * freq * t).sin()
            }));
        }
        samples.extend(std::iter::repeat(0.0).take(padding));
        samples
    }
}

#[async_trait]
impl SpeechModel for FakeSpeechModel {
    fn sample_rate(&self) -> u32 {
        self.config.sample_rate
    }

    fn device(&self) -> &str {
        &self.config.device
    }

    fn set_seed(&mut self, seed: Option<u64>) {
        self.rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
    }

    async fn generate(
        &mut self,
        text: &str,
        params: &GenerationParams,
    ) -> Result<Vec<f32>, ModelError> {
        self.stats.generations.fetch_add(1, Ordering::SeqCst);
        let stats = self.stats.clone();
        let _in_flight = InFlight::enter(&stats);
        // 让出执行权，未串行化的调用会在这里重叠
        tokio::task::yield_now().await;

        let tint = match &params.voice_path {
            Some(path) => {
                if let Ok(mut last) = self.stats.last_voice.lock() {
                    *last = Some(path.clone());
                }
                let voice = tokio::fs::read(path).await.map_err(|e| {
                    ModelError::VoiceUnavailable(format!("{}: {}", path.display(), e))
                })?;
                Self::voice_tint(&voice)
            }
            None => 0.0,
        };

        if let Some(marker) = &self.config.fail_on_text {
            if text.contains(marker.as_str()) {
                return Err(ModelError::InferenceFailed(format!(
                    "fake model refused text containing '{}'",
                    marker
                )));
            }
        }

        Ok(self.render(text, tint, params))
    }
}
