//! 音频片段与 PCM 处理
//!
//! 纯函数，单声道 f32 样本，范围 [-1.0, 1.0]

use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum AudioError {
    #[error("No audio segments to assemble")]
    NoSegments,

    #[error("Sample rate mismatch: expected {expected} Hz, got {found} Hz")]
    SampleRateMismatch { expected: u32, found: u32 },

    #[error("Invalid speed factor: {0}")]
    InvalidSpeed(f32),
}

/// 单个分块的生成结果（模型原生采样率）
#[derive(Debug, Clone, PartialEq)]
pub struct AudioSegment {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
}

impl AudioSegment {
    pub fn new(samples: Vec<f32>, sample_rate: u32) -> Self {
        Self {
            samples,
            sample_rate,
        }
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn duration_ms(&self) -> u64 {
        if self.sample_rate == 0 {
            return 0;
        }
        self.samples.len() as u64 * 1000 / self.sample_rate as u64
    }
}

/// 静音裁剪参数
#[derive(Debug, Clone, Copy)]
pub struct TrimConfig {
    /// 振幅阈值（满幅度的比例）
    pub threshold: f32,
    /// 分析窗口（样本数），首尾各保留半个窗口
    pub window: usize,
    /// 全静音时保留的最小样本数
    pub min_samples: usize,
}

impl Default for TrimConfig {
    fn default() -> Self {
        Self {
            threshold: 0.01,
            window: 2048,
            min_samples: 100,
        }
    }
}

/// 按顺序首尾相接，不做交叉淡化
pub fn concatenate(segments: Vec<AudioSegment>) -> Result<AudioSegment, AudioError> {
    let mut iter = segments.into_iter();
    let mut merged = iter.next().ok_or(AudioError::NoSegments)?;

    for segment in iter {
        if segment.sample_rate != merged.sample_rate {
            return Err(AudioError::SampleRateMismatch {
                expected: merged.sample_rate,
                found: segment.sample_rate,
            });
        }
        merged.samples.extend(segment.samples);
    }

    Ok(merged)
}

/// 线性插值重采样，ratio = 目标采样率 / 源采样率
fn resample_linear(samples: &[f32], ratio: f64) -> Vec<f32> {
    if samples.is_empty() {
        return Vec::new();
    }

    let frame_count = samples.len();
    let new_frame_count = ((frame_count as f64 * ratio) as usize).max(1);
    let mut resampled = Vec::with_capacity(new_frame_count);

    for i in 0..new_frame_count {
        let src_pos = i as f64 / ratio;
        let src_idx = (src_pos as usize).min(frame_count - 1);
        let frac = (src_pos - src_idx as f64) as f32;

        let s0 = samples[src_idx];
        let s1 = samples.get(src_idx + 1).copied().unwrap_or(s0);

        resampled.push(s0 + (s1 - s0) * frac);
    }

    resampled
}

/// 采样率转换（远程后端返回非原生采样率时使用）
pub fn resample(samples: &[f32], from_rate: u32, to_rate: u32) -> Vec<f32> {
    if from_rate == to_rate || from_rate == 0 {
        return samples.to_vec();
    }
    resample_linear(samples, to_rate as f64 / from_rate as f64)
}

/// 变速
///
/// 把样本视为以 `sample_rate * speed` 录制，再重采样回原采样率。
/// 时长变为 1/speed，音高随之改变
pub fn change_speed(segment: AudioSegment, speed: f32) -> Result<AudioSegment, AudioError> {
    if !speed.is_finite() || speed <= 0.0 {
        return Err(AudioError::InvalidSpeed(speed));
    }
    if (speed - 1.0).abs() < f32::EPSILON {
        return Ok(segment);
    }

    let samples = resample_linear(&segment.samples, 1.0 / speed as f64);
    Ok(AudioSegment::new(samples, segment.sample_rate))
}

/// 裁剪首尾静音
///
/// 保留第一个到最后一个超过阈值的样本，两侧各扩展半个窗口。
/// 结果永远非空：全静音时保留前 min_samples 个样本，空输入补零
pub fn trim_silence(segment: AudioSegment, config: &TrimConfig) -> AudioSegment {
    let AudioSegment {
        samples,
        sample_rate,
    } = segment;
    let min_samples = config.min_samples.max(1);

    if samples.is_empty() {
        return AudioSegment::new(vec![0.0; min_samples], sample_rate);
    }

    let loud = |s: &f32| s.abs() > config.threshold;
    let (first, last) = match (
        samples.iter().position(loud),
        samples.iter().rposition(loud),
    ) {
        (Some(first), Some(last)) => (first, last),
        _ => {
            let keep = min_samples.min(samples.len());
            return AudioSegment::new(samples[..keep].to_vec(), sample_rate);
        }
    };

    let half = config.window / 2;
    let start = first.saturating_sub(half);
    let end = (last + 1 + half).min(samples.len());

    AudioSegment::new(samples[start..end].to_vec(), sample_rate)
}
