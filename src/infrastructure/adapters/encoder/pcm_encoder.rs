//! PCM Encoder - 单声道 f32 PCM 编码
//!
//! 支持：
//! - WAV (16-bit PCM, RIFF 容器)
//! - MP3 (LAME, 固定码率)

use mp3lame_encoder::{Bitrate, Builder, FlushNoGap, MonoPcm, Quality};

use crate::application::ports::{AudioEncoderPort, EncodeError};
use crate::domain::{AudioSegment, OutputFormat};

/// LAME flush 最多输出的字节数
const MP3_FLUSH_RESERVE: usize = 7200;

/// 支持的 MP3 固定码率（kbps）
pub const MP3_BITRATES_KBPS: &[u32] = &[64, 96, 112, 128, 160, 192, 224, 256, 320];

pub struct PcmEncoder {
    mp3_bitrate_kbps: u32,
}

impl PcmEncoder {
    pub fn new(mp3_bitrate_kbps: u32) -> Self {
        Self { mp3_bitrate_kbps }
    }

    pub fn supports_bitrate(kbps: u32) -> bool {
        MP3_BITRATES_KBPS.contains(&kbps)
    }

    fn to_i16(samples: &[f32]) -> Vec<i16> {
        samples
            .iter()
            .map(|&s| (s.clamp(-1.0, 1.0) * 32767.0) as i16)
            .collect()
    }

    fn bitrate(&self) -> Result<Bitrate, EncodeError> {
        let bitrate = match self.mp3_bitrate_kbps {
            64 => Bitrate::Kbps64,
            96 => Bitrate::Kbps96,
            112 => Bitrate::Kbps112,
            128 => Bitrate::Kbps128,
            160 => Bitrate::Kbps160,
            192 => Bitrate::Kbps192,
            224 => Bitrate::Kbps224,
            256 => Bitrate::Kbps256,
            320 => Bitrate::Kbps320,
            other => {
                return Err(EncodeError::InitFailed(format!(
                    "unsupported mp3 bitrate: {} kbps",
                    other
                )))
            }
        };
        Ok(bitrate)
    }

    /// 编码为 WAV
    fn encode_wav(&self, audio: &AudioSegment) -> Result<Vec<u8>, EncodeError> {
        if audio.sample_rate == 0 {
            return Err(EncodeError::InvalidInput("sample rate is 0".to_string()));
        }

        let bits_per_sample: u16 = 16;
        let num_channels: u16 = 1;
        let sample_rate = audio.sample_rate;
        let byte_rate = sample_rate * num_channels as u32 * (bits_per_sample / 8) as u32;
        let block_align = num_channels * (bits_per_sample / 8);

        let pcm_data = Self::to_i16(&audio.samples);
        let data_size = pcm_data.len() * 2;
        let file_size = 36 + data_size;

        let mut wav = Vec::with_capacity(44 + data_size);

        // RIFF header
        wav.extend_from_slice(b"RIFF");
        wav.extend_from_slice(&(file_size as u32).to_le_bytes());
        wav.extend_from_slice(b"WAVE");

        // fmt chunk
        wav.extend_from_slice(b"fmt ");
        wav.extend_from_slice(&16u32.to_le_bytes());
        wav.extend_from_slice(&1u16.to_le_bytes()); // PCM
        wav.extend_from_slice(&num_channels.to_le_bytes());
        wav.extend_from_slice(&sample_rate.to_le_bytes());
        wav.extend_from_slice(&byte_rate.to_le_bytes());
        wav.extend_from_slice(&block_align.to_le_bytes());
        wav.extend_from_slice(&bits_per_sample.to_le_bytes());

        // data chunk
        wav.extend_from_slice(b"data");
        wav.extend_from_slice(&(data_size as u32).to_le_bytes());
        for sample in pcm_data {
            wav.extend_from_slice(&sample.to_le_bytes());
        }

        Ok(wav)
    }

    /// 编码为 MP3
    fn encode_mp3(&self, audio: &AudioSegment) -> Result<Vec<u8>, EncodeError> {
        let mut builder = Builder::new()
            .ok_or_else(|| EncodeError::InitFailed("LAME allocation failed".to_string()))?;
        builder
            .set_num_channels(1)
            .map_err(|e| EncodeError::InitFailed(format!("set channels: {:?}", e)))?;
        builder
            .set_sample_rate(audio.sample_rate)
            .map_err(|e| EncodeError::InitFailed(format!("set sample rate: {:?}", e)))?;
        builder
            .set_brate(self.bitrate()?)
            .map_err(|e| EncodeError::InitFailed(format!("set bitrate: {:?}", e)))?;
        builder
            .set_quality(Quality::Good)
            .map_err(|e| EncodeError::InitFailed(format!("set quality: {:?}", e)))?;
        let mut encoder = builder
            .build()
            .map_err(|e| EncodeError::InitFailed(format!("build: {:?}", e)))?;

        let pcm_i16 = Self::to_i16(&audio.samples);
        let mut out = Vec::with_capacity(
            mp3lame_encoder::max_required_buffer_size(pcm_i16.len()) + MP3_FLUSH_RESERVE,
        );

        let encoded = encoder
            .encode(MonoPcm(&pcm_i16), out.spare_capacity_mut())
            .map_err(|e| EncodeError::EncodingFailed(format!("encode: {:?}", e)))?;
        // SAFETY: encoder 已初始化前 encoded 个字节
        unsafe {
            out.set_len(out.len().wrapping_add(encoded));
        }

        let flushed = encoder
            .flush::<FlushNoGap>(out.spare_capacity_mut())
            .map_err(|e| EncodeError::EncodingFailed(format!("flush: {:?}", e)))?;
        // SAFETY: 同上
        unsafe {
            out.set_len(out.len().wrapping_add(flushed));
        }

        if out.is_empty() {
            return Err(EncodeError::EncodingFailed(
                "encoder produced no output".to_string(),
            ));
        }
        Ok(out)
    }
}

impl AudioEncoderPort for PcmEncoder {
    fn encode(&self, audio: &AudioSegment, format: OutputFormat) -> Result<Vec<u8>, EncodeError> {
        match format {
            OutputFormat::Wav => self.encode_wav(audio),
            OutputFormat::Mp3 => self.encode_mp3(audio),
        }
    }

    fn probe_duration_ms(&self, data: &[u8], format: OutputFormat) -> Option<u64> {
        match format {
            OutputFormat::Wav => parse_wav_header(data).ok().map(|h| h.duration_ms()),
            OutputFormat::Mp3 => None,
        }
    }
}

#[derive(Debug)]
struct WavHeader {
    num_channels: u16,
    sample_rate: u32,
    bits_per_sample: u16,
    data_size: usize,
}

impl WavHeader {
    fn duration_ms(&self) -> u64 {
        let bytes_per_second =
            self.sample_rate as u64 * self.num_channels as u64 * (self.bits_per_sample as u64 / 8);
        if bytes_per_second == 0 {
            return 0;
        }
        self.data_size as u64 * 1000 / bytes_per_second
    }
}

/// 解析 WAV 文件头
fn parse_wav_header(data: &[u8]) -> Result<WavHeader, EncodeError> {
    if data.len() < 44 {
        return Err(EncodeError::InvalidInput("WAV data too short".to_string()));
    }
    if &data[0..4] != b"RIFF" || &data[8..12] != b"WAVE" {
        return Err(EncodeError::InvalidInput(
            "Invalid WAV: missing RIFF/WAVE header".to_string(),
        ));
    }

    let mut pos = 12;
    let mut fmt: Option<(u16, u32, u16)> = None;

    while pos + 8 <= data.len() {
        let chunk_id = &data[pos..pos + 4];
        let chunk_size =
            u32::from_le_bytes([data[pos + 4], data[pos + 5], data[pos + 6], data[pos + 7]])
                as usize;

        match chunk_id {
            b"fmt " => {
                if chunk_size < 16 || pos + 8 + 16 > data.len() {
                    return Err(EncodeError::InvalidInput(
                        "Invalid fmt chunk size".to_string(),
                    ));
                }
                let f = &data[pos + 8..pos + 8 + 16];
                fmt = Some((
                    u16::from_le_bytes([f[2], f[3]]),
                    u32::from_le_bytes([f[4], f[5], f[6], f[7]]),
                    u16::from_le_bytes([f[14], f[15]]),
                ));
            }
            b"data" => {
                let (num_channels, sample_rate, bits_per_sample) = fmt.ok_or_else(|| {
                    EncodeError::InvalidInput("Invalid WAV: data before fmt".to_string())
                })?;
                return Ok(WavHeader {
                    num_channels,
                    sample_rate,
                    bits_per_sample,
                    data_size: chunk_size.min(data.len() - (pos + 8)),
                });
            }
            _ => {}
        }

        pos += 8 + chunk_size;
        // 对齐到偶数字节
        if chunk_size % 2 != 0 {
            pos += 1;
        }
    }

    Err(EncodeError::InvalidInput(
        "Invalid WAV: missing data chunk".to_string(),
    ))
}
