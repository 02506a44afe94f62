//! 16-bit PCM WAV encoding and decoding
//!
//! The decoder only understands the layout produced by the encoder in this
//! module: a `fmt ` chunk immediately followed by the `data` chunk, with no
//! other chunks in between. Headerless buffers are treated as raw 16-bit PCM.

use crate::error::{SpeechError, WavError};

/// Size of the RIFF + fmt + data chunk headers written by the encoder
pub const WAV_HEADER_SIZE: usize = 44;

/// Sample rate assumed for headerless PCM buffers
pub const DEFAULT_SAMPLE_RATE: u32 = 16000;

/// Channel count assumed for headerless PCM buffers
pub const DEFAULT_CHANNELS: u16 = 1;

pub const BIT_DEPTH: u16 = 16;

const BYTES_PER_SAMPLE: usize = 2;
const FORMAT_PCM: u16 = 1;
const FORMAT_EXTENSIBLE: u16 = 65534;
const FMT_CHUNK_SIZE: u32 = 16;
const FMT_SIZE_OFFSET: usize = 16;

/// Decoded 16-bit PCM audio
#[derive(Debug, Clone, PartialEq)]
pub struct WavBuffer {
    pub sample_rate: u32,
    pub channels: u16,
    pub bit_depth: u16,
    /// Interleaved samples
    pub pcm_samples: Vec<i16>,
}

impl WavBuffer {
    /// Samples normalized to [-1, 1]
    pub fn normalized(&self) -> Vec<f32> {
        self.pcm_samples
            .iter()
            .map(|&s| s as f32 / i16::MAX as f32)
            .collect()
    }

    pub fn duration_secs(&self) -> f64 {
        if self.sample_rate == 0 || self.channels == 0 {
            return 0.0;
        }
        self.pcm_samples.len() as f64 / (self.sample_rate as f64 * self.channels as f64)
    }
}

/// Encode normalized float samples into a complete WAV file
pub fn encode_full(samples: &[f32], channels: u16, sample_rate: u32) -> Result<Vec<u8>, SpeechError> {
    encode_incremental(samples, channels, sample_rate, true)
}

/// Encode normalized float samples, optionally prefixed by the 44-byte header
///
/// Streams emit the header with their first chunk only, so that a receiver can
/// concatenate the chunks into one file.
pub fn encode_incremental(
    samples: &[f32],
    channels: u16,
    sample_rate: u32,
    include_header: bool,
) -> Result<Vec<u8>, SpeechError> {
    validate_arguments(channels, sample_rate)?;

    let data_size = samples.len() * BYTES_PER_SAMPLE;
    let header_size = if include_header { WAV_HEADER_SIZE } else { 0 };
    let mut bytes = Vec::with_capacity(header_size + data_size);

    if include_header {
        write_header(&mut bytes, channels, sample_rate, data_size)?;
    }

    for &sample in samples {
        bytes.extend_from_slice(&sample_to_i16(sample).to_le_bytes());
    }

    debug_assert_eq!(bytes.len(), header_size + data_size);
    Ok(bytes)
}

/// Rewrite the RIFF and data size fields of a concatenated stream
///
/// A stream built from `encode_incremental(.., true)` followed by headerless
/// chunks carries the sizes of its first chunk only. After this call the
/// buffer is byte-identical to `encode_full` over all of the samples.
pub fn finalize_stream_sizes(bytes: &mut [u8]) -> Result<(), SpeechError> {
    if bytes.len() < WAV_HEADER_SIZE || &bytes[0..4] != b"RIFF" {
        return Err(WavError::InvalidFormat("stream does not start with a WAV header".into()).into());
    }

    let data_size = bytes.len() - WAV_HEADER_SIZE;
    let riff_size = to_u32(bytes.len() - 8)?;
    bytes[4..8].copy_from_slice(&riff_size.to_le_bytes());
    bytes[40..44].copy_from_slice(&to_u32(data_size)?.to_le_bytes());
    Ok(())
}

/// Decode a WAV buffer (or raw headerless PCM) into 16-bit samples
pub fn decode(bytes: &[u8]) -> Result<WavBuffer, SpeechError> {
    if !has_riff_header(bytes) {
        return Ok(WavBuffer {
            sample_rate: DEFAULT_SAMPLE_RATE,
            channels: DEFAULT_CHANNELS,
            bit_depth: BIT_DEPTH,
            pcm_samples: read_pcm(bytes),
        });
    }

    // fmt chunk fields end at offset 36
    if bytes.len() < 36 {
        return Err(WavError::InvalidFormat(format!("header truncated at {} bytes", bytes.len())).into());
    }

    let fmt_size = read_u32(bytes, FMT_SIZE_OFFSET) as usize;
    let audio_format = read_u16(bytes, 20);
    if audio_format != FORMAT_PCM && audio_format != FORMAT_EXTENSIBLE {
        return Err(WavError::UnsupportedFormatCode(audio_format).into());
    }

    let channels = read_u16(bytes, 22);
    let sample_rate = read_u32(bytes, 24);
    let bit_depth = read_u16(bytes, 34);
    if bit_depth != BIT_DEPTH {
        return Err(WavError::UnsupportedBitDepth(bit_depth).into());
    }

    // Position of the data chunk size field, directly after the fmt payload
    let size_offset = FMT_SIZE_OFFSET
        .checked_add(4)
        .and_then(|o| o.checked_add(fmt_size))
        .and_then(|o| o.checked_add(4))
        .ok_or_else(|| WavError::InvalidFormat("fmt chunk size overflows".into()))?;

    if bytes.len() < size_offset + 4 {
        return Err(WavError::InvalidFormat("missing data chunk".into()).into());
    }
    if &bytes[size_offset - 4..size_offset] != b"data" {
        return Err(WavError::InvalidFormat("data chunk does not follow fmt chunk".into()).into());
    }

    let declared = read_u32(bytes, size_offset) as usize;
    let payload = &bytes[size_offset + 4..];
    if declared > payload.len() {
        return Err(WavError::SizeMismatch {
            declared,
            available: payload.len(),
        }
        .into());
    }

    Ok(WavBuffer {
        sample_rate,
        channels,
        bit_depth,
        pcm_samples: read_pcm(&payload[..declared]),
    })
}

/// Whether the buffer starts with the "RIFF" magic
pub fn has_riff_header(bytes: &[u8]) -> bool {
    bytes.len() >= 4 && &bytes[0..4] == b"RIFF"
}

/// Convert a normalized sample to 16-bit PCM
///
/// Input is clamped to [-1, 1] first; NaN becomes silence.
pub fn sample_to_i16(sample: f32) -> i16 {
    if sample.is_nan() {
        return 0;
    }
    (sample.clamp(-1.0, 1.0) * i16::MAX as f32).round() as i16
}

fn write_header(
    bytes: &mut Vec<u8>,
    channels: u16,
    sample_rate: u32,
    data_size: usize,
) -> Result<(), SpeechError> {
    let block_align = channels
        .checked_mul(BYTES_PER_SAMPLE as u16)
        .ok_or_else(|| SpeechError::InvalidAudioArguments(format!("{} channels", channels)))?;
    let byte_rate = sample_rate
        .checked_mul(block_align as u32)
        .ok_or_else(|| SpeechError::InvalidAudioArguments(format!("sample rate {}", sample_rate)))?;
    let file_size = to_u32(WAV_HEADER_SIZE + data_size)?;

    // RIFF descriptor
    bytes.extend_from_slice(b"RIFF");
    bytes.extend_from_slice(&(file_size - 8).to_le_bytes());
    bytes.extend_from_slice(b"WAVE");

    // fmt chunk
    bytes.extend_from_slice(b"fmt ");
    bytes.extend_from_slice(&FMT_CHUNK_SIZE.to_le_bytes());
    bytes.extend_from_slice(&FORMAT_PCM.to_le_bytes());
    bytes.extend_from_slice(&channels.to_le_bytes());
    bytes.extend_from_slice(&sample_rate.to_le_bytes());
    bytes.extend_from_slice(&byte_rate.to_le_bytes());
    bytes.extend_from_slice(&block_align.to_le_bytes());
    bytes.extend_from_slice(&BIT_DEPTH.to_le_bytes());

    // data chunk header
    bytes.extend_from_slice(b"data");
    bytes.extend_from_slice(&to_u32(data_size)?.to_le_bytes());

    Ok(())
}

fn validate_arguments(channels: u16, sample_rate: u32) -> Result<(), SpeechError> {
    if channels == 0 {
        return Err(SpeechError::InvalidAudioArguments("channel count must be at least 1".into()));
    }
    if sample_rate == 0 {
        return Err(SpeechError::InvalidAudioArguments("sample rate must be positive".into()));
    }
    Ok(())
}

fn to_u32(value: usize) -> Result<u32, SpeechError> {
    u32::try_from(value)
        .map_err(|_| SpeechError::InvalidAudioArguments(format!("{} bytes exceeds WAV size limit", value)))
}

fn read_pcm(bytes: &[u8]) -> Vec<i16> {
    bytes
        .chunks_exact(BYTES_PER_SAMPLE)
        .map(|pair| i16::from_le_bytes([pair[0], pair[1]]))
        .collect()
}

fn read_u16(bytes: &[u8], offset: usize) -> u16 {
    u16::from_le_bytes([bytes[offset], bytes[offset + 1]])
}

fn read_u32(bytes: &[u8], offset: usize) -> u32 {
    u32::from_le_bytes([
        bytes[offset],
        bytes[offset + 1],
        bytes[offset + 2],
        bytes[offset + 3],
    ])
}
