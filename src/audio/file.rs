use anyhow::{Context, Result};
use hound::{SampleFormat, WavReader};
use std::path::Path;
use tracing::info;

use super::wav;

/// A WAV file loaded from disk as normalized samples
pub struct AudioFile {
    pub path: String,
    pub duration_seconds: f64,
    pub sample_rate: u32,
    pub channels: u16,
    pub samples: Vec<f32>,
}

impl AudioFile {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        info!("Opening audio file: {}", path.display());

        let reader = WavReader::open(path)
            .context("Failed to open WAV file")?;

        let spec = reader.spec();
        if spec.sample_format != SampleFormat::Int || spec.bits_per_sample != wav::BIT_DEPTH {
            anyhow::bail!(
                "Only 16-bit PCM files are supported, got {} bit {:?}",
                spec.bits_per_sample,
                spec.sample_format
            );
        }

        let samples: Vec<f32> = reader
            .into_samples::<i16>()
            .map(|s| s.map(|s| s as f32 / i16::MAX as f32))
            .collect::<Result<Vec<_>, _>>()
            .context("Failed to read audio samples")?;

        let duration_seconds = samples.len() as f64 /
            (spec.sample_rate as f64 * spec.channels as f64);

        info!(
            "Audio file loaded: {:.1}s, {}Hz, {} channels, {} samples",
            duration_seconds,
            spec.sample_rate,
            spec.channels,
            samples.len()
        );

        Ok(Self {
            path: path.display().to_string(),
            duration_seconds,
            sample_rate: spec.sample_rate,
            channels: spec.channels,
            samples,
        })
    }

    /// Re-encode the whole file with this crate's WAV encoder
    pub fn to_wav_bytes(&self) -> Result<Vec<u8>> {
        wav::encode_full(&self.samples, self.channels, self.sample_rate)
            .context("Failed to encode WAV bytes")
    }
}
