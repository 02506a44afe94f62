use anyhow::{Context, Result};
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use super::backend::AudioFrame;
use super::wav;

/// Events a capture pipeline delivers to a speech session
#[derive(Debug, Clone, PartialEq)]
pub enum CaptureEvent {
    /// WAV bytes; the first chunk of a recording carries the RIFF header
    Audio(Vec<u8>),
    /// Recording finished; the session should start a new turn
    Stopped,
}

/// Chunker configuration
#[derive(Debug, Clone)]
pub struct ChunkConfig {
    /// Recording stops once this much audio has been chunked
    pub max_recording: Duration,
}

impl Default for ChunkConfig {
    fn default() -> Self {
        Self {
            max_recording: Duration::from_secs(180), // stay inside the idle ceiling
        }
    }
}

/// Summary of one chunked recording
#[derive(Debug, Clone, Default)]
pub struct ChunkStats {
    /// Number of chunks emitted
    pub chunk_count: usize,
    /// Number of samples encoded (all channels)
    pub sample_count: usize,
    /// Total WAV bytes emitted, header included
    pub byte_count: usize,
    /// Whether the recording hit the duration limit
    pub truncated: bool,
}

/// Incremental WAV chunker
///
/// Turns captured frames into WAV byte chunks. The 44-byte header is written
/// once, with the first chunk of a recording; later chunks are headerless PCM.
pub struct WavChunker {
    config: ChunkConfig,
    header_sent: bool,
    recorded_ms: u64,
    stats: ChunkStats,
}

impl WavChunker {
    pub fn new(config: ChunkConfig) -> Self {
        Self {
            config,
            header_sent: false,
            recorded_ms: 0,
            stats: ChunkStats::default(),
        }
    }

    /// Encode one frame, returning `None` if it would take the recording past
    /// the limit
    pub fn push(&mut self, frame: &AudioFrame) -> Result<Option<Vec<u8>>> {
        let limit = self.config.max_recording.as_millis() as u64;
        if self.recorded_ms + frame_duration_ms(frame) > limit {
            return Ok(None);
        }

        let bytes = wav::encode_incremental(
            &frame.samples,
            frame.channels,
            frame.sample_rate,
            !self.header_sent,
        )
        .context("Failed to encode audio frame")?;

        self.header_sent = true;
        self.recorded_ms += frame_duration_ms(frame);
        self.stats.chunk_count += 1;
        self.stats.sample_count += frame.samples.len();
        self.stats.byte_count += bytes.len();

        Ok(Some(bytes))
    }

    pub fn is_full(&self) -> bool {
        self.recorded_ms >= self.config.max_recording.as_millis() as u64
    }

    /// Forget the header state so the next chunk starts a new file
    pub fn reset(&mut self) {
        self.header_sent = false;
        self.recorded_ms = 0;
        self.stats = ChunkStats::default();
    }

    pub fn stats(&self) -> &ChunkStats {
        &self.stats
    }

    /// Chunk frames until the source closes or the recording limit is reached,
    /// then send `CaptureEvent::Stopped`
    pub async fn record(
        &mut self,
        mut frames: mpsc::Receiver<AudioFrame>,
        events: mpsc::Sender<CaptureEvent>,
    ) -> Result<ChunkStats> {
        info!(
            "Starting chunked capture (limit {}s)",
            self.config.max_recording.as_secs()
        );

        while let Some(frame) = frames.recv().await {
            match self.push(&frame)? {
                Some(bytes) => {
                    debug!("Captured chunk {} ({} bytes)", self.stats.chunk_count, bytes.len());
                    if events.send(CaptureEvent::Audio(bytes)).await.is_err() {
                        warn!("Capture subscriber dropped, stopping recording");
                        return Ok(self.stats.clone());
                    }
                }
                None => {
                    info!("Recording limit reached after {}ms", self.recorded_ms);
                    self.stats.truncated = true;
                    break;
                }
            }
        }

        if events.send(CaptureEvent::Stopped).await.is_err() {
            warn!("Capture subscriber dropped before stop notification");
        }

        info!(
            "Chunked capture complete: {} chunks, {} bytes",
            self.stats.chunk_count, self.stats.byte_count
        );

        Ok(self.stats.clone())
    }
}

fn frame_duration_ms(frame: &AudioFrame) -> u64 {
    let per_second = frame.sample_rate as u64 * frame.channels.max(1) as u64;
    if per_second == 0 {
        return 0;
    }
    frame.samples.len() as u64 * 1000 / per_second
}
