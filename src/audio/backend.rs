use anyhow::Result;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use super::file::AudioFile;

/// Captured audio samples (normalized f32, interleaved)
#[derive(Debug, Clone)]
pub struct AudioFrame {
    /// Samples in [-1, 1], interleaved by channel
    pub samples: Vec<f32>,
    /// Sample rate in Hz
    pub sample_rate: u32,
    /// Number of channels
    pub channels: u16,
    /// Timestamp in milliseconds since capture started
    pub timestamp_ms: u64,
}

/// Configuration for audio backends
#[derive(Debug, Clone)]
pub struct AudioBackendConfig {
    /// Duration covered by each emitted frame
    pub frame_duration_ms: u64,
    /// Replay frames at real-time pace instead of as fast as possible
    pub realtime: bool,
}

impl Default for AudioBackendConfig {
    fn default() -> Self {
        Self {
            frame_duration_ms: 200, // recorder update interval
            realtime: true,
        }
    }
}

/// Audio capture source
///
/// Microphone capture lives outside this crate; implementors only need to
/// push frames into the returned channel.
#[async_trait::async_trait]
pub trait AudioBackend: Send + Sync {
    /// Start capturing audio
    ///
    /// Returns a channel receiver that will receive audio frames. The channel
    /// closes when capture ends.
    async fn start(&mut self) -> Result<mpsc::Receiver<AudioFrame>>;

    /// Stop capturing audio
    async fn stop(&mut self) -> Result<()>;

    /// Check if backend is currently capturing
    fn is_capturing(&self) -> bool;

    /// Get backend name for logging
    fn name(&self) -> &str;
}

/// Replays a WAV file as if it were being captured
pub struct FileBackend {
    audio: AudioFile,
    config: AudioBackendConfig,
    task: Option<JoinHandle<()>>,
}

impl FileBackend {
    pub fn new(audio: AudioFile, config: AudioBackendConfig) -> Self {
        Self {
            audio,
            config,
            task: None,
        }
    }

    /// Split interleaved samples into frames of the configured duration
    pub fn frames(&self) -> Vec<AudioFrame> {
        let channels = self.audio.channels.max(1) as usize;
        let frame_len = ((self.audio.sample_rate as u64 * self.config.frame_duration_ms / 1000)
            as usize)
            .max(1)
            * channels;

        self.audio
            .samples
            .chunks(frame_len)
            .enumerate()
            .map(|(i, chunk)| AudioFrame {
                samples: chunk.to_vec(),
                sample_rate: self.audio.sample_rate,
                channels: self.audio.channels,
                timestamp_ms: i as u64 * self.config.frame_duration_ms,
            })
            .collect()
    }
}

#[async_trait::async_trait]
impl AudioBackend for FileBackend {
    async fn start(&mut self) -> Result<mpsc::Receiver<AudioFrame>> {
        if self.task.is_some() {
            anyhow::bail!("{} is already capturing", self.audio.path);
        }

        let frames = self.frames();
        let (tx, rx) = mpsc::channel(32);
        let pace = self
            .config
            .realtime
            .then(|| Duration::from_millis(self.config.frame_duration_ms));

        info!(
            "Replaying {} ({} frames of {}ms)",
            self.audio.path,
            frames.len(),
            self.config.frame_duration_ms
        );

        self.task = Some(tokio::spawn(async move {
            for frame in frames {
                if tx.send(frame).await.is_err() {
                    debug!("Frame receiver dropped, ending replay");
                    break;
                }
                if let Some(pace) = pace {
                    tokio::time::sleep(pace).await;
                }
            }
        }));

        Ok(rx)
    }

    async fn stop(&mut self) -> Result<()> {
        if let Some(task) = self.task.take() {
            task.abort();
        }
        Ok(())
    }

    fn is_capturing(&self) -> bool {
        self.task.as_ref().is_some_and(|t| !t.is_finished())
    }

    fn name(&self) -> &str {
        "file"
    }
}
