use anyhow::{Context, Result};
use serde::Deserialize;
use std::time::Duration;

use crate::audio::{AudioBackendConfig, ChunkConfig};
use crate::language::LanguageMode;
use crate::protocol::messages::DEFAULT_CLIENT_VERSION;
use crate::protocol::SpeechConfig;
use crate::session::SessionConfig;

#[derive(Debug, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub service: ServiceConfig,
    #[serde(default)]
    pub speech: SpeechSettings,
    #[serde(default)]
    pub audio: AudioConfig,
}

#[derive(Debug, Deserialize)]
pub struct ServiceConfig {
    pub name: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            name: "speech-stream".to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct SpeechSettings {
    pub language: LanguageMode,
    pub client_version: String,
    pub max_idle_secs: u64,
    pub max_session_secs: u64,
    pub max_pending_audio: usize,
    /// e.g. "Linux 6.1.0 on 64 bit Ubuntu"; detected from the host when unset
    pub os_description: Option<String>,
    pub device_model: Option<String>,
}

impl Default for SpeechSettings {
    fn default() -> Self {
        let session = SessionConfig::default();
        Self {
            language: LanguageMode::default(),
            client_version: DEFAULT_CLIENT_VERSION.to_string(),
            max_idle_secs: session.max_idle_duration.as_secs(),
            max_session_secs: session.max_duration.as_secs(),
            max_pending_audio: session.max_pending_audio,
            os_description: None,
            device_model: None,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct AudioConfig {
    pub sample_rate: u32,
    pub channels: u16,
    pub frame_duration_ms: u64,
    pub max_recording_secs: u64,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            sample_rate: 16000,
            channels: 1,
            frame_duration_ms: 200,
            max_recording_secs: 180,
        }
    }
}

impl Config {
    /// Load `path` (any extension the config crate knows, optional) and
    /// overlay `SPEECH__SECTION__KEY` environment variables
    pub fn load(path: &str) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(path).required(false))
            .add_source(config::Environment::with_prefix("SPEECH").separator("__"))
            .build()
            .with_context(|| format!("Failed to load config from {}", path))?;

        settings
            .try_deserialize()
            .context("Failed to parse configuration")
    }

    pub fn speech_config(&self) -> SpeechConfig {
        let speech = &self.speech;
        match (&speech.os_description, &speech.device_model) {
            (Some(os), Some(device)) => {
                SpeechConfig::from_descriptors(&speech.client_version, os, device)
            }
            _ => SpeechConfig::detect(&speech.client_version),
        }
    }

    pub fn to_session_config(&self) -> SessionConfig {
        SessionConfig {
            language: self.speech.language,
            max_idle_duration: Duration::from_secs(self.speech.max_idle_secs),
            max_duration: Duration::from_secs(self.speech.max_session_secs),
            max_pending_audio: self.speech.max_pending_audio,
            speech_config: self.speech_config(),
            ..SessionConfig::default()
        }
    }

    pub fn backend_config(&self) -> AudioBackendConfig {
        AudioBackendConfig {
            frame_duration_ms: self.audio.frame_duration_ms,
            ..AudioBackendConfig::default()
        }
    }

    /// Reject audio the service was not configured for
    pub fn check_audio_format(&self, sample_rate: u32, channels: u16) -> Result<()> {
        if sample_rate != self.audio.sample_rate || channels != self.audio.channels {
            anyhow::bail!(
                "Audio is {}Hz {}ch, expected {}Hz {}ch",
                sample_rate,
                channels,
                self.audio.sample_rate,
                self.audio.channels
            );
        }
        Ok(())
    }

    pub fn chunk_config(&self) -> ChunkConfig {
        ChunkConfig {
            max_recording: Duration::from_secs(self.audio.max_recording_secs),
        }
    }
}
