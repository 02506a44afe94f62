use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::language::LanguageMode;
use crate::protocol::SpeechConfig;

/// Configuration for a speech session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Recognition language, selects the endpoint
    pub language: LanguageMode,

    /// Close the connection after this long without an inbound message
    /// Default: 180 seconds
    pub max_idle_duration: Duration,

    /// Close the connection after this long regardless of activity
    /// Default: 600 seconds
    pub max_duration: Duration,

    /// Audio chunks held while the speech config is unacknowledged
    pub max_pending_audio: usize,

    /// How often the driver polls the duration timers
    pub tick_interval: Duration,

    /// Client context sent in the `speech.config` message
    pub speech_config: SpeechConfig,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            language: LanguageMode::default(),
            max_idle_duration: Duration::from_secs(180), // 3 minutes
            max_duration: Duration::from_secs(600),      // 10 minutes
            max_pending_audio: 64,
            tick_interval: Duration::from_millis(250),
            speech_config: SpeechConfig::default(),
        }
    }
}

impl SessionConfig {
    pub fn endpoint(&self) -> String {
        self.language.endpoint()
    }
}
