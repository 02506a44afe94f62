use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::session::{CloseReason, SessionState};

/// Statistics about a speech session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionStats {
    /// Current lifecycle state
    pub state: SessionState,

    /// When the current connection attempt began
    pub started_at: DateTime<Utc>,

    /// Seconds since `started_at`
    pub duration_secs: f64,

    /// Number of audio messages sent
    pub audio_frames_sent: usize,

    /// Audio payload bytes sent (frame headers excluded)
    pub audio_bytes_sent: usize,

    /// Inbound frames received, malformed ones included
    pub messages_received: usize,

    /// Inbound frames dropped as malformed
    pub malformed_messages: usize,

    /// Number of `turn.end` notifications received
    pub turns_completed: usize,

    /// Number of final phrases collected
    pub transcript_segments_count: usize,

    /// Why the last connection closed, if it has
    pub close_reason: Option<CloseReason>,
}

/// A final phrase recognised by the service
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptSegment {
    /// Recognised text
    pub text: String,

    /// Turn the phrase belongs to
    pub request_id: String,

    /// Recognition status reported by the service (e.g. "Success")
    pub status: String,

    /// When this segment was received
    pub timestamp: DateTime<Utc>,
}

impl TranscriptSegment {
    pub fn is_success(&self) -> bool {
        self.status == "Success"
    }
}
