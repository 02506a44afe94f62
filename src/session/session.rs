use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::time::Duration;
use tracing::{debug, error, info, warn};

use super::config::SessionConfig;
use super::stats::{SessionStats, TranscriptSegment};
use crate::error::{SpeechError, SpeechResult};
use crate::protocol::frame::{self, Header};
use crate::protocol::parser::{self, SpeechEvent};

/// Connection lifecycle of a speech session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionState {
    /// Connection attempt in progress, socket not yet open
    Idle,
    /// Socket open, `speech.config` sent but not yet confirmed
    AwaitingConfigAck,
    /// Audio may be sent
    Streaming,
    Closed,
}

/// Why a session asked for (or observed) a close
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CloseReason {
    /// No inbound message within the idle ceiling
    IdleTimeout,
    /// Connection older than the total ceiling
    MaxDuration,
    /// The `speech.config` message could not be sent
    ConfigFailed,
    /// Closed on request of the host
    Requested,
    /// Socket closed by the peer or transport
    Remote { reason: String, was_clean: bool },
    /// Transport reported an error
    TransportError(String),
}

impl CloseReason {
    /// The error a caller should see for this close, if any
    pub fn to_error(&self) -> Option<SpeechError> {
        match self {
            CloseReason::IdleTimeout => Some(SpeechError::DurationExceeded("idle")),
            CloseReason::MaxDuration => Some(SpeechError::DurationExceeded("total")),
            CloseReason::ConfigFailed => Some(SpeechError::ConfigNotAcknowledged),
            CloseReason::TransportError(message) => Some(SpeechError::Transport(message.clone())),
            CloseReason::Requested | CloseReason::Remote { .. } => None,
        }
    }
}

/// Instruction for whoever owns the transport
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionAction {
    /// Send the `speech.config` text message and report the outcome back
    /// through [`SpeechSession::on_config_sent`]
    SendConfig(String),
    /// Send a binary audio message
    SendAudio(Vec<u8>),
    /// Close the socket
    Close(CloseReason),
}

#[derive(Debug, Default)]
struct Counters {
    audio_frames_sent: usize,
    audio_bytes_sent: usize,
    messages_received: usize,
    malformed_messages: usize,
    turns_completed: usize,
}

/// Turn and connection state for one speech socket
///
/// The session performs no I/O. Socket events are fed in, and the returned
/// [`SessionAction`]s tell the owner what to send. Timers are advanced by
/// polling [`SpeechSession::tick`].
pub struct SpeechSession {
    config: SessionConfig,
    state: SessionState,
    connection_id: Option<String>,
    current_request_id: Option<String>,
    config_sent: bool,
    elapsed_total: Duration,
    elapsed_idle: Duration,
    pending_audio: VecDeque<Vec<u8>>,
    counters: Counters,
    transcript: Vec<TranscriptSegment>,
    close_reason: Option<CloseReason>,
    started_at: DateTime<Utc>,
}

impl SpeechSession {
    pub fn new(config: SessionConfig) -> Self {
        Self {
            config,
            state: SessionState::Idle,
            connection_id: None,
            current_request_id: None,
            config_sent: false,
            elapsed_total: Duration::ZERO,
            elapsed_idle: Duration::ZERO,
            pending_audio: VecDeque::new(),
            counters: Counters::default(),
            transcript: Vec::new(),
            close_reason: None,
            started_at: Utc::now(),
        }
    }

    /// Start a connection attempt, minting a fresh connection id
    pub fn begin_connection(&mut self) -> &str {
        self.reset();
        self.state = SessionState::Idle;
        self.close_reason = None;
        self.started_at = Utc::now();
        let id = frame::new_id();
        info!("Starting speech connection {}", id);
        self.connection_id.insert(id)
    }

    /// Headers for the socket upgrade request
    pub fn connection_headers(&mut self, token: &str) -> Header {
        if self.connection_id.is_none() {
            self.begin_connection();
        }
        let connection_id = self.connection_id.as_deref().unwrap_or_default();
        frame::connection_headers(token, connection_id)
    }

    /// Socket opened: start timers and emit the one-time speech config
    pub fn on_open(&mut self) -> SpeechResult<Vec<SessionAction>> {
        if self.state == SessionState::Closed || self.connection_id.is_none() {
            self.begin_connection();
        }

        info!(
            "Speech socket open (connection {})",
            self.connection_id.as_deref().unwrap_or_default()
        );
        self.elapsed_total = Duration::ZERO;
        self.elapsed_idle = Duration::ZERO;

        // Config goes out once per connection
        if self.config_sent {
            self.state = SessionState::Streaming;
            self.ensure_request_id();
            return self.flush_pending();
        }

        let body = self.config.speech_config.to_json()?;
        let message = frame::speech_config_message(&body);
        debug!("Sending speech config:\n{}", message);

        self.state = SessionState::AwaitingConfigAck;
        Ok(vec![SessionAction::SendConfig(message)])
    }

    /// Outcome of sending the speech config
    pub fn on_config_sent(&mut self, sent: bool) -> SpeechResult<Vec<SessionAction>> {
        if self.state != SessionState::AwaitingConfigAck {
            warn!("Ignoring config confirmation in state {:?}", self.state);
            return Ok(Vec::new());
        }

        if !sent {
            error!("Failed sending speech config, closing connection");
            return Ok(self.close_with(CloseReason::ConfigFailed).into_iter().collect());
        }

        self.config_sent = true;
        self.state = SessionState::Streaming;
        self.ensure_request_id();
        info!("Speech config sent, streaming ready");

        self.flush_pending()
    }

    /// Wrap captured WAV bytes in an audio message
    ///
    /// While the config is unacknowledged the bytes are held back (up to the
    /// configured limit) and released by [`SpeechSession::on_config_sent`].
    pub fn send_audio(&mut self, wav_bytes: &[u8]) -> SpeechResult<Option<SessionAction>> {
        match self.state {
            SessionState::Streaming => {
                let request_id = self.ensure_request_id().to_string();
                let message = frame::audio_message(&request_id, wav_bytes)?;
                self.counters.audio_frames_sent += 1;
                self.counters.audio_bytes_sent += wav_bytes.len();
                Ok(Some(SessionAction::SendAudio(message)))
            }
            SessionState::AwaitingConfigAck => {
                if self.pending_audio.len() >= self.config.max_pending_audio {
                    warn!(
                        "Audio queue full ({} chunks) while awaiting config ack",
                        self.pending_audio.len()
                    );
                    return Err(SpeechError::ConfigNotAcknowledged);
                }
                self.pending_audio.push_back(wav_bytes.to_vec());
                Ok(None)
            }
            SessionState::Idle => Err(SpeechError::ConfigNotAcknowledged),
            SessionState::Closed => Err(SpeechError::SessionClosed),
        }
    }

    /// Start a new turn with a fresh request id
    pub fn new_turn(&mut self) -> &str {
        let id = frame::new_id();
        info!("New turn {}", id);
        self.current_request_id.insert(id)
    }

    /// Handle an inbound frame
    ///
    /// Any frame resets the idle timer. Malformed frames are reported and
    /// otherwise leave the session untouched; unknown paths are ignored.
    pub fn on_message(&mut self, data: &[u8], is_binary: bool) -> SpeechResult<Option<SpeechEvent>> {
        if self.state == SessionState::Closed {
            return Err(SpeechError::SessionClosed);
        }

        self.elapsed_idle = Duration::ZERO;
        self.counters.messages_received += 1;

        let text = parser::frame_text(data);
        if text.is_empty() {
            return Ok(None);
        }
        debug!(
            "Speech {} message:\n{}",
            if is_binary { "binary" } else { "text" },
            text
        );

        let event = match parser::parse_event(&text) {
            Ok(event) => event,
            Err(SpeechError::UnhandledPath(path)) => {
                warn!("Unhandled message path: {}", path);
                return Ok(None);
            }
            Err(e) => {
                self.counters.malformed_messages += 1;
                error!("Failed to parse speech message: {}", e);
                return Err(e);
            }
        };

        self.apply(&event);
        Ok(Some(event))
    }

    /// Advance both duration timers and check the ceilings
    ///
    /// Returns a close action the first time a ceiling is exceeded; the
    /// session is `Closed` afterwards, so later calls return `None`.
    pub fn tick(&mut self, elapsed: Duration) -> Option<SessionAction> {
        if !self.timers_running() {
            return None;
        }

        self.elapsed_idle += elapsed;
        self.elapsed_total += elapsed;

        let reason = if self.elapsed_idle > self.config.max_idle_duration {
            CloseReason::IdleTimeout
        } else if self.elapsed_total > self.config.max_duration {
            CloseReason::MaxDuration
        } else {
            return None;
        };

        info!(
            "Closing speech socket, {:?} (idle {:.1}s, total {:.1}s)",
            reason,
            self.elapsed_idle.as_secs_f64(),
            self.elapsed_total.as_secs_f64()
        );
        self.close_with(reason)
    }

    /// Close on request of the host
    pub fn close(&mut self) -> Option<SessionAction> {
        self.close_with(CloseReason::Requested)
    }

    /// Socket closed by the peer or transport
    pub fn on_close(&mut self, reason: &str, was_clean: bool) {
        info!(
            "Speech socket closed with reason: {} (clean: {}, after {:.1}s)",
            reason,
            was_clean,
            self.elapsed_total.as_secs_f64()
        );
        if self.state != SessionState::Closed {
            self.close_reason = Some(CloseReason::Remote {
                reason: reason.to_string(),
                was_clean,
            });
        }
        self.reset();
    }

    /// Transport error: the socket should be torn down
    pub fn on_error(&mut self, message: &str) -> Option<SessionAction> {
        error!("Speech socket error: {}", message);
        self.close_with(CloseReason::TransportError(message.to_string()))
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Whether audio handed in now will be sent or queued
    pub fn accepts_audio(&self) -> bool {
        matches!(
            self.state,
            SessionState::AwaitingConfigAck | SessionState::Streaming
        )
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn connection_id(&self) -> Option<&str> {
        self.connection_id.as_deref()
    }

    pub fn current_request_id(&self) -> Option<&str> {
        self.current_request_id.as_deref()
    }

    pub fn is_config_sent(&self) -> bool {
        self.config_sent
    }

    pub fn elapsed_idle(&self) -> Duration {
        self.elapsed_idle
    }

    pub fn elapsed_total(&self) -> Duration {
        self.elapsed_total
    }

    pub fn pending_audio(&self) -> usize {
        self.pending_audio.len()
    }

    pub fn close_reason(&self) -> Option<&CloseReason> {
        self.close_reason.as_ref()
    }

    pub fn transcript(&self) -> &[TranscriptSegment] {
        &self.transcript
    }

    pub fn stats(&self) -> SessionStats {
        let duration = Utc::now().signed_duration_since(self.started_at);

        SessionStats {
            state: self.state,
            started_at: self.started_at,
            duration_secs: duration.num_milliseconds() as f64 / 1000.0,
            audio_frames_sent: self.counters.audio_frames_sent,
            audio_bytes_sent: self.counters.audio_bytes_sent,
            messages_received: self.counters.messages_received,
            malformed_messages: self.counters.malformed_messages,
            turns_completed: self.counters.turns_completed,
            transcript_segments_count: self.transcript.len(),
            close_reason: self.close_reason.clone(),
        }
    }

    fn apply(&mut self, event: &SpeechEvent) {
        match event {
            SpeechEvent::TurnEnd { request_id } => {
                if self.current_request_id.as_deref() != Some(request_id.as_str()) {
                    debug!("turn.end for {} while on {:?}", request_id, self.current_request_id);
                }
                self.counters.turns_completed += 1;
                // The service expects a new request id after every turn
                self.new_turn();
            }
            SpeechEvent::Phrase {
                request_id,
                text,
                status,
                ..
            } => {
                if text.is_empty() {
                    debug!("Phrase without text ({})", status);
                    return;
                }
                info!("Phrase: {}", text);
                self.transcript.push(TranscriptSegment {
                    text: text.clone(),
                    request_id: request_id.clone(),
                    status: status.clone(),
                    timestamp: Utc::now(),
                });
            }
            _ => {}
        }
    }

    fn ensure_request_id(&mut self) -> &str {
        if self.current_request_id.is_none() {
            self.new_turn();
        }
        self.current_request_id.as_deref().unwrap_or_default()
    }

    fn flush_pending(&mut self) -> SpeechResult<Vec<SessionAction>> {
        let mut actions = Vec::with_capacity(self.pending_audio.len());
        while let Some(bytes) = self.pending_audio.pop_front() {
            if let Some(action) = self.send_audio(&bytes)? {
                actions.push(action);
            }
        }
        if !actions.is_empty() {
            debug!("Released {} queued audio chunks", actions.len());
        }
        Ok(actions)
    }

    fn timers_running(&self) -> bool {
        matches!(
            self.state,
            SessionState::AwaitingConfigAck | SessionState::Streaming
        )
    }

    fn close_with(&mut self, reason: CloseReason) -> Option<SessionAction> {
        if self.state == SessionState::Closed {
            return None;
        }
        self.close_reason = Some(reason.clone());
        self.reset();
        Some(SessionAction::Close(reason))
    }

    /// Drop all per-connection state
    fn reset(&mut self) {
        self.state = SessionState::Closed;
        self.connection_id = None;
        self.current_request_id = None;
        self.config_sent = false;
        self.elapsed_total = Duration::ZERO;
        self.elapsed_idle = Duration::ZERO;
        self.pending_audio.clear();
    }
}
