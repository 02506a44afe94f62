use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use super::session::{SessionAction, SessionState, SpeechSession};
use super::stats::SessionStats;
use crate::audio::CaptureEvent;
use crate::error::SpeechResult;
use crate::protocol::SpeechEvent;
use crate::transport::{Transport, TransportEvent};

/// Runs one [`SpeechSession`] against a transport
///
/// Socket events, captured audio and the timer poll are all handled on one
/// task, which is also the only writer to the transport.
pub struct SessionDriver {
    session: SpeechSession,
    transport: Arc<dyn Transport>,
    subscriber: Option<mpsc::Sender<SpeechEvent>>,
}

impl SessionDriver {
    pub fn new(session: SpeechSession, transport: Arc<dyn Transport>) -> Self {
        Self {
            session,
            transport,
            subscriber: None,
        }
    }

    /// Forward every routed inbound event to `subscriber`
    pub fn with_subscriber(mut self, subscriber: mpsc::Sender<SpeechEvent>) -> Self {
        self.subscriber = Some(subscriber);
        self
    }

    pub fn session(&self) -> &SpeechSession {
        &self.session
    }

    /// Drive the session until the connection closes
    ///
    /// Returns the session statistics, or the error behind a forced close.
    pub async fn run(
        mut self,
        mut inbound: mpsc::Receiver<TransportEvent>,
        mut capture: mpsc::Receiver<CaptureEvent>,
    ) -> SpeechResult<SessionStats> {
        self.session.begin_connection();

        let mut ticker = time::interval(self.session.config().tick_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut last_tick = Instant::now();
        let mut capture_open = true;

        loop {
            let accepting = capture_open && self.session.accepts_audio();

            tokio::select! {
                event = inbound.recv() => {
                    match event {
                        Some(event) => self.handle_transport_event(event).await?,
                        None => {
                            info!("Transport event stream ended");
                            if let Some(action) = self.session.close() {
                                self.execute(action).await?;
                            }
                        }
                    }
                }

                event = capture.recv(), if accepting => {
                    match event {
                        Some(CaptureEvent::Audio(bytes)) => {
                            match self.session.send_audio(&bytes) {
                                Ok(Some(action)) => self.execute(action).await?,
                                Ok(None) => {}
                                Err(e) => warn!("Dropping {} bytes of audio: {}", bytes.len(), e),
                            }
                        }
                        Some(CaptureEvent::Stopped) => {
                            info!("Capture stopped, starting a new turn");
                            self.session.new_turn();
                        }
                        None => {
                            debug!("Capture channel closed");
                            capture_open = false;
                        }
                    }
                }

                now = ticker.tick() => {
                    let elapsed = now.duration_since(last_tick);
                    last_tick = now;
                    if let Some(action) = self.session.tick(elapsed) {
                        self.execute(action).await?;
                    }
                }
            }

            if self.session.state() == SessionState::Closed {
                break;
            }
        }

        let stats = self.session.stats();
        info!(
            "Speech session ended: {} audio messages, {} turns, {} phrases",
            stats.audio_frames_sent, stats.turns_completed, stats.transcript_segments_count
        );

        match stats.close_reason.as_ref().and_then(|r| r.to_error()) {
            Some(e) => Err(e),
            None => Ok(stats),
        }
    }

    async fn handle_transport_event(&mut self, event: TransportEvent) -> SpeechResult<()> {
        match event {
            TransportEvent::Open => {
                let actions = self.session.on_open()?;
                self.execute_all(actions).await?;
            }
            TransportEvent::Message { data, is_binary } => {
                // Malformed frames are logged and counted by the session
                if let Ok(Some(event)) = self.session.on_message(&data, is_binary) {
                    self.publish(event).await;
                }
            }
            TransportEvent::Close { reason, was_clean } => {
                self.session.on_close(&reason, was_clean);
            }
            TransportEvent::Error(message) => {
                if let Some(action) = self.session.on_error(&message) {
                    self.execute(action).await?;
                }
            }
        }
        Ok(())
    }

    async fn execute(&mut self, action: SessionAction) -> SpeechResult<()> {
        self.execute_all(vec![action]).await
    }

    /// Perform actions in order, including any follow-ups they produce
    async fn execute_all(&mut self, actions: Vec<SessionAction>) -> SpeechResult<()> {
        let mut queue: VecDeque<SessionAction> = actions.into();

        while let Some(action) = queue.pop_front() {
            match action {
                SessionAction::SendConfig(message) => {
                    let sent = match self.transport.send_text(message).await {
                        Ok(()) => true,
                        Err(e) => {
                            error!("Failed to send speech config: {}", e);
                            false
                        }
                    };
                    queue.extend(self.session.on_config_sent(sent)?);
                }
                SessionAction::SendAudio(message) => {
                    if let Err(e) = self.transport.send_bytes(message).await {
                        queue.clear();
                        queue.extend(self.session.on_error(&e.to_string()));
                    }
                }
                SessionAction::Close(reason) => {
                    debug!("Closing transport: {:?}", reason);
                    if let Err(e) = self.transport.close().await {
                        warn!("Transport close failed: {}", e);
                    }
                }
            }
        }
        Ok(())
    }

    async fn publish(&mut self, event: SpeechEvent) {
        let Some(subscriber) = &self.subscriber else {
            return;
        };
        if subscriber.send(event).await.is_err() {
            debug!("Event subscriber dropped");
            self.subscriber = None;
        }
    }
}
