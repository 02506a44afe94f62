use tokio::sync::mpsc;
use tracing::debug;

use super::Transport;
use crate::error::SpeechError;

/// Command for the task that owns the socket
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportCommand {
    SendText(String),
    SendBinary(Vec<u8>),
    Close,
}

/// Transport that forwards frames to the socket task over a channel
///
/// The channel is the single writer path: frames reach the socket in the
/// order they were sent, each one whole.
#[derive(Clone)]
pub struct ChannelTransport {
    tx: mpsc::Sender<TransportCommand>,
}

impl ChannelTransport {
    pub fn new(tx: mpsc::Sender<TransportCommand>) -> Self {
        Self { tx }
    }

    /// Create a transport together with the receiver the socket task drains
    pub fn pair(buffer: usize) -> (Self, mpsc::Receiver<TransportCommand>) {
        let (tx, rx) = mpsc::channel(buffer);
        (Self::new(tx), rx)
    }

    async fn send(&self, command: TransportCommand) -> Result<(), SpeechError> {
        self.tx
            .send(command)
            .await
            .map_err(|_| SpeechError::Transport("socket task has shut down".into()))
    }
}

#[async_trait::async_trait]
impl Transport for ChannelTransport {
    async fn send_text(&self, text: String) -> Result<(), SpeechError> {
        debug!("Queueing text frame ({} bytes)", text.len());
        self.send(TransportCommand::SendText(text)).await
    }

    async fn send_bytes(&self, bytes: Vec<u8>) -> Result<(), SpeechError> {
        debug!("Queueing binary frame ({} bytes)", bytes.len());
        self.send(TransportCommand::SendBinary(bytes)).await
    }

    async fn close(&self) -> Result<(), SpeechError> {
        self.send(TransportCommand::Close).await
    }
}
