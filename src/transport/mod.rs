//! Seam to the socket that carries the speech protocol
//!
//! Connecting, TLS and reconnection belong to the socket owner. The session
//! only needs to send frames and observe the connection lifecycle.

pub mod channel;

pub use channel::{ChannelTransport, TransportCommand};

use crate::error::SpeechError;

/// Lifecycle and data events raised by the socket owner
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    Open,
    Message { data: Vec<u8>, is_binary: bool },
    Close { reason: String, was_clean: bool },
    Error(String),
}

impl TransportEvent {
    pub fn text(text: impl Into<String>) -> Self {
        TransportEvent::Message {
            data: text.into().into_bytes(),
            is_binary: false,
        }
    }
}

/// Outbound half of an established duplex connection
#[async_trait::async_trait]
pub trait Transport: Send + Sync {
    /// Send a text frame; resolves once the frame is handed to the socket
    async fn send_text(&self, text: String) -> Result<(), SpeechError>;

    /// Send a binary frame
    async fn send_bytes(&self, bytes: Vec<u8>) -> Result<(), SpeechError>;

    /// Ask the socket owner to close the connection
    async fn close(&self) -> Result<(), SpeechError>;
}
