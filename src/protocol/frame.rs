//! Outgoing frame construction
//!
//! Text messages are `header block + body`. Binary messages are
//! `[u16 big-endian header length][ASCII header block][payload]`, where the
//! length counts the header bytes only.

use crate::error::{FrameError, SpeechError};
use chrono::{DateTime, Utc};
use uuid::Uuid;

pub const PATH: &str = "Path";
pub const CONTENT_TYPE: &str = "Content-Type";
pub const X_TIMESTAMP: &str = "X-Timestamp";
pub const X_REQUEST_ID: &str = "X-RequestId";
pub const X_CONNECTION_ID: &str = "X-ConnectionId";
pub const AUTHORIZATION: &str = "Authorization";

pub const PATH_SPEECH_CONFIG: &str = "speech.config";
pub const PATH_AUDIO: &str = "audio";

pub const CONTENT_TYPE_JSON: &str = "application/json; charset=utf-8";
pub const CONTENT_TYPE_WAV: &str = "audio/x-wav";

const CRLF: &str = "\r\n";

/// Ordered header block
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Header {
    fields: Vec<(String, String)>,
}

impl Header {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a field, keeping insertion order
    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.push(name, value);
        self
    }

    pub fn push(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.fields.push((name.into(), value.into()));
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn fields(&self) -> &[(String, String)] {
        &self.fields
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl<N: Into<String>, V: Into<String>> FromIterator<(N, V)> for Header {
    fn from_iter<I: IntoIterator<Item = (N, V)>>(iter: I) -> Self {
        Self {
            fields: iter.into_iter().map(|(n, v)| (n.into(), v.into())).collect(),
        }
    }
}

/// Render the header block: one `name: value` line per field, then a blank line
pub fn build_header(header: &Header) -> String {
    let mut block = String::new();
    for (name, value) in header.fields() {
        block.push_str(name);
        block.push_str(": ");
        block.push_str(value);
        block.push_str(CRLF);
    }
    block.push_str(CRLF);
    block
}

pub fn build_text_message(body: &str, header: &Header) -> String {
    let mut message = build_header(header);
    message.push_str(body);
    message
}

pub fn build_binary_message(payload: &[u8], header: &Header) -> Result<Vec<u8>, SpeechError> {
    let block = build_header(header);
    if !block.is_ascii() {
        return Err(FrameError::NonAsciiHeader.into());
    }

    let header_bytes = block.as_bytes();
    let prefix = u16::try_from(header_bytes.len())
        .map_err(|_| FrameError::HeaderTooLong(header_bytes.len()))?;

    let mut message = Vec::with_capacity(2 + header_bytes.len() + payload.len());
    message.extend_from_slice(&prefix.to_be_bytes());
    message.extend_from_slice(header_bytes);
    message.extend_from_slice(payload);
    Ok(message)
}

/// `speech.config` handshake message
pub fn speech_config_message(body: &str) -> String {
    let header = Header::new()
        .with(PATH, PATH_SPEECH_CONFIG)
        .with(CONTENT_TYPE, CONTENT_TYPE_JSON)
        .with(X_TIMESTAMP, x_timestamp());
    build_text_message(body, &header)
}

/// `audio` message carrying WAV bytes for the given turn
pub fn audio_message(request_id: &str, wav_bytes: &[u8]) -> Result<Vec<u8>, SpeechError> {
    let header = Header::new()
        .with(PATH, PATH_AUDIO)
        .with(X_REQUEST_ID, request_id)
        .with(X_TIMESTAMP, x_timestamp())
        .with(CONTENT_TYPE, CONTENT_TYPE_WAV);
    build_binary_message(wav_bytes, &header)
}

/// Headers for the socket upgrade request
pub fn connection_headers(token: &str, connection_id: &str) -> Header {
    Header::new()
        .with(AUTHORIZATION, format!("Bearer {}", token))
        .with(X_CONNECTION_ID, connection_id)
}

/// Current UTC time as ISO-8601 with 100ns precision, e.g. `2024-01-02T03:04:05.1234567Z`
pub fn x_timestamp() -> String {
    format_timestamp(Utc::now())
}

/// chrono has no 7-digit fraction specifier, so the ticks are appended by hand
pub fn format_timestamp(instant: DateTime<Utc>) -> String {
    // Leap seconds report nanos above 1e9
    let ticks = instant.timestamp_subsec_nanos() % 1_000_000_000 / 100;
    format!("{}.{:07}Z", instant.format("%Y-%m-%dT%H:%M:%S"), ticks)
}

/// Random 32-hex-digit identifier without dashes
pub fn new_id() -> String {
    Uuid::new_v4().simple().to_string()
}

/// Split a binary message back into its header block and payload
pub fn split_binary_message(message: &[u8]) -> Option<(&str, &[u8])> {
    if message.len() < 2 {
        return None;
    }
    let header_len = u16::from_be_bytes([message[0], message[1]]) as usize;
    let rest = &message[2..];
    if rest.len() < header_len {
        return None;
    }
    let header = std::str::from_utf8(&rest[..header_len]).ok()?;
    Some((header, &rest[header_len..]))
}
