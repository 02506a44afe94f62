//! Inbound message parsing
//!
//! The service replies with a loose header block followed by a JSON object.
//! Headers are located line by line with these patterns (multiline mode):
//!
//! - path: `^Path:\s*([A-Za-z.]+)`
//! - request id: `^X-RequestId:\s*([A-Za-z0-9]+)`
//! - timestamp: `^X-Timestamp:\s*(\S+)` (optional)
//!
//! The body is everything from the first `{` to the end of the text. Braces
//! are not balanced.

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::warn;

use super::messages::{parse_body, SpeechDetected, SpeechHypothesis, SpeechPhrase, TurnStart};
use crate::error::SpeechError;

pub const PATH_HYPOTHESIS: &str = "speech.hypothesis";
pub const PATH_PHRASE: &str = "speech.phrase";
pub const PATH_START_DETECTED: &str = "speech.startDetected";
pub const PATH_END_DETECTED: &str = "speech.endDetected";
pub const PATH_TURN_START: &str = "turn.start";
pub const PATH_TURN_END: &str = "turn.end";

static PATH_LINE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^Path:[ \t]*([A-Za-z.]+)").expect("valid regex"));
static REQUEST_ID_LINE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^X-RequestId:[ \t]*([A-Za-z0-9]+)").expect("valid regex"));
static TIMESTAMP_LINE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^X-Timestamp:[ \t]*(\S+)").expect("valid regex"));

/// A header block and JSON body received from the service
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedMessage {
    pub path: String,
    pub request_id: String,
    pub timestamp: Option<String>,
    pub body: String,
}

/// Routed notification from the service
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpeechEvent {
    /// Interim recognition result
    Hypothesis {
        request_id: String,
        text: String,
        offset: u64,
        duration: u64,
    },
    /// Final recognition result
    Phrase {
        request_id: String,
        text: String,
        status: String,
        offset: u64,
        duration: u64,
    },
    SpeechStartDetected { request_id: String, offset: u64 },
    SpeechEndDetected { request_id: String, offset: u64 },
    TurnStart {
        request_id: String,
        service_tag: Option<String>,
    },
    TurnEnd { request_id: String },
}

impl SpeechEvent {
    pub fn request_id(&self) -> &str {
        match self {
            SpeechEvent::Hypothesis { request_id, .. }
            | SpeechEvent::Phrase { request_id, .. }
            | SpeechEvent::SpeechStartDetected { request_id, .. }
            | SpeechEvent::SpeechEndDetected { request_id, .. }
            | SpeechEvent::TurnStart { request_id, .. }
            | SpeechEvent::TurnEnd { request_id } => request_id,
        }
    }

    /// Whether this is a final phrase recognised successfully
    pub fn is_successful_phrase(&self) -> bool {
        matches!(self, SpeechEvent::Phrase { status, .. } if status == "Success")
    }
}

/// Text view of a raw frame
///
/// Text and binary frames are both read as UTF-8; invalid sequences become
/// U+FFFD so a damaged frame still reaches the header scanner.
pub fn frame_text(data: &[u8]) -> String {
    String::from_utf8_lossy(data).into_owned()
}

/// Extract path, request id, timestamp and body from a message
pub fn parse_message(text: &str) -> Result<ParsedMessage, SpeechError> {
    let path = capture(&PATH_LINE, text)
        .ok_or_else(|| SpeechError::MalformedMessage("missing Path header".into()))?;
    let request_id = capture(&REQUEST_ID_LINE, text)
        .ok_or_else(|| SpeechError::MalformedMessage("missing X-RequestId header".into()))?;
    let body_start = text
        .find('{')
        .ok_or_else(|| SpeechError::MalformedMessage("missing JSON body".into()))?;

    Ok(ParsedMessage {
        path,
        request_id,
        timestamp: capture(&TIMESTAMP_LINE, text),
        body: text[body_start..].to_string(),
    })
}

/// Route a parsed message by path
pub fn route(message: &ParsedMessage) -> Result<SpeechEvent, SpeechError> {
    let request_id = message.request_id.clone();

    let event = match message.path.as_str() {
        PATH_HYPOTHESIS => {
            let hypothesis: SpeechHypothesis = parse_body(&message.body)?;
            SpeechEvent::Hypothesis {
                request_id,
                text: hypothesis.text,
                offset: hypothesis.offset,
                duration: hypothesis.duration,
            }
        }
        PATH_PHRASE => {
            let phrase: SpeechPhrase = parse_body(&message.body)?;
            SpeechEvent::Phrase {
                request_id,
                text: phrase.display_text,
                status: phrase.recognition_status,
                offset: phrase.offset,
                duration: phrase.duration,
            }
        }
        PATH_START_DETECTED => {
            let detected: SpeechDetected = parse_body(&message.body)?;
            SpeechEvent::SpeechStartDetected {
                request_id,
                offset: detected.offset,
            }
        }
        PATH_END_DETECTED => {
            let detected: SpeechDetected = parse_body(&message.body)?;
            SpeechEvent::SpeechEndDetected {
                request_id,
                offset: detected.offset,
            }
        }
        PATH_TURN_START => {
            // Tag is informational only
            let service_tag = match parse_body::<TurnStart>(&message.body) {
                Ok(turn) => turn.context.service_tag,
                Err(e) => {
                    warn!("Ignoring unreadable turn.start body: {}", e);
                    None
                }
            };
            SpeechEvent::TurnStart {
                request_id,
                service_tag,
            }
        }
        PATH_TURN_END => SpeechEvent::TurnEnd { request_id },
        other => return Err(SpeechError::UnhandledPath(other.to_string())),
    };

    Ok(event)
}

/// Parse and route in one step
pub fn parse_event(text: &str) -> Result<SpeechEvent, SpeechError> {
    route(&parse_message(text)?)
}

fn capture(re: &Regex, text: &str) -> Option<String> {
    re.captures(text)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
        .filter(|s| !s.is_empty())
}
