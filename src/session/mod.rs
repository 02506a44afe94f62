//! Speech session management
//!
//! This module provides:
//! - `SpeechSession`, the turn and connection state machine
//! - `SessionDriver`, which runs a session against a transport on one task
//! - Session configuration and statistics

mod config;
mod driver;
mod session;
mod stats;

pub use config::SessionConfig;
pub use driver::SessionDriver;
pub use session::{CloseReason, SessionAction, SessionState, SpeechSession};
pub use stats::{SessionStats, TranscriptSegment};
