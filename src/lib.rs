pub mod audio;
pub mod config;
pub mod error;
pub mod language;
pub mod protocol;
pub mod session;
pub mod transport;

pub use audio::{
    AudioBackend, AudioBackendConfig, AudioFile, AudioFrame, CaptureEvent, ChunkConfig,
    ChunkStats, FileBackend, WavBuffer, WavChunker,
};
pub use config::Config;
pub use error::{FrameError, SpeechError, SpeechResult, WavError};
pub use language::LanguageMode;
pub use protocol::{Header, ParsedMessage, SpeechConfig, SpeechEvent};
pub use session::{
    CloseReason, SessionAction, SessionConfig, SessionDriver, SessionState, SessionStats,
    SpeechSession, TranscriptSegment,
};
pub use transport::{ChannelTransport, Transport, TransportCommand, TransportEvent};
