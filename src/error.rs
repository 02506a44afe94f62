use thiserror::Error;

/// Errors raised while decoding a WAV buffer
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WavError {
    #[error("invalid WAV layout: {0}")]
    InvalidFormat(String),

    #[error("unsupported audio format code {0} (only PCM and WAVE_FORMAT_EXTENSIBLE)")]
    UnsupportedFormatCode(u16),

    #[error("unsupported bit depth {0} (only 16-bit samples)")]
    UnsupportedBitDepth(u16),

    #[error("data chunk declares {declared} bytes but only {available} are present")]
    SizeMismatch { declared: usize, available: usize },
}

/// Errors raised while building outgoing frames
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FrameError {
    #[error("header block is {0} bytes, exceeds the 16-bit length prefix")]
    HeaderTooLong(usize),

    #[error("header block contains non-ASCII characters")]
    NonAsciiHeader,
}

#[derive(Error, Debug)]
pub enum SpeechError {
    #[error("malformed message: {0}")]
    MalformedMessage(String),

    #[error("unhandled message path: {0}")]
    UnhandledPath(String),

    #[error("unsupported audio format: {0}")]
    UnsupportedAudioFormat(#[from] WavError),

    #[error("frame error: {0}")]
    Frame(#[from] FrameError),

    #[error("invalid audio arguments: {0}")]
    InvalidAudioArguments(String),

    #[error("speech config not acknowledged, audio not sent")]
    ConfigNotAcknowledged,

    #[error("{0} duration exceeded")]
    DurationExceeded(&'static str),

    #[error("session is closed")]
    SessionClosed,

    #[error("transport failure: {0}")]
    Transport(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type SpeechResult<T> = Result<T, SpeechError>;
