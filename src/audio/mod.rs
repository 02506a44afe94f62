pub mod backend;
pub mod chunk;
pub mod file;
pub mod wav;

pub use backend::{AudioBackend, AudioBackendConfig, AudioFrame, FileBackend};
pub use chunk::{CaptureEvent, ChunkConfig, ChunkStats, WavChunker};
pub use file::AudioFile;
pub use wav::WavBuffer;
