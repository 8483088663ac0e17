/// vidscribe - video upload transcription service
///
/// Accepts an uploaded video over HTTP, produces a timestamped transcript via
/// Whisper, samples one JPEG frame per second, uploads the frames to object
/// storage and records metadata rows in a hosted database.

pub mod api;
pub mod config;
pub mod db;
pub mod error;
pub mod frames;
pub mod pipeline;
pub mod storage;
pub mod transcription;

// Re-export main types for easy access
pub use crate::config::Config;
pub use crate::db::{MetadataStore, SupabaseDb};
pub use crate::error::UploadError;
pub use crate::frames::{FrameRecord, FrameSampler, VideoFrameSampler};
pub use crate::pipeline::{UploadOutcome, UploadPipeline, UploadRequest};
pub use crate::storage::{ObjectStore, SupabaseStorage};
pub use crate::transcription::{Segment, SpeechEngine, TranscribeError, WhisperEngine};
