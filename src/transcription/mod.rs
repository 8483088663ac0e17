pub mod transcript;
pub mod whisper;

pub use transcript::{format_timestamp, render_transcript};
pub use whisper::WhisperEngine;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// One detected utterance with start/end times in seconds
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Segment {
    /// Start time in seconds
    pub start: f64,
    /// End time in seconds
    pub end: f64,
    /// Transcribed text
    pub text: String,
}

/// Transcription failure modes
#[derive(Debug, Error)]
pub enum TranscribeError {
    #[error("No audio detected in the video")]
    NoAudio,

    #[error("Speech engine failed: {0}")]
    Engine(#[from] anyhow::Error),
}

/// Trait for speech-recognition engines
///
/// Implementations take a locally materialized video file and produce the
/// detected utterances. An empty result is reported as [`TranscribeError::NoAudio`]
/// rather than an empty segment list.
#[async_trait]
pub trait SpeechEngine: Send + Sync {
    async fn transcribe(&self, video_path: &Path) -> Result<Vec<Segment>, TranscribeError>;
}
