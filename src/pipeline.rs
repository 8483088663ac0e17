use std::sync::Arc;
use tempfile::NamedTempFile;
use tracing::{info, warn};

use crate::db::MetadataStore;
use crate::error::UploadError;
use crate::frames::FrameSampler;
use crate::transcription::{render_transcript, SpeechEngine};

/// A validated-enough upload as it arrives from the HTTP layer
#[derive(Debug)]
pub struct UploadRequest {
    pub name: String,
    pub phone: String,
    pub file_name: Option<String>,
    pub video: Vec<u8>,
}

/// Result of a processed upload
#[derive(Debug, Clone)]
pub struct UploadOutcome {
    pub transcript_id: i64,
    pub frame_count: usize,
}

/// Sequential upload pipeline: transcribe, persist the transcript, then
/// sample and persist frames
///
/// Collaborators are injected as capabilities so tests can substitute stubs.
/// Transcription and the transcript insert are fatal for the request; the
/// frame stage degrades to zero frames on any failure.
pub struct UploadPipeline {
    engine: Arc<dyn SpeechEngine>,
    sampler: Arc<dyn FrameSampler>,
    store: Arc<dyn MetadataStore>,
}

impl UploadPipeline {
    pub fn new(
        engine: Arc<dyn SpeechEngine>,
        sampler: Arc<dyn FrameSampler>,
        store: Arc<dyn MetadataStore>,
    ) -> Self {
        Self {
            engine,
            sampler,
            store,
        }
    }

    pub async fn process(&self, request: UploadRequest) -> Result<UploadOutcome, UploadError> {
        if request.name.trim().is_empty() || request.phone.trim().is_empty() {
            return Err(UploadError::MissingNameOrPhone);
        }

        if request.video.is_empty() {
            return Err(UploadError::EmptyVideo);
        }

        // The scratch file lives until this function returns; dropping the
        // handle removes it on every exit path.
        let scratch = self.write_scratch_file(&request).await?;
        let video_path = scratch.path().to_path_buf();

        let segments = self.engine.transcribe(&video_path).await?;
        let transcript_text = render_transcript(&segments);

        let transcript_id = self
            .store
            .insert_transcript(&request.name, &request.phone, &transcript_text)
            .await
            .map_err(UploadError::Database)?;

        info!(
            "Stored transcript {} ({} segments) for {}",
            transcript_id,
            segments.len(),
            request.name
        );

        let frames = match self.sampler.sample(&video_path, transcript_id).await {
            Ok(frames) => frames,
            Err(e) => {
                warn!(
                    "Frame sampling failed for transcript {}, continuing without frames: {:#}",
                    transcript_id, e
                );
                Vec::new()
            }
        };

        if !frames.is_empty() {
            if let Err(e) = self.store.insert_frames(&frames).await {
                warn!(
                    "Failed to persist {} frame rows for transcript {}: {:#}",
                    frames.len(),
                    transcript_id,
                    e
                );
            }
        }

        Ok(UploadOutcome {
            transcript_id,
            frame_count: frames.len(),
        })
    }

    /// Materialize the upload to a scratch file the decoding and
    /// transcription tools can open by path
    async fn write_scratch_file(&self, request: &UploadRequest) -> Result<NamedTempFile, UploadError> {
        let suffix = request
            .file_name
            .as_deref()
            .and_then(|name| name.rsplit_once('.'))
            .map(|(_, ext)| format!(".{}", ext))
            .unwrap_or_else(|| ".mp4".to_string());

        let scratch = tempfile::Builder::new()
            .prefix("vidscribe_")
            .suffix(&suffix)
            .tempfile()
            .map_err(|e| UploadError::Internal(e.into()))?;

        tokio::fs::write(scratch.path(), &request.video)
            .await
            .map_err(|e| UploadError::Internal(e.into()))?;

        Ok(scratch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frames::FrameRecord;
    use crate::transcription::{Segment, TranscribeError};
    use anyhow::{anyhow, Result};
    use async_trait::async_trait;
    use std::path::Path;
    use std::sync::atomic::{AtomicI64, Ordering};
    use std::sync::Mutex;

    struct SilentEngine;

    #[async_trait]
    impl SpeechEngine for SilentEngine {
        async fn transcribe(&self, _path: &Path) -> Result<Vec<Segment>, TranscribeError> {
            Err(TranscribeError::NoAudio)
        }
    }

    struct FixedEngine(Vec<Segment>);

    #[async_trait]
    impl SpeechEngine for FixedEngine {
        async fn transcribe(&self, _path: &Path) -> Result<Vec<Segment>, TranscribeError> {
            Ok(self.0.clone())
        }
    }

    struct FixedSampler(usize);

    #[async_trait]
    impl FrameSampler for FixedSampler {
        async fn sample(&self, _path: &Path, transcript_id: i64) -> Result<Vec<FrameRecord>> {
            Ok((0..self.0)
                .map(|second| FrameRecord {
                    transcript_id,
                    frame_timestamp: second as i64,
                    frame_storage_url: Some(format!(
                        "https://cdn.example/{}/frame_{}.jpg",
                        transcript_id, second
                    )),
                })
                .collect())
        }
    }

    struct BrokenSampler;

    #[async_trait]
    impl FrameSampler for BrokenSampler {
        async fn sample(&self, _path: &Path, _transcript_id: i64) -> Result<Vec<FrameRecord>> {
            Err(anyhow!("Failed to open video"))
        }
    }

    #[derive(Default)]
    struct RecordingStore {
        next_id: AtomicI64,
        transcripts: Mutex<Vec<(String, String, String)>>,
        frames: Mutex<Vec<FrameRecord>>,
        fail_frame_insert: bool,
    }

    impl RecordingStore {
        fn starting_at(id: i64) -> Self {
            let store = Self::default();
            store.next_id.store(id, Ordering::SeqCst);
            store
        }
    }

    #[async_trait]
    impl MetadataStore for RecordingStore {
        async fn insert_transcript(
            &self,
            name: &str,
            phone: &str,
            transcript: &str,
        ) -> Result<i64> {
            self.transcripts.lock().unwrap().push((
                name.to_string(),
                phone.to_string(),
                transcript.to_string(),
            ));
            Ok(self.next_id.fetch_add(1, Ordering::SeqCst))
        }

        async fn insert_frames(&self, frames: &[FrameRecord]) -> Result<()> {
            if self.fail_frame_insert {
                return Err(anyhow!("frame insert rejected"));
            }
            self.frames.lock().unwrap().extend_from_slice(frames);
            Ok(())
        }
    }

    fn request(video: Vec<u8>) -> UploadRequest {
        UploadRequest {
            name: "Ada".to_string(),
            phone: "555-0100".to_string(),
            file_name: Some("clip.mp4".to_string()),
            video,
        }
    }

    fn hello_segment() -> Vec<Segment> {
        vec![Segment {
            start: 0.0,
            end: 2.0,
            text: "hello".to_string(),
        }]
    }

    fn pipeline(
        engine: impl SpeechEngine + 'static,
        sampler: impl FrameSampler + 'static,
        store: Arc<RecordingStore>,
    ) -> UploadPipeline {
        UploadPipeline::new(Arc::new(engine), Arc::new(sampler), store)
    }

    #[tokio::test]
    async fn test_missing_name_is_rejected() {
        let store = Arc::new(RecordingStore::default());
        let pipeline = pipeline(FixedEngine(hello_segment()), FixedSampler(0), store);

        let mut req = request(vec![1, 2, 3]);
        req.name = "  ".to_string();
        let err = pipeline.process(req).await.unwrap_err();

        assert!(matches!(err, UploadError::MissingNameOrPhone));
    }

    #[tokio::test]
    async fn test_empty_video_is_rejected() {
        let store = Arc::new(RecordingStore::default());
        let pipeline = pipeline(FixedEngine(hello_segment()), FixedSampler(0), store.clone());

        let err = pipeline.process(request(Vec::new())).await.unwrap_err();

        assert!(matches!(err, UploadError::EmptyVideo));
        assert!(store.transcripts.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_silent_video_persists_nothing() {
        let store = Arc::new(RecordingStore::default());
        let pipeline = pipeline(SilentEngine, FixedSampler(3), store.clone());

        let err = pipeline.process(request(vec![0; 64])).await.unwrap_err();

        assert_eq!(err.status(), axum::http::StatusCode::INTERNAL_SERVER_ERROR);
        assert!(err.to_string().contains("No audio detected"));
        assert!(store.transcripts.lock().unwrap().is_empty());
        assert!(store.frames.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_successful_upload_persists_transcript_and_frames() {
        let store = Arc::new(RecordingStore::starting_at(42));
        let pipeline = pipeline(FixedEngine(hello_segment()), FixedSampler(5), store.clone());

        let outcome = pipeline.process(request(vec![0; 64])).await.unwrap();

        assert_eq!(outcome.transcript_id, 42);
        assert_eq!(outcome.frame_count, 5);

        let transcripts = store.transcripts.lock().unwrap();
        assert_eq!(transcripts.len(), 1);
        assert_eq!(transcripts[0].0, "Ada");
        assert_eq!(transcripts[0].2, "[00:00:00,000 --> 00:00:02,000] hello");

        let frames = store.frames.lock().unwrap();
        assert_eq!(frames.len(), 5);
        assert!(frames.iter().all(|f| f.transcript_id == 42));
    }

    #[tokio::test]
    async fn test_frame_sampling_failure_degrades_to_zero_frames() {
        let store = Arc::new(RecordingStore::starting_at(7));
        let pipeline = pipeline(FixedEngine(hello_segment()), BrokenSampler, store.clone());

        let outcome = pipeline.process(request(vec![0; 64])).await.unwrap();

        assert_eq!(outcome.transcript_id, 7);
        assert_eq!(outcome.frame_count, 0);
        assert_eq!(store.transcripts.lock().unwrap().len(), 1);
        assert!(store.frames.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_frame_insert_failure_is_suppressed() {
        let store = Arc::new(RecordingStore {
            fail_frame_insert: true,
            ..RecordingStore::starting_at(9)
        });
        let pipeline = pipeline(FixedEngine(hello_segment()), FixedSampler(2), store.clone());

        let outcome = pipeline.process(request(vec![0; 64])).await.unwrap();

        // Transcript survives, the reported count still covers the sampled frames.
        assert_eq!(outcome.frame_count, 2);
        assert_eq!(store.transcripts.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_resubmission_creates_a_new_transcript() {
        let store = Arc::new(RecordingStore::starting_at(1));
        let pipeline = pipeline(FixedEngine(hello_segment()), FixedSampler(1), store.clone());

        let first = pipeline.process(request(vec![0; 64])).await.unwrap();
        let second = pipeline.process(request(vec![0; 64])).await.unwrap();

        assert_ne!(first.transcript_id, second.transcript_id);
        assert_eq!(store.transcripts.lock().unwrap().len(), 2);
    }
}
