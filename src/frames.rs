use anyhow::{anyhow, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use tokio::process::Command;
use tracing::{debug, warn};

use crate::storage::ObjectStore;

/// Frame rate assumed when the source reports zero or a negative value
const DEFAULT_FPS: f64 = 25.0;

/// Metadata for one sampled video frame
///
/// Field names match the `frame` table columns; the URL is absent when the
/// upload or URL resolution failed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FrameRecord {
    pub transcript_id: i64,
    pub frame_timestamp: i64,
    pub frame_storage_url: Option<String>,
}

/// Trait for per-second frame samplers
#[async_trait]
pub trait FrameSampler: Send + Sync {
    /// Sample one frame per whole second of video and return the collected
    /// metadata. Per-frame failures are skipped; only an unreadable video
    /// is an error.
    async fn sample(&self, video_path: &Path, transcript_id: i64) -> Result<Vec<FrameRecord>>;
}

/// Reason a second was dropped from the batch
#[derive(Debug)]
enum FrameSkip {
    Decode(String),
    Encode,
}

/// Seam between the sampling loop and the decoding tool, so the loop's
/// skip semantics can be exercised without spawning ffmpeg
#[async_trait]
trait VideoDecoder: Send + Sync {
    /// Probe stream properties of the video
    async fn probe(&self, video_path: &Path) -> Result<VideoProbe>;

    /// Decode the frame at `second` and encode it as JPEG
    async fn extract_jpeg(&self, video_path: &Path, second: u64) -> Result<Vec<u8>, FrameSkip>;
}

/// Probed stream properties used to derive the sampling schedule
#[derive(Debug, Clone, Copy)]
struct VideoProbe {
    fps: f64,
    total_frames: f64,
}

impl VideoProbe {
    /// Whole seconds of video: floor(total_frames / fps)
    fn duration_seconds(&self) -> u64 {
        let fps = if self.fps > 0.0 { self.fps } else { DEFAULT_FPS };
        (self.total_frames / fps).floor().max(0.0) as u64
    }
}

/// Frame sampler backed by ffprobe/ffmpeg, uploading JPEGs to an object store
pub struct VideoFrameSampler {
    store: Arc<dyn ObjectStore>,
    decoder: Arc<dyn VideoDecoder>,
}

impl VideoFrameSampler {
    pub fn new(store: Arc<dyn ObjectStore>) -> Self {
        Self {
            store,
            decoder: Arc::new(FfmpegDecoder),
        }
    }

    #[cfg(test)]
    fn with_decoder(store: Arc<dyn ObjectStore>, decoder: Arc<dyn VideoDecoder>) -> Self {
        Self { store, decoder }
    }
}

/// ffprobe/ffmpeg command-line decoder
struct FfmpegDecoder;

#[async_trait]
impl VideoDecoder for FfmpegDecoder {
    /// Probe stream properties with ffprobe
    async fn probe(&self, video_path: &Path) -> Result<VideoProbe> {
        let output = Command::new("ffprobe")
            .args([
                "-v",
                "quiet",
                "-print_format",
                "json",
                "-show_format",
                "-show_streams",
            ])
            .arg(video_path)
            .output()
            .await?;

        if !output.status.success() {
            return Err(anyhow!("Failed to open video: {}", video_path.display()));
        }

        let json_str = String::from_utf8(output.stdout)?;
        let ffprobe_data: serde_json::Value = serde_json::from_str(&json_str)?;
        parse_probe(&ffprobe_data)
    }

    /// Decode the frame at `second` and encode it as JPEG in one ffmpeg run
    async fn extract_jpeg(&self, video_path: &Path, second: u64) -> Result<Vec<u8>, FrameSkip> {
        let output = Command::new("ffmpeg")
            .args(["-hide_banner", "-loglevel", "error"])
            .arg("-ss")
            .arg(second.to_string())
            .arg("-i")
            .arg(video_path)
            .args(["-frames:v", "1", "-f", "image2", "-c:v", "mjpeg", "pipe:1"])
            .output()
            .await
            .map_err(|e| FrameSkip::Decode(e.to_string()))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(FrameSkip::Decode(stderr.trim().to_string()));
        }

        if output.stdout.is_empty() {
            return Err(FrameSkip::Encode);
        }

        Ok(output.stdout)
    }
}

#[async_trait]
impl FrameSampler for VideoFrameSampler {
    async fn sample(&self, video_path: &Path, transcript_id: i64) -> Result<Vec<FrameRecord>> {
        let probe = self.decoder.probe(video_path).await?;
        let duration = probe.duration_seconds();
        debug!(
            "Sampling {} seconds from {} ({:.2} fps)",
            duration,
            video_path.display(),
            probe.fps
        );

        let mut records = Vec::new();

        for second in 0..duration {
            match self.decoder.extract_jpeg(video_path, second).await {
                Ok(jpeg) => {
                    let record =
                        upload_frame(self.store.as_ref(), transcript_id, second, jpeg).await;
                    records.push(record);
                }
                Err(skip) => {
                    debug!("Skipping frame at {}s: {:?}", second, skip);
                }
            }
        }

        Ok(records)
    }
}

/// Upload one encoded frame, best-effort: any remote failure is logged and
/// the record keeps an absent URL
async fn upload_frame(
    store: &dyn ObjectStore,
    transcript_id: i64,
    second: u64,
    jpeg: Vec<u8>,
) -> FrameRecord {
    let key = storage_key(transcript_id, second);

    let url = match store.upload(&key, jpeg, "image/jpeg").await {
        Ok(()) => match store.public_url(&key).await {
            Ok(url) => Some(url),
            Err(e) => {
                warn!("Failed to resolve public URL for {}: {:#}", key, e);
                None
            }
        },
        Err(e) => {
            warn!("Failed to upload frame {}: {:#}", key, e);
            None
        }
    };

    FrameRecord {
        transcript_id,
        frame_timestamp: second as i64,
        frame_storage_url: url,
    }
}

/// Storage key convention: `{transcript_id}/frame_{second}.jpg`
fn storage_key(transcript_id: i64, second: u64) -> String {
    format!("{}/frame_{}.jpg", transcript_id, second)
}

/// Extract fps and total frame count from ffprobe JSON
fn parse_probe(ffprobe_data: &serde_json::Value) -> Result<VideoProbe> {
    let streams = ffprobe_data["streams"]
        .as_array()
        .ok_or_else(|| anyhow!("No streams in probe output"))?;

    let video_stream = streams
        .iter()
        .find(|s| s["codec_type"] == "video")
        .ok_or_else(|| anyhow!("No video stream found"))?;

    let fps = video_stream["r_frame_rate"]
        .as_str()
        .map(parse_frame_rate)
        .unwrap_or(0.0);
    let fps = if fps > 0.0 { fps } else { DEFAULT_FPS };

    // nb_frames is container-dependent; fall back to duration * fps
    let total_frames = video_stream["nb_frames"]
        .as_str()
        .and_then(|s| s.parse::<f64>().ok())
        .unwrap_or_else(|| {
            let duration: f64 = ffprobe_data["format"]["duration"]
                .as_str()
                .and_then(|s| s.parse().ok())
                .unwrap_or(0.0);
            duration * fps
        });

    Ok(VideoProbe { fps, total_frames })
}

/// Parse an ffprobe rational frame rate such as "30000/1001"
fn parse_frame_rate(rate: &str) -> f64 {
    match rate.split_once('/') {
        Some((num, den)) => {
            let num: f64 = num.parse().unwrap_or(0.0);
            let den: f64 = den.parse().unwrap_or(0.0);
            if den > 0.0 {
                num / den
            } else {
                0.0
            }
        }
        None => rate.parse().unwrap_or(0.0),
    }
}
