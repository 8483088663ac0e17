use anyhow::{anyhow, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::process::Command;
use tokio::sync::OnceCell;
use tracing::{debug, info, warn};

use crate::config::TranscriptionConfig;
use super::transcript::parse_timestamp;
use super::{Segment, SpeechEngine, TranscribeError};

/// Whisper backends in order of preference
const BACKENDS: &[(&str, bool)] = &[
    ("whisper-cli", true), // whisper.cpp via Homebrew (fastest)
    ("whisper-cpp", true), // whisper.cpp
    ("whisper", false),    // Python OpenAI Whisper (fallback)
];

/// Speech engine backed by a local Whisper installation
///
/// The available backend is detected once on first use and shared for the
/// lifetime of the process; each transcription then spawns one CLI run
/// against the video file.
pub struct WhisperEngine {
    config: TranscriptionConfig,
    backend: OnceCell<Backend>,
}

#[derive(Debug, Clone, Copy)]
struct Backend {
    command: &'static str,
    is_cpp: bool,
}

impl WhisperEngine {
    pub fn new(config: TranscriptionConfig) -> Self {
        Self {
            config,
            backend: OnceCell::new(),
        }
    }

    /// Resolve the Whisper backend, probing the PATH once per process
    async fn backend(&self) -> Result<Backend> {
        self.backend
            .get_or_try_init(|| async {
                for &(command, is_cpp) in BACKENDS {
                    if Self::check_command_available(command).await {
                        info!("Using Whisper backend: {}", command);
                        return Ok(Backend { command, is_cpp });
                    }
                    debug!("Whisper backend {} not available", command);
                }

                Err(anyhow!(
                    "No Whisper backend found. Please install whisper.cpp or openai-whisper"
                ))
            })
            .await
            .copied()
    }

    /// Check if a command is available
    async fn check_command_available(cmd_name: &str) -> bool {
        Command::new(cmd_name)
            .arg("--help")
            .output()
            .await
            .map(|output| output.status.success())
            .unwrap_or(false)
    }

    fn build_command(&self, backend: Backend, video_path: &Path, output_dir: &Path) -> Command {
        let mut cmd = Command::new(backend.command);

        if backend.is_cpp {
            let output_base = output_dir.join("transcript");
            cmd.arg("-f")
                .arg(video_path)
                .arg("-oj")
                .arg("-of")
                .arg(&output_base)
                .arg("-tp")
                .arg("0.0");

            if let Some(model_path) = &self.config.model_path {
                cmd.arg("-m").arg(model_path);
            } else {
                let default_path = format!("models/ggml-{}.bin", self.config.model);
                if Path::new(&default_path).exists() {
                    cmd.arg("-m").arg(&default_path);
                }
            }

            if let Some(language) = &self.config.language {
                cmd.arg("-l").arg(language);
            }
        } else {
            cmd.arg(video_path)
                .arg("--model")
                .arg(&self.config.model)
                .arg("--output_dir")
                .arg(output_dir)
                .arg("--output_format")
                .arg("json")
                .arg("--verbose")
                .arg("False")
                .arg("--fp16")
                .arg("False")
                .arg("--device")
                .arg("cpu")
                .arg("--temperature")
                .arg("0.0");

            if let Some(language) = &self.config.language {
                cmd.arg("--language").arg(language);
            }
        }

        cmd
    }

    async fn run_whisper(&self, video_path: &Path) -> Result<Vec<Segment>> {
        let backend = self.backend().await?;

        // Whisper writes its JSON next to other artifacts; keep them in a
        // scratch directory that vanishes when we are done.
        let output_dir = tempfile::tempdir()?;
        let mut cmd = self.build_command(backend, video_path, output_dir.path());
        debug!("Executing Whisper command: {:?}", cmd);

        let timeout = Duration::from_secs(self.config.timeout_seconds);
        let output = match tokio::time::timeout(timeout, cmd.output()).await {
            Ok(result) => result?,
            Err(_) => {
                return Err(anyhow!(
                    "Whisper timed out after {} seconds",
                    self.config.timeout_seconds
                ))
            }
        };

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(anyhow!(
                "Whisper failed with exit code {}: {}",
                output.status,
                stderr.trim()
            ));
        }

        let json_path = find_json_output(output_dir.path()).await?;
        let json_content = tokio::fs::read_to_string(&json_path).await?;
        let parsed: WhisperOutput = serde_json::from_str(&json_content)
            .map_err(|e| anyhow!("Failed to parse Whisper JSON output: {}", e))?;

        Ok(parsed.into_segments())
    }
}

#[async_trait::async_trait]
impl SpeechEngine for WhisperEngine {
    async fn transcribe(&self, video_path: &Path) -> Result<Vec<Segment>, TranscribeError> {
        if !video_path.exists() {
            return Err(TranscribeError::Engine(anyhow!(
                "Video file does not exist: {}",
                video_path.display()
            )));
        }

        info!("Starting transcription for {}", video_path.display());
        let segments = self.run_whisper(video_path).await?;

        if segments.is_empty() {
            warn!("Whisper produced no segments for {}", video_path.display());
            return Err(TranscribeError::NoAudio);
        }

        info!("Transcription produced {} segments", segments.len());
        Ok(segments)
    }
}

/// Find the JSON file Whisper produced in the scratch directory
async fn find_json_output(dir: &Path) -> Result<PathBuf> {
    let mut entries = tokio::fs::read_dir(dir).await?;

    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        if path.extension().map_or(false, |ext| ext == "json") {
            return Ok(path);
        }
    }

    Err(anyhow!("No Whisper JSON output found in {}", dir.display()))
}

/// Whisper JSON output, covering both the whisper.cpp format and the
/// Python implementation's legacy format
#[derive(Debug, Deserialize)]
struct WhisperOutput {
    #[serde(default)]
    segments: Vec<WhisperSegment>,
    #[serde(default)]
    transcription: Vec<WhisperTranscriptionSegment>,
}

#[derive(Debug, Deserialize)]
struct WhisperSegment {
    start: f64,
    end: f64,
    text: String,
}

#[derive(Debug, Deserialize)]
struct WhisperTranscriptionSegment {
    timestamps: WhisperTimestamps,
    text: String,
}

#[derive(Debug, Deserialize)]
struct WhisperTimestamps {
    from: String,
    to: String,
}

impl WhisperOutput {
    fn into_segments(self) -> Vec<Segment> {
        if !self.transcription.is_empty() {
            // whisper.cpp format: timestamps as "HH:MM:SS,mmm" strings
            self.transcription
                .into_iter()
                .map(|seg| Segment {
                    start: parse_timestamp(&seg.timestamps.from).unwrap_or(0.0),
                    end: parse_timestamp(&seg.timestamps.to).unwrap_or(0.0),
                    text: seg.text.trim().to_string(),
                })
                .filter(|seg| !seg.text.is_empty())
                .collect()
        } else {
            self.segments
                .into_iter()
                .map(|seg| Segment {
                    start: seg.start,
                    end: seg.end,
                    text: seg.text.trim().to_string(),
                })
                .filter(|seg| !seg.text.is_empty())
                .collect()
        }
    }
}
