use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};

/// Configuration for the vidscribe service
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// HTTP server settings
    pub server: ServerConfig,

    /// Transcription engine settings
    pub transcription: TranscriptionConfig,

    /// Frame storage settings
    pub storage: StorageConfig,

    /// Metadata database settings
    pub database: DatabaseConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Address to bind the HTTP server to
    pub host: String,

    /// Port to listen on
    pub port: u16,

    /// Maximum accepted upload size in bytes
    pub max_upload_bytes: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptionConfig {
    /// Whisper model name (tiny, base, small, ...)
    pub model: String,

    /// Path to a ggml model file for whisper.cpp backends
    pub model_path: Option<String>,

    /// Language hint for transcription (auto-detect when unset)
    pub language: Option<String>,

    /// Timeout for a single transcription run (seconds)
    pub timeout_seconds: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Base URL of the storage service
    pub url: String,

    /// API key used for uploads
    pub api_key: String,

    /// Bucket that receives frame images
    pub bucket: String,

    /// HTTP request timeout in seconds
    pub request_timeout_seconds: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Base URL of the database REST endpoint
    pub url: String,

    /// API key used for inserts
    pub api_key: String,

    /// Table holding transcript rows
    pub transcript_table: String,

    /// Table holding frame metadata rows
    pub frame_table: String,

    /// HTTP request timeout in seconds
    pub request_timeout_seconds: u64,
}

impl Config {
    /// Load configuration from file
    pub fn load() -> Result<Self> {
        // Try to load from various locations
        let config_paths = [
            "vidscribe.toml",
            "config/vidscribe.toml",
            "/etc/vidscribe/config.toml",
        ];

        for path in &config_paths {
            if let Ok(config_str) = std::fs::read_to_string(path) {
                match toml::from_str(&config_str) {
                    Ok(config) => {
                        tracing::info!("Loaded configuration from: {}", path);
                        return Ok(config);
                    }
                    Err(e) => {
                        tracing::warn!("Failed to parse config file {}: {}", path, e);
                    }
                }
            }
        }

        // Fall back to environment variables over defaults
        Self::from_env()
    }

    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        if let Ok(host) = std::env::var("VIDSCRIBE_HOST") {
            config.server.host = host;
        }

        if let Ok(port) = std::env::var("VIDSCRIBE_PORT") {
            config.server.port = port.parse().unwrap_or(config.server.port);
        }

        if let Ok(max_bytes) = std::env::var("VIDSCRIBE_MAX_UPLOAD_BYTES") {
            config.server.max_upload_bytes =
                max_bytes.parse().unwrap_or(config.server.max_upload_bytes);
        }

        if let Ok(model) = std::env::var("VIDSCRIBE_WHISPER_MODEL") {
            config.transcription.model = model;
        }

        if let Ok(url) = std::env::var("VIDSCRIBE_SUPABASE_URL") {
            config.storage.url = url.clone();
            config.database.url = url;
        }

        if let Ok(key) = std::env::var("VIDSCRIBE_SUPABASE_KEY") {
            config.storage.api_key = key.clone();
            config.database.api_key = key;
        }

        if let Ok(bucket) = std::env::var("VIDSCRIBE_STORAGE_BUCKET") {
            config.storage.bucket = bucket;
        }

        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.server.max_upload_bytes == 0 {
            return Err(anyhow!("max_upload_bytes must be greater than 0"));
        }

        if self.transcription.model.is_empty() {
            return Err(anyhow!("transcription model must be set"));
        }

        if self.transcription.timeout_seconds == 0 {
            return Err(anyhow!("transcription timeout must be greater than 0"));
        }

        if self.storage.bucket.is_empty() {
            return Err(anyhow!("storage bucket must be set"));
        }

        if self.database.transcript_table.is_empty() || self.database.frame_table.is_empty() {
            return Err(anyhow!("database table names must be set"));
        }

        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            transcription: TranscriptionConfig::default(),
            storage: StorageConfig::default(),
            database: DatabaseConfig::default(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 10000,
            max_upload_bytes: 15 * 1024 * 1024,
        }
    }
}

impl Default for TranscriptionConfig {
    fn default() -> Self {
        Self {
            model: "tiny".to_string(),
            model_path: None,
            language: None,
            timeout_seconds: 300,
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            api_key: String::new(),
            bucket: "video-frames".to_string(),
            request_timeout_seconds: 30,
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            api_key: String::new(),
            transcript_table: "transcript".to_string(),
            frame_table: "frame".to_string(),
            request_timeout_seconds: 30,
        }
    }
}
