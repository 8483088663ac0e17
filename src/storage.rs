use anyhow::{anyhow, Result};
use async_trait::async_trait;
use std::time::Duration;
use tracing::debug;

use crate::config::StorageConfig;

/// Trait for remote object stores that hold frame images
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Upload an object under the given key
    async fn upload(&self, key: &str, bytes: Vec<u8>, content_type: &str) -> Result<()>;

    /// Resolve the public URL for a previously uploaded key
    async fn public_url(&self, key: &str) -> Result<String>;
}

/// Supabase storage client
pub struct SupabaseStorage {
    config: StorageConfig,
    client: reqwest::Client,
}

impl SupabaseStorage {
    pub fn new(config: StorageConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_seconds))
            .build()?;

        Ok(Self { config, client })
    }

    fn object_endpoint(&self, key: &str) -> String {
        format!(
            "{}/storage/v1/object/{}/{}",
            self.config.url.trim_end_matches('/'),
            self.config.bucket,
            key
        )
    }
}

#[async_trait]
impl ObjectStore for SupabaseStorage {
    async fn upload(&self, key: &str, bytes: Vec<u8>, content_type: &str) -> Result<()> {
        let endpoint = self.object_endpoint(key);
        debug!("Uploading {} bytes to {}", bytes.len(), endpoint);

        let response = self
            .client
            .post(&endpoint)
            .bearer_auth(&self.config.api_key)
            .header("apikey", &self.config.api_key)
            .header(reqwest::header::CONTENT_TYPE, content_type)
            .body(bytes)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(anyhow!("Storage upload failed {}: {}", status, text));
        }

        Ok(())
    }

    async fn public_url(&self, key: &str) -> Result<String> {
        Ok(format!(
            "{}/storage/v1/object/public/{}/{}",
            self.config.url.trim_end_matches('/'),
            self.config.bucket,
            key
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> StorageConfig {
        StorageConfig {
            url: "https://example.supabase.co/".to_string(),
            api_key: "anon-key".to_string(),
            bucket: "video-frames".to_string(),
            request_timeout_seconds: 5,
        }
    }

    #[test]
    fn test_object_endpoint_strips_trailing_slash() {
        let storage = SupabaseStorage::new(test_config()).unwrap();
        assert_eq!(
            storage.object_endpoint("42/frame_0.jpg"),
            "https://example.supabase.co/storage/v1/object/video-frames/42/frame_0.jpg"
        );
    }

    #[tokio::test]
    async fn test_public_url_shape() {
        let storage = SupabaseStorage::new(test_config()).unwrap();
        let url = storage.public_url("42/frame_3.jpg").await.unwrap();
        assert_eq!(
            url,
            "https://example.supabase.co/storage/v1/object/public/video-frames/42/frame_3.jpg"
        );
    }
}
