use anyhow::{anyhow, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use crate::config::DatabaseConfig;
use crate::frames::FrameRecord;

/// Trait for the metadata database holding transcript and frame rows
#[async_trait]
pub trait MetadataStore: Send + Sync {
    /// Insert one transcript row and return the identifier assigned by the store
    async fn insert_transcript(&self, name: &str, phone: &str, transcript: &str) -> Result<i64>;

    /// Insert frame rows in one batch
    async fn insert_frames(&self, frames: &[FrameRecord]) -> Result<()>;
}

/// Row sent when creating a transcript
#[derive(Debug, Serialize)]
struct TranscriptInsert<'a> {
    name: &'a str,
    #[serde(rename = "phoneNumber")]
    phone_number: &'a str,
    transcript: &'a str,
}

/// Row shape returned by the store after an insert
#[derive(Debug, Deserialize)]
struct TranscriptRow {
    id: i64,
}

/// PostgREST client for a Supabase-hosted database
pub struct SupabaseDb {
    config: DatabaseConfig,
    client: reqwest::Client,
}

impl SupabaseDb {
    pub fn new(config: DatabaseConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_seconds))
            .build()?;

        Ok(Self { config, client })
    }

    fn table_endpoint(&self, table: &str) -> String {
        format!("{}/rest/v1/{}", self.config.url.trim_end_matches('/'), table)
    }

    async fn insert<T: Serialize + ?Sized>(
        &self,
        table: &str,
        rows: &T,
        want_representation: bool,
    ) -> Result<reqwest::Response> {
        let prefer = if want_representation {
            "return=representation"
        } else {
            "return=minimal"
        };

        let endpoint = self.table_endpoint(table);
        debug!("Inserting into {}", endpoint);

        let response = self
            .client
            .post(&endpoint)
            .bearer_auth(&self.config.api_key)
            .header("apikey", &self.config.api_key)
            .header("Prefer", prefer)
            .json(rows)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(anyhow!("Insert into {} failed {}: {}", table, status, text));
        }

        Ok(response)
    }
}

#[async_trait]
impl MetadataStore for SupabaseDb {
    async fn insert_transcript(&self, name: &str, phone: &str, transcript: &str) -> Result<i64> {
        let row = TranscriptInsert {
            name,
            phone_number: phone,
            transcript,
        };

        let response = self
            .insert(&self.config.transcript_table, &row, true)
            .await?;

        let rows: Vec<TranscriptRow> = response.json().await?;
        let inserted = rows
            .first()
            .ok_or_else(|| anyhow!("Transcript insert returned no rows"))?;

        Ok(inserted.id)
    }

    async fn insert_frames(&self, frames: &[FrameRecord]) -> Result<()> {
        self.insert(&self.config.frame_table, frames, false).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transcript_insert_column_names() {
        let row = TranscriptInsert {
            name: "Ada",
            phone_number: "555-0100",
            transcript: "[00:00:00,000 --> 00:00:02,000] hello",
        };

        let value = serde_json::to_value(&row).unwrap();
        assert_eq!(value["name"], "Ada");
        assert_eq!(value["phoneNumber"], "555-0100");
        assert!(value["transcript"].as_str().unwrap().contains("hello"));
    }

    #[test]
    fn test_transcript_row_deserializes_id() {
        let rows: Vec<TranscriptRow> =
            serde_json::from_str(r#"[{"id": 42, "name": "Ada"}]"#).unwrap();
        assert_eq!(rows[0].id, 42);
    }

    #[test]
    fn test_table_endpoint() {
        let db = SupabaseDb::new(DatabaseConfig {
            url: "https://example.supabase.co/".to_string(),
            api_key: "anon-key".to_string(),
            transcript_table: "transcript".to_string(),
            frame_table: "frame".to_string(),
            request_timeout_seconds: 5,
        })
        .unwrap();

        assert_eq!(
            db.table_endpoint("frame"),
            "https://example.supabase.co/rest/v1/frame"
        );
    }
}
