//! API request handlers

use axum::extract::multipart::{Multipart, MultipartError};
use axum::http::StatusCode;
use serde_json::Value;

use crate::error::UploadError;
use crate::pipeline::{UploadPipeline, UploadRequest};
use super::models::UploadResponse;

/// Handle health check requests
pub async fn health_check() -> Value {
    serde_json::json!({
        "status": "healthy",
        "service": "vidscribe",
        "version": env!("CARGO_PKG_VERSION"),
        "timestamp": chrono::Utc::now().to_rfc3339()
    })
}

/// Handle an upload: collect the multipart form, run the pipeline
pub async fn handle_upload(
    pipeline: &UploadPipeline,
    max_upload_bytes: u64,
    mut multipart: Multipart,
) -> Result<UploadResponse, UploadError> {
    let request = read_upload_form(&mut multipart, max_upload_bytes).await?;
    let outcome = pipeline.process(request).await?;

    Ok(UploadResponse {
        message: "Video processed successfully".to_string(),
        transcript_id: outcome.transcript_id,
        frame_count: outcome.frame_count,
    })
}

/// Collect the `name`, `phone` and `video` fields from a multipart form
async fn read_upload_form(
    multipart: &mut Multipart,
    max_upload_bytes: u64,
) -> Result<UploadRequest, UploadError> {
    let mut name = None;
    let mut phone = None;
    let mut file_name = None;
    let mut video = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| map_multipart_error(e, max_upload_bytes))?
    {
        match field.name() {
            Some("name") => {
                name = Some(
                    field
                        .text()
                        .await
                        .map_err(|e| map_multipart_error(e, max_upload_bytes))?,
                );
            }
            Some("phone") => {
                phone = Some(
                    field
                        .text()
                        .await
                        .map_err(|e| map_multipart_error(e, max_upload_bytes))?,
                );
            }
            Some("video") => {
                file_name = field.file_name().map(|n| n.to_string());
                video = Some(
                    field
                        .bytes()
                        .await
                        .map_err(|e| map_multipart_error(e, max_upload_bytes))?,
                );
            }
            _ => {}
        }
    }

    // Blank name/phone are rejected by the pipeline with the same error as
    // absent ones.
    let name = name.unwrap_or_default();
    let phone = phone.unwrap_or_default();
    let video = video.ok_or(UploadError::MissingVideo)?;

    Ok(UploadRequest {
        name,
        phone,
        file_name,
        video: video.to_vec(),
    })
}

/// Map multipart read failures: a blown body limit is a 413, anything else
/// a malformed request
fn map_multipart_error(error: MultipartError, max_upload_bytes: u64) -> UploadError {
    if error.status() == StatusCode::PAYLOAD_TOO_LARGE {
        UploadError::TooLarge(max_upload_bytes / (1024 * 1024))
    } else {
        UploadError::InvalidBody(error.to_string())
    }
}
