use axum::http::StatusCode;
use thiserror::Error;

use crate::transcription::TranscribeError;

/// Failure modes of the upload pipeline, mapped to HTTP status codes.
///
/// Validation problems are client errors; everything downstream of a valid
/// upload is a server error. Frame-stage failures never surface here, the
/// pipeline degrades to zero frames instead.
#[derive(Debug, Error)]
pub enum UploadError {
    #[error("Name and phone are required")]
    MissingNameOrPhone,

    #[error("No video file provided")]
    MissingVideo,

    #[error("Uploaded video is empty")]
    EmptyVideo,

    #[error("File too large. Max {0} MB allowed.")]
    TooLarge(u64),

    #[error("Invalid upload body: {0}")]
    InvalidBody(String),

    #[error(transparent)]
    Transcription(#[from] TranscribeError),

    #[error("Failed to store transcript: {0}")]
    Database(anyhow::Error),

    #[error("{0}")]
    Internal(anyhow::Error),
}

impl UploadError {
    /// HTTP status code for this error
    pub fn status(&self) -> StatusCode {
        match self {
            UploadError::MissingNameOrPhone
            | UploadError::MissingVideo
            | UploadError::EmptyVideo
            | UploadError::InvalidBody(_) => StatusCode::BAD_REQUEST,
            UploadError::TooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            UploadError::Transcription(_)
            | UploadError::Database(_)
            | UploadError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_errors_are_client_errors() {
        assert_eq!(
            UploadError::MissingNameOrPhone.status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(UploadError::MissingVideo.status(), StatusCode::BAD_REQUEST);
        assert_eq!(UploadError::EmptyVideo.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            UploadError::TooLarge(15).status(),
            StatusCode::PAYLOAD_TOO_LARGE
        );
    }

    #[test]
    fn test_downstream_errors_are_server_errors() {
        let err = UploadError::Transcription(TranscribeError::NoAudio);
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(err.to_string().contains("No audio detected"));

        let err = UploadError::Database(anyhow::anyhow!("connection refused"));
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_too_large_message_names_the_limit() {
        assert_eq!(
            UploadError::TooLarge(15).to_string(),
            "File too large. Max 15 MB allowed."
        );
    }
}
