//! API data models

use serde::{Deserialize, Serialize};

/// Success payload for a processed upload
#[derive(Debug, Serialize, Deserialize)]
pub struct UploadResponse {
    pub message: String,
    pub transcript_id: i64,
    pub frame_count: usize,
}

/// Error payload returned with a 4xx/5xx status
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upload_response_shape() {
        let response = UploadResponse {
            message: "Video processed successfully".to_string(),
            transcript_id: 42,
            frame_count: 5,
        };

        let value = serde_json::to_value(&response).unwrap();
        assert_eq!(value["message"], "Video processed successfully");
        assert_eq!(value["transcript_id"], 42);
        assert_eq!(value["frame_count"], 5);
    }
}
