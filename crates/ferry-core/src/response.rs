//! JSON bodies returned by the upload endpoint.

use serde::{Deserialize, Serialize};

pub const UPLOAD_OK_MESSAGE: &str = "File uploaded successfully";

/// Acknowledgment for a completed upload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadResponse {
    pub message: String,
    pub original_filename: String,
    pub saved_filename: String,
    /// Bytes actually received (uncompressed).
    pub size: u64,
    /// Body chunks received.
    pub chunks: u64,
    pub compression: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}
