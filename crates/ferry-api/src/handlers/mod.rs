//! HTTP handlers — map requests onto the upload orchestrator.

pub mod upload;

use axum::http::StatusCode;
use axum::Json;

use ferry_core::{ErrorResponse, TransferError};
use ferry_services::UploadOrchestrator;

#[derive(Clone)]
pub struct ApiState {
    pub orchestrator: UploadOrchestrator,
}

impl ApiState {
    pub fn new(orchestrator: UploadOrchestrator) -> Self {
        Self { orchestrator }
    }
}

pub type ApiError = (StatusCode, Json<ErrorResponse>);

/// Client-caused errors become 400, everything else 500.
pub fn error_response(err: &TransferError) -> ApiError {
    let status = if err.is_client_error() {
        StatusCode::BAD_REQUEST
    } else {
        StatusCode::INTERNAL_SERVER_ERROR
    };
    (status, Json(ErrorResponse::new(err.to_string())))
}

pub async fn not_found() -> ApiError {
    (StatusCode::NOT_FOUND, Json(ErrorResponse::new("Not found")))
}
