//! POST /upload — stream the request body to disk.

use axum::body::Body;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::Json;

use ferry_core::UploadResponse;

use super::{error_response, ApiError, ApiState};

pub async fn handle_upload(
    State(state): State<ApiState>,
    headers: HeaderMap,
    body: Body,
) -> Result<Json<UploadResponse>, ApiError> {
    let receipt = state
        .orchestrator
        .handle(&headers, body.into_data_stream())
        .await
        .map_err(|e| error_response(&e))?;
    Ok(Json(receipt.into()))
}
