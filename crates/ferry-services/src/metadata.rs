//! Metadata extractor — reads transfer metadata from request headers.

use http::HeaderMap;

use ferry_core::metadata::{HEADER_COMPRESSION, HEADER_FILENAME, HEADER_FILE_SIZE};
use ferry_core::{CodecId, TransferError, TransferMetadata};

const FILENAME_FIELD: &str = "X-Filename";

/// Parse the transfer headers. Only the file name is required.
pub fn extract(headers: &HeaderMap) -> Result<TransferMetadata, TransferError> {
    let raw = headers
        .get(HEADER_FILENAME)
        .ok_or(TransferError::MissingField(FILENAME_FIELD))?;
    let raw = std::str::from_utf8(raw.as_bytes()).map_err(|_| TransferError::InvalidField {
        field: FILENAME_FIELD,
        reason: "not valid UTF-8".to_string(),
    })?;
    if raw.trim().is_empty() {
        return Err(TransferError::MissingField(FILENAME_FIELD));
    }
    let name = sanitize_filename(raw)?;

    // Advisory only: 0 means unknown.
    let declared_size = headers
        .get(HEADER_FILE_SIZE)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<u64>().ok())
        .unwrap_or(0);

    let codec = CodecId::from_header(
        headers
            .get(HEADER_COMPRESSION)
            .map(|v| String::from_utf8_lossy(v.as_bytes()))
            .as_deref(),
    );

    Ok(TransferMetadata::new(name, declared_size, codec))
}

/// Keep only the final path component so uploads stay inside the upload dir.
fn sanitize_filename(raw: &str) -> Result<String, TransferError> {
    let base = raw.rsplit(['/', '\\']).next().unwrap_or(raw).trim();
    match base {
        "" | "." | ".." => Err(TransferError::InvalidField {
            field: FILENAME_FIELD,
            reason: format!("{raw:?} does not name a file"),
        }),
        name => Ok(name.to_string()),
    }
}
