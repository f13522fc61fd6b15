//! Transfer metadata and the request headers that carry it.

use crate::codec::CodecId;

/// Header carrying the target file name (required).
pub const HEADER_FILENAME: &str = "x-filename";
/// Header carrying the declared file size in bytes (advisory).
pub const HEADER_FILE_SIZE: &str = "x-file-size";
/// Header carrying the requested codec (optional).
pub const HEADER_COMPRESSION: &str = "x-compression-type";

/// The single upload route.
pub const UPLOAD_PATH: &str = "/upload";

/// Default chunk size for streaming reads (64 KiB).
pub const DEFAULT_CHUNK_SIZE: usize = 64 * 1024;

/// Per-transfer metadata. Fixed for the lifetime of a transfer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferMetadata {
    pub name: String,
    /// Size the client declared. 0 = unknown. Only used for progress display.
    pub declared_size: u64,
    pub codec: CodecId,
}

impl TransferMetadata {
    pub fn new(name: impl Into<String>, declared_size: u64, codec: CodecId) -> Self {
        Self {
            name: name.into(),
            declared_size,
            codec,
        }
    }

    /// Stored file name derived from name and codec.
    pub fn saved_name(&self) -> String {
        crate::codec::derive_name(&self.name, &self.codec)
    }

    /// Percentage of the declared size covered by `bytes`, if the size is known.
    pub fn progress_percent(&self, bytes: u64) -> Option<f64> {
        if self.declared_size == 0 {
            return None;
        }
        Some(bytes as f64 / self.declared_size as f64 * 100.0)
    }
}
