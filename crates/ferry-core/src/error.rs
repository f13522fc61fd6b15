//! Transfer error taxonomy shared by client and server.

use std::io;

#[derive(Debug, thiserror::Error)]
pub enum TransferError {
    /// Required metadata absent. Client-caused, never retried.
    #[error("missing {0} header")]
    MissingField(&'static str),

    /// Metadata present but unusable.
    #[error("invalid {field} header: {reason}")]
    InvalidField { field: &'static str, reason: String },

    /// Source read failure (client) or sink write/flush failure (server).
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The compressor failed internally.
    #[error("{codec} compression failed: {source}")]
    Codec {
        codec: String,
        #[source]
        source: io::Error,
    },

    /// Connection-level failure on either side.
    #[error("network error: {0}")]
    Network(String),

    /// The server answered with a non-success status.
    #[error("server rejected upload ({status}): {error}")]
    Rejected { status: u16, error: String },
}

impl TransferError {
    /// True for errors the client caused and a server should answer with 4xx.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            TransferError::MissingField(_) | TransferError::InvalidField { .. }
        )
    }
}
