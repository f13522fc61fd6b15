//! Transfer client — streams one local file to a Ferry server.
//!
//! The file is read in fixed-size chunks and handed to the HTTP body as a
//! stream; reqwest only pulls the next chunk once the previous one has been
//! sent, so memory stays at about one chunk.

use std::io;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use futures::TryStreamExt;
use reqwest::header::{HeaderValue, CONTENT_TYPE};

use ferry_core::config::{ClientConfig, TransferConfig};
use ferry_core::metadata::{HEADER_COMPRESSION, HEADER_FILENAME, HEADER_FILE_SIZE, UPLOAD_PATH};
use ferry_core::{CodecId, ErrorResponse, TransferError, TransferMetadata, UploadResponse};
use ferry_services::ChunkSource;

/// Result of a successful transfer.
#[derive(Debug, Clone)]
pub struct TransferSummary {
    pub response: UploadResponse,
    pub bytes_sent: u64,
    pub chunks_sent: u64,
    pub elapsed: Duration,
}

/// One `send` call: what is being sent, and counters shared between the body
/// stream and the caller.
struct TransferSession {
    metadata: TransferMetadata,
    bytes_sent: AtomicU64,
    chunks_sent: AtomicU64,
    /// Set when reading the source fails mid-stream.
    read_failure: Mutex<Option<(io::ErrorKind, String)>>,
}

pub struct TransferClient {
    http: reqwest::Client,
    endpoint: String,
    chunk_size: usize,
    progress_every: u64,
}

impl TransferClient {
    pub fn new(client: &ClientConfig, transfer: &TransferConfig) -> Self {
        Self::with_endpoint(
            format!("http://{}:{}{}", client.host, client.port, UPLOAD_PATH),
            transfer.chunk_size,
            transfer.progress_every,
        )
    }

    pub fn with_endpoint(endpoint: impl Into<String>, chunk_size: usize, progress_every: u64) -> Self {
        Self {
            http: reqwest::Client::new(),
            endpoint: endpoint.into(),
            chunk_size,
            progress_every,
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Stream `path` to the server, compressed there with `codec`.
    pub async fn send(&self, path: &Path, codec: CodecId) -> Result<TransferSummary, TransferError> {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| TransferError::InvalidField {
                field: "X-Filename",
                reason: format!("{} has no file name", path.display()),
            })?;

        let name_header =
            HeaderValue::from_bytes(name.as_bytes()).map_err(|e| TransferError::InvalidField {
                field: "X-Filename",
                reason: e.to_string(),
            })?;

        let source = ChunkSource::open(path, self.chunk_size).await?;
        let total = source.len();
        tracing::info!(
            file = %name,
            bytes = total,
            codec = %codec,
            endpoint = %self.endpoint,
            "transfer starting"
        );

        let session = Arc::new(TransferSession::new(TransferMetadata::new(
            name.clone(),
            total,
            codec,
        )));
        let started = Instant::now();

        let progress_every = self.progress_every;
        let on_chunk = session.clone();
        let on_error = session.clone();
        let body = source
            .into_stream()
            .inspect_ok(move |chunk| {
                let bytes = on_chunk
                    .bytes_sent
                    .fetch_add(chunk.len() as u64, Ordering::Relaxed)
                    + chunk.len() as u64;
                let chunks = on_chunk.chunks_sent.fetch_add(1, Ordering::Relaxed) + 1;
                if progress_every != 0 && chunks % progress_every == 0 {
                    let percent = on_chunk
                        .metadata
                        .progress_percent(bytes)
                        .map_or(100.0, |pct| (pct * 10.0).round() / 10.0);
                    tracing::info!(
                        file = %on_chunk.metadata.name,
                        chunks,
                        bytes,
                        percent,
                        "transfer progress"
                    );
                }
            })
            .inspect_err(move |e| {
                *on_error
                    .read_failure
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner) =
                    Some((e.source.kind(), e.to_string()));
            });

        let mut request = self
            .http
            .post(&self.endpoint)
            .header(HEADER_FILENAME, name_header)
            .header(HEADER_FILE_SIZE, session.metadata.declared_size.to_string())
            .header(CONTENT_TYPE, "application/octet-stream");
        if let Some(value) = session.metadata.codec.header_value() {
            request = request.header(HEADER_COMPRESSION, value);
        }

        let sent = request
            .body(reqwest::Body::wrap_stream(body))
            .send()
            .await;

        let resp = match sent {
            Ok(resp) => resp,
            Err(e) => {
                let err = session.failure(e);
                tracing::error!(file = %name, error = %err, "transfer failed");
                return Err(err);
            }
        };

        let status = resp.status();
        if !status.is_success() {
            let error = match resp.json::<ErrorResponse>().await {
                Ok(body) => body.error,
                Err(_) => status
                    .canonical_reason()
                    .unwrap_or("unknown error")
                    .to_string(),
            };
            tracing::error!(file = %name, status = status.as_u16(), %error, "server rejected transfer");
            return Err(TransferError::Rejected {
                status: status.as_u16(),
                error,
            });
        }

        let response = resp
            .json::<UploadResponse>()
            .await
            .map_err(|e| TransferError::Network(format!("invalid upload response: {e}")))?;

        let summary = TransferSummary {
            response,
            bytes_sent: session.bytes_sent.load(Ordering::Relaxed),
            chunks_sent: session.chunks_sent.load(Ordering::Relaxed),
            elapsed: started.elapsed(),
        };
        tracing::info!(
            file = %name,
            saved = %summary.response.saved_filename,
            bytes = summary.bytes_sent,
            chunks = summary.chunks_sent,
            elapsed_ms = summary.elapsed.as_millis() as u64,
            "transfer complete"
        );
        Ok(summary)
    }
}

impl TransferSession {
    fn new(metadata: TransferMetadata) -> Self {
        Self {
            metadata,
            bytes_sent: AtomicU64::new(0),
            chunks_sent: AtomicU64::new(0),
            read_failure: Mutex::new(None),
        }
    }

    /// A failed send is a source read error if the body stream recorded one,
    /// otherwise a network error.
    fn failure(&self, err: reqwest::Error) -> TransferError {
        let recorded = self
            .read_failure
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        match recorded {
            Some((kind, msg)) => TransferError::Io(io::Error::new(kind, msg)),
            None => TransferError::Network(err.to_string()),
        }
    }
}
