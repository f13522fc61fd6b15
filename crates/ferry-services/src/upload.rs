//! Upload orchestrator — drives one incoming transfer from headers to a
//! finished file.
//!
//! Each request gets its own `Upload`: headers are parsed first, then the body
//! is pulled one chunk at a time, counted, routed through the pipeline, and the
//! next chunk is only pulled once the previous one reached the sink. Uploads
//! share nothing but the read-only `UploadSettings`.
//!
//! On failure the partially written file is left in place.

use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use bytes::Bytes;
use futures::{Stream, StreamExt};
use http::HeaderMap;

use ferry_core::config::{CompressionConfig, FerryConfig};
use ferry_core::response::UPLOAD_OK_MESSAGE;
use ferry_core::{TransferError, TransferMetadata, UploadResponse};

use crate::codec;
use crate::metadata;
use crate::pipeline::Pipeline;
use crate::sink::{ByteSink, FileSink};

// ── Settings ──────────────────────────────────────────────────────────────────

/// Server-side settings shared by every upload.
#[derive(Debug, Clone)]
pub struct UploadSettings {
    pub upload_dir: PathBuf,
    pub compression: CompressionConfig,
    /// Log progress every N body chunks. 0 disables progress logging.
    pub progress_every: u64,
}

impl UploadSettings {
    pub fn from_config(config: &FerryConfig) -> Self {
        Self {
            upload_dir: config.server.upload_dir.clone(),
            compression: config.compression.clone(),
            progress_every: config.transfer.progress_every,
        }
    }
}

// ── Per-upload state ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadState {
    AwaitingHeaders,
    Streaming,
    Finalizing,
    Completed,
    Failed,
}

impl fmt::Display for UploadState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            UploadState::AwaitingHeaders => "awaiting-headers",
            UploadState::Streaming => "streaming",
            UploadState::Finalizing => "finalizing",
            UploadState::Completed => "completed",
            UploadState::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// Everything known about one upload. Owned by that upload only.
#[derive(Debug, Clone)]
pub struct UploadContext {
    pub metadata: TransferMetadata,
    pub output_path: PathBuf,
    /// Uncompressed bytes received so far.
    pub bytes_received: u64,
    /// Non-empty body chunks received so far.
    pub chunks_received: u64,
}

impl UploadContext {
    pub fn new(metadata: TransferMetadata, upload_dir: &Path) -> Self {
        let output_path = upload_dir.join(metadata.saved_name());
        Self {
            metadata,
            output_path,
            bytes_received: 0,
            chunks_received: 0,
        }
    }
}

/// Outcome of a completed upload.
#[derive(Debug, Clone, PartialEq)]
pub struct UploadReceipt {
    pub original_name: String,
    pub saved_name: String,
    pub output_path: PathBuf,
    pub bytes_received: u64,
    pub chunks_received: u64,
    pub compression: String,
    pub elapsed: Duration,
}

impl From<UploadReceipt> for UploadResponse {
    fn from(r: UploadReceipt) -> Self {
        UploadResponse {
            message: UPLOAD_OK_MESSAGE.to_string(),
            original_filename: r.original_name,
            saved_filename: r.saved_name,
            size: r.bytes_received,
            chunks: r.chunks_received,
            compression: r.compression,
        }
    }
}

// ── Upload ────────────────────────────────────────────────────────────────────

/// One in-flight upload bound to its pipeline.
pub struct Upload<S> {
    ctx: UploadContext,
    pipeline: Option<Pipeline<S>>,
    state: UploadState,
    progress_every: u64,
    started: Instant,
}

impl<S: ByteSink> Upload<S> {
    pub fn new(
        ctx: UploadContext,
        sink: S,
        compression: &CompressionConfig,
        progress_every: u64,
    ) -> Self {
        let transform = codec::select(&ctx.metadata.codec, compression);
        Self {
            ctx,
            pipeline: Some(Pipeline::new(transform, sink)),
            state: UploadState::AwaitingHeaders,
            progress_every,
            started: Instant::now(),
        }
    }

    pub fn state(&self) -> UploadState {
        self.state
    }

    pub fn context(&self) -> &UploadContext {
        &self.ctx
    }

    /// Consume the request body until it ends or fails.
    ///
    /// Empty body frames are skipped and not counted as chunks.
    pub async fn receive<B, E>(mut self, mut body: B) -> Result<UploadReceipt, TransferError>
    where
        B: Stream<Item = Result<Bytes, E>> + Unpin,
        E: fmt::Display,
    {
        let Some(mut pipeline) = self.pipeline.take() else {
            return Err(TransferError::Io(io::Error::other("upload already consumed")));
        };
        self.state = UploadState::Streaming;

        while let Some(frame) = body.next().await {
            let chunk = match frame {
                Ok(chunk) => chunk,
                Err(e) => {
                    let err = TransferError::Network(e.to_string());
                    return Err(self.fail(pipeline, err).await);
                }
            };
            if chunk.is_empty() {
                continue;
            }

            self.ctx.bytes_received += chunk.len() as u64;
            self.ctx.chunks_received += 1;

            if let Err(e) = pipeline.accept(chunk).await {
                return Err(self.fail(pipeline, e).await);
            }
            self.report_progress();
        }

        self.state = UploadState::Finalizing;
        if let Err(e) = pipeline.finish().await {
            self.state = UploadState::Failed;
            tracing::error!(
                file = %self.ctx.metadata.name,
                path = %self.ctx.output_path.display(),
                error = %e,
                "upload failed while finalizing"
            );
            return Err(e);
        }
        self.state = UploadState::Completed;

        let receipt = UploadReceipt {
            original_name: self.ctx.metadata.name.clone(),
            saved_name: self.ctx.metadata.saved_name(),
            output_path: self.ctx.output_path.clone(),
            bytes_received: self.ctx.bytes_received,
            chunks_received: self.ctx.chunks_received,
            compression: self.ctx.metadata.codec.label().to_string(),
            elapsed: self.started.elapsed(),
        };
        tracing::info!(
            file = %receipt.original_name,
            saved = %receipt.saved_name,
            bytes = receipt.bytes_received,
            chunks = receipt.chunks_received,
            codec = %receipt.compression,
            elapsed_ms = receipt.elapsed.as_millis() as u64,
            "upload complete"
        );
        Ok(receipt)
    }

    async fn fail(&mut self, pipeline: Pipeline<S>, err: TransferError) -> TransferError {
        self.state = UploadState::Failed;
        pipeline.abort().await;
        tracing::error!(
            file = %self.ctx.metadata.name,
            path = %self.ctx.output_path.display(),
            bytes = self.ctx.bytes_received,
            chunks = self.ctx.chunks_received,
            error = %err,
            "upload failed"
        );
        err
    }

    fn report_progress(&self) {
        if self.progress_every == 0 || self.ctx.chunks_received % self.progress_every != 0 {
            return;
        }
        match self.ctx.metadata.progress_percent(self.ctx.bytes_received) {
            Some(pct) => tracing::info!(
                file = %self.ctx.metadata.name,
                chunks = self.ctx.chunks_received,
                bytes = self.ctx.bytes_received,
                percent = (pct * 10.0).round() / 10.0,
                "upload progress"
            ),
            None => tracing::info!(
                file = %self.ctx.metadata.name,
                chunks = self.ctx.chunks_received,
                bytes = self.ctx.bytes_received,
                "upload progress"
            ),
        }
    }
}

impl<S> Drop for Upload<S> {
    fn drop(&mut self) {
        // The body future was dropped mid-transfer, usually a client disconnect.
        if matches!(
            self.state,
            UploadState::Streaming | UploadState::Finalizing
        ) {
            tracing::warn!(
                file = %self.ctx.metadata.name,
                path = %self.ctx.output_path.display(),
                bytes = self.ctx.bytes_received,
                state = %self.state,
                "upload abandoned, partial output left on disk"
            );
        }
    }
}

// ── Orchestrator ──────────────────────────────────────────────────────────────

/// Entry point for incoming uploads. Cheap to clone.
#[derive(Clone)]
pub struct UploadOrchestrator {
    settings: Arc<UploadSettings>,
}

impl UploadOrchestrator {
    pub fn new(settings: UploadSettings) -> Self {
        Self {
            settings: Arc::new(settings),
        }
    }

    pub fn settings(&self) -> &UploadSettings {
        &self.settings
    }

    /// Parse headers into a fresh context. Nothing is created on disk yet.
    pub fn begin(&self, headers: &HeaderMap) -> Result<UploadContext, TransferError> {
        let metadata = metadata::extract(headers)?;
        let ctx = UploadContext::new(metadata, &self.settings.upload_dir);
        tracing::info!(
            file = %ctx.metadata.name,
            declared_size = ctx.metadata.declared_size,
            codec = %ctx.metadata.codec,
            path = %ctx.output_path.display(),
            "upload started"
        );
        Ok(ctx)
    }

    /// Create the output file and bind it to a new upload.
    pub async fn open(&self, ctx: UploadContext) -> Result<Upload<FileSink>, TransferError> {
        let sink = FileSink::create(&ctx.output_path).await.map_err(|e| {
            tracing::error!(
                path = %ctx.output_path.display(),
                error = %e,
                "failed to create output file"
            );
            TransferError::Io(e)
        })?;
        Ok(Upload::new(
            ctx,
            sink,
            &self.settings.compression,
            self.settings.progress_every,
        ))
    }

    /// Run a whole upload: headers, output file, body.
    pub async fn handle<B, E>(
        &self,
        headers: &HeaderMap,
        body: B,
    ) -> Result<UploadReceipt, TransferError>
    where
        B: Stream<Item = Result<Bytes, E>> + Unpin,
        E: fmt::Display,
    {
        let ctx = self.begin(headers)?;
        let upload = self.open(ctx).await?;
        upload.receive(body).await
    }
}
