//! Persistence sink — durable byte sink for upload output.

use std::future::Future;
use std::io;
use std::path::{Path, PathBuf};

use tokio::fs::File;
use tokio::io::AsyncWriteExt;

/// Ordered, durable byte sink. The last stage of an upload pipeline.
///
/// Each call completes before the pipeline pulls more input, so a slow sink
/// slows the whole transfer down instead of growing a buffer.
pub trait ByteSink: Send {
    /// Append bytes.
    fn write(&mut self, buf: &[u8]) -> impl Future<Output = io::Result<()>> + Send;

    /// End of input: flush and close.
    fn finalize(&mut self) -> impl Future<Output = io::Result<()>> + Send;

    /// Release the sink without finalizing. Bytes already written stay where they are.
    fn abort(&mut self) -> impl Future<Output = ()> + Send;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SinkState {
    Open,
    /// A write failed; later writes are no-ops.
    Failed,
    Closed,
}

/// File-backed sink. Truncates any existing file at the path.
pub struct FileSink {
    path: PathBuf,
    file: Option<File>,
    state: SinkState,
    bytes_written: u64,
}

impl FileSink {
    pub async fn create(path: impl AsRef<Path>) -> io::Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = File::create(&path).await?;
        Ok(Self {
            path,
            file: Some(file),
            state: SinkState::Open,
            bytes_written: 0,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn bytes_written(&self) -> u64 {
        self.bytes_written
    }

    pub fn is_usable(&self) -> bool {
        self.state == SinkState::Open
    }
}

impl ByteSink for FileSink {
    async fn write(&mut self, buf: &[u8]) -> io::Result<()> {
        let Some(file) = self.file.as_mut().filter(|_| self.state == SinkState::Open) else {
            return Ok(());
        };

        if let Err(e) = file.write_all(buf).await {
            tracing::warn!(path = %self.path.display(), error = %e, "sink write failed");
            self.state = SinkState::Failed;
            self.file = None;
            return Err(e);
        }
        self.bytes_written += buf.len() as u64;
        Ok(())
    }

    async fn finalize(&mut self) -> io::Result<()> {
        match self.state {
            SinkState::Closed => return Ok(()),
            SinkState::Failed => {
                return Err(io::Error::other(format!(
                    "sink for {} is unusable after a failed write",
                    self.path.display()
                )))
            }
            SinkState::Open => {}
        }

        if let Some(mut file) = self.file.take() {
            let synced = match file.flush().await {
                Ok(()) => file.sync_all().await,
                Err(e) => Err(e),
            };
            if let Err(e) = synced {
                self.state = SinkState::Failed;
                return Err(e);
            }
        }
        self.state = SinkState::Closed;
        tracing::trace!(path = %self.path.display(), bytes = self.bytes_written, "sink finalized");
        Ok(())
    }

    async fn abort(&mut self) {
        if self.file.take().is_some() {
            tracing::debug!(
                path = %self.path.display(),
                bytes = self.bytes_written,
                "sink aborted, partial output left on disk"
            );
        }
        if self.state == SinkState::Open {
            self.state = SinkState::Closed;
        }
    }
}
