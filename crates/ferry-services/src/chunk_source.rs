//! Chunk source — reads a file as a lazy sequence of fixed-size chunks.
//!
//! Memory use is bounded by one chunk regardless of file size. Every chunk is
//! exactly `chunk_size` bytes except possibly the last one.

use std::io;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::task::{ready, Context, Poll};

use bytes::{BufMut, Bytes, BytesMut};
use futures::Stream;
use tokio::fs::File;
use tokio_util::io::poll_read_buf;

use ferry_core::TransferError;

/// A read failure on the source file.
#[derive(Debug, thiserror::Error)]
#[error("failed to read {}: {source}", path.display())]
pub struct SourceError {
    pub path: PathBuf,
    #[source]
    pub source: io::Error,
}

impl From<SourceError> for TransferError {
    fn from(e: SourceError) -> Self {
        TransferError::Io(io::Error::new(e.source.kind(), e.to_string()))
    }
}

/// An opened source file, ready to be streamed.
pub struct ChunkSource {
    file: File,
    path: PathBuf,
    len: u64,
    chunk_size: usize,
}

impl ChunkSource {
    /// Open `path` for chunked reading. The length is captured at open time.
    pub async fn open(path: impl AsRef<Path>, chunk_size: usize) -> Result<Self, SourceError> {
        let path = path.as_ref().to_path_buf();
        let fail = |source| SourceError {
            path: path.clone(),
            source,
        };

        if chunk_size == 0 {
            return Err(fail(io::Error::new(
                io::ErrorKind::InvalidInput,
                "chunk size must be non-zero",
            )));
        }

        let file = File::open(&path).await.map_err(fail)?;
        let len = file.metadata().await.map_err(fail)?.len();

        Ok(Self {
            file,
            path,
            len,
            chunk_size,
        })
    }

    /// File length in bytes when it was opened.
    pub fn len(&self) -> u64 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Consume the source into a chunk stream. Not restartable.
    pub fn into_stream(self) -> ChunkStream {
        ChunkStream {
            file: self.file,
            path: self.path,
            buf: BytesMut::with_capacity(self.chunk_size),
            chunk_size: self.chunk_size,
            done: false,
        }
    }
}

/// Stream of file chunks in file order.
///
/// After an error the stream ends; chunks already yielded stay valid.
pub struct ChunkStream {
    file: File,
    path: PathBuf,
    buf: BytesMut,
    chunk_size: usize,
    done: bool,
}

impl Stream for ChunkStream {
    type Item = Result<Bytes, SourceError>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        if this.done {
            return Poll::Ready(None);
        }

        // Fill up to one full chunk; a short read only ends the chunk at EOF.
        while this.buf.len() < this.chunk_size {
            let remaining = this.chunk_size - this.buf.len();
            this.buf.reserve(remaining);
            let mut limited = (&mut this.buf).limit(remaining);

            match ready!(poll_read_buf(Pin::new(&mut this.file), cx, &mut limited)) {
                Ok(0) => {
                    this.done = true;
                    break;
                }
                Ok(_) => {}
                Err(source) => {
                    this.done = true;
                    this.buf.clear();
                    return Poll::Ready(Some(Err(SourceError {
                        path: this.path.clone(),
                        source,
                    })));
                }
            }
        }

        if this.buf.is_empty() {
            return Poll::Ready(None);
        }
        Poll::Ready(Some(Ok(this.buf.split().freeze())))
    }
}
