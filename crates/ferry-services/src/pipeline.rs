//! Two-stage upload pipeline: optional compressor, then sink.

use std::io;

use bytes::Bytes;

use ferry_core::TransferError;

use crate::codec::{StreamCompressor, Transform};
use crate::sink::ByteSink;

/// Compress → write chain for one transfer.
///
/// `accept` does not return until the chunk (and any compressed output it
/// produced) has been written, so output order always follows input order.
/// Compression itself runs on the blocking pool.
pub struct Pipeline<S> {
    compressing: bool,
    /// Out of its slot only while a chunk is on the blocking pool, or for
    /// good after the compressor failed.
    compressor: Option<StreamCompressor>,
    sink: S,
}

impl<S: ByteSink> Pipeline<S> {
    pub fn new(transform: Transform, sink: S) -> Self {
        let compressor = match transform {
            Transform::Identity => None,
            Transform::Compress(compressor) => Some(compressor),
        };
        Self {
            compressing: compressor.is_some(),
            compressor,
            sink,
        }
    }

    pub fn is_compressing(&self) -> bool {
        self.compressing
    }

    /// Route one chunk through the pipeline.
    pub async fn accept(&mut self, chunk: Bytes) -> Result<(), TransferError> {
        if !self.compressing {
            self.sink.write(&chunk).await?;
            return Ok(());
        }

        let compressor = self.compressor.take().ok_or_else(lost_compressor)?;
        let (compressor, out) = compressor.accept_blocking(chunk).await?;
        self.compressor = Some(compressor);
        if !out.is_empty() {
            self.sink.write(&out).await?;
        }
        Ok(())
    }

    /// End of input: flush the compressor's trailing bytes, then finalize the
    /// sink. On failure the sink is aborted before the error is returned.
    pub async fn finish(self) -> Result<S, TransferError> {
        let Pipeline {
            compressing,
            compressor,
            mut sink,
        } = self;

        let finished = async {
            if compressing {
                let tail = compressor
                    .ok_or_else(lost_compressor)?
                    .finish_blocking()
                    .await?;
                if !tail.is_empty() {
                    sink.write(&tail).await?;
                }
            }
            sink.finalize().await?;
            Ok::<(), TransferError>(())
        }
        .await;

        match finished {
            Ok(()) => Ok(sink),
            Err(e) => {
                sink.abort().await;
                Err(e)
            }
        }
    }

    /// Tear down: discard compressor state and release the sink.
    pub async fn abort(self) -> S {
        let Pipeline {
            compressor,
            mut sink,
            ..
        } = self;
        if let Some(compressor) = compressor {
            compressor.abort();
        }
        sink.abort().await;
        sink
    }
}

fn lost_compressor() -> TransferError {
    TransferError::Io(io::Error::other("compressor unavailable after an earlier failure"))
}
