//! Codec selection and streaming compressors.
//!
//! Compression runs one chunk at a time. Encoder state is carried across
//! chunks and whatever output the encoder has produced is drained after each
//! call, so nothing holds the whole payload. The async entry points run the
//! encoder on tokio's blocking pool and keep it off the request workers.

use std::io::{self, Write};
use std::sync::{Arc, Mutex, PoisonError};

use bytes::Bytes;
use flate2::write::{GzEncoder, ZlibEncoder};
use flate2::Compression;

use ferry_core::config::CompressionConfig;
use ferry_core::{CodecId, TransferError};

/// Internal buffer size handed to the brotli encoder.
const BROTLI_BUFFER_SIZE: usize = 4096;

/// What happens to body bytes before they reach the sink.
pub enum Transform {
    /// Bytes pass through untouched.
    Identity,
    Compress(StreamCompressor),
}

impl Transform {
    pub fn is_identity(&self) -> bool {
        matches!(self, Transform::Identity)
    }
}

/// Map a codec to its transform.
pub fn select(codec: &CodecId, settings: &CompressionConfig) -> Transform {
    match codec {
        CodecId::None => Transform::Identity,
        CodecId::Unknown(raw) => {
            tracing::warn!(codec = %raw, "unknown compression type, saving uncompressed");
            Transform::Identity
        }
        CodecId::Gzip => Transform::Compress(StreamCompressor::gzip(settings.gzip_level)),
        CodecId::Deflate => Transform::Compress(StreamCompressor::deflate(settings.deflate_level)),
        CodecId::Brotli => Transform::Compress(StreamCompressor::brotli(
            settings.brotli_quality,
            settings.brotli_window,
        )),
    }
}

// ── Spool ─────────────────────────────────────────────────────────────────────

/// Write target shared with an encoder; drained after every call.
#[derive(Clone, Default)]
struct Spool(Arc<Mutex<Vec<u8>>>);

impl Spool {
    fn drain(&self) -> Bytes {
        let mut buf = self.0.lock().unwrap_or_else(PoisonError::into_inner);
        Bytes::from(std::mem::take(&mut *buf))
    }
}

impl Write for Spool {
    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        let mut buf = self.0.lock().unwrap_or_else(PoisonError::into_inner);
        buf.extend_from_slice(data);
        Ok(data.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

// ── StreamCompressor ──────────────────────────────────────────────────────────

enum Encoder {
    Gzip(GzEncoder<Spool>),
    Deflate(ZlibEncoder<Spool>),
    Brotli(Box<brotli::CompressorWriter<Spool>>),
}

/// Chunk-at-a-time compressor for one transfer.
pub struct StreamCompressor {
    codec: CodecId,
    encoder: Encoder,
    spool: Spool,
    bytes_in: u64,
    bytes_out: u64,
}

impl StreamCompressor {
    pub fn gzip(level: u32) -> Self {
        let spool = Spool::default();
        let encoder = Encoder::Gzip(GzEncoder::new(
            spool.clone(),
            Compression::new(level.min(9)),
        ));
        Self::with_encoder(CodecId::Gzip, encoder, spool)
    }

    /// zlib-wrapped deflate, the format HTTP calls "deflate".
    pub fn deflate(level: u32) -> Self {
        let spool = Spool::default();
        let encoder = Encoder::Deflate(ZlibEncoder::new(
            spool.clone(),
            Compression::new(level.min(9)),
        ));
        Self::with_encoder(CodecId::Deflate, encoder, spool)
    }

    pub fn brotli(quality: u32, window: u32) -> Self {
        let spool = Spool::default();
        let encoder = Encoder::Brotli(Box::new(brotli::CompressorWriter::new(
            spool.clone(),
            BROTLI_BUFFER_SIZE,
            quality.min(11),
            window.clamp(10, 24),
        )));
        Self::with_encoder(CodecId::Brotli, encoder, spool)
    }

    fn with_encoder(codec: CodecId, encoder: Encoder, spool: Spool) -> Self {
        Self {
            codec,
            encoder,
            spool,
            bytes_in: 0,
            bytes_out: 0,
        }
    }

    pub fn codec(&self) -> &CodecId {
        &self.codec
    }

    /// Feed one chunk. Returns the compressed output produced so far, which
    /// may be empty while the encoder is still filling its window.
    pub fn accept(&mut self, input: &[u8]) -> Result<Bytes, TransferError> {
        let written = match &mut self.encoder {
            Encoder::Gzip(enc) => enc.write_all(input),
            Encoder::Deflate(enc) => enc.write_all(input),
            Encoder::Brotli(enc) => enc.write_all(input),
        };
        written.map_err(|source| self.codec_error(source))?;
        self.bytes_in += input.len() as u64;
        Ok(self.take_output())
    }

    /// End of input: flush the encoder and return its trailing output.
    pub fn finish(self) -> Result<Bytes, TransferError> {
        let Self {
            codec,
            encoder,
            spool,
            bytes_in,
            bytes_out,
        } = self;

        let finished = match encoder {
            Encoder::Gzip(enc) => enc.finish().map(drop),
            Encoder::Deflate(enc) => enc.finish().map(drop),
            Encoder::Brotli(enc) => {
                // into_inner writes the final brotli block.
                drop((*enc).into_inner());
                Ok(())
            }
        };
        finished.map_err(|source| TransferError::Codec {
            codec: codec.label().to_string(),
            source,
        })?;

        let tail = spool.drain();
        tracing::debug!(
            codec = %codec,
            bytes_in,
            bytes_out = bytes_out + tail.len() as u64,
            "compressor finished"
        );
        Ok(tail)
    }

    /// `accept` on the blocking pool. The compressor moves to the worker with
    /// the chunk and comes back alongside its output.
    pub async fn accept_blocking(
        mut self,
        input: Bytes,
    ) -> Result<(Self, Bytes), TransferError> {
        let codec = self.codec.clone();
        tokio::task::spawn_blocking(move || -> Result<(Self, Bytes), TransferError> {
            let out = self.accept(&input)?;
            Ok((self, out))
        })
        .await
        .map_err(|e| join_failure(&codec, e))?
    }

    /// `finish` on the blocking pool.
    pub async fn finish_blocking(self) -> Result<Bytes, TransferError> {
        let codec = self.codec.clone();
        tokio::task::spawn_blocking(move || self.finish())
            .await
            .map_err(|e| join_failure(&codec, e))?
    }

    /// Discard encoder state without producing trailing output.
    pub fn abort(self) {
        tracing::debug!(codec = %self.codec, bytes_in = self.bytes_in, "compressor aborted");
    }

    fn take_output(&mut self) -> Bytes {
        let out = self.spool.drain();
        self.bytes_out += out.len() as u64;
        out
    }

    fn codec_error(&self, source: io::Error) -> TransferError {
        TransferError::Codec {
            codec: self.codec.label().to_string(),
            source,
        }
    }
}

fn join_failure(codec: &CodecId, err: tokio::task::JoinError) -> TransferError {
    TransferError::Codec {
        codec: codec.label().to_string(),
        source: io::Error::other(err.to_string()),
    }
}
