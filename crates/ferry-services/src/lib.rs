//! ferry-services — the transfer machinery shared by `ferryd` and `ferry-ctl`.
//!
//! Client side: `ChunkSource` streams a file in fixed-size chunks.
//! Server side: `UploadOrchestrator` parses headers, picks a codec and drives
//! the body through a `Pipeline` into a `ByteSink`.

pub mod chunk_source;
pub mod codec;
pub mod metadata;
pub mod pipeline;
pub mod sink;
pub mod upload;

pub use chunk_source::{ChunkSource, ChunkStream, SourceError};
pub use codec::{StreamCompressor, Transform};
pub use pipeline::Pipeline;
pub use sink::{ByteSink, FileSink};
pub use upload::{
    Upload, UploadContext, UploadOrchestrator, UploadReceipt, UploadSettings, UploadState,
};
