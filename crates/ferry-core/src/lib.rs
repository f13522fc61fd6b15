//! ferry-core — shared types, header names, response bodies and configuration.
//! All other Ferry crates depend on this one.

pub mod codec;
pub mod config;
pub mod error;
pub mod metadata;
pub mod response;

pub use codec::{derive_name, CodecId};
pub use error::TransferError;
pub use metadata::TransferMetadata;
pub use response::{ErrorResponse, UploadResponse};
