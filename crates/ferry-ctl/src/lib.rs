//! ferry-ctl — client library behind the `ferry-ctl` binary.

pub mod client;

pub use client::{TransferClient, TransferSummary};
