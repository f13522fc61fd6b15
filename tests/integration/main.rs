//! Ferry integration test harness.
//!
//! Each test starts the upload router in-process on an ephemeral port with
//! its own upload directory, and talks to it over real HTTP:
//!
//!   cargo test --test integration
//!
//! Each test owns its server; nothing is shared between tests.

use std::io::Read;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use anyhow::{bail, Context, Result};
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

use ferry_api::ApiState;
use ferry_core::config::CompressionConfig;
use ferry_core::metadata::{DEFAULT_CHUNK_SIZE, UPLOAD_PATH};
use ferry_core::CodecId;
use ferry_ctl::TransferClient;
use ferry_services::{UploadOrchestrator, UploadSettings};

mod upload;

// ── Harness ───────────────────────────────────────────────────────────────────

static COUNTER: AtomicU64 = AtomicU64::new(0);

/// Fresh scratch directory under the system temp dir.
pub fn scratch_dir(label: &str) -> PathBuf {
    let id = COUNTER.fetch_add(1, Ordering::Relaxed);
    let dir = std::env::temp_dir().join(format!(
        "ferry-it-{label}-{}-{}",
        std::process::id(),
        id
    ));
    let _ = std::fs::remove_dir_all(&dir);
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

/// An upload server running in the test's runtime.
pub struct TestServer {
    pub addr: SocketAddr,
    pub upload_dir: PathBuf,
    pub input_dir: PathBuf,
    shutdown: Option<oneshot::Sender<()>>,
    handle: Option<JoinHandle<Result<()>>>,
}

impl TestServer {
    pub async fn start() -> Result<Self> {
        let upload_dir = scratch_dir("uploads");
        let input_dir = scratch_dir("inputs");

        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .context("failed to bind test listener")?;
        let addr = listener.local_addr()?;

        let state = ApiState::new(UploadOrchestrator::new(UploadSettings {
            upload_dir: upload_dir.clone(),
            compression: CompressionConfig::default(),
            progress_every: 10,
        }));

        let (tx, rx) = oneshot::channel::<()>();
        let handle = tokio::spawn(ferry_api::serve(state, listener, async {
            rx.await.ok();
        }));

        Ok(Self {
            addr,
            upload_dir,
            input_dir,
            shutdown: Some(tx),
            handle: Some(handle),
        })
    }

    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    pub fn client(&self) -> TransferClient {
        self.client_with_chunk_size(DEFAULT_CHUNK_SIZE)
    }

    pub fn client_with_chunk_size(&self, chunk_size: usize) -> TransferClient {
        TransferClient::with_endpoint(self.url(UPLOAD_PATH), chunk_size, 10)
    }

    /// Write a local file for the client to send.
    pub fn input(&self, name: &str, contents: &[u8]) -> PathBuf {
        let path = self.input_dir.join(name);
        std::fs::write(&path, contents).unwrap();
        path
    }

    pub fn stored(&self, name: &str) -> Result<Vec<u8>> {
        let path = self.upload_dir.join(name);
        std::fs::read(&path).with_context(|| format!("missing upload {}", path.display()))
    }

    pub fn stored_names(&self) -> Vec<String> {
        let mut names: Vec<String> = std::fs::read_dir(&self.upload_dir)
            .map(|entries| {
                entries
                    .filter_map(|e| e.ok())
                    .map(|e| e.file_name().to_string_lossy().into_owned())
                    .collect()
            })
            .unwrap_or_default();
        names.sort();
        names
    }

    pub async fn stop(mut self) -> Result<()> {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.handle.take() {
            handle.await.context("server task panicked")??;
        }
        Ok(())
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        let _ = std::fs::remove_dir_all(&self.upload_dir);
        let _ = std::fs::remove_dir_all(&self.input_dir);
    }
}

/// Undo the server-side codec.
pub fn decode(codec: &CodecId, stored: &[u8]) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    match codec {
        CodecId::None | CodecId::Unknown(_) => out.extend_from_slice(stored),
        CodecId::Gzip => {
            flate2::read::GzDecoder::new(stored).read_to_end(&mut out)?;
        }
        CodecId::Deflate => {
            flate2::read::ZlibDecoder::new(stored).read_to_end(&mut out)?;
        }
        CodecId::Brotli => {
            brotli::Decompressor::new(stored, 4096).read_to_end(&mut out)?;
        }
    }
    Ok(out)
}

/// Deterministic, mildly compressible test payload.
pub fn payload(len: usize) -> Vec<u8> {
    let words: &[&[u8]] = &[b"ferry ", b"chunk ", b"stream ", b"upload ", b"\n"];
    let mut out = Vec::with_capacity(len);
    let mut i = 0usize;
    while out.len() < len {
        out.extend_from_slice(words[(i * 7 + i / 3) % words.len()]);
        i += 1;
    }
    out.truncate(len);
    out
}

pub fn assert_no_file(dir: &Path, name: &str) -> Result<()> {
    if dir.join(name).exists() {
        bail!("{name} should not exist in {}", dir.display());
    }
    Ok(())
}

// ── Tests ─────────────────────────────────────────────────────────────────────

/// The server comes up, answers, and shuts down cleanly.
#[tokio::test]
async fn test_server_starts_and_stops() -> Result<()> {
    let server = TestServer::start().await?;
    let resp = reqwest::get(server.url("/")).await?;
    assert_eq!(resp.status().as_u16(), 404);
    server.stop().await
}
