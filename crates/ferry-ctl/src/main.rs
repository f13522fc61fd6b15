//! ferry-ctl — send a file to a Ferry server.

use std::path::Path;

use anyhow::{Context, Result, bail};
use tracing_subscriber::EnvFilter;

use ferry_core::CodecId;
use ferry_core::config::FerryConfig;
use ferry_ctl::TransferClient;

fn print_usage() {
    println!("Usage: ferry-ctl [--host <host>] [--port <port>] <file> [codec]");
    println!();
    println!("Codecs:");
    println!("  none      Store as sent (default)");
    println!("  gzip      Store as <file>.gz");
    println!("  deflate   Store as <file>.deflate");
    println!("  brotli    Store as <file>.br");
    println!();
    println!("Options:");
    println!("  --host <host>   Server host (default: config, then localhost)");
    println!("  --port <port>   Server port (default: config, then 3002)");
}

// ── Entry point ───────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();

    let mut config = FerryConfig::load().unwrap_or_else(|e| {
        tracing::warn!(error = %e, "failed to load config, using defaults");
        FerryConfig::default()
    });

    // Parse --host / --port options
    let mut remaining: Vec<&str> = Vec::new();
    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--host" => {
                i += 1;
                config.client.host = args.get(i).context("--host requires a value")?.clone();
            }
            "--port" => {
                i += 1;
                config.client.port = args
                    .get(i)
                    .context("--port requires a value")?
                    .parse()
                    .context("--port must be a number")?;
            }
            other => remaining.push(other),
        }
        i += 1;
    }

    let (file, codec) = match remaining.as_slice() {
        ["help"] | ["--help"] | ["-h"] => {
            print_usage();
            return Ok(());
        }
        [file] => (*file, CodecId::None),
        [file, codec] => (*file, CodecId::parse(codec)),
        _ => {
            print_usage();
            std::process::exit(1);
        }
    };

    let path = Path::new(file);
    let meta = std::fs::metadata(path).with_context(|| format!("file not found: {file}"))?;
    if !meta.is_file() {
        bail!("not a regular file: {file}");
    }
    if let CodecId::Unknown(raw) = &codec {
        eprintln!("warning: unknown codec '{raw}', the server will store the file uncompressed");
    }

    let client = TransferClient::new(&config.client, &config.transfer);
    let summary = client
        .send(path, codec)
        .await
        .with_context(|| format!("failed to upload {file} to {}", client.endpoint()))?;

    let resp = &summary.response;
    println!("═══════════════════════════════════════");
    println!("  {}", resp.message);
    println!("═══════════════════════════════════════");
    println!("  Original name : {}", resp.original_filename);
    println!("  Saved as      : {}", resp.saved_filename);
    println!("  Compression   : {}", resp.compression);
    println!("  Size          : {} bytes", resp.size);
    println!("  Chunks        : {} sent, {} received", summary.chunks_sent, resp.chunks);
    println!("  Elapsed       : {:.2}s", summary.elapsed.as_secs_f64());

    Ok(())
}
