use crate::*;

use ferry_core::{ErrorResponse, TransferError, UploadResponse};

/// Every codec: the stored file decodes back to the exact input.
#[tokio::test]
async fn test_round_trip_all_codecs() -> Result<()> {
    let server = TestServer::start().await?;
    let data = payload(300 * 1024 + 17);

    for codec in [
        CodecId::None,
        CodecId::Gzip,
        CodecId::Deflate,
        CodecId::Brotli,
    ] {
        let name = format!("round-trip-{codec}.txt");
        let path = server.input(&name, &data);

        let summary = server.client().send(&path, codec.clone()).await?;
        let resp = &summary.response;
        assert_eq!(resp.message, "File uploaded successfully");
        assert_eq!(resp.original_filename, name);
        assert_eq!(resp.saved_filename, ferry_core::derive_name(&name, &codec));
        assert_eq!(resp.size, data.len() as u64);
        assert_eq!(resp.compression, codec.label());
        assert_eq!(summary.bytes_sent, data.len() as u64);
        // 300 KiB + 17 bytes in 64 KiB chunks.
        assert_eq!(summary.chunks_sent, 5);

        let stored = server.stored(&resp.saved_filename)?;
        assert_eq!(decode(&codec, &stored)?, data, "{codec} did not round trip");
        if codec.compresses() {
            assert!(stored.len() < data.len(), "{codec} output was not smaller");
        }
    }

    server.stop().await
}

/// 10-byte `a.txt` sent with gzip lands as `a.txt.gz`.
#[tokio::test]
async fn test_small_gzip_file() -> Result<()> {
    let server = TestServer::start().await?;
    let path = server.input("a.txt", b"0123456789");

    let summary = server.client().send(&path, CodecId::Gzip).await?;
    assert_eq!(summary.response.saved_filename, "a.txt.gz");
    assert_eq!(summary.response.size, 10);
    assert_eq!(summary.response.chunks, 1);
    assert_eq!(summary.chunks_sent, 1);

    let stored = server.stored("a.txt.gz")?;
    assert_eq!(decode(&CodecId::Gzip, &stored)?, b"0123456789");
    assert_eq!(server.stored_names(), vec!["a.txt.gz".to_string()]);

    server.stop().await
}

/// Without a codec the file is stored verbatim under its own name.
#[tokio::test]
async fn test_small_file_without_codec() -> Result<()> {
    let server = TestServer::start().await?;
    let path = server.input("a.txt", b"0123456789");

    let summary = server.client().send(&path, CodecId::None).await?;
    assert_eq!(summary.response.saved_filename, "a.txt");
    assert_eq!(summary.response.compression, "none");
    assert_eq!(server.stored("a.txt")?, b"0123456789");

    server.stop().await
}

/// An unknown codec is echoed back but the file is stored uncompressed.
#[tokio::test]
async fn test_unknown_codec_passthrough() -> Result<()> {
    let server = TestServer::start().await?;
    let path = server.input("a.txt", b"0123456789");

    let summary = server
        .client()
        .send(&path, CodecId::parse("lz4"))
        .await?;
    assert_eq!(summary.response.saved_filename, "a.txt");
    assert_eq!(summary.response.compression, "lz4");
    assert_eq!(server.stored("a.txt")?, b"0123456789");

    server.stop().await
}

/// Empty files still produce a valid (empty) output.
#[tokio::test]
async fn test_empty_file() -> Result<()> {
    let server = TestServer::start().await?;
    let path = server.input("empty.bin", b"");

    let summary = server.client().send(&path, CodecId::Brotli).await?;
    assert_eq!(summary.response.size, 0);
    assert_eq!(summary.response.chunks, 0);
    assert_eq!(summary.chunks_sent, 0);

    let stored = server.stored("empty.bin.br")?;
    assert!(decode(&CodecId::Brotli, &stored)?.is_empty());

    server.stop().await
}

/// Small client chunks are reassembled in order.
#[tokio::test]
async fn test_small_chunks_keep_order() -> Result<()> {
    let server = TestServer::start().await?;
    let data = payload(10_000);
    let path = server.input("ordered.txt", &data);

    let summary = server
        .client_with_chunk_size(1000)
        .send(&path, CodecId::Deflate)
        .await?;
    assert_eq!(summary.chunks_sent, 10);

    let stored = server.stored("ordered.txt.deflate")?;
    assert_eq!(decode(&CodecId::Deflate, &stored)?, data);

    server.stop().await
}

/// A missing X-Filename is a 400 and nothing is written.
#[tokio::test]
async fn test_missing_filename_rejected() -> Result<()> {
    let server = TestServer::start().await?;

    let resp = reqwest::Client::new()
        .post(server.url("/upload"))
        .header("X-File-Size", "10")
        .header("X-Compression-Type", "gzip")
        .body("0123456789")
        .send()
        .await?;
    assert_eq!(resp.status().as_u16(), 400);
    let body: ErrorResponse = resp.json().await?;
    assert!(body.error.contains("X-Filename"), "{}", body.error);
    assert!(server.stored_names().is_empty());

    server.stop().await
}

/// Raw request with mixed-case headers and a path in the file name.
#[tokio::test]
async fn test_raw_request_headers() -> Result<()> {
    let server = TestServer::start().await?;

    let resp = reqwest::Client::new()
        .post(server.url("/upload"))
        .header("X-FILENAME", "../../escape.txt")
        .header("x-file-size", "not a number")
        .header("X-Compression-Type", "GZIP")
        .body("0123456789")
        .send()
        .await?;
    assert_eq!(resp.status().as_u16(), 200);
    let body: UploadResponse = resp.json().await?;
    assert_eq!(body.original_filename, "escape.txt");
    assert_eq!(body.saved_filename, "escape.txt.gz");
    assert_eq!(body.compression, "gzip");

    assert_eq!(server.stored_names(), vec!["escape.txt.gz".to_string()]);
    assert_no_file(&server.upload_dir.join(".."), "escape.txt.gz")?;

    server.stop().await
}

/// Anything other than POST /upload is a JSON 404.
#[tokio::test]
async fn test_not_found_fallback() -> Result<()> {
    let server = TestServer::start().await?;
    let http = reqwest::Client::new();

    for resp in [
        http.get(server.url("/upload")).send().await?,
        http.post(server.url("/files")).body("x").send().await?,
        http.get(server.url("/")).send().await?,
    ] {
        assert_eq!(resp.status().as_u16(), 404);
        let body: serde_json::Value = resp.json().await?;
        assert_eq!(body, serde_json::json!({ "error": "Not found" }));
    }

    server.stop().await
}

/// The client reports server rejections as `Rejected`.
#[tokio::test]
async fn test_client_sees_rejection() -> Result<()> {
    let server = TestServer::start().await?;
    let path = server.input("x.txt", b"data");

    let client = TransferClient::with_endpoint(server.url("/nowhere"), DEFAULT_CHUNK_SIZE, 10);
    let err = client.send(&path, CodecId::None).await.unwrap_err();
    match err {
        TransferError::Rejected { status, error } => {
            assert_eq!(status, 404);
            assert_eq!(error, "Not found");
        }
        other => panic!("expected rejection, got {other:?}"),
    }

    server.stop().await
}

/// CORS pre-flight is answered for the transfer headers.
#[tokio::test]
async fn test_cors_preflight() -> Result<()> {
    let server = TestServer::start().await?;

    let resp = reqwest::Client::new()
        .request(reqwest::Method::OPTIONS, server.url("/upload"))
        .header("Origin", "http://example.test")
        .header("Access-Control-Request-Method", "POST")
        .header(
            "Access-Control-Request-Headers",
            "x-filename,x-file-size,x-compression-type",
        )
        .send()
        .await?;
    assert!(resp.status().is_success());
    let headers = resp.headers();
    assert_eq!(
        headers
            .get("access-control-allow-origin")
            .and_then(|v| v.to_str().ok()),
        Some("*")
    );
    let allowed = headers
        .get("access-control-allow-headers")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_ascii_lowercase();
    assert!(allowed.contains("x-compression-type"), "{allowed}");

    server.stop().await
}
