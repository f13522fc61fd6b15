//! Codec identifiers and the output naming rule.

use std::fmt;

/// Compression codec requested for one transfer.
///
/// Closed set of known codecs plus `Unknown`, which carries the raw value the
/// client sent. Unknown codecs are stored uncompressed under the original name.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum CodecId {
    #[default]
    None,
    Gzip,
    Deflate,
    Brotli,
    Unknown(String),
}

impl CodecId {
    /// Parse a header value. Matching is case-insensitive and ignores
    /// surrounding whitespace; an empty value means no codec.
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        match trimmed.to_ascii_lowercase().as_str() {
            "" | "none" => CodecId::None,
            "gzip" => CodecId::Gzip,
            "deflate" => CodecId::Deflate,
            "brotli" => CodecId::Brotli,
            _ => CodecId::Unknown(trimmed.to_string()),
        }
    }

    /// Parse an optional header value; absence means no codec.
    pub fn from_header(raw: Option<&str>) -> Self {
        raw.map(Self::parse).unwrap_or_default()
    }

    /// File suffix appended to stored output, only for codecs that compress.
    pub fn extension(&self) -> Option<&'static str> {
        match self {
            CodecId::Gzip => Some(".gz"),
            CodecId::Deflate => Some(".deflate"),
            CodecId::Brotli => Some(".br"),
            CodecId::None | CodecId::Unknown(_) => None,
        }
    }

    /// Name reported back to the client in the `compression` field.
    pub fn label(&self) -> &str {
        match self {
            CodecId::None => "none",
            CodecId::Gzip => "gzip",
            CodecId::Deflate => "deflate",
            CodecId::Brotli => "brotli",
            CodecId::Unknown(raw) => raw,
        }
    }

    /// Value for the `X-Compression-Type` request header. `None` sends no header.
    pub fn header_value(&self) -> Option<&str> {
        match self {
            CodecId::None => None,
            other => Some(other.label()),
        }
    }

    /// True when bytes are routed through a compressor.
    pub fn compresses(&self) -> bool {
        self.extension().is_some()
    }
}

impl fmt::Display for CodecId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Stored file name for a transfer: the original name, plus the codec suffix
/// when the codec compresses.
pub fn derive_name(name: &str, codec: &CodecId) -> String {
    match codec.extension() {
        Some(ext) => format!("{name}{ext}"),
        None => name.to_string(),
    }
}
