//! Image ingestion: file bytes to a `data:` URI stored as block content.

use std::path::{Path, PathBuf};

use base64::Engine;
use base64::engine::general_purpose::STANDARD;

/// Largest image accepted by default (5 MiB).
pub const DEFAULT_MAX_BYTES: u64 = 5 * 1024 * 1024;

/// Image types a block may hold.
pub const ACCEPTED_MIME_TYPES: [&str; 5] = [
    "image/png",
    "image/jpeg",
    "image/gif",
    "image/webp",
    "image/svg+xml",
];

/// Error type for image ingestion.
#[derive(Debug, thiserror::Error)]
pub enum ImageError {
    #[error("unsupported image type: {0}")]
    UnsupportedType(String),

    #[error("image is {size} bytes, limit is {limit}")]
    TooLarge { size: u64, limit: u64 },

    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Check if `mime` is one of [`ACCEPTED_MIME_TYPES`].
pub fn is_accepted(mime: &str) -> bool {
    ACCEPTED_MIME_TYPES.contains(&mime)
}

/// Guess the MIME type from a file extension (case-insensitive).
pub fn mime_from_path(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    match ext.as_str() {
        "png" => Some("image/png"),
        "jpg" | "jpeg" => Some("image/jpeg"),
        "gif" => Some("image/gif"),
        "webp" => Some("image/webp"),
        "svg" => Some("image/svg+xml"),
        _ => None,
    }
}

/// Encode `bytes` as `data:<mime>;base64,<payload>`.
pub fn to_data_uri(bytes: &[u8], mime: &str, max_bytes: u64) -> Result<String, ImageError> {
    if !is_accepted(mime) {
        return Err(ImageError::UnsupportedType(mime.to_string()));
    }
    let size = bytes.len() as u64;
    if size > max_bytes {
        return Err(ImageError::TooLarge {
            size,
            limit: max_bytes,
        });
    }
    Ok(format!("data:{mime};base64,{}", STANDARD.encode(bytes)))
}

/// Read an image file and encode it as a data URI.
///
/// The size limit is checked against file metadata before the read.
pub async fn ingest_file(path: impl AsRef<Path>, max_bytes: u64) -> Result<String, ImageError> {
    let path = path.as_ref();
    let mime = mime_from_path(path).ok_or_else(|| {
        ImageError::UnsupportedType(
            path.extension()
                .and_then(|e| e.to_str())
                .unwrap_or("(none)")
                .to_string(),
        )
    })?;

    let io_err = |source| ImageError::Io {
        path: path.to_path_buf(),
        source,
    };
    let size = tokio::fs::metadata(path).await.map_err(io_err)?.len();
    if size > max_bytes {
        return Err(ImageError::TooLarge {
            size,
            limit: max_bytes,
        });
    }

    let bytes = tokio::fs::read(path).await.map_err(io_err)?;
    tracing::debug!(path = %path.display(), mime, size = bytes.len(), "ingested image");
    to_data_uri(&bytes, mime, max_bytes)
}
