//! Attachment ingestion: reading file payloads and encoding them inline.
//!
//! Reading happens before any state transition. A batch is decoded
//! concurrently and either all of it succeeds or the whole batch fails, so
//! callers can apply the result as a single transition.

use std::path::{Path, PathBuf};

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use futures_util::future::try_join_all;
use taskboard_proto::{Attachment, AttachmentId};

use super::BoardError;

/// Media type used when nothing better is known.
pub const DEFAULT_MEDIA_TYPE: &str = "application/octet-stream";

/// Where an attachment's bytes come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PayloadSource {
    /// Bytes already in memory.
    Bytes(Vec<u8>),
    /// A file to read from disk.
    Path(PathBuf),
}

/// A raw file handed over by a form or the command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilePayload {
    pub name: String,
    pub media_type: String,
    pub source: PayloadSource,
}

impl FilePayload {
    /// An in-memory payload.
    #[must_use]
    pub fn from_bytes(
        name: impl Into<String>,
        media_type: impl Into<String>,
        bytes: Vec<u8>,
    ) -> Self {
        Self {
            name: name.into(),
            media_type: media_type.into(),
            source: PayloadSource::Bytes(bytes),
        }
    }

    /// A payload read from `path` on demand. Name and media type are
    /// derived from the file name.
    #[must_use]
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let name = path
            .file_name()
            .map_or_else(|| path.display().to_string(), |n| n.to_string_lossy().into_owned());
        Self {
            media_type: media_type_for(&path).to_string(),
            name,
            source: PayloadSource::Path(path),
        }
    }

    async fn read(self, limit: usize) -> Result<(String, String, Vec<u8>), BoardError> {
        let bytes = match self.source {
            PayloadSource::Bytes(bytes) => bytes,
            PayloadSource::Path(path) => {
                let size = tokio::fs::metadata(&path)
                    .await
                    .map_err(|source| BoardError::AttachmentRead {
                        name: self.name.clone(),
                        source,
                    })?
                    .len();
                let size = usize::try_from(size).unwrap_or(usize::MAX);
                if size > limit {
                    return Err(BoardError::AttachmentTooLarge {
                        name: self.name,
                        size,
                        limit,
                    });
                }
                tokio::fs::read(&path)
                    .await
                    .map_err(|source| BoardError::AttachmentRead {
                        name: self.name.clone(),
                        source,
                    })?
            }
        };
        if bytes.len() > limit {
            return Err(BoardError::AttachmentTooLarge {
                name: self.name,
                size: bytes.len(),
                limit,
            });
        }
        Ok((self.name, self.media_type, bytes))
    }
}

/// Guesses a media type from a file extension.
#[must_use]
pub fn media_type_for(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);
    match ext.as_deref() {
        Some("png") => "image/png",
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        Some("svg") => "image/svg+xml",
        Some("pdf") => "application/pdf",
        Some("json") => "application/json",
        Some("txt" | "log") => "text/plain",
        Some("md") => "text/markdown",
        Some("csv") => "text/csv",
        Some("html" | "htm") => "text/html",
        _ => DEFAULT_MEDIA_TYPE,
    }
}

/// Builds a base64 `data:` URI.
#[must_use]
pub fn data_uri(media_type: &str, bytes: &[u8]) -> String {
    let media_type = if media_type.is_empty() {
        DEFAULT_MEDIA_TYPE
    } else {
        media_type
    };
    format!("data:{media_type};base64,{}", STANDARD.encode(bytes))
}

/// Reads one payload and turns it into an [`Attachment`] with a fresh id.
///
/// # Errors
///
/// Returns [`BoardError::AttachmentRead`] if the payload cannot be read,
/// or [`BoardError::AttachmentTooLarge`] if it exceeds `limit` bytes.
pub async fn encode(payload: FilePayload, limit: usize) -> Result<Attachment, BoardError> {
    let (name, media_type, bytes) = payload.read(limit).await.inspect_err(|e| {
        tracing::warn!(error = %e, "attachment ingestion failed");
    })?;
    Ok(Attachment {
        id: AttachmentId::generate(),
        data: data_uri(&media_type, &bytes),
        name,
        media_type,
    })
}

/// Encodes every payload concurrently, preserving input order.
///
/// # Errors
///
/// Fails with the first error encountered; nothing is returned for the
/// payloads that did succeed.
pub async fn encode_all(
    payloads: Vec<FilePayload>,
    limit: usize,
) -> Result<Vec<Attachment>, BoardError> {
    try_join_all(payloads.into_iter().map(|p| encode(p, limit))).await
}
