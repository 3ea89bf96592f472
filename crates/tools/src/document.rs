//! Reading source documents and writing summaries.

use docsum_core::{SUPPORTED_EXTENSIONS, file_extension, is_supported_extension};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{error, info};

use crate::store::{ObjectStore, StoreError};

/// Files above this size would not fit the model's context.
pub const MAX_FILE_SIZE_BYTES: u64 = 10 * 1024 * 1024;

pub const SUMMARY_CONTENT_TYPE: &str = "text/plain; charset=utf-8";

const GENERATED_BY: &str = "docsum";

#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("unsupported file type: {extension:?} (supported: {supported})")]
    UnsupportedExtension {
        extension: String,
        supported: String,
    },
    #[error("file too large: {size} bytes (limit: {limit} bytes)")]
    TooLarge { size: u64, limit: u64 },
    #[error("file not found: {location}")]
    NotFound { location: String },
    #[error("file is not valid UTF-8: {location}; save it as UTF-8 and upload again")]
    NotUtf8 { location: String },
    #[error(transparent)]
    Store(StoreError),
}

impl From<StoreError> for DocumentError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound { bucket, key } => Self::NotFound {
                location: s3_uri(&bucket, &key),
            },
            other => Self::Store(other),
        }
    }
}

pub fn s3_uri(bucket: &str, key: &str) -> String {
    format!("s3://{bucket}/{key}")
}

/// Fetch a `.txt`/`.md` object as UTF-8 text.
///
/// The size is checked with a metadata lookup before the body is
/// downloaded, so oversized files are rejected without transferring them.
pub async fn read_text_file(
    store: &dyn ObjectStore,
    bucket: &str,
    key: &str,
    max_bytes: u64,
) -> Result<String, DocumentError> {
    let location = s3_uri(bucket, key);
    info!(%location, "reading file");

    if !is_supported_extension(key) {
        let err = DocumentError::UnsupportedExtension {
            extension: file_extension(key),
            supported: SUPPORTED_EXTENSIONS.join(", "),
        };
        error!(%location, error = %err, "rejecting file");
        return Err(err);
    }

    let size = store.content_length(bucket, key).await.map_err(|e| {
        error!(%location, error = %e, "size lookup failed");
        DocumentError::from(e)
    })?;
    info!(%location, size, "file size");
    if size > max_bytes {
        let err = DocumentError::TooLarge {
            size,
            limit: max_bytes,
        };
        error!(%location, error = %err, "rejecting file");
        return Err(err);
    }

    let bytes = store.get(bucket, key).await.map_err(|e| {
        error!(%location, error = %e, "download failed");
        DocumentError::from(e)
    })?;
    let content = String::from_utf8(bytes).map_err(|_| {
        error!(%location, "file is not UTF-8");
        DocumentError::NotUtf8 {
            location: location.clone(),
        }
    })?;

    info!(%location, chars = content.chars().count(), "file read");
    Ok(content)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SaveStatus {
    Success,
    Error,
}

/// Outcome of [`save_summary`], reported back to the model as JSON.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaveReceipt {
    pub status: SaveStatus,
    pub location: Option<String>,
    pub message: String,
}

impl SaveReceipt {
    pub fn is_success(&self) -> bool {
        self.status == SaveStatus::Success
    }
}

/// Write `summary` to `bucket/key` as UTF-8 text.
///
/// Storage failures are returned as an error receipt rather than an `Err`
/// so the model can read what went wrong.
pub async fn save_summary(
    store: &dyn ObjectStore,
    bucket: &str,
    key: &str,
    summary: &str,
) -> SaveReceipt {
    let location = s3_uri(bucket, key);
    info!(%location, chars = summary.chars().count(), "saving summary");

    let metadata = [("generated-by", GENERATED_BY), ("content-type", "summary")];
    match store
        .put(
            bucket,
            key,
            summary.as_bytes().to_vec(),
            SUMMARY_CONTENT_TYPE,
            &metadata,
        )
        .await
    {
        Ok(()) => {
            info!(%location, "summary saved");
            SaveReceipt {
                status: SaveStatus::Success,
                location: Some(location),
                message: "summary saved".to_string(),
            }
        }
        Err(err) => {
            let message = format!("failed to save summary: {err}");
            error!(%location, error = %err, "summary save failed");
            SaveReceipt {
                status: SaveStatus::Error,
                location: None,
                message,
            }
        }
    }
}
