//! Blob storage for uploaded files (event photos, profile pictures).
//!
//! Uploads are addressed by a [`BlobKey`] and answered with a public retrieval
//! URL that is stored on the owning document.

use chrono::{DateTime, Utc};
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use thiserror::Error;

/// Errors that can occur during blob storage operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BlobStoreError {
    /// The key cannot be used for storage.
    #[error("Invalid blob key: {0}")]
    InvalidKey(String),

    /// The storage backend rejected or failed the upload.
    #[error("Upload failed: {0}")]
    UploadFailed(String),
}

/// Key of an uploaded blob.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct BlobKey(String);

impl BlobKey {
    /// Create a key from an arbitrary non-empty string.
    ///
    /// # Errors
    ///
    /// Returns [`BlobStoreError::InvalidKey`] if the key is blank.
    pub fn new(key: impl Into<String>) -> Result<Self, BlobStoreError> {
        let key = key.into();
        if key.trim().is_empty() {
            return Err(BlobStoreError::InvalidKey("key cannot be empty".to_string()));
        }
        Ok(Self(key))
    }

    /// Key of the form `{epoch_millis}_{file_name}`.
    ///
    /// Path separators and whitespace in the file name become `_`.
    ///
    /// ```
    /// use chrono::{TimeZone, Utc};
    /// use evently_core::blob_store::BlobKey;
    ///
    /// let at = Utc.timestamp_millis_opt(1_700_000_000_000).unwrap();
    /// assert_eq!(BlobKey::timestamped(at, "my photo.png").as_str(), "1700000000000_my_photo.png");
    /// ```
    #[must_use]
    pub fn timestamped(at: DateTime<Utc>, file_name: &str) -> Self {
        let file_name: String = file_name
            .chars()
            .map(|c| if c == '/' || c == '\\' || c.is_whitespace() { '_' } else { c })
            .collect();
        Self(format!("{}_{file_name}", at.timestamp_millis()))
    }

    /// Get the key as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BlobKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Blob storage abstraction.
pub trait BlobStore: Send + Sync {
    /// Upload `bytes` under `key`, returning the public retrieval URL.
    ///
    /// Uploading to an existing key replaces the blob.
    ///
    /// # Errors
    ///
    /// Returns [`BlobStoreError::UploadFailed`] if the backend rejects the upload.
    fn upload(
        &self,
        key: BlobKey,
        bytes: Vec<u8>,
        content_type: String,
    ) -> Pin<Box<dyn Future<Output = Result<String, BlobStoreError>> + Send + '_>>;
}
