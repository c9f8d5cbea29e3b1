//! Error types shared across the storage, signing, and media-URL layers.

use aws_sdk_s3::error::SdkError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("object `{0}` not found")]
    ObjectNotFound(String),
    #[error("invalid object key: {0}")]
    InvalidObjectKey(String),
    #[error("invalid media URL `{url}`: {reason}")]
    InvalidMediaUrl { url: String, reason: String },
    #[error("invalid signing expiry: {0}")]
    InvalidExpiry(String),
    #[error("s3 {operation} request failed: {source}")]
    Request {
        operation: &'static str,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

pub type StorageResult<T> = Result<T, StorageError>;

impl StorageError {
    /// Wrap an SDK error from the named S3 operation.
    pub(crate) fn request<E>(operation: &'static str, err: SdkError<E>) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        StorageError::Request {
            operation,
            source: Box::new(err),
        }
    }
}
