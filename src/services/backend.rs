//! The file-storage contract.

use crate::errors::StorageResult;
use crate::models::listing::DirListing;
use crate::models::object::{ObjectInfo, StoredFile};
use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};

/// A storage backend: save/open/delete/exists plus metadata and URL lookups.
///
/// Keys are `/`-separated paths. Implementations clean keys on the way in
/// (backslashes become `/`, a leading `/` is stripped), so callers may pass
/// either form; returned metadata always carries the cleaned key.
#[async_trait]
pub trait Storage: Send + Sync {
    /// Store `content` under `key`, overwriting any previous object.
    /// Returns the metadata of the stored object, cleaned key included.
    async fn save(&self, key: &str, content: Bytes) -> StorageResult<ObjectInfo>;

    /// Fetch the object for reading.
    async fn open(&self, key: &str) -> StorageResult<StoredFile>;

    /// Remove the object. Removing an absent key is not an error.
    async fn delete(&self, key: &str) -> StorageResult<()>;

    /// Whether an object exists under `key`.
    async fn exists(&self, key: &str) -> StorageResult<bool>;

    /// Size of the stored object in bytes.
    async fn size(&self, key: &str) -> StorageResult<i64>;

    /// Last-modified timestamp of the stored object.
    async fn modified(&self, key: &str) -> StorageResult<DateTime<Utc>>;

    /// Public URL for the object: the media base joined with the
    /// percent-encoded key.
    fn url(&self, key: &str) -> StorageResult<String>;

    /// List the immediate subdirectories and files under `path`.
    async fn listdir(&self, path: &str) -> StorageResult<DirListing>;
}
