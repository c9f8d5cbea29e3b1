//! Metadata and read handles for a single stored object.

use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::io::Cursor;

/// Metadata describing one object in the bucket.
///
/// Returned by `save` and metadata lookups. The payload itself is fetched
/// separately through `open`.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct ObjectInfo {
    /// Cleaned object key (no leading slash, `/`-separated).
    pub key: String,

    /// Size in bytes as reported by the store.
    pub size_bytes: i64,

    /// MD5 checksum reported by the store, without surrounding quotes.
    pub etag: Option<String>,

    /// Content type (MIME type), when the store reports one.
    pub content_type: Option<String>,

    /// Timestamp when the object was last modified.
    pub last_modified: Option<DateTime<Utc>>,
}

/// A fully fetched object, ready for reading.
///
/// `open` downloads the payload; this handle owns the bytes and exposes
/// size and reader accessors.
#[derive(Clone, Debug)]
pub struct StoredFile {
    /// Cleaned key the object was fetched from.
    pub key: String,

    /// Content type reported by the store, when present.
    pub content_type: Option<String>,

    data: Bytes,
}

impl StoredFile {
    pub fn new(key: String, content_type: Option<String>, data: Bytes) -> Self {
        Self {
            key,
            content_type,
            data,
        }
    }

    /// Payload size in bytes.
    pub fn size(&self) -> usize {
        self.data.len()
    }

    /// Borrow the payload.
    pub fn bytes(&self) -> &Bytes {
        &self.data
    }

    /// Consume the handle, keeping the payload.
    pub fn into_bytes(self) -> Bytes {
        self.data
    }

    /// A `std::io::Read` view over the payload.
    pub fn reader(&self) -> Cursor<&[u8]> {
        Cursor::new(self.data.as_ref())
    }
}

impl AsRef<[u8]> for StoredFile {
    fn as_ref(&self) -> &[u8] {
        self.data.as_ref()
    }
}
