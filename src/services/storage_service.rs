//! src/services/storage_service.rs
//!
//! S3Storage — the S3-backed implementation of the `Storage` contract.
//! All payloads and metadata live in the remote bucket; this service supplies
//! key cleaning, directory-style listing on top of ListObjectsV2, and public
//! URL construction. It intentionally carries no local state beyond the
//! client handle and the configured URL bases.

use crate::config::StorageConfig;
use crate::errors::{StorageError, StorageResult};
use crate::media::MediaUrls;
use crate::models::listing::DirListing;
use crate::models::object::{ObjectInfo, StoredFile};
use crate::services::backend::Storage;
use crate::services::signer::Signer;
use async_trait::async_trait;
use aws_sdk_s3::Client;
use aws_sdk_s3::config::Credentials;
use aws_sdk_s3::primitives::ByteStream;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as B64;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use std::collections::BTreeSet;
use tracing::debug;

const MAX_OBJECT_KEY_LEN: usize = 1024;

/// Normalize a storage key.
///
/// - backslashes become `/`
/// - a leading `/` is stripped (absolute and relative forms address the
///   same object)
///
/// Rejects empty keys, keys over 1024 bytes, `..` segments, and control
/// characters.
pub fn clean_key(key: &str) -> StorageResult<String> {
    let normalized = key.replace('\\', "/");
    let cleaned = normalized.trim_start_matches('/');
    if cleaned.is_empty() {
        return Err(StorageError::InvalidObjectKey("empty key".into()));
    }
    if cleaned.len() > MAX_OBJECT_KEY_LEN {
        return Err(StorageError::InvalidObjectKey(format!(
            "key exceeds {MAX_OBJECT_KEY_LEN} bytes"
        )));
    }
    if cleaned.split('/').any(|segment| segment == "..") {
        return Err(StorageError::InvalidObjectKey(
            "key contains a `..` segment".into(),
        ));
    }
    if cleaned.bytes().any(|b| b.is_ascii_control()) {
        return Err(StorageError::InvalidObjectKey(
            "key contains control characters".into(),
        ));
    }
    Ok(cleaned.to_string())
}

/// Normalize a directory path into a list prefix: cleaned, with a trailing
/// `/`. The bucket root (empty path or `/`) maps to the empty prefix.
pub fn dir_prefix(path: &str) -> StorageResult<String> {
    let normalized = path.replace('\\', "/");
    if normalized.trim_matches('/').is_empty() {
        return Ok(String::new());
    }
    let mut prefix = clean_key(normalized.trim_end_matches('/'))?;
    prefix.push('/');
    Ok(prefix)
}

/// Group one level of keys under `prefix` into dirs and files.
///
/// `keys` are full object keys from list pages, `common_prefixes` the
/// delimiter groups the store reported. Both outputs are sorted and
/// duplicate-free; the zero-byte directory marker (`key == prefix`) is
/// skipped.
fn group_listing<'a>(
    prefix: &str,
    keys: impl IntoIterator<Item = &'a str>,
    common_prefixes: impl IntoIterator<Item = &'a str>,
) -> DirListing {
    let mut dirs = BTreeSet::new();
    let mut files = BTreeSet::new();

    for group in common_prefixes {
        if let Some(name) = group.strip_prefix(prefix) {
            let name = name.trim_end_matches('/');
            if !name.is_empty() {
                dirs.insert(name.to_string());
            }
        }
    }
    for key in keys {
        if key == prefix {
            continue;
        }
        if let Some(name) = key.strip_prefix(prefix) {
            // A name with a slash belongs to a deeper level; the delimiter
            // should already have grouped it.
            match name.split_once('/') {
                Some((dir, _)) if !dir.is_empty() => {
                    dirs.insert(dir.to_string());
                }
                _ if !name.is_empty() => {
                    files.insert(name.to_string());
                }
                _ => {}
            }
        }
    }

    DirListing {
        dirs: dirs.into_iter().collect(),
        files: files.into_iter().collect(),
    }
}

/// Base64-encoded MD5 digest, the Content-MD5 header format.
fn content_md5(data: &[u8]) -> String {
    B64.encode(md5::compute(data).0)
}

/// S3-backed storage service.
#[derive(Clone)]
pub struct S3Storage {
    client: Client,
    bucket: String,
    media: MediaUrls,
}

impl S3Storage {
    /// Build a client from configuration and wire it to the configured
    /// bucket and media base.
    ///
    /// Explicit credentials from the config take precedence; otherwise the
    /// SDK's default provider chain applies.
    pub async fn connect(cfg: &StorageConfig) -> StorageResult<Self> {
        let mut loader =
            aws_config::ConfigLoader::default().region(aws_config::Region::new(cfg.region.clone()));
        if let Some(endpoint) = &cfg.endpoint {
            loader = loader.endpoint_url(endpoint);
        }
        if let (Some(access_key), Some(secret_key)) = (&cfg.access_key_id, &cfg.secret_access_key) {
            loader = loader.credentials_provider(Credentials::new(
                access_key.clone(),
                secret_key.clone(),
                None,
                None,
                "s3-media-store",
            ));
        }
        let shared = loader.load().await;
        let s3_config = aws_sdk_s3::config::Builder::from(&shared)
            .force_path_style(cfg.force_path_style)
            .build();

        Ok(Self::new(
            Client::from_conf(s3_config),
            cfg.bucket.clone(),
            MediaUrls::new(cfg.media_url.clone())?,
        ))
    }

    /// Wrap an existing client.
    pub fn new(client: Client, bucket: impl Into<String>, media: MediaUrls) -> Self {
        Self {
            client,
            bucket: bucket.into(),
            media,
        }
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    pub fn media_urls(&self) -> &MediaUrls {
        &self.media
    }

    /// A signed-URL helper bound to the same client and bucket.
    pub fn signer(&self) -> Signer {
        Signer::new(self.client.clone(), self.bucket.clone())
    }

    /// HeadObject mapped into `ObjectInfo`. NotFound becomes
    /// `ObjectNotFound`.
    async fn head(&self, key: &str) -> StorageResult<ObjectInfo> {
        let cleaned = clean_key(key)?;
        let resp = self
            .client
            .head_object()
            .bucket(&self.bucket)
            .key(&cleaned)
            .send()
            .await
            .map_err(|err| {
                if err
                    .as_service_error()
                    .map(|e| e.is_not_found())
                    .unwrap_or(false)
                {
                    StorageError::ObjectNotFound(cleaned.clone())
                } else {
                    StorageError::request("head_object", err)
                }
            })?;

        Ok(ObjectInfo {
            key: cleaned,
            size_bytes: resp.content_length().unwrap_or(0),
            etag: resp.e_tag().map(|e| e.trim_matches('"').to_string()),
            content_type: resp.content_type().map(str::to_string),
            last_modified: resp.last_modified().and_then(to_chrono),
        })
    }
}

/// Convert the SDK's timestamp type into `chrono`.
fn to_chrono(dt: &aws_sdk_s3::primitives::DateTime) -> Option<DateTime<Utc>> {
    DateTime::<Utc>::from_timestamp(dt.secs(), dt.subsec_nanos())
}

#[async_trait]
impl Storage for S3Storage {
    async fn save(&self, key: &str, content: Bytes) -> StorageResult<ObjectInfo> {
        let cleaned = clean_key(key)?;
        let checksum = content_md5(&content);
        let size_bytes = content.len() as i64;

        let resp = self
            .client
            .put_object()
            .bucket(&self.bucket)
            .key(&cleaned)
            .content_md5(checksum)
            .body(ByteStream::from(content))
            .send()
            .await
            .map_err(|err| StorageError::request("put_object", err))?;

        debug!("stored {} ({} bytes)", cleaned, size_bytes);
        Ok(ObjectInfo {
            key: cleaned,
            size_bytes,
            etag: resp.e_tag().map(|e| e.trim_matches('"').to_string()),
            content_type: None,
            last_modified: Some(Utc::now()),
        })
    }

    async fn open(&self, key: &str) -> StorageResult<StoredFile> {
        let cleaned = clean_key(key)?;
        let resp = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(&cleaned)
            .send()
            .await
            .map_err(|err| {
                if err
                    .as_service_error()
                    .map(|e| e.is_no_such_key())
                    .unwrap_or(false)
                {
                    StorageError::ObjectNotFound(cleaned.clone())
                } else {
                    StorageError::request("get_object", err)
                }
            })?;

        let content_type = resp.content_type().map(str::to_string);
        let data = resp
            .body
            .collect()
            .await
            .map_err(|err| StorageError::Request {
                operation: "get_object",
                source: Box::new(err),
            })?
            .into_bytes();

        Ok(StoredFile::new(cleaned, content_type, data))
    }

    async fn delete(&self, key: &str) -> StorageResult<()> {
        let cleaned = clean_key(key)?;
        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(&cleaned)
            .send()
            .await
            .map_err(|err| StorageError::request("delete_object", err))?;
        debug!("deleted {}", cleaned);
        Ok(())
    }

    async fn exists(&self, key: &str) -> StorageResult<bool> {
        match self.head(key).await {
            Ok(_) => Ok(true),
            Err(StorageError::ObjectNotFound(_)) => Ok(false),
            Err(err) => Err(err),
        }
    }

    async fn size(&self, key: &str) -> StorageResult<i64> {
        Ok(self.head(key).await?.size_bytes)
    }

    async fn modified(&self, key: &str) -> StorageResult<DateTime<Utc>> {
        let info = self.head(key).await?;
        info.last_modified.ok_or(StorageError::Request {
            operation: "head_object",
            source: "response carried no Last-Modified timestamp".into(),
        })
    }

    fn url(&self, key: &str) -> StorageResult<String> {
        let cleaned = clean_key(key)?;
        self.media.url(&cleaned)
    }

    async fn listdir(&self, path: &str) -> StorageResult<DirListing> {
        let prefix = dir_prefix(path)?;
        let mut keys: Vec<String> = Vec::new();
        let mut groups: Vec<String> = Vec::new();
        let mut continuation: Option<String> = None;

        loop {
            let mut req = self
                .client
                .list_objects_v2()
                .bucket(&self.bucket)
                .delimiter("/");
            if !prefix.is_empty() {
                req = req.prefix(&prefix);
            }
            if let Some(token) = &continuation {
                req = req.continuation_token(token);
            }
            let resp = req
                .send()
                .await
                .map_err(|err| StorageError::request("list_objects_v2", err))?;

            keys.extend(
                resp.contents()
                    .iter()
                    .filter_map(|obj| obj.key())
                    .map(str::to_string),
            );
            groups.extend(
                resp.common_prefixes()
                    .iter()
                    .filter_map(|cp| cp.prefix())
                    .map(str::to_string),
            );

            match resp.next_continuation_token() {
                Some(token) if resp.is_truncated().unwrap_or(false) => {
                    continuation = Some(token.to_string());
                }
                _ => break,
            }
        }

        Ok(group_listing(
            &prefix,
            keys.iter().map(String::as_str),
            groups.iter().map(String::as_str),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clean_key_strips_leading_slash() {
        assert_eq!(clean_key("/testsdir/file1.txt").unwrap(), "testsdir/file1.txt");
        assert_eq!(clean_key("testsdir/file2.txt").unwrap(), "testsdir/file2.txt");
    }

    #[test]
    fn clean_key_translates_backslashes() {
        assert_eq!(clean_key(r"testsdir\file.txt").unwrap(), "testsdir/file.txt");
    }

    #[test]
    fn clean_key_keeps_unicode() {
        assert_eq!(clean_key("testsdir/áéíóú.txt").unwrap(), "testsdir/áéíóú.txt");
    }

    #[test]
    fn clean_key_rejects_bad_keys() {
        assert!(clean_key("").is_err());
        assert!(clean_key("/").is_err());
        assert!(clean_key("a/../b").is_err());
        assert!(clean_key("a\tb").is_err());
        assert!(clean_key(&"x".repeat(1025)).is_err());
    }

    #[test]
    fn clean_key_allows_dotted_names() {
        assert_eq!(clean_key("a/..b/c").unwrap(), "a/..b/c");
        assert_eq!(clean_key("archive.tar.gz").unwrap(), "archive.tar.gz");
    }

    #[test]
    fn dir_prefix_normalizes_all_forms() {
        for path in ["/testsdir", "testsdir", "testsdir/"] {
            assert_eq!(dir_prefix(path).unwrap(), "testsdir/");
        }
        assert_eq!(dir_prefix("testsdir/sub").unwrap(), "testsdir/sub/");
    }

    #[test]
    fn dir_prefix_of_root_is_empty() {
        assert_eq!(dir_prefix("").unwrap(), "");
        assert_eq!(dir_prefix("/").unwrap(), "");
    }

    #[test]
    fn group_listing_splits_dirs_and_files() {
        let listing = group_listing(
            "testsdir/",
            ["testsdir/file3.txt", "testsdir/file4.txt"],
            ["testsdir/sub/"],
        );
        assert_eq!(listing.dirs, vec!["sub"]);
        assert_eq!(listing.files, vec!["file3.txt", "file4.txt"]);
    }

    #[test]
    fn group_listing_of_subdir() {
        let listing = group_listing("testsdir/sub/", ["testsdir/sub/file5.txt"], []);
        assert_eq!(listing.dirs, Vec::<String>::new());
        assert_eq!(listing.files, vec!["file5.txt"]);
    }

    #[test]
    fn group_listing_sorts_and_dedupes() {
        let listing = group_listing(
            "d/",
            ["d/b.txt", "d/a.txt", "d/b.txt"],
            ["d/z/", "d/y/", "d/z/"],
        );
        assert_eq!(listing.dirs, vec!["y", "z"]);
        assert_eq!(listing.files, vec!["a.txt", "b.txt"]);
    }

    #[test]
    fn group_listing_skips_directory_marker_and_deep_keys() {
        // A deep key can appear when a page was produced without the
        // delimiter applied; it must fold into its top-level dir.
        let listing = group_listing("d/", ["d/", "d/sub/deep.txt", "d/top.txt"], []);
        assert_eq!(listing.dirs, vec!["sub"]);
        assert_eq!(listing.files, vec!["top.txt"]);
    }

    #[test]
    fn group_listing_at_root() {
        let listing = group_listing("", ["file6.txt"], ["testsdir/"]);
        assert_eq!(listing.dirs, vec!["testsdir"]);
        assert_eq!(listing.files, vec!["file6.txt"]);
    }

    fn offline_storage(media_url: &str) -> S3Storage {
        let config = aws_sdk_s3::Config::builder()
            .behavior_version(aws_sdk_s3::config::BehaviorVersion::latest())
            .region(aws_sdk_s3::config::Region::new("us-east-1"))
            .build();
        S3Storage::new(
            Client::from_conf(config),
            "test-bucket",
            MediaUrls::new(media_url).unwrap(),
        )
    }

    #[test]
    fn url_is_media_base_plus_encoded_key() {
        let storage = offline_storage("http://media.example.com/media/");
        assert_eq!(
            storage.url("/testsdir/file1.txt").unwrap(),
            "http://media.example.com/media/testsdir/file1.txt"
        );
        assert_eq!(
            storage.url("testsdir/áéíóú.txt").unwrap(),
            "http://media.example.com/media/testsdir/%C3%A1%C3%A9%C3%AD%C3%B3%C3%BA.txt"
        );
        assert_eq!(
            storage.url(r"testsdir\file2.txt").unwrap(),
            "http://media.example.com/media/testsdir/file2.txt"
        );
    }

    #[test]
    fn content_md5_is_base64_of_digest() {
        // md5("Lorem ipsum dolor sit amet") = fea80f2db003d4ebc4536023814aa885
        assert_eq!(
            content_md5(b"Lorem ipsum dolor sit amet"),
            "/qgPLbAD1OvEU2AjgUqohQ=="
        );
    }
}
