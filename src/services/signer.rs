//! Time-limited signed URLs for private objects.
//!
//! Wraps the SDK's GET presigning. A signed URL answers 200 until its expiry
//! and 403 afterwards; signing a missing key still produces a well-formed
//! URL, which the store answers with 404. The signature does not cover the
//! URL scheme, so `secure` simply forces `https` after presigning.

use crate::errors::{StorageError, StorageResult};
use crate::services::storage_service::clean_key;
use aws_sdk_s3::Client;
use aws_sdk_s3::presigning::PresigningConfig;
use chrono::{DateTime, Utc};
use std::time::Duration;

/// Generates presigned GET URLs for one bucket.
#[derive(Clone, Debug)]
pub struct Signer {
    client: Client,
    bucket: String,
}

impl Signer {
    pub fn new(client: Client, bucket: impl Into<String>) -> Self {
        Self {
            client,
            bucket: bucket.into(),
        }
    }

    /// Sign a GET for `key`, valid for `expires` from now.
    pub async fn sign_url(&self, key: &str, expires: Duration, secure: bool) -> StorageResult<String> {
        let cleaned = clean_key(key)?;
        let config = PresigningConfig::expires_in(expires)
            .map_err(|err| StorageError::InvalidExpiry(err.to_string()))?;

        let presigned = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(&cleaned)
            .presigned(config)
            .await
            .map_err(|err| StorageError::request("presign_get_object", err))?;

        Ok(force_scheme(presigned.uri().to_string(), secure))
    }

    /// Sign a GET for `key`, valid until the absolute instant `expires_at`.
    pub async fn sign_url_at(
        &self,
        key: &str,
        expires_at: DateTime<Utc>,
        secure: bool,
    ) -> StorageResult<String> {
        let remaining = (expires_at - Utc::now()).to_std().map_err(|_| {
            StorageError::InvalidExpiry(format!("expiry {expires_at} is in the past"))
        })?;
        self.sign_url(key, remaining, secure).await
    }
}

/// Rewrite the scheme according to the `secure` flag, leaving the rest of
/// the URL (signature included) untouched.
fn force_scheme(url: String, secure: bool) -> String {
    if secure {
        if let Some(rest) = url.strip_prefix("http://") {
            return format!("https://{rest}");
        }
    } else if let Some(rest) = url.strip_prefix("https://") {
        return format!("http://{rest}");
    }
    url
}

#[cfg(test)]
mod tests {
    use super::*;
    use aws_sdk_s3::config::{BehaviorVersion, Credentials, Region};

    fn offline_signer() -> Signer {
        let config = aws_sdk_s3::Config::builder()
            .behavior_version(BehaviorVersion::latest())
            .region(Region::new("us-east-1"))
            .credentials_provider(Credentials::new("AKID", "SECRET", None, None, "tests"))
            .build();
        Signer::new(Client::from_conf(config), "test-bucket")
    }

    #[tokio::test]
    async fn signed_url_carries_expiry_and_signature() {
        let url = offline_signer()
            .sign_url("testprivatefile.txt", Duration::from_secs(5), true)
            .await
            .unwrap();
        assert!(url.starts_with("https://"), "url: {url}");
        assert!(url.contains("testprivatefile.txt"), "url: {url}");
        assert!(url.contains("X-Amz-Expires=5"), "url: {url}");
        assert!(url.contains("X-Amz-Signature="), "url: {url}");
    }

    #[tokio::test]
    async fn signing_strips_leading_slash_from_key() {
        let signer = offline_signer();
        let absolute = signer
            .sign_url("/testdir/testprivatefile.txt", Duration::from_secs(5), false)
            .await
            .unwrap();
        assert!(absolute.starts_with("http://"), "url: {absolute}");
        assert!(
            absolute.contains("/testdir/testprivatefile.txt?"),
            "url: {absolute}"
        );
    }

    #[tokio::test]
    async fn absolute_expiry_in_the_past_is_rejected() {
        let err = offline_signer()
            .sign_url_at(
                "testprivatefile.txt",
                Utc::now() - chrono::Duration::seconds(30),
                false,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::InvalidExpiry(_)));
    }

    #[test]
    fn force_scheme_upgrades_and_downgrades() {
        assert_eq!(
            force_scheme("http://bucket.s3.amazonaws.com/k?X-Amz-Expires=5".into(), true),
            "https://bucket.s3.amazonaws.com/k?X-Amz-Expires=5"
        );
        assert_eq!(
            force_scheme("https://bucket.s3.amazonaws.com/k".into(), false),
            "http://bucket.s3.amazonaws.com/k"
        );
    }

    #[test]
    fn force_scheme_is_a_noop_when_already_right() {
        assert_eq!(
            force_scheme("https://h/k".into(), true),
            "https://h/k"
        );
        assert_eq!(force_scheme("http://h/k".into(), false), "http://h/k");
    }
}
