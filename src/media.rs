//! Media URL resolution.
//!
//! `MediaUrls` holds the public base URL objects are served from (plus
//! optional per-path overrides, e.g. separate CDN hosts) and resolves a
//! storage key to an absolute URL. Paths are percent-encoded consistently:
//! an already-encoded input and the equivalent raw unicode input resolve to
//! the same URL.

use crate::errors::{StorageError, StorageResult};
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, percent_decode_str, utf8_percent_encode};
use regex::Regex;
use url::Url;

/// Everything except unreserved characters and `/` gets percent-encoded.
const PATH_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~')
    .remove(b'/');

/// Percent-encode a URL path, decoding it first so the operation is
/// idempotent: `test/fil%C3%A9.txt` and `test/filé.txt` encode identically.
pub fn encode_path(path: &str) -> String {
    let decoded = percent_decode_str(path).decode_utf8_lossy().into_owned();
    utf8_percent_encode(&decoded, PATH_ENCODE_SET).to_string()
}

/// Base URLs for serving media, with optional pattern overrides.
///
/// The default base is used for every path unless an override pattern
/// matches. An explicit https base can be configured for hosts whose TLS
/// name differs from the plain one; otherwise `http://` is swapped for
/// `https://` when a secure URL is requested.
#[derive(Debug, Clone)]
pub struct MediaUrls {
    base: String,
    patterns: Vec<(Regex, String)>,
    https: Option<String>,
}

impl MediaUrls {
    /// Create a resolver from the default base URL.
    ///
    /// The base must be an absolute URL; relative bases cannot anchor
    /// `join` resolution.
    pub fn new(base: impl Into<String>) -> StorageResult<Self> {
        let base = base.into();
        Url::parse(&base).map_err(|err| StorageError::InvalidMediaUrl {
            url: base.clone(),
            reason: err.to_string(),
        })?;
        Ok(Self {
            base,
            patterns: Vec::new(),
            https: None,
        })
    }

    /// Add a per-path override: paths matching `pattern` (anchored at the
    /// start) are served from `base` instead of the default.
    pub fn with_pattern(mut self, pattern: &str, base: impl Into<String>) -> StorageResult<Self> {
        let re = Regex::new(pattern).map_err(|err| StorageError::InvalidMediaUrl {
            url: pattern.to_string(),
            reason: err.to_string(),
        })?;
        self.patterns.push((re, base.into()));
        Ok(self)
    }

    /// Set an explicit base for https URLs.
    pub fn with_https(mut self, base: impl Into<String>) -> Self {
        self.https = Some(base.into());
        self
    }

    /// The base serving `path`: the first matching override, else the
    /// default.
    fn base_for(&self, path: &str) -> &str {
        for (re, base) in &self.patterns {
            if let Some(m) = re.find(path) {
                if m.start() == 0 {
                    return base;
                }
            }
        }
        &self.base
    }

    /// The https counterpart of the default base.
    fn https_base(&self) -> String {
        match &self.https {
            Some(base) => base.clone(),
            None => self.base.replacen("http://", "https://", 1),
        }
    }

    /// Resolve `path` against the appropriate base, normalizing the
    /// percent-encoding of the path component.
    pub fn url(&self, path: &str) -> StorageResult<String> {
        let base = self.base_for(path).replacen("https://", "http://", 1);
        resolve(&base, path)
    }

    /// Resolve `path` against the https base.
    pub fn https_url(&self, path: &str) -> StorageResult<String> {
        resolve(&self.https_base(), path)
    }

    /// Resolve with an explicit scheme choice.
    pub fn url_secure(&self, path: &str, secure: bool) -> StorageResult<String> {
        if secure {
            self.https_url(path)
        } else {
            self.url(path)
        }
    }
}

/// `join(base, path)` with the path component re-encoded through
/// [`encode_path`]. Query and fragment of the joined URL are preserved.
fn resolve(base: &str, path: &str) -> StorageResult<String> {
    let invalid = |reason: String| StorageError::InvalidMediaUrl {
        url: base.to_string(),
        reason,
    };
    let base_url = Url::parse(base).map_err(|err| invalid(err.to_string()))?;
    let joined = base_url.join(path).map_err(|err| invalid(err.to_string()))?;

    let mut out = format!(
        "{}://{}{}",
        joined.scheme(),
        joined.authority(),
        encode_path(joined.path())
    );
    if let Some(query) = joined.query() {
        out.push('?');
        out.push_str(query);
    }
    if let Some(fragment) = joined.fragment() {
        out.push('#');
        out.push_str(fragment);
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    const BASE: &str = "http://media.example.com/media/";

    #[test]
    fn encode_path_leaves_slashes_and_unreserved() {
        assert_eq!(encode_path("test/file.txt"), "test/file.txt");
        assert_eq!(encode_path("a-b_c~d.e/f"), "a-b_c~d.e/f");
    }

    #[test]
    fn encode_path_quotes_spaces_and_unicode() {
        assert_eq!(encode_path("test/file quote.txt"), "test/file%20quote.txt");
        assert_eq!(encode_path("test/filé.txt"), "test/fil%C3%A9.txt");
    }

    #[test]
    fn encode_path_is_idempotent() {
        assert_eq!(encode_path("test/file%20quote.txt"), "test/file%20quote.txt");
        assert_eq!(encode_path("test/fil%C3%A9.txt"), "test/fil%C3%A9.txt");
        assert_eq!(encode_path(&encode_path("test/filé.txt")), "test/fil%C3%A9.txt");
    }

    #[test]
    fn url_joins_relative_paths() {
        let urls = MediaUrls::new(BASE).unwrap();
        assert_eq!(
            urls.url("test/file.txt").unwrap(),
            "http://media.example.com/media/test/file.txt"
        );
    }

    #[test]
    fn url_with_absolute_path_resets_to_root() {
        let urls = MediaUrls::new(BASE).unwrap();
        assert_eq!(
            urls.url("/other/file.txt").unwrap(),
            "http://media.example.com/other/file.txt"
        );
    }

    #[test]
    fn url_encodes_raw_and_preencoded_identically() {
        let urls = MediaUrls::new(BASE).unwrap();
        let expected = "http://media.example.com/media/test/fil%C3%A9.txt";
        assert_eq!(urls.url("test/filé.txt").unwrap(), expected);
        assert_eq!(urls.url("test/fil%C3%A9.txt").unwrap(), expected);
        assert_eq!(
            urls.url("test/file quote.txt").unwrap(),
            "http://media.example.com/media/test/file%20quote.txt"
        );
        assert_eq!(
            urls.url("test/file%20quote.txt").unwrap(),
            "http://media.example.com/media/test/file%20quote.txt"
        );
    }

    #[test]
    fn https_url_swaps_scheme() {
        let urls = MediaUrls::new(BASE).unwrap();
        assert_eq!(
            urls.https_url("a.txt").unwrap(),
            "https://media.example.com/media/a.txt"
        );
    }

    #[test]
    fn https_url_prefers_explicit_base() {
        let urls = MediaUrls::new(BASE)
            .unwrap()
            .with_https("https://secure.example.com/media/");
        assert_eq!(
            urls.https_url("a.txt").unwrap(),
            "https://secure.example.com/media/a.txt"
        );
    }

    #[test]
    fn pattern_override_routes_matching_paths() {
        let urls = MediaUrls::new(BASE)
            .unwrap()
            .with_pattern("images/", "http://img.example.com/")
            .unwrap();
        assert_eq!(
            urls.url("images/logo.png").unwrap(),
            "http://img.example.com/images/logo.png"
        );
        assert_eq!(
            urls.url("docs/readme.txt").unwrap(),
            "http://media.example.com/media/docs/readme.txt"
        );
    }

    #[test]
    fn pattern_must_match_at_start() {
        let urls = MediaUrls::new(BASE)
            .unwrap()
            .with_pattern("images/", "http://img.example.com/")
            .unwrap();
        assert_eq!(
            urls.url("thumbs/images/logo.png").unwrap(),
            "http://media.example.com/media/thumbs/images/logo.png"
        );
    }

    #[test]
    fn plain_url_downgrades_https_override_base() {
        let urls = MediaUrls::new(BASE)
            .unwrap()
            .with_pattern("images/", "https://img.example.com/")
            .unwrap();
        assert_eq!(
            urls.url("images/logo.png").unwrap(),
            "http://img.example.com/images/logo.png"
        );
    }

    #[test]
    fn rejects_relative_base() {
        assert!(MediaUrls::new("/media/").is_err());
    }
}
