//! Result of listing one directory level of the bucket.

use serde::{Deserialize, Serialize};

/// Immediate children of a directory-like prefix.
///
/// Both collections are sorted ascending and contain bare names, not full
/// keys: listing `testsdir` with keys `testsdir/file3.txt` and
/// `testsdir/sub/file5.txt` yields `dirs = ["sub"]`, `files = ["file3.txt"]`.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct DirListing {
    /// Names of immediate subdirectories.
    pub dirs: Vec<String>,

    /// Names of files directly under the listed path.
    pub files: Vec<String>,
}
