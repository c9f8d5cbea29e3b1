//! Data models for stored objects and directory listings.
//!
//! These mirror what the remote store reports about an object; none of them
//! hold payload bytes. They serialize naturally as JSON via `serde`.

pub mod listing;
pub mod object;
