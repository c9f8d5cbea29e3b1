//! Storage contract and its S3-backed implementation, plus URL signing.

pub mod backend;
pub mod signer;
pub mod storage_service;
