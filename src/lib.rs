//! S3-backed media storage.
//!
//! - [`Storage`]: the file-storage contract (save, open, delete, exists,
//!   size, modified, url, listdir), implemented for S3 by [`S3Storage`].
//! - [`Signer`]: time-limited presigned GET URLs for private objects.
//! - [`MediaUrls`] and [`tags`]: public media-URL resolution and the
//!   `s3_media_url` template directive.

pub mod config;
pub mod errors;
pub mod media;
pub mod models;
pub mod services;
pub mod tags;

pub use config::{ConfigArgs, StorageConfig};
pub use errors::{StorageError, StorageResult};
pub use media::MediaUrls;
pub use models::listing::DirListing;
pub use models::object::{ObjectInfo, StoredFile};
pub use services::backend::Storage;
pub use services::signer::Signer;
pub use services::storage_service::S3Storage;
