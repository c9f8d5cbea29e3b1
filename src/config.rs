use anyhow::{Context, Result};
use std::env;

/// Centralized storage configuration.
/// Combines environment variables and CLI arguments.
#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub bucket: String,
    pub region: String,
    pub endpoint: Option<String>,
    pub access_key_id: Option<String>,
    pub secret_access_key: Option<String>,
    pub media_url: String,
    pub static_url: Option<String>,
    pub force_path_style: bool,
}

/// CLI overrides for the environment-driven configuration.
#[derive(clap::Args, Debug, Default)]
pub struct ConfigArgs {
    /// Bucket to operate on (overrides AWS_STORAGE_BUCKET_NAME)
    #[arg(long)]
    pub bucket: Option<String>,

    /// AWS region (overrides AWS_REGION)
    #[arg(long)]
    pub region: Option<String>,

    /// Custom S3 endpoint, e.g. a MinIO URL (overrides AWS_S3_ENDPOINT)
    #[arg(long)]
    pub endpoint: Option<String>,

    /// Public base URL for media (overrides MEDIA_URL)
    #[arg(long)]
    pub media_url: Option<String>,

    /// Public base URL for static files (overrides STATIC_URL)
    #[arg(long)]
    pub static_url: Option<String>,

    /// Use path-style addressing (required by MinIO and most S3 clones)
    #[arg(long)]
    pub force_path_style: bool,
}

impl StorageConfig {
    /// Merge environment variables with CLI overrides.
    ///
    /// Credentials are only read from the environment; when absent, the SDK's
    /// default provider chain is used instead.
    pub fn from_env_and_args(args: &ConfigArgs) -> Result<Self> {
        let env_bucket = env::var("AWS_STORAGE_BUCKET_NAME").ok();
        let env_region = env::var("AWS_REGION").unwrap_or_else(|_| "us-east-1".into());
        let env_endpoint = env::var("AWS_S3_ENDPOINT").ok();
        let env_media = env::var("MEDIA_URL").ok();
        let env_static = env::var("STATIC_URL").ok();
        let env_path_style = env::var("AWS_S3_FORCE_PATH_STYLE")
            .map(|value| matches!(value.as_str(), "1" | "true" | "yes"))
            .unwrap_or(false);

        let bucket = args
            .bucket
            .clone()
            .or(env_bucket)
            .context("AWS_STORAGE_BUCKET_NAME is not set and --bucket was not given")?;
        let media_url = args
            .media_url
            .clone()
            .or(env_media)
            .context("MEDIA_URL is not set and --media-url was not given")?;

        Ok(Self {
            bucket,
            region: args.region.clone().unwrap_or(env_region),
            endpoint: args.endpoint.clone().or(env_endpoint),
            access_key_id: env::var("AWS_ACCESS_KEY_ID").ok(),
            secret_access_key: env::var("AWS_SECRET_ACCESS_KEY").ok(),
            media_url,
            static_url: args.static_url.clone().or(env_static),
            force_path_style: args.force_path_style || env_path_style,
        })
    }
}
