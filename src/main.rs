use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use s3_media_store::tags::TagRenderer;
use s3_media_store::{ConfigArgs, MediaUrls, S3Storage, Storage, StorageConfig};
use std::collections::HashMap;
use std::io::Write;
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about = "S3-backed media storage CLI")]
struct Cli {
    #[command(flatten)]
    config: ConfigArgs,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Upload a local file under the given key
    Put { key: String, file: PathBuf },
    /// Download an object to a file, or stdout when no file is given
    Get { key: String, output: Option<PathBuf> },
    /// Delete an object
    Rm { key: String },
    /// List one directory level (defaults to the bucket root)
    Ls { path: Option<String> },
    /// Check whether an object exists
    Exists { key: String },
    /// Print the public media URL of an object
    Url { key: String },
    /// Print a time-limited signed URL for a private object
    Sign {
        key: String,
        /// Validity window in seconds
        #[arg(long, default_value_t = 60)]
        expires: u64,
        /// Force an https URL
        #[arg(long)]
        secure: bool,
    },
    /// Render an `s3_media_url` / `s3_static_url` directive
    Tag {
        /// Tag contents, e.g. `s3_media_url "test/file.txt"`
        contents: String,
        /// Context variables as name=value pairs
        #[arg(long = "var")]
        vars: Vec<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let cfg = StorageConfig::from_env_and_args(&cli.config)?;
    tracing::debug!("using bucket {} in {}", cfg.bucket, cfg.region);

    let storage = S3Storage::connect(&cfg).await?;

    match cli.command {
        Command::Put { key, file } => {
            let content = tokio::fs::read(&file).await?;
            let info = storage.save(&key, content.into()).await?;
            println!("{} ({} bytes)", info.key, info.size_bytes);
        }
        Command::Get { key, output } => {
            let file = storage.open(&key).await?;
            match output {
                Some(path) => tokio::fs::write(&path, file.bytes()).await?,
                None => std::io::stdout().write_all(file.as_ref())?,
            }
        }
        Command::Rm { key } => {
            storage.delete(&key).await?;
        }
        Command::Ls { path } => {
            let listing = storage.listdir(path.as_deref().unwrap_or("")).await?;
            for dir in &listing.dirs {
                println!("{dir}/");
            }
            for file in &listing.files {
                println!("{file}");
            }
        }
        Command::Exists { key } => {
            println!("{}", storage.exists(&key).await?);
        }
        Command::Url { key } => {
            println!("{}", storage.url(&key)?);
        }
        Command::Sign {
            key,
            expires,
            secure,
        } => {
            let signer = storage.signer();
            let url = signer
                .sign_url(&key, Duration::from_secs(expires), secure)
                .await?;
            println!("{url}");
        }
        Command::Tag { contents, vars } => {
            let mut renderer = TagRenderer::new(MediaUrls::new(cfg.media_url.clone())?);
            if let Some(static_url) = &cfg.static_url {
                renderer = renderer.with_static(MediaUrls::new(static_url.clone())?);
            }
            let mut context = HashMap::new();
            for pair in &vars {
                let (name, value) = pair
                    .split_once('=')
                    .with_context(|| format!("--var `{pair}` is not name=value"))?;
                context.insert(name.to_string(), value.to_string());
            }
            println!("{}", renderer.render_str(&contents, &mut context)?);
        }
    }

    Ok(())
}
