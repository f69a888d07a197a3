mod bullhorn;
mod config;
mod dispatch;
mod errors;
mod mapping;
mod pipeline;
mod routes;
mod source;
mod state;
mod summary;

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::bullhorn::BullhornClient;
use crate::config::Config;
use crate::mapping::{MappingConfig, RowMapper};
use crate::pipeline::{BlobLocation, SyncJob};
use crate::routes::build_router;
use crate::source::{BlobConnection, BlobSource, LocalBlobSource, S3BlobSource};
use crate::state::AppState;

#[derive(Debug, Parser)]
#[command(name = "skills-sync")]
#[command(about = "Push the engineering skills survey into Bullhorn candidate records")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run one sync and exit.
    Run {
        #[command(flatten)]
        source: SourceArgs,
        /// Also print the run summary as JSON on stdout.
        #[arg(long)]
        json: bool,
    },
    /// Serve the HTTP trigger endpoint.
    Serve {
        #[command(flatten)]
        source: SourceArgs,
        #[arg(long)]
        port: Option<u16>,
    },
}

#[derive(Debug, Args)]
struct SourceArgs {
    /// Overrides BLOB_CONTAINER.
    #[arg(long)]
    container: Option<String>,
    /// Overrides BLOB_NAME.
    #[arg(long)]
    blob: Option<String>,
    /// Overrides COLUMN_MAPPING_PATH.
    #[arg(long)]
    mapping: Option<PathBuf>,
    /// Read `<dir>/<container>/<blob>` from disk instead of object storage.
    #[arg(long)]
    local_dir: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("skills_sync={}", &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting skills-sync v{}", env!("CARGO_PKG_VERSION"));

    match cli.command {
        Command::Run { source, json } => {
            let job = build_job(&config, &source).await?;
            let summary = job.run().await.context("Skills sync aborted")?;
            if summary.failed > 0 {
                warn!(
                    "{} of {} rows failed; see log for details",
                    summary.failed,
                    summary.total()
                );
            }
            if json {
                println!("{}", serde_json::to_string_pretty(&summary)?);
            }
        }
        Command::Serve { source, port } => {
            let job = build_job(&config, &source).await?;
            let app = build_router(AppState::new(job)).layer(TraceLayer::new_for_http());

            let addr: SocketAddr = format!("0.0.0.0:{}", port.unwrap_or(config.port)).parse()?;
            info!("Listening on {addr}");

            let listener = tokio::net::TcpListener::bind(addr).await?;
            axum::serve(listener, app).await?;
        }
    }

    Ok(())
}

/// Wires source, mapper and Bullhorn client from config plus CLI overrides.
async fn build_job(config: &Config, args: &SourceArgs) -> Result<SyncJob> {
    let mapping_path = args.mapping.as_ref().or(config.mapping_path.as_ref());
    let mapping = MappingConfig::resolve(mapping_path.map(PathBuf::as_path))?;
    info!(
        "Column mapping: identifier '{}', {} rules",
        mapping.identifier_column,
        mapping.rules.len()
    );

    let source: Arc<dyn BlobSource> = match &args.local_dir {
        Some(dir) => Arc::new(LocalBlobSource::new(dir)),
        None => {
            let raw = config
                .blob_connection_string
                .as_deref()
                .context("Required environment variable 'BLOB_CONNECTION_STRING' is not set")?;
            let connection = BlobConnection::parse(raw)?;
            info!("Object storage client initialized");
            Arc::new(S3BlobSource::connect(&connection).await)
        }
    };

    let bullhorn = BullhornClient::new(config.bullhorn.clone(), &config.http)
        .context("Failed to build HTTP client")?;

    Ok(SyncJob::new(
        source,
        Arc::new(bullhorn),
        RowMapper::new(mapping),
        BlobLocation {
            container: args
                .container
                .clone()
                .unwrap_or_else(|| config.blob_container.clone()),
            blob: args.blob.clone().unwrap_or_else(|| config.blob_name.clone()),
        },
    ))
}
