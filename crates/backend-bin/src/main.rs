use std::sync::Arc;

use backend_lib::{config::Settings, http, storage::FlatFileStorage, AppState};
use clap::Parser;
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

/// Live Q&A moderation and delivery backend
#[derive(Parser, Debug)]
#[command(name = "eventdesk-backend", version)]
struct Args {
    /// Path to a TOML config file; defaults to config.toml/yaml/json in
    /// the working directory plus EVENTDESK_* environment variables
    #[arg(long)]
    config: Option<std::path::PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let settings = match &args.config {
        Some(path) => Settings::load_from(path)?,
        None => Settings::load()?,
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(settings.log_level.clone())),
        )
        .init();

    let storage = FlatFileStorage::new(&settings.data_dir)?;
    let state = Arc::new(AppState::new(storage, &settings).await?);
    let app = http::create_router(state);

    let listener = TcpListener::bind(settings.bind_addr).await?;
    tracing::info!(addr = %settings.bind_addr, "listening");

    axum::serve(listener, app).await?;

    Ok(())
}
