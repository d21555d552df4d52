mod account;
mod context;
mod crypto;
mod database;
mod dispatch;
mod notifications;
mod settings;
mod webserver;

use clap::Parser;
use context::AppContext;
use settings::Settings;
use std::{error::Error, path::PathBuf, sync::Arc};
use tracing::{debug, error};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Parser)]
#[command(version, about = "Forwards push notifications to users looked up by email")]
struct Cli {
    /// Settings file; defaults to `settings.toml` in the working directory
    #[arg(long)]
    settings: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_env("RUST_LOG"))
        .init();

    let cli = Cli::parse();
    let settings = match &cli.settings {
        Some(path) => Settings::load_from_path(path)?,
        None => Settings::load()?,
    };
    let context = Arc::new(AppContext::from_settings(&settings).await?);

    debug!("starting webserver");
    let result = webserver::start(&settings.webserver, context.clone()).await;
    if let Err(e) = &result {
        error!("Error occurred while running webserver: {:?}", e);
    }

    context.shutdown().await;
    result?;
    Ok(())
}
