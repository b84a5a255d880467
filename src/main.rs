use anyhow::Context;
use clap::Parser;
use log::{error, info};
use reqwest::Client;
use std::path::PathBuf;
use std::sync::Arc;

mod cache;
mod config;
mod fetcher;
mod file_manager;
mod logger;
mod monitor;
mod mood;
mod prompt;
mod sources;
mod state;
mod subscribers;
mod web_server;

use monitor::Monitor;
use state::{AppState, Collaborators};

#[derive(Parser)]
#[command(name = "moodwall")]
#[command(version, about = "Mood wallpaper service driven by time of day and weather")]
struct Cli {
    /// Port for the HTTP and push server (overrides config.json)
    #[arg(long)]
    port: Option<u16>,

    /// Data directory (default: $APPDATA/MoodWall or ~/.config/MoodWall)
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Seconds between condition checks (overrides config.json)
    #[arg(long)]
    tick_secs: Option<u64>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let app_data_dir = file_manager::init_app_data_dir(cli.data_dir.as_deref())
        .context("failed to initialize app data directory")?;

    // Keep the handle alive or the file writer shuts down.
    let _logger = match logger::setup_logging(&app_data_dir) {
        Ok(handle) => Some(handle),
        Err(e) => {
            eprintln!("Failed to setup logging: {}", e);
            None
        }
    };
    info!("--- MoodWall {} started ---", env!("CARGO_PKG_VERSION"));
    info!("Data directory: {}", app_data_dir.display());

    let mut config = config::load_or_init(&app_data_dir).context("failed to load config")?;
    if let Some(port) = cli.port {
        config.port = port;
    }
    if let Some(secs) = cli.tick_secs {
        config.tick_interval_secs = secs;
    }
    let port = config.port;

    let client = Client::builder()
        .user_agent(concat!("moodwall/", env!("CARGO_PKG_VERSION")))
        .build()
        .context("failed to build HTTP client")?;
    let collaborators = Collaborators::from_config(&config, &client);
    let app_state = Arc::new(AppState::new(app_data_dir, config, collaborators));

    let initial = monitor::refresh_conditions(&app_state).await;
    info!(
        "Initial conditions: {} {} -> {}/{}",
        initial.location.city,
        initial.weather.weather,
        initial.fingerprint.time_mood,
        initial.fingerprint.weather_key
    );

    let monitor_handle = tokio::spawn(Monitor::new(app_state.clone()).run());

    if let Err(e) = web_server::start_server(app_state, port).await {
        error!("Web server failed: {}", e);
        monitor_handle.abort();
        return Err(e).context("web server failed");
    }
    info!("--- MoodWall shutting down ---");
    Ok(())
}
