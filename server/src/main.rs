//! Dog walking game server binary
//!
//! Wires the config, the retirement database, the snapshot file and the
//! HTTP layer together, then serves until a shutdown signal arrives and
//! writes one final snapshot.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use log::info;
use tokio::sync::Mutex;
use tokio::time::{interval, MissedTickBehavior};
use tower_http::services::ServeDir;

use server::api::{self, AppState};
use server::app::Application;
use server::config;
use server::db::{Database, DB_URL_ENV};
use server::serialization::{self, StateSaver};

/// Command line arguments
#[derive(Parser, Debug)]
#[clap(author, version, about)]
struct Args {
    /// Path to the game config JSON
    #[clap(short = 'c', long, value_name = "file")]
    config_file: PathBuf,

    /// Root directory for static files
    #[clap(short = 'w', long, value_name = "dir")]
    www_root: PathBuf,

    /// Path to the state snapshot file
    #[clap(short = 'f', long, value_name = "file")]
    state_file: Option<PathBuf>,

    /// Tick period in milliseconds; enables the auto-ticker
    #[clap(short = 't', long, value_name = "milliseconds")]
    tick_period: Option<u64>,

    /// State save period in milliseconds
    #[clap(short = 's', long, value_name = "milliseconds")]
    save_state_period: Option<u64>,

    /// Spawn dogs at random road positions
    #[clap(long)]
    randomize_spawn_dogs: bool,

    /// Address to listen on
    #[clap(long, default_value = "0.0.0.0:8080")]
    addr: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = Args::parse();

    let db_url = std::env::var(DB_URL_ENV)
        .with_context(|| format!("{DB_URL_ENV} environment variable not set"))?;

    let game = config::load_game(&args.config_file).context("failed to load game config")?;
    let db = Database::connect(&db_url)
        .await
        .context("failed to connect to the retirement database")?;

    let mut application = Application::new(game, false);
    if let Some(state_file) = &args.state_file {
        serialization::restore_state(state_file, &mut application)
            .context("failed to restore saved state")?;
        info!("state restored from {}", state_file.display());
    }
    if args.randomize_spawn_dogs {
        application.set_randomize_spawn(true);
    }
    application.set_auto_tick_enabled(args.tick_period.is_some());

    let saver = match (&args.state_file, args.save_state_period) {
        (Some(path), Some(period)) => Some(StateSaver::new(path.clone(), period)),
        _ => None,
    };

    let state = Arc::new(AppState {
        app: Mutex::new(application),
        db,
        saver: Mutex::new(saver),
    });

    if let Some(period) = args.tick_period {
        spawn_auto_ticker(Arc::clone(&state), period);
        info!("auto-tick enabled with period {} ms", period);
    }

    let router = api::router(Arc::clone(&state)).fallback_service(ServeDir::new(&args.www_root));

    let listener = tokio::net::TcpListener::bind(&args.addr)
        .await
        .with_context(|| format!("failed to bind {}", args.addr))?;
    info!("server listening on {}", args.addr);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    if let Some(state_file) = &args.state_file {
        let app = state.app.lock().await;
        serialization::save_state(state_file, &app).context("failed to save state at shutdown")?;
        info!("state saved to {}", state_file.display());
    }

    info!("server stopped");
    Ok(())
}

/// Drives the simulation at a fixed period on the shared state
fn spawn_auto_ticker(state: Arc<AppState>, period_ms: u64) {
    tokio::spawn(async move {
        let mut ticker = interval(Duration::from_millis(period_ms));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick of an interval fires immediately
        ticker.tick().await;
        loop {
            ticker.tick().await;
            api::run_tick(&state, period_ms).await;
        }
    });
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_err() {
        log::error!("failed to listen for the shutdown signal");
    }
    info!("shutdown signal received");
}
