//! crsync-ra - Call Recording Sync Agent
//!
//! Scans a device directory of call recordings, reconciles them against
//! remote call logs, and uploads anything not yet synced. The agent itself
//! owns the triggers (HTTP endpoints and an optional interval scheduler);
//! the reconciliation core underneath is trigger-agnostic.

use anyhow::Result;
use clap::Parser;
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use crsync_ra::config::AgentConfig;
use crsync_ra::AppState;

#[derive(Debug, Parser)]
#[command(name = "crsync-ra", about = "Call recording sync agent")]
struct Args {
    /// Agent root folder (database and config location)
    #[arg(long)]
    root_folder: Option<String>,

    /// HTTP listen port (overrides config)
    #[arg(long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let args = Args::parse();

    info!("Starting crsync-ra (Call Recording Sync Agent)");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    // Step 1: Resolve root folder (CLI → env → TOML → OS default)
    let root_folder =
        crsync_common::config::resolve_root_folder(args.root_folder.as_deref(), "CRSYNC_ROOT_FOLDER");
    info!("Root folder: {}", root_folder.display());

    // Step 2: Create root folder if missing, open or create database
    let db_path = crsync_common::config::ensure_root_folder(&root_folder)?;
    info!("Database: {}", db_path.display());

    let db_pool = crsync_ra::db::init_database_pool(&db_path).await?;
    info!("Database connection established");

    // Step 3: Agent configuration (TOML + env overrides)
    let mut config = AgentConfig::load(&root_folder);
    if let Some(port) = args.port {
        config.port = port;
    }
    match &config.recordings_dir {
        Some(dir) => info!("Recordings directory: {}", dir.display()),
        None => warn!("No recordings directory configured; scans will be rejected"),
    }

    let state = AppState::new(db_pool, config.clone())?;

    // Step 4: Host-owned scheduler. The core never polls on its own; this
    // task is the only place a timer exists.
    if config.auto_sync {
        let interval_secs = config.auto_sync_interval_secs.max(1);
        info!(interval_secs, "Auto-sync enabled");
        let auto_state = state.clone();
        tokio::spawn(async move {
            let mut interval =
                tokio::time::interval(std::time::Duration::from_secs(interval_secs));
            // The first tick fires immediately; skip it so startup stays quiet
            interval.tick().await;
            loop {
                interval.tick().await;
                match auto_state.sync_pass().await {
                    Ok(report) => info!(
                        succeeded = report.succeeded,
                        failed = report.failed,
                        matched = report.matched,
                        "Auto-sync pass complete"
                    ),
                    Err(e) => warn!(error = %e, "Auto-sync pass skipped"),
                }
            }
        });
    }

    // Start server
    let app = crsync_ra::build_router(state);
    let listener = tokio::net::TcpListener::bind(("127.0.0.1", config.port)).await?;
    info!("Listening on http://127.0.0.1:{}", config.port);
    info!("Health check: http://127.0.0.1:{}/health", config.port);

    axum::serve(listener, app).await?;

    Ok(())
}
