//! crsync-ra library interface
//!
//! Exposes the reconciliation core and the HTTP surface for integration
//! testing. The binary in `main.rs` wires configuration, the database and
//! the scheduler around this.

pub mod api;
pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod services;

pub use crate::error::{ApiError, ApiResult};

use axum::Router;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use std::sync::Arc;

use crate::config::AgentConfig;
use crate::db::sync_state::SyncStateStore;
use crate::models::SyncReport;
use crate::services::recording_scanner::RecordingScanner;
use crate::services::remote_client::{CallLogFetcher, RemoteClient};
use crate::services::sync_orchestrator::{SyncConfig, SyncOrchestrator};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub db: SqlitePool,
    pub config: AgentConfig,
    pub store: SyncStateStore,
    /// Candidate fetcher, shared with the orchestrator; the listing
    /// surface uses it for best-effort match annotation
    pub fetcher: Arc<dyn CallLogFetcher>,
    pub orchestrator: Arc<SyncOrchestrator>,
    /// Service startup timestamp for uptime tracking
    pub startup_time: DateTime<Utc>,
}

impl AppState {
    pub fn new(db: SqlitePool, config: AgentConfig) -> anyhow::Result<Self> {
        let store = SyncStateStore::new(db.clone());
        let remote = Arc::new(RemoteClient::new(&config.api_base_url, config.user_id)?);

        let orchestrator = Arc::new(SyncOrchestrator::new(
            store.clone(),
            remote.clone(),
            remote.clone(),
            SyncConfig {
                user_id: config.user_id,
                batch_size: config.batch_size,
            },
        ));

        Ok(Self {
            db,
            config,
            store,
            fetcher: remote,
            orchestrator,
            startup_time: Utc::now(),
        })
    }

    /// Resolve the configured recordings directory or reject the request
    pub fn recordings_dir(&self) -> ApiResult<std::path::PathBuf> {
        self.config
            .recordings_dir
            .clone()
            .ok_or_else(|| ApiError::BadRequest("No recordings directory configured".to_string()))
    }

    /// One complete scan + sync pass, shared by the HTTP trigger and the
    /// auto-sync scheduler.
    pub async fn sync_pass(&self) -> ApiResult<SyncReport> {
        let dir = self.recordings_dir()?;
        let snapshot = self.store.load().await;

        let scanner = RecordingScanner::new();
        let mut inventory = scanner.scan(&dir, &snapshot.synced_keys)?;

        Ok(self.orchestrator.sync_unsynced(&mut inventory).await?)
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(api::health_routes())
        .merge(api::recording_routes())
        .merge(api::sync_routes())
        .with_state(state)
}
