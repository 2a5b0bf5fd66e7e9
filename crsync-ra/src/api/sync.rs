//! Sync trigger and status endpoints

use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::ApiResult;
use crate::models::{ScanSummary, SyncReport};
use crate::services::recording_scanner::RecordingScanner;
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct SyncStatusResponse {
    pub running: bool,
    pub last_sync_at: Option<DateTime<Utc>>,
    pub recordings_dir: Option<String>,
    pub user_configured: bool,
    pub auto_sync: bool,
    pub summary: ScanSummary,
}

#[derive(Debug, Serialize)]
pub struct SyncRunResponse {
    #[serde(flatten)]
    pub report: SyncReport,
    pub last_sync_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize)]
pub struct ClearResponse {
    pub cleared: u64,
}

/// GET /status
///
/// Inventory statistics plus sync bookkeeping. Scans the directory to
/// compute the summary; when no directory is configured the summary is
/// simply empty rather than an error.
pub async fn sync_status(State(state): State<AppState>) -> ApiResult<Json<SyncStatusResponse>> {
    let summary = match state.config.recordings_dir.as_deref() {
        Some(dir) => {
            let snapshot = state.store.load().await;
            let scanner = RecordingScanner::new();
            match scanner.scan(dir, &snapshot.synced_keys) {
                Ok(inventory) => ScanSummary::from_inventory(&inventory),
                Err(e) => {
                    tracing::warn!(error = %e, "Status scan failed");
                    ScanSummary::default()
                }
            }
        }
        None => ScanSummary::default(),
    };

    Ok(Json(SyncStatusResponse {
        running: state.orchestrator.is_running(),
        last_sync_at: state.store.last_sync_at().await,
        recordings_dir: state
            .config
            .recordings_dir
            .as_ref()
            .map(|p| p.display().to_string()),
        user_configured: state.config.user_id.is_some(),
        auto_sync: state.config.auto_sync,
        summary,
    }))
}

/// POST /sync
///
/// One full orchestration run: scan, match, upload unsynced, commit.
/// Returns 409 while another run is in flight.
pub async fn run_sync(State(state): State<AppState>) -> ApiResult<Json<SyncRunResponse>> {
    let report = state.sync_pass().await?;

    Ok(Json(SyncRunResponse {
        report,
        last_sync_at: state.store.last_sync_at().await,
    }))
}

/// POST /sync/clear
///
/// Reset all sync records: every recording becomes unsynced again. Only
/// ever invoked by explicit user action.
pub async fn clear_sync_state(State(state): State<AppState>) -> ApiResult<Json<ClearResponse>> {
    let cleared = state.store.clear().await?;
    Ok(Json(ClearResponse { cleared }))
}

/// Build sync routes
pub fn sync_routes() -> Router<AppState> {
    Router::new()
        .route("/status", get(sync_status))
        .route("/sync", post(run_sync))
        .route("/sync/clear", post(clear_sync_state))
}
