//! Recording inventory endpoints

use axum::{extract::State, routing::get, Json, Router};
use serde::Serialize;

use crate::error::ApiResult;
use crate::models::{RecordingFile, ScanSummary};
use crate::services::recording_scanner::RecordingScanner;
use crate::services::sync_orchestrator::annotate_matches;
use crate::AppState;
use crsync_common::human::{format_duration_millis, format_file_size};

/// One recording as rendered for clients
#[derive(Debug, Serialize)]
pub struct RecordingView {
    pub file_name: String,
    pub phone_number: String,
    pub raw_phone_number: String,
    pub call_type: &'static str,
    pub date: String,
    pub time: String,
    pub timestamp: String,
    pub size: String,
    pub size_bytes: u64,
    pub duration: String,
    pub duration_millis: u64,
    pub identity_key: String,
    pub synced: bool,
    pub matched_call_log_id: Option<i64>,
}

impl From<&RecordingFile> for RecordingView {
    fn from(file: &RecordingFile) -> Self {
        Self {
            file_name: file.file_name.clone(),
            phone_number: file.display_phone_number.clone(),
            raw_phone_number: file.raw_phone_number.clone(),
            call_type: file.call_type.label(),
            date: file.display_date.clone(),
            time: file.display_time.clone(),
            timestamp: file.captured_at_raw.clone(),
            size: format_file_size(file.size_bytes),
            size_bytes: file.size_bytes,
            duration: format_duration_millis(file.duration_millis),
            duration_millis: file.duration_millis,
            identity_key: file.identity_key.clone(),
            synced: file.synced,
            matched_call_log_id: file.matched_call_log_id,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct RecordingListResponse {
    pub summary: ScanSummary,
    pub recordings: Vec<RecordingView>,
}

/// GET /recordings
///
/// Fresh scan of the configured directory. Matching annotation is
/// best-effort: when the candidate fetch fails the listing simply comes
/// back without links.
pub async fn list_recordings(
    State(state): State<AppState>,
) -> ApiResult<Json<RecordingListResponse>> {
    let dir = state.recordings_dir()?;
    let snapshot = state.store.load().await;

    let scanner = RecordingScanner::new();
    let mut inventory = scanner.scan(&dir, &snapshot.synced_keys)?;

    match state.fetcher.fetch_call_logs().await {
        Ok(candidates) => annotate_matches(&mut inventory, &candidates),
        Err(e) => {
            tracing::debug!(error = %e, "Candidate fetch skipped, listing without links");
        }
    }

    Ok(Json(RecordingListResponse {
        summary: ScanSummary::from_inventory(&inventory),
        recordings: inventory.iter().map(RecordingView::from).collect(),
    }))
}

/// Build recording routes
pub fn recording_routes() -> Router<AppState> {
    Router::new().route("/recordings", get(list_recordings))
}
