//! Sync orchestration
//!
//! Drives one complete pass of fetch-candidates → upload-unsynced →
//! commit-state. Everything below this module absorbs its own failures;
//! the orchestrator is the only component that reports an aggregate
//! outcome upward.
//!
//! State machine per invocation:
//! Idle → Fetching → Uploading (batched) → Committing → Idle.
//! A run that is already in flight rejects new requests rather than
//! queueing them.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use futures::future::join_all;
use thiserror::Error;

use crate::db::sync_state::SyncStateStore;
use crate::models::{RecordingFile, SyncReport};
use crate::services::call_log_matcher::find_match;
use crate::services::remote_client::{
    CallLogFetcher, CallLogRecord, RecordingUploader, UploadRequest, UploadResponse,
};

/// Default bound on concurrent uploads within one batch
pub const DEFAULT_BATCH_SIZE: usize = 10;

/// Orchestrator errors. Everything here aborts the run before or at the
/// commit boundary; per-file upload failures are counted, not raised.
#[derive(Debug, Error)]
pub enum SyncError {
    /// A run is already in flight; concurrent requests are rejected
    #[error("Sync already running")]
    Busy,

    /// No user identity configured; nothing can be attributed remotely
    #[error("No user identity configured")]
    MissingIdentity,

    /// Committing the accumulated sync state failed
    #[error("Sync state commit failed: {0}")]
    Commit(#[from] crsync_common::Error),
}

/// Orchestrator configuration, passed in explicitly by the host
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Remote subject the uploads belong to; a run without one aborts
    pub user_id: Option<i64>,
    /// Uploads fanned out concurrently per batch
    pub batch_size: usize,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            user_id: None,
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }
}

pub struct SyncOrchestrator {
    store: SyncStateStore,
    fetcher: Arc<dyn CallLogFetcher>,
    uploader: Arc<dyn RecordingUploader>,
    config: SyncConfig,
    running: AtomicBool,
}

impl SyncOrchestrator {
    pub fn new(
        store: SyncStateStore,
        fetcher: Arc<dyn CallLogFetcher>,
        uploader: Arc<dyn RecordingUploader>,
        config: SyncConfig,
    ) -> Self {
        Self {
            store,
            fetcher,
            uploader,
            config,
            running: AtomicBool::new(false),
        }
    }

    /// Whether a run is currently in flight
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Upload every unsynced file in the inventory, in bounded batches.
    ///
    /// On success each file's `synced`/`matched_call_log_id` flags are
    /// updated in place and its identity key accumulated; the store is
    /// committed once at the end of the run. Failed uploads stay out of
    /// the accumulator and are eligible again on the next run.
    pub async fn sync_unsynced(
        &self,
        inventory: &mut [RecordingFile],
    ) -> Result<SyncReport, SyncError> {
        let user_id = self.config.user_id.ok_or(SyncError::MissingIdentity)?;

        if self.running.swap(true, Ordering::SeqCst) {
            return Err(SyncError::Busy);
        }

        let result = self.run(user_id, inventory).await;
        self.running.store(false, Ordering::SeqCst);
        result
    }

    async fn run(
        &self,
        user_id: i64,
        inventory: &mut [RecordingFile],
    ) -> Result<SyncReport, SyncError> {
        let run_id = uuid::Uuid::new_v4();

        // Fetching: one candidate pull per run. Fetch failure degrades to
        // an empty set; sync still happens, just unlinked.
        let candidates = match self.fetcher.fetch_call_logs().await {
            Ok(candidates) => candidates,
            Err(e) => {
                tracing::warn!(error = %e, "Call log fetch failed, syncing without matching");
                Vec::new()
            }
        };

        let unsynced: Vec<usize> = inventory
            .iter()
            .enumerate()
            .filter(|(_, f)| !f.synced)
            .map(|(i, _)| i)
            .collect();

        let mut report = SyncReport {
            attempted: unsynced.len(),
            ..Default::default()
        };
        let mut accumulator: HashSet<String> = HashSet::new();

        tracing::info!(
            run_id = %run_id,
            unsynced = unsynced.len(),
            candidates = candidates.len(),
            batch_size = self.config.batch_size,
            "Starting sync run"
        );

        // Uploading: bounded fan-out, full join before the next batch
        for batch in unsynced.chunks(self.config.batch_size.max(1)) {
            let uploads = batch.iter().map(|&idx| {
                let file = inventory[idx].clone();
                let match_hint = find_match(&file, &candidates).map(|c| c.id);
                async move {
                    let outcome = self.upload_one(user_id, &file, match_hint).await;
                    (idx, match_hint, outcome)
                }
            });

            for (idx, match_hint, outcome) in join_all(uploads).await {
                let file = &mut inventory[idx];
                match outcome {
                    Ok(response) if response.success => {
                        report.succeeded += 1;
                        if response.matched {
                            report.matched += 1;
                        }
                        file.synced = true;
                        file.matched_call_log_id = response.call_log_id.or(match_hint);
                        accumulator.insert(file.identity_key.clone());
                    }
                    Ok(response) => {
                        report.failed += 1;
                        tracing::warn!(
                            file = %file.file_name,
                            message = response.message.as_deref().unwrap_or("upload rejected"),
                            "Upload failed"
                        );
                    }
                    Err(e) => {
                        report.failed += 1;
                        tracing::warn!(file = %file.file_name, error = %e, "Upload failed");
                    }
                }
            }
        }

        // Committing: one store union per run, then the run timestamp
        self.store.mark_synced(&accumulator).await?;
        self.store.set_last_sync_at(crsync_common::time::now()).await?;

        tracing::info!(
            run_id = %run_id,
            succeeded = report.succeeded,
            failed = report.failed,
            matched = report.matched,
            "Sync run complete"
        );

        Ok(report)
    }

    /// Read, encode and upload one recording. Any failure (file read,
    /// transport, rejection) is returned to the batch loop for counting.
    async fn upload_one(
        &self,
        user_id: i64,
        file: &RecordingFile,
        match_hint: Option<i64>,
    ) -> crsync_common::Result<UploadResponse> {
        let bytes = tokio::fs::read(&file.path).await?;
        let file_data = BASE64.encode(&bytes);

        let request = UploadRequest {
            phone_number: file.display_phone_number.clone(),
            raw_phone_number: file.raw_phone_number.clone(),
            timestamp: file.captured_at_raw.clone(),
            date: file.display_date.clone(),
            time: file.display_time.clone(),
            call_type: file.call_type.label().to_string(),
            file_name: file.file_name.clone(),
            file_size: file.size_bytes,
            duration: crsync_common::human::format_duration_millis(file.duration_millis),
            file_data,
            file_identifier: file.identity_key.clone(),
            user_id,
            matched_call_log_id: match_hint,
        };

        self.uploader.upload(&request).await
    }
}

/// Best-effort matching pass over an inventory, used by the listing
/// surface to show candidate links without uploading anything.
pub fn annotate_matches(inventory: &mut [RecordingFile], candidates: &[CallLogRecord]) {
    for file in inventory.iter_mut() {
        if file.matched_call_log_id.is_none() {
            file.matched_call_log_id = find_match(file, candidates).map(|c| c.id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use sqlx::SqlitePool;
    use std::path::PathBuf;

    struct EmptyFetcher;

    #[async_trait]
    impl CallLogFetcher for EmptyFetcher {
        async fn fetch_call_logs(&self) -> crsync_common::Result<Vec<CallLogRecord>> {
            Ok(Vec::new())
        }
    }

    struct NeverUploader;

    #[async_trait]
    impl RecordingUploader for NeverUploader {
        async fn upload(&self, _request: &UploadRequest) -> crsync_common::Result<UploadResponse> {
            panic!("uploader must not be called");
        }
    }

    async fn test_store() -> SyncStateStore {
        let pool = SqlitePool::connect(":memory:").await.unwrap();
        crate::db::init_tables(&pool).await.unwrap();
        SyncStateStore::new(pool)
    }

    #[tokio::test]
    async fn test_missing_identity_aborts_before_any_work() {
        let orchestrator = SyncOrchestrator::new(
            test_store().await,
            Arc::new(EmptyFetcher),
            Arc::new(NeverUploader),
            SyncConfig {
                user_id: None,
                batch_size: DEFAULT_BATCH_SIZE,
            },
        );

        let mut inventory = Vec::new();
        let result = orchestrator.sync_unsynced(&mut inventory).await;
        assert!(matches!(result, Err(SyncError::MissingIdentity)));
        assert!(!orchestrator.is_running());
    }

    #[tokio::test]
    async fn test_empty_inventory_commits_last_sync_only() {
        let store = test_store().await;
        let orchestrator = SyncOrchestrator::new(
            store.clone(),
            Arc::new(EmptyFetcher),
            Arc::new(NeverUploader),
            SyncConfig {
                user_id: Some(1),
                batch_size: DEFAULT_BATCH_SIZE,
            },
        );

        let mut inventory = Vec::new();
        let report = orchestrator.sync_unsynced(&mut inventory).await.unwrap();
        assert_eq!(report.attempted, 0);
        assert_eq!(report.succeeded, 0);
        assert!(store.load().await.synced_keys.is_empty());
        assert!(store.last_sync_at().await.is_some());
    }

    #[tokio::test]
    async fn test_already_synced_files_are_not_offered() {
        let store = test_store().await;
        let orchestrator = SyncOrchestrator::new(
            store,
            Arc::new(EmptyFetcher),
            Arc::new(NeverUploader),
            SyncConfig {
                user_id: Some(1),
                batch_size: DEFAULT_BATCH_SIZE,
            },
        );

        // One file, already synced: the uploader must never fire
        let mut inventory = vec![RecordingFile {
            file_name: "a.mp3".to_string(),
            path: PathBuf::from("/nonexistent/a.mp3"),
            raw_phone_number: "9812345678".to_string(),
            display_phone_number: "98123 45678".to_string(),
            display_date: "Unknown Date".to_string(),
            display_time: "Unknown Time".to_string(),
            call_type: crate::models::CallType::RecordedCall,
            captured_at: None,
            captured_at_raw: String::new(),
            size_bytes: 10,
            duration_millis: 0,
            identity_key: "a.mp3_10_".to_string(),
            synced: true,
            matched_call_log_id: None,
        }];

        let report = orchestrator.sync_unsynced(&mut inventory).await.unwrap();
        assert_eq!(report.attempted, 0);
    }
}
