//! End-to-end tests for the scan → match → upload → commit pipeline,
//! using mock remote collaborators in place of the admin API.

use async_trait::async_trait;
use sqlx::SqlitePool;
use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use crsync_ra::db::sync_state::SyncStateStore;
use crsync_ra::services::recording_scanner::RecordingScanner;
use crsync_ra::services::remote_client::{
    CallLogFetcher, CallLogRecord, RecordingUploader, UploadRequest, UploadResponse,
};
use crsync_ra::services::sync_orchestrator::{SyncConfig, SyncError, SyncOrchestrator};

// ============================================================================
// Mock remote collaborators
// ============================================================================

struct StaticFetcher(Vec<CallLogRecord>);

#[async_trait]
impl CallLogFetcher for StaticFetcher {
    async fn fetch_call_logs(&self) -> crsync_common::Result<Vec<CallLogRecord>> {
        Ok(self.0.clone())
    }
}

struct FailingFetcher;

#[async_trait]
impl CallLogFetcher for FailingFetcher {
    async fn fetch_call_logs(&self) -> crsync_common::Result<Vec<CallLogRecord>> {
        Err(crsync_common::Error::Remote("connection refused".to_string()))
    }
}

/// Records every upload request; fails uploads whose filename is listed.
struct MockUploader {
    fail_names: HashSet<String>,
    calls: Mutex<Vec<UploadRequest>>,
}

impl MockUploader {
    fn new(fail_names: &[&str]) -> Self {
        Self {
            fail_names: fail_names.iter().map(|n| n.to_string()).collect(),
            calls: Mutex::new(Vec::new()),
        }
    }

    fn uploaded_names(&self) -> Vec<String> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .map(|r| r.file_name.clone())
            .collect()
    }
}

#[async_trait]
impl RecordingUploader for MockUploader {
    async fn upload(&self, request: &UploadRequest) -> crsync_common::Result<UploadResponse> {
        self.calls.lock().unwrap().push(request.clone());

        if self.fail_names.contains(&request.file_name) {
            return Err(crsync_common::Error::Remote("upload failed".to_string()));
        }

        // Echo the client-side match hint the way the server confirms links
        Ok(UploadResponse {
            success: true,
            matched: request.matched_call_log_id.is_some(),
            call_log_id: request.matched_call_log_id,
            message: None,
        })
    }
}

/// Uploader that holds every request until released, for concurrency tests
struct SlowUploader;

#[async_trait]
impl RecordingUploader for SlowUploader {
    async fn upload(&self, _request: &UploadRequest) -> crsync_common::Result<UploadResponse> {
        tokio::time::sleep(std::time::Duration::from_millis(300)).await;
        Ok(UploadResponse {
            success: true,
            matched: false,
            call_log_id: None,
            message: None,
        })
    }
}

// ============================================================================
// Helpers
// ============================================================================

async fn test_store() -> SyncStateStore {
    let pool = SqlitePool::connect(":memory:").await.unwrap();
    crsync_ra::db::init_tables(&pool).await.unwrap();
    SyncStateStore::new(pool)
}

/// Write `count` recording files with valid parseable names into `dir`
fn write_recordings(dir: &std::path::Path, count: usize) -> Vec<String> {
    let mut names = Vec::new();
    for i in 0..count {
        let name = format!("98123456{:02}~_202401151430{:02}_incoming.mp3", i, i);
        std::fs::write(dir.join(&name), format!("audio-{}", i)).unwrap();
        names.push(name);
    }
    names
}

fn orchestrator(
    store: SyncStateStore,
    fetcher: Arc<dyn CallLogFetcher>,
    uploader: Arc<dyn RecordingUploader>,
) -> SyncOrchestrator {
    SyncOrchestrator::new(
        store,
        fetcher,
        uploader,
        SyncConfig {
            user_id: Some(7),
            batch_size: 10,
        },
    )
}

// ============================================================================
// Tests
// ============================================================================

#[tokio::test]
async fn batch_failure_isolation() {
    let tmp = tempfile::tempdir().unwrap();
    let names = write_recordings(tmp.path(), 10);

    let store = test_store().await;
    let scanner = RecordingScanner::new();
    let mut inventory = scanner.scan(tmp.path(), &HashSet::new()).unwrap();
    assert_eq!(inventory.len(), 10);

    // Uploads for three of the ten files fail
    let uploader = Arc::new(MockUploader::new(&[
        names[2].as_str(),
        names[5].as_str(),
        names[9].as_str(),
    ]));
    let orchestrator = orchestrator(
        store.clone(),
        Arc::new(StaticFetcher(Vec::new())),
        uploader.clone(),
    );

    let report = orchestrator.sync_unsynced(&mut inventory).await.unwrap();
    assert_eq!(report.attempted, 10);
    assert_eq!(report.succeeded, 7);
    assert_eq!(report.failed, 3);

    // Exactly the seven succeeding identity keys are persisted
    let state = store.load().await;
    assert_eq!(state.synced_keys.len(), 7);
    for file in &inventory {
        let should_be_synced = !matches!(
            file.file_name.as_str(),
            n if n == names[2] || n == names[5] || n == names[9]
        );
        assert_eq!(state.synced_keys.contains(&file.identity_key), should_be_synced);
        assert_eq!(file.synced, should_be_synced);
    }
}

#[tokio::test]
async fn second_run_uploads_nothing() {
    let tmp = tempfile::tempdir().unwrap();
    write_recordings(tmp.path(), 3);

    let store = test_store().await;
    let scanner = RecordingScanner::new();
    let uploader = Arc::new(MockUploader::new(&[]));
    let orchestrator = orchestrator(
        store.clone(),
        Arc::new(StaticFetcher(Vec::new())),
        uploader.clone(),
    );

    // First run syncs everything
    let mut inventory = scanner.scan(tmp.path(), &store.load().await.synced_keys).unwrap();
    let report = orchestrator.sync_unsynced(&mut inventory).await.unwrap();
    assert_eq!(report.succeeded, 3);

    // A fresh scan generation sees the store snapshot and offers nothing
    let mut second = scanner.scan(tmp.path(), &store.load().await.synced_keys).unwrap();
    assert!(second.iter().all(|f| f.synced));

    let report = orchestrator.sync_unsynced(&mut second).await.unwrap();
    assert_eq!(report.attempted, 0);
    assert_eq!(report.succeeded, 0);
    assert_eq!(uploader.uploaded_names().len(), 3);
}

#[tokio::test]
async fn failed_files_retried_on_next_run() {
    let tmp = tempfile::tempdir().unwrap();
    let names = write_recordings(tmp.path(), 2);

    let store = test_store().await;
    let scanner = RecordingScanner::new();

    // First run: one upload fails
    let failing = Arc::new(MockUploader::new(&[names[0].as_str()]));
    let first = orchestrator(
        store.clone(),
        Arc::new(StaticFetcher(Vec::new())),
        failing,
    );
    let mut inventory = scanner.scan(tmp.path(), &store.load().await.synced_keys).unwrap();
    let report = first.sync_unsynced(&mut inventory).await.unwrap();
    assert_eq!(report.failed, 1);

    // Second run with a healthy uploader: only the failed file is offered
    let healthy = Arc::new(MockUploader::new(&[]));
    let second = orchestrator(
        store.clone(),
        Arc::new(StaticFetcher(Vec::new())),
        healthy.clone(),
    );
    let mut inventory = scanner.scan(tmp.path(), &store.load().await.synced_keys).unwrap();
    let report = second.sync_unsynced(&mut inventory).await.unwrap();
    assert_eq!(report.attempted, 1);
    assert_eq!(report.succeeded, 1);
    assert_eq!(healthy.uploaded_names(), vec![names[0].clone()]);
}

#[tokio::test]
async fn fetch_failure_syncs_unlinked() {
    let tmp = tempfile::tempdir().unwrap();
    write_recordings(tmp.path(), 2);

    let store = test_store().await;
    let scanner = RecordingScanner::new();
    let uploader = Arc::new(MockUploader::new(&[]));
    let orchestrator = orchestrator(store.clone(), Arc::new(FailingFetcher), uploader.clone());

    let mut inventory = scanner.scan(tmp.path(), &HashSet::new()).unwrap();
    let report = orchestrator.sync_unsynced(&mut inventory).await.unwrap();

    assert_eq!(report.succeeded, 2);
    assert_eq!(report.matched, 0);
    assert!(inventory.iter().all(|f| f.matched_call_log_id.is_none()));

    // No request carried a match hint
    let calls = uploader.calls.lock().unwrap();
    assert!(calls.iter().all(|r| r.matched_call_log_id.is_none()));
}

#[tokio::test]
async fn matched_uploads_carry_call_log_link() {
    let tmp = tempfile::tempdir().unwrap();
    // 9812345600, captured 2024-01-15 14:30:00
    write_recordings(tmp.path(), 1);

    let candidates = vec![
        CallLogRecord {
            id: 501,
            phone_number: "+919812345600".to_string(),
            customer_id: String::new(),
            start_time: "2024-01-15 14:31:30".to_string(),
            recording_url: None,
        },
        // Closer in time but wrong number
        CallLogRecord {
            id: 502,
            phone_number: "5550001111".to_string(),
            customer_id: String::new(),
            start_time: "2024-01-15 14:30:01".to_string(),
            recording_url: None,
        },
    ];

    let store = test_store().await;
    let scanner = RecordingScanner::new();
    let uploader = Arc::new(MockUploader::new(&[]));
    let orchestrator = orchestrator(
        store.clone(),
        Arc::new(StaticFetcher(candidates)),
        uploader.clone(),
    );

    let mut inventory = scanner.scan(tmp.path(), &HashSet::new()).unwrap();
    let report = orchestrator.sync_unsynced(&mut inventory).await.unwrap();

    assert_eq!(report.succeeded, 1);
    assert_eq!(report.matched, 1);
    assert_eq!(inventory[0].matched_call_log_id, Some(501));

    let calls = uploader.calls.lock().unwrap();
    assert_eq!(calls[0].matched_call_log_id, Some(501));
    assert_eq!(calls[0].user_id, 7);
    assert_eq!(calls[0].file_identifier, inventory[0].identity_key);
    assert!(!calls[0].file_data.is_empty());
}

#[tokio::test]
async fn missing_identity_aborts_without_side_effects() {
    let tmp = tempfile::tempdir().unwrap();
    write_recordings(tmp.path(), 2);

    let store = test_store().await;
    let scanner = RecordingScanner::new();
    let uploader = Arc::new(MockUploader::new(&[]));
    let orchestrator = SyncOrchestrator::new(
        store.clone(),
        Arc::new(StaticFetcher(Vec::new())),
        uploader.clone(),
        SyncConfig {
            user_id: None,
            batch_size: 10,
        },
    );

    let mut inventory = scanner.scan(tmp.path(), &HashSet::new()).unwrap();
    let result = orchestrator.sync_unsynced(&mut inventory).await;

    assert!(matches!(result, Err(SyncError::MissingIdentity)));
    assert!(uploader.uploaded_names().is_empty());
    assert!(store.load().await.synced_keys.is_empty());
    assert!(store.last_sync_at().await.is_none());
}

#[tokio::test]
async fn concurrent_run_rejected_not_queued() {
    let tmp = tempfile::tempdir().unwrap();
    write_recordings(tmp.path(), 1);

    let store = test_store().await;
    let scanner = RecordingScanner::new();
    let orchestrator = Arc::new(orchestrator(
        store.clone(),
        Arc::new(StaticFetcher(Vec::new())),
        Arc::new(SlowUploader),
    ));

    let mut inventory = scanner.scan(tmp.path(), &HashSet::new()).unwrap();
    let background = {
        let orchestrator = orchestrator.clone();
        tokio::spawn(async move { orchestrator.sync_unsynced(&mut inventory).await })
    };

    // Give the first run time to take the guard, then collide with it
    tokio::time::sleep(std::time::Duration::from_millis(50)).await;
    assert!(orchestrator.is_running());

    let mut second_inventory = scanner.scan(tmp.path(), &HashSet::new()).unwrap();
    let result = orchestrator.sync_unsynced(&mut second_inventory).await;
    assert!(matches!(result, Err(SyncError::Busy)));

    // The original run is unaffected by the rejected request
    let report = background.await.unwrap().unwrap();
    assert_eq!(report.succeeded, 1);
    assert!(!orchestrator.is_running());
}

#[tokio::test]
async fn last_sync_recorded_once_per_run() {
    let tmp = tempfile::tempdir().unwrap();
    write_recordings(tmp.path(), 1);

    let store = test_store().await;
    let scanner = RecordingScanner::new();
    let orchestrator = orchestrator(
        store.clone(),
        Arc::new(StaticFetcher(Vec::new())),
        Arc::new(MockUploader::new(&[])),
    );

    assert!(store.last_sync_at().await.is_none());

    let mut inventory = scanner.scan(tmp.path(), &HashSet::new()).unwrap();
    orchestrator.sync_unsynced(&mut inventory).await.unwrap();

    assert!(store.last_sync_at().await.is_some());
}
