//! Remote admin-API client
//!
//! HTTP client for the two remote collaborators the agent consumes: the
//! call-log listing (matching candidates) and the recording upload
//! endpoint. Both are best-effort from the orchestrator's point of view;
//! this client reports transport and protocol failures faithfully and lets
//! the caller decide how to degrade.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crsync_common::{Error, Result};

const ADMIN_API_PATH: &str = "/admin_api.php";
const UPLOAD_PATH: &str = "/upload-recording.php";
const REQUEST_TIMEOUT_SECS: u64 = 60;

/// How many candidate call logs to pull per orchestration run
const CALL_LOG_FETCH_LIMIT: u32 = 200;

/// Remote call-log record, opaque except for the fields used in matching
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CallLogRecord {
    pub id: i64,
    #[serde(rename = "phonenumber", default)]
    pub phone_number: String,
    #[serde(rename = "customerid", default)]
    pub customer_id: String,
    #[serde(rename = "starttime", default)]
    pub start_time: String,
    #[serde(rename = "recordingurl", default)]
    pub recording_url: Option<String>,
}

impl CallLogRecord {
    /// Whether this entry already carries a linked recording
    pub fn has_recording(&self) -> bool {
        self.recording_url
            .as_deref()
            .map(|url| !url.is_empty())
            .unwrap_or(false)
    }
}

#[derive(Debug, Serialize)]
struct CallLogQuery {
    user_id: i64,
    limit: u32,
    offset: u32,
}

#[derive(Debug, Deserialize)]
struct CallLogEnvelope {
    status: String,
    #[serde(default)]
    data: Vec<CallLogRecord>,
}

/// Upload payload: parsed metadata, base64 audio, and the identity key as
/// an idempotency token. The client never depends on server-side dedupe;
/// the sync-state store stays authoritative.
#[derive(Debug, Clone, Serialize)]
pub struct UploadRequest {
    pub phone_number: String,
    pub raw_phone_number: String,
    pub timestamp: String,
    pub date: String,
    pub time: String,
    pub call_type: String,
    pub file_name: String,
    pub file_size: u64,
    pub duration: String,
    pub file_data: String,
    pub file_identifier: String,
    pub user_id: i64,
    /// Client-side match hint; the server may confirm or re-derive it
    #[serde(skip_serializing_if = "Option::is_none")]
    pub matched_call_log_id: Option<i64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UploadResponse {
    pub success: bool,
    #[serde(default)]
    pub matched: bool,
    #[serde(default)]
    pub call_log_id: Option<i64>,
    #[serde(default)]
    pub message: Option<String>,
}

/// Fetch the current candidate call-log set
#[async_trait]
pub trait CallLogFetcher: Send + Sync {
    async fn fetch_call_logs(&self) -> Result<Vec<CallLogRecord>>;
}

/// Upload one recording payload
#[async_trait]
pub trait RecordingUploader: Send + Sync {
    async fn upload(&self, request: &UploadRequest) -> Result<UploadResponse>;
}

/// reqwest-backed client for the remote admin API
pub struct RemoteClient {
    http: reqwest::Client,
    base_url: String,
    user_id: Option<i64>,
}

impl RemoteClient {
    pub fn new(base_url: impl Into<String>, user_id: Option<i64>) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| Error::Remote(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            user_id,
        })
    }
}

#[async_trait]
impl CallLogFetcher for RemoteClient {
    async fn fetch_call_logs(&self) -> Result<Vec<CallLogRecord>> {
        let user_id = self
            .user_id
            .ok_or_else(|| Error::Remote("No user identity configured".to_string()))?;

        let url = format!(
            "{}{}?task=get_call_logs_with_recordings",
            self.base_url, ADMIN_API_PATH
        );
        let query = CallLogQuery {
            user_id,
            limit: CALL_LOG_FETCH_LIMIT,
            offset: 0,
        };

        let response = self
            .http
            .post(&url)
            .json(&query)
            .send()
            .await
            .map_err(|e| Error::Remote(format!("Call log fetch failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::Remote(format!(
                "Call log fetch returned HTTP {}",
                status
            )));
        }

        let envelope: CallLogEnvelope = response
            .json()
            .await
            .map_err(|e| Error::Remote(format!("Call log response parse failed: {}", e)))?;

        if envelope.status != "success" {
            return Err(Error::Remote(format!(
                "Call log fetch returned status '{}'",
                envelope.status
            )));
        }

        tracing::debug!(count = envelope.data.len(), "Fetched call logs");
        Ok(envelope.data)
    }
}

#[async_trait]
impl RecordingUploader for RemoteClient {
    async fn upload(&self, request: &UploadRequest) -> Result<UploadResponse> {
        let url = format!("{}{}", self.base_url, UPLOAD_PATH);

        let response = self
            .http
            .post(&url)
            .json(request)
            .send()
            .await
            .map_err(|e| Error::Remote(format!("Upload failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::Remote(format!("Upload returned HTTP {}", status)));
        }

        let result: UploadResponse = response
            .json()
            .await
            .map_err(|e| Error::Remote(format!("Upload response parse failed: {}", e)))?;

        Ok(result)
    }
}
