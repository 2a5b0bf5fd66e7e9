//! Agent configuration
//!
//! Resolution priority for every field: environment variable (`CRSYNC_*`)
//! → `crsync.toml` in the root folder → compiled default. Sync and
//! auto-sync toggles are plain fields here and get passed into the
//! orchestrator explicitly; nothing reads ambient global state.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::warn;

pub const CONFIG_FILE_NAME: &str = "crsync.toml";

const DEFAULT_API_BASE_URL: &str = "http://127.0.0.1:8080";
const DEFAULT_BATCH_SIZE: usize = 10;
const DEFAULT_AUTO_SYNC_INTERVAL_SECS: u64 = 300;
const DEFAULT_PORT: u16 = 5761;

/// Recording agent configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Directory scanned for call recordings
    pub recordings_dir: Option<PathBuf>,

    /// Base URL of the remote admin API
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,

    /// Remote subject the uploads belong to; sync refuses to run without it
    pub user_id: Option<i64>,

    /// Concurrent uploads per batch
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Run a sync pass on a fixed interval without an external trigger
    #[serde(default)]
    pub auto_sync: bool,

    #[serde(default = "default_auto_sync_interval")]
    pub auto_sync_interval_secs: u64,

    /// HTTP listen port
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_api_base_url() -> String {
    DEFAULT_API_BASE_URL.to_string()
}

fn default_batch_size() -> usize {
    DEFAULT_BATCH_SIZE
}

fn default_auto_sync_interval() -> u64 {
    DEFAULT_AUTO_SYNC_INTERVAL_SECS
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            recordings_dir: None,
            api_base_url: default_api_base_url(),
            user_id: None,
            batch_size: default_batch_size(),
            auto_sync: false,
            auto_sync_interval_secs: default_auto_sync_interval(),
            port: default_port(),
        }
    }
}

impl AgentConfig {
    /// Load configuration from `{root}/crsync.toml`, then apply environment
    /// overrides. Never fails: a missing or unparseable file degrades to
    /// defaults with a warning.
    pub fn load(root: &Path) -> Self {
        let path = root.join(CONFIG_FILE_NAME);
        let mut config = match std::fs::read_to_string(&path) {
            Ok(content) => match toml::from_str::<AgentConfig>(&content) {
                Ok(config) => config,
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Unparseable config, using defaults");
                    AgentConfig::default()
                }
            },
            Err(_) => AgentConfig::default(),
        };

        config.apply_env_overrides();
        config
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(dir) = std::env::var("CRSYNC_RECORDINGS_DIR") {
            self.recordings_dir = Some(PathBuf::from(dir));
        }
        if let Ok(url) = std::env::var("CRSYNC_API_BASE_URL") {
            self.api_base_url = url;
        }
        if let Ok(user_id) = std::env::var("CRSYNC_USER_ID") {
            match user_id.parse() {
                Ok(id) => self.user_id = Some(id),
                Err(_) => warn!(value = %user_id, "Ignoring non-numeric CRSYNC_USER_ID"),
            }
        }
        if let Ok(auto_sync) = std::env::var("CRSYNC_AUTO_SYNC") {
            self.auto_sync = matches!(auto_sync.as_str(), "1" | "true" | "yes");
        }
        if let Ok(port) = std::env::var("CRSYNC_PORT") {
            match port.parse() {
                Ok(port) => self.port = port,
                Err(_) => warn!(value = %port, "Ignoring non-numeric CRSYNC_PORT"),
            }
        }
    }
}
