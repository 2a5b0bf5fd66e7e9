//! Sync-state store
//!
//! Persists which recordings have already been uploaded so repeated sync
//! passes are idempotent and resumable. The set of identity keys only ever
//! grows; the single exception is an explicit user-triggered `clear`.

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use std::collections::HashSet;

use crsync_common::Result;

const LAST_SYNC_KEY: &str = "last_sync_at";

/// In-memory snapshot of the persisted sync state
#[derive(Debug, Clone, Default)]
pub struct SyncState {
    pub synced_keys: HashSet<String>,
    pub last_sync_at: Option<DateTime<Utc>>,
}

/// SQLite-backed store for synced identity keys and the last-sync timestamp
#[derive(Clone)]
pub struct SyncStateStore {
    db: SqlitePool,
}

impl SyncStateStore {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    /// Load a full snapshot.
    ///
    /// Never fails: unreadable or corrupt state degrades to the empty
    /// state with a warning. Worst case is a re-upload, never a refusal
    /// to start.
    pub async fn load(&self) -> SyncState {
        let synced_keys = match sqlx::query_scalar::<_, String>(
            "SELECT identity_key FROM synced_files",
        )
        .fetch_all(&self.db)
        .await
        {
            Ok(keys) => keys.into_iter().collect(),
            Err(e) => {
                tracing::warn!(error = %e, "Failed to load synced keys, treating as empty");
                HashSet::new()
            }
        };

        SyncState {
            synced_keys,
            last_sync_at: self.last_sync_at().await,
        }
    }

    /// Whether one identity key is already recorded as synced
    pub async fn is_synced(&self, key: &str) -> Result<bool> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM synced_files WHERE identity_key = ?")
                .bind(key)
                .fetch_one(&self.db)
                .await?;
        Ok(count > 0)
    }

    /// Idempotent union of `keys` into the persisted set, one transaction.
    /// Re-marking an existing key is a no-op.
    pub async fn mark_synced(&self, keys: &HashSet<String>) -> Result<()> {
        if keys.is_empty() {
            return Ok(());
        }

        let now = Utc::now().to_rfc3339();
        let mut tx = self.db.begin().await?;
        for key in keys {
            sqlx::query(
                "INSERT OR IGNORE INTO synced_files (identity_key, synced_at) VALUES (?, ?)",
            )
            .bind(key)
            .bind(&now)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;

        tracing::debug!(count = keys.len(), "Marked identity keys synced");
        Ok(())
    }

    /// Reset to the empty state. Explicit user action only; nothing in the
    /// sync path calls this. Returns how many keys were removed.
    pub async fn clear(&self) -> Result<u64> {
        let result = sqlx::query("DELETE FROM synced_files")
            .execute(&self.db)
            .await?;
        sqlx::query("DELETE FROM settings WHERE key = ?")
            .bind(LAST_SYNC_KEY)
            .execute(&self.db)
            .await?;

        tracing::info!(removed = result.rows_affected(), "Sync state cleared");
        Ok(result.rows_affected())
    }

    /// Record the completion time of an orchestration run
    pub async fn set_last_sync_at(&self, at: DateTime<Utc>) -> Result<()> {
        sqlx::query(
            "INSERT INTO settings (key, value) VALUES (?, ?) \
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
        )
        .bind(LAST_SYNC_KEY)
        .bind(at.to_rfc3339())
        .execute(&self.db)
        .await?;
        Ok(())
    }

    /// Last successful sync time, if any. Read failures and unparseable
    /// values degrade to `None`.
    pub async fn last_sync_at(&self) -> Option<DateTime<Utc>> {
        let value: Option<String> =
            match sqlx::query_scalar("SELECT value FROM settings WHERE key = ?")
                .bind(LAST_SYNC_KEY)
                .fetch_optional(&self.db)
                .await
            {
                Ok(value) => value,
                Err(e) => {
                    tracing::warn!(error = %e, "Failed to read last sync timestamp");
                    return None;
                }
            };

        value
            .and_then(|v| DateTime::parse_from_rfc3339(&v).ok())
            .map(|dt| dt.with_timezone(&Utc))
    }
}
