//! SQLite storage backend for LogSync.
//!
//! Persists sync cursors to a single SQLite file, one row per engine ID.
//! Uses `sqlx` with WAL mode for concurrent read performance.
//!
//! # Usage
//! ```rust,no_run
//! use logsync_storage::sqlite::SqliteStore;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! // File-backed (persistent)
//! let store = SqliteStore::open("./logsync.db").await?;
//!
//! // In-memory (tests / ephemeral)
//! let store = SqliteStore::in_memory().await?;
//! # Ok(())
//! # }
//! ```

use async_trait::async_trait;
use sqlx::{Row, SqlitePool};
use tracing::debug;

use logsync_core::cursor::Cursor;
use logsync_core::error::SyncError;
use logsync_core::state::SyncStateStore;

/// SQLite-backed cursor store.
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Open (or create) a SQLite database at `path`.
    ///
    /// The path may be a plain file path (`"./logsync.db"`) or a full
    /// SQLite URL (`"sqlite:./logsync.db?mode=rwc"`).
    pub async fn open(path: &str) -> Result<Self, SyncError> {
        let url = if path.starts_with("sqlite:") {
            path.to_string()
        } else {
            format!("sqlite:{path}?mode=rwc")
        };

        let pool = SqlitePool::connect(&url)
            .await
            .map_err(|e| SyncError::Store(e.to_string()))?;

        let store = Self { pool };
        store.init_schema().await?;
        Ok(store)
    }

    /// Open an in-memory SQLite database.
    ///
    /// All data is lost when the pool is dropped. Ideal for tests.
    pub async fn in_memory() -> Result<Self, SyncError> {
        let pool = SqlitePool::connect("sqlite::memory:")
            .await
            .map_err(|e| SyncError::Store(e.to_string()))?;

        let store = Self { pool };
        store.init_schema().await?;
        Ok(store)
    }

    /// Create the sync_state table and enable WAL mode.
    async fn init_schema(&self) -> Result<(), SyncError> {
        sqlx::query("PRAGMA journal_mode=WAL;")
            .execute(&self.pool)
            .await
            .map_err(|e| SyncError::Store(e.to_string()))?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS sync_state (
                engine_id    TEXT    PRIMARY KEY,
                block        INTEGER NOT NULL,
                log_position INTEGER NOT NULL,
                updated_at   INTEGER NOT NULL
            );",
        )
        .execute(&self.pool)
        .await
        .map_err(|e| SyncError::Store(e.to_string()))?;

        Ok(())
    }
}

#[async_trait]
impl SyncStateStore for SqliteStore {
    async fn load(&self, engine_id: &str) -> Result<Option<Cursor>, SyncError> {
        let row = sqlx::query(
            "SELECT block, log_position FROM sync_state WHERE engine_id = ?",
        )
        .bind(engine_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| SyncError::Store(e.to_string()))?;

        // The drained sentinel (u64::MAX) is stored as -1 through the i64
        // bit cast; the reverse cast restores it.
        Ok(row.map(|r| Cursor {
            block: r.get::<i64, _>("block") as u64,
            log_position: r.get::<i64, _>("log_position") as u64,
        }))
    }

    async fn save(&self, engine_id: &str, cursor: &Cursor) -> Result<(), SyncError> {
        sqlx::query(
            "INSERT OR REPLACE INTO sync_state (engine_id, block, log_position, updated_at)
             VALUES (?, ?, ?, ?)",
        )
        .bind(engine_id)
        .bind(cursor.block as i64)
        .bind(cursor.log_position as i64)
        .bind(chrono::Utc::now().timestamp())
        .execute(&self.pool)
        .await
        .map_err(|e| SyncError::Store(e.to_string()))?;

        debug!(
            engine_id,
            block = cursor.block,
            position = cursor.log_position,
            "Cursor saved"
        );
        Ok(())
    }

    async fn delete(&self, engine_id: &str) -> Result<(), SyncError> {
        sqlx::query("DELETE FROM sync_state WHERE engine_id = ?")
            .bind(engine_id)
            .execute(&self.pool)
            .await
            .map_err(|e| SyncError::Store(e.to_string()))?;

        Ok(())
    }
}
