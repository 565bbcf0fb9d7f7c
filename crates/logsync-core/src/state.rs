//! Sync state store — persists the engine's cursor for crash recovery.
//!
//! The engine saves its cursor after every dispatched log and after every
//! fully scanned range. On restart it resumes from the stored cursor and
//! skips anything the cursor already covers, so a handler never sees the
//! same log twice across restarts.

use async_trait::async_trait;

use crate::cursor::Cursor;
use crate::error::SyncError;

/// Trait for storing and loading sync cursors.
///
/// Implementations include `MemoryStateStore` here and the `InMemoryStore` /
/// `SqliteStore` pair in `logsync-storage`.
#[async_trait]
pub trait SyncStateStore: Send + Sync {
    /// Load the cursor for an engine. `None` if the engine has never run.
    async fn load(&self, engine_id: &str) -> Result<Option<Cursor>, SyncError>;

    /// Save (upsert) the cursor for an engine.
    async fn save(&self, engine_id: &str, cursor: &Cursor) -> Result<(), SyncError>;

    /// Delete the cursor (e.g. when resetting an engine).
    async fn delete(&self, engine_id: &str) -> Result<(), SyncError>;
}

// ─── In-memory store (for testing) ────────────────────────────────────────────

use std::collections::HashMap;
use std::sync::Mutex;

/// In-memory state store for tests and ephemeral engines.
#[derive(Default)]
pub struct MemoryStateStore {
    data: Mutex<HashMap<String, Cursor>>,
}

impl MemoryStateStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-seed the cursor for an engine, as if a previous run had saved it.
    pub fn with_cursor(engine_id: impl Into<String>, cursor: Cursor) -> Self {
        let store = Self::default();
        store
            .data
            .lock()
            .unwrap()
            .insert(engine_id.into(), cursor);
        store
    }
}

#[async_trait]
impl SyncStateStore for MemoryStateStore {
    async fn load(&self, engine_id: &str) -> Result<Option<Cursor>, SyncError> {
        Ok(self.data.lock().unwrap().get(engine_id).copied())
    }

    async fn save(&self, engine_id: &str, cursor: &Cursor) -> Result<(), SyncError> {
        self.data
            .lock()
            .unwrap()
            .insert(engine_id.to_string(), *cursor);
        Ok(())
    }

    async fn delete(&self, engine_id: &str) -> Result<(), SyncError> {
        self.data.lock().unwrap().remove(engine_id);
        Ok(())
    }
}
