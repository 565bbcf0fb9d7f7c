//! In-memory storage backend.
//!
//! Keeps cursors and delivered events in RAM. Useful for tests and
//! short-lived engines that don't need persistence: the store implements
//! both [`SyncStateStore`] and [`EventHandler`], so one instance can be the
//! cursor store and a recording sink for any route.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;

use logsync_core::cursor::Cursor;
use logsync_core::error::{HandlerError, SyncError};
use logsync_core::routes::EventHandler;
use logsync_core::state::SyncStateStore;
use logsync_core::types::{DecodedEvent, SyncContext};

/// In-memory cursor store and event recorder.
///
/// All data is lost when the process exits.
#[derive(Default)]
pub struct InMemoryStore {
    cursors: Mutex<HashMap<String, Cursor>>,
    events: Mutex<Vec<DecodedEvent>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a delivered event.
    pub fn insert_event(&self, event: DecodedEvent) {
        self.events.lock().unwrap().push(event);
    }

    /// All recorded events for one `(contract, event)` route, in delivery
    /// order.
    pub fn events_by_route(&self, contract: &str, event: &str) -> Vec<DecodedEvent> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .filter(|e| e.contract == contract && e.event == event)
            .cloned()
            .collect()
    }

    /// All recorded events, in delivery order.
    pub fn events(&self) -> Vec<DecodedEvent> {
        self.events.lock().unwrap().clone()
    }

    /// Total number of recorded events.
    pub fn event_count(&self) -> usize {
        self.events.lock().unwrap().len()
    }
}

#[async_trait]
impl SyncStateStore for InMemoryStore {
    async fn load(&self, engine_id: &str) -> Result<Option<Cursor>, SyncError> {
        Ok(self.cursors.lock().unwrap().get(engine_id).copied())
    }

    async fn save(&self, engine_id: &str, cursor: &Cursor) -> Result<(), SyncError> {
        self.cursors
            .lock()
            .unwrap()
            .insert(engine_id.to_string(), *cursor);
        Ok(())
    }

    async fn delete(&self, engine_id: &str) -> Result<(), SyncError> {
        self.cursors.lock().unwrap().remove(engine_id);
        Ok(())
    }
}

#[async_trait]
impl EventHandler for InMemoryStore {
    async fn handle(&self, event: &DecodedEvent, _ctx: &SyncContext) -> Result<(), HandlerError> {
        self.insert_event(event.clone());
        Ok(())
    }
}
