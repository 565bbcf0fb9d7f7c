//! Engine configuration and state types.

use serde::{Deserialize, Serialize};

/// Configuration for a sync engine instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Unique name for this engine (used for cursor keys and contexts).
    pub id: String,
    /// Block to start from when no cursor is stored.
    pub start_block: u64,
    /// Maximum number of blocks a single scan window may span.
    pub block_batch: u64,
    /// Queue capacity of the live-mode concurrency gate.
    pub gate_capacity: usize,
    /// How long to wait before retrying after a truncated catch-up pass
    /// (milliseconds).
    pub retry_backoff_ms: u64,
    /// What to do when a registered handler returns an error.
    pub on_handler_failure: FailurePolicy,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            id: "default".into(),
            start_block: 0,
            block_batch: 1000,
            gate_capacity: 32,
            retry_backoff_ms: 1000,
            on_handler_failure: FailurePolicy::default(),
        }
    }
}

/// Reaction to a handler returning an error.
///
/// Handlers are the reason the engine exists, so a failing one aborts the
/// run by default rather than silently losing its events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Abort the engine run.
    #[default]
    Fatal,
    /// Log the failure, advance the cursor, and keep going.
    Skip,
}

/// Runtime state of the sync engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EngineState {
    /// Not yet started.
    Init,
    /// Scanning historical ranges up to the current head.
    CatchingUp,
    /// Following pushed head notifications in real time.
    Live,
    /// Terminated.
    Stopped,
}

impl std::fmt::Display for EngineState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Init => write!(f, "init"),
            Self::CatchingUp => write!(f, "catching-up"),
            Self::Live => write!(f, "live"),
            Self::Stopped => write!(f, "stopped"),
        }
    }
}
