//! logsync-storage — pluggable cursor stores for LogSync.
//!
//! Backends:
//! - [`memory`] — in-memory (dev/testing, no persistence), doubles as a
//!   recording event sink for harnesses
//! - [`sqlite`] — SQLite via `sqlx` (embedded, single-file persistence)

pub mod memory;

#[cfg(feature = "sqlite")]
pub mod sqlite;

pub use memory::InMemoryStore;
