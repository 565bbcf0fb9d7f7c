//! Error types for the logsync pipeline.

use thiserror::Error;

/// How far an error reaches when it surfaces inside the engine.
///
/// Recoverable errors truncate the current scan pass; the engine keeps the
/// cursor where it is and re-covers the remaining range on the next pass.
/// Fatal errors abort the engine run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Recoverable,
    Fatal,
}

/// Errors that can occur while syncing.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("Chain source error: {0}")]
    Source(String),

    #[error("Height subscription error: {0}")]
    Subscription(String),

    #[error("State store error: {0}")]
    Store(String),

    #[error("Membership query for group '{group}' failed: {reason}")]
    Membership { group: String, reason: String },

    #[error("Handler error in '{route}': {reason}")]
    Handler { route: String, reason: String },

    #[error("{0}")]
    Other(String),
}

impl SyncError {
    /// Classify this error for the engine's truncate-or-abort decision.
    pub fn severity(&self) -> Severity {
        match self {
            Self::Source(_) | Self::Store(_) | Self::Membership { .. } | Self::Other(_) => {
                Severity::Recoverable
            }
            Self::Subscription(_) | Self::Handler { .. } => Severity::Fatal,
        }
    }

    /// Returns `true` if the error must abort the engine run.
    pub fn is_fatal(&self) -> bool {
        self.severity() == Severity::Fatal
    }
}

/// Error returned by user-registered event and block-drained handlers.
///
/// Handlers own their failure semantics; the engine only needs a message it
/// can attach to the route that failed.
#[derive(Debug, Error)]
#[error("{0}")]
pub struct HandlerError(pub String);

impl HandlerError {
    pub fn new(reason: impl Into<String>) -> Self {
        Self(reason.into())
    }
}

impl From<String> for HandlerError {
    fn from(reason: String) -> Self {
        Self(reason)
    }
}

impl From<&str> for HandlerError {
    fn from(reason: &str) -> Self {
        Self(reason.to_string())
    }
}

/// Error returned by a dynamic group's membership query.
#[derive(Debug, Error)]
#[error("{0}")]
pub struct MembershipError(pub String);

impl MembershipError {
    pub fn new(reason: impl Into<String>) -> Self {
        Self(reason.into())
    }
}
