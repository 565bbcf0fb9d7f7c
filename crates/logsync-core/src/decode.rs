//! The `LogDecoder` trait and decode error type.
//!
//! Decoding is CPU work with no I/O, so the trait is synchronous. It is
//! object-safe so decoders can be stored as `Arc<dyn LogDecoder>` inside the
//! router.

use thiserror::Error;

use crate::schema::InterfaceSpec;
use crate::types::{DecodedEvent, RawLogEvent};

/// Errors that can occur while decoding a single log.
///
/// All of these are routing-level conditions: the router logs the failed log
/// and moves on, they never abort a scan.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("No event with topic {topic} on the interface of '{contract}'")]
    UnknownTopic { contract: String, topic: String },

    #[error("Log carries no topics")]
    MissingTopic,

    #[error("ABI decode failed: {reason}")]
    AbiDecodeFailed { reason: String },

    #[error("Invalid raw log: {reason}")]
    InvalidRawLog { reason: String },

    #[error("{0}")]
    Other(String),
}

/// The trait every chain-specific log decoder implements.
///
/// # Thread Safety
/// Implementations must be `Send + Sync` so they can be shared across Tokio
/// tasks without additional locking.
pub trait LogDecoder: Send + Sync {
    /// Decode a raw log against a contract interface.
    ///
    /// `contract` is the routing name (static contract or group name) the
    /// log resolved to; it is stamped onto the decoded event.
    fn decode(
        &self,
        interface: &InterfaceSpec,
        contract: &str,
        log: &RawLogEvent,
    ) -> Result<DecodedEvent, DecodeError>;
}
