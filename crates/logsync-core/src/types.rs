//! Shared types for the sync pipeline.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

// ─── RawLogEvent ──────────────────────────────────────────────────────────────

/// A raw contract log as delivered by a chain source, before decoding.
///
/// Sources normalize whatever their wire format is into this shape. `topics`
/// keeps the on-chain ordering: `topics[0]` is the event fingerprint, the
/// rest are the indexed parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawLogEvent {
    /// Address of the contract that emitted the log (`0x…`).
    pub address: String,
    /// Block the log was emitted in.
    pub block_number: u64,
    /// Position of the log within its block.
    pub log_index: u64,
    /// Topic words (`0x…`-prefixed 32-byte hex strings).
    pub topics: Vec<String>,
    /// ABI-encoded non-indexed parameters.
    pub data: Vec<u8>,
}

impl RawLogEvent {
    /// The event fingerprint topic, if the log carries any topics.
    pub fn topic0(&self) -> Option<&str> {
        self.topics.first().map(|s| s.as_str())
    }
}

// ─── BlockRange ───────────────────────────────────────────────────────────────

/// An inclusive range of block heights.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockRange {
    /// First block of the range (inclusive).
    pub from: u64,
    /// Last block of the range (inclusive).
    pub to: u64,
}

impl BlockRange {
    /// Create a range covering `from..=to`.
    pub fn new(from: u64, to: u64) -> Self {
        Self { from, to }
    }

    /// Returns `true` if the range covers no blocks.
    pub fn is_empty(&self) -> bool {
        self.from > self.to
    }
}

impl fmt::Display for BlockRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}]", self.from, self.to)
    }
}

// ─── AbiValue ─────────────────────────────────────────────────────────────────

/// A decoded event argument value.
///
/// Decoders normalize chain-level encodings into this small value system so
/// handlers never deal with raw ABI words.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
pub enum AbiValue {
    Uint(u128),
    /// Large uints (> u128) stored as decimal string
    BigUint(String),
    Int(i128),
    /// Large ints (> i128) stored as decimal string
    BigInt(String),
    Bool(bool),
    Bytes(Vec<u8>),
    Str(String),
    /// EVM address — 20 bytes, hex with 0x prefix
    Address(String),
}

impl AbiValue {
    /// Returns the inner string if this is an Address value.
    pub fn as_address(&self) -> Option<&str> {
        match self {
            AbiValue::Address(s) => Some(s.as_str()),
            _ => None,
        }
    }

    /// Coerce to a u128 if this is a small Uint.
    pub fn as_u128(&self) -> Option<u128> {
        match self {
            AbiValue::Uint(v) => Some(*v),
            _ => None,
        }
    }

    /// Returns the inner string if this is a Str value.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            AbiValue::Str(s) => Some(s.as_str()),
            _ => None,
        }
    }

    /// Returns the inner bool if this is a Bool value.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            AbiValue::Bool(v) => Some(*v),
            _ => None,
        }
    }

    /// Returns the inner bytes if this is a Bytes value.
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            AbiValue::Bytes(b) => Some(b.as_slice()),
            _ => None,
        }
    }
}

impl fmt::Display for AbiValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AbiValue::Uint(v) => write!(f, "{v}"),
            AbiValue::BigUint(v) => write!(f, "{v}"),
            AbiValue::Int(v) => write!(f, "{v}"),
            AbiValue::BigInt(v) => write!(f, "{v}"),
            AbiValue::Bool(v) => write!(f, "{v}"),
            AbiValue::Bytes(b) => write!(f, "0x{}", hex::encode(b)),
            AbiValue::Str(s) => write!(f, "{s}"),
            AbiValue::Address(a) => write!(f, "{a}"),
        }
    }
}

// ─── DecodedEvent ─────────────────────────────────────────────────────────────

/// A fully decoded contract event, ready for dispatch to a handler.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecodedEvent {
    /// Name of the contract (or dynamic group) the log was resolved to.
    pub contract: String,
    /// Decoded event name (e.g. `"Transfer"`).
    pub event: String,
    /// Address of the emitting contract.
    pub address: String,
    /// Block the log was emitted in.
    pub block_number: u64,
    /// Position of the log within its block.
    pub log_index: u64,
    /// Decoded arguments by parameter name.
    pub args: HashMap<String, AbiValue>,
}

impl DecodedEvent {
    /// Look up a decoded argument by name.
    pub fn arg(&self, name: &str) -> Option<&AbiValue> {
        self.args.get(name)
    }
}

// ─── SyncContext ──────────────────────────────────────────────────────────────

/// Context passed to handlers and membership queries during a dispatch.
///
/// A fresh context is built for every call site; nothing in it outlives the
/// dispatch it was built for.
#[derive(Debug, Clone)]
pub struct SyncContext {
    /// Identifier of the engine doing the dispatch.
    pub engine_id: String,
    /// Current engine phase.
    pub phase: SyncPhase,
    /// The block the dispatch concerns.
    pub block: u64,
}

/// The current phase of the sync engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SyncPhase {
    /// Scanning historical ranges up to the chain head.
    CatchUp,
    /// Following pushed head notifications in real time.
    Live,
}

// ─── Tests ────────────────────────────────────────────────────────────────────
