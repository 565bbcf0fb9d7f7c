//! Event schemas — the in-memory description of a contract interface.
//!
//! An [`InterfaceSpec`] is the decode side of a contract definition: the set
//! of events the contract can emit, keyed by their fingerprint topic. The
//! router hands the matching schema to the decoder; anything emitted by a
//! watched contract but absent from its interface is skipped as undecodable.

use serde::{Deserialize, Serialize};
use std::fmt;

/// ABI parameter types understood by the decoders.
///
/// `Display` renders the canonical ABI type string, which is what event
/// signatures (and therefore fingerprints) are built from.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamKind {
    /// Unsigned integer (uint8 .. uint256). Width in bits.
    Uint(u16),
    /// Signed integer (int8 .. int256). Width in bits.
    Int(u16),
    /// Boolean
    Bool,
    /// 20-byte address
    Address,
    /// Fixed-size byte array (bytes1 .. bytes32). Length in bytes.
    FixedBytes(u8),
    /// Variable-length byte array
    Bytes,
    /// UTF-8 string
    Str,
}

impl fmt::Display for ParamKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamKind::Uint(bits) => write!(f, "uint{bits}"),
            ParamKind::Int(bits) => write!(f, "int{bits}"),
            ParamKind::Bool => write!(f, "bool"),
            ParamKind::Address => write!(f, "address"),
            ParamKind::FixedBytes(n) => write!(f, "bytes{n}"),
            ParamKind::Bytes => write!(f, "bytes"),
            ParamKind::Str => write!(f, "string"),
        }
    }
}

/// A single event parameter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventParam {
    /// Parameter name, e.g. `"from"`.
    pub name: String,
    /// ABI type of the parameter.
    pub kind: ParamKind,
    /// Whether the parameter is carried in a topic rather than the data blob.
    pub indexed: bool,
}

impl EventParam {
    /// An indexed parameter (EVM: carried in `topics[1..]`).
    pub fn indexed(name: impl Into<String>, kind: ParamKind) -> Self {
        Self {
            name: name.into(),
            kind,
            indexed: true,
        }
    }

    /// A non-indexed parameter (EVM: carried in the data payload).
    pub fn data(name: impl Into<String>, kind: ParamKind) -> Self {
        Self {
            name: name.into(),
            kind,
            indexed: false,
        }
    }
}

/// Schema of a single event: its name, fingerprint topic, and ordered
/// parameter definitions (order matters for ABI decode).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventSchema {
    /// Event name, e.g. `"Transfer"`.
    pub name: String,
    /// The fingerprint topic (`topics[0]` of every matching log), as a
    /// `0x`-prefixed 32-byte hex string.
    pub topic0: String,
    /// Parameter definitions in declaration order.
    pub inputs: Vec<EventParam>,
}

impl EventSchema {
    /// Create a schema from a precomputed fingerprint topic.
    ///
    /// `logsync-evm` offers a constructor that derives the topic from the
    /// canonical signature instead.
    pub fn with_topic0(
        name: impl Into<String>,
        topic0: impl Into<String>,
        inputs: Vec<EventParam>,
    ) -> Self {
        Self {
            name: name.into(),
            topic0: topic0.into(),
            inputs,
        }
    }

    /// The canonical signature this schema decodes, e.g.
    /// `"Transfer(address,address,uint256)"`.
    pub fn signature(&self) -> String {
        let kinds: Vec<String> = self.inputs.iter().map(|p| p.kind.to_string()).collect();
        format!("{}({})", self.name, kinds.join(","))
    }

    /// Returns only the indexed parameters (EVM: `topics[1..]`).
    pub fn indexed_inputs(&self) -> Vec<&EventParam> {
        self.inputs.iter().filter(|p| p.indexed).collect()
    }

    /// Returns only the non-indexed parameters (EVM: data payload).
    pub fn data_inputs(&self) -> Vec<&EventParam> {
        self.inputs.iter().filter(|p| !p.indexed).collect()
    }
}

/// The set of events a watched contract can emit, keyed by fingerprint.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterfaceSpec {
    events: Vec<EventSchema>,
}

impl InterfaceSpec {
    /// Build an interface from its event schemas.
    pub fn new(events: Vec<EventSchema>) -> Self {
        Self { events }
    }

    /// Look up the event schema matching a fingerprint topic.
    /// Hex comparison is case-insensitive.
    pub fn event_for_topic(&self, topic0: &str) -> Option<&EventSchema> {
        self.events
            .iter()
            .find(|e| e.topic0.eq_ignore_ascii_case(topic0))
    }

    /// All event schemas in this interface.
    pub fn events(&self) -> &[EventSchema] {
        &self.events
    }
}
