//! Event fingerprints — keccak-256 of the canonical signature.
//!
//! `topics[0]` of every EVM log is the keccak-256 hash of the emitting
//! event's canonical signature, e.g.
//! `keccak256("Transfer(address,address,uint256)")`. Schemas built through
//! [`event_schema`] get their fingerprint derived from the signature instead
//! of hand-copied from a block explorer.

use logsync_core::schema::{EventParam, EventSchema};
use tiny_keccak::{Hasher, Keccak};

/// keccak-256 of `input`.
pub fn keccak256(input: &[u8]) -> [u8; 32] {
    let mut hasher = Keccak::v256();
    let mut output = [0u8; 32];
    hasher.update(input);
    hasher.finalize(&mut output);
    output
}

/// The fingerprint topic for a canonical event signature, as a
/// `0x`-prefixed hex string.
pub fn signature_topic(signature: &str) -> String {
    format!("0x{}", hex::encode(keccak256(signature.as_bytes())))
}

/// Build an [`EventSchema`] whose fingerprint topic is derived from the
/// canonical signature of `name` and `inputs`.
pub fn event_schema(name: impl Into<String>, inputs: Vec<EventParam>) -> EventSchema {
    let mut schema = EventSchema {
        name: name.into(),
        topic0: String::new(),
        inputs,
    };
    schema.topic0 = signature_topic(&schema.signature());
    schema
}
