//! `AbiLogDecoder` — the `LogDecoder` implementation for EVM logs.
//!
//! Decoding splits a log into its two ABI-encoded halves: the indexed
//! parameters carried in `topics[1..]` (one 32-byte word each) and the
//! non-indexed parameters packed into the data payload as a tuple. Both
//! halves decode through alloy's dynamic ABI machinery and normalize into
//! [`AbiValue`]s keyed by parameter name.

use std::collections::HashMap;

use alloy_core::dyn_abi::{DynSolType, DynSolValue};
use logsync_core::decode::{DecodeError, LogDecoder};
use logsync_core::schema::{EventParam, InterfaceSpec, ParamKind};
use logsync_core::types::{AbiValue, DecodedEvent, RawLogEvent};

/// The EVM log decoder.
/// Thread-safe, cheap to clone (no heap state).
#[derive(Debug, Default, Clone)]
pub struct AbiLogDecoder;

impl AbiLogDecoder {
    pub fn new() -> Self {
        Self
    }

    /// Build an alloy `DynSolType` from a [`ParamKind`].
    fn kind_to_dyn(kind: &ParamKind) -> DynSolType {
        match kind {
            ParamKind::Uint(bits) => DynSolType::Uint(*bits as usize),
            ParamKind::Int(bits) => DynSolType::Int(*bits as usize),
            ParamKind::Bool => DynSolType::Bool,
            ParamKind::Address => DynSolType::Address,
            ParamKind::FixedBytes(n) => DynSolType::FixedBytes(*n as usize),
            ParamKind::Bytes => DynSolType::Bytes,
            ParamKind::Str => DynSolType::String,
        }
    }

    /// Decode a single indexed topic (always 32 bytes, ABI-encoded).
    ///
    /// # EVM ABI indexed-parameter encoding rules
    /// - **Value types** (uint, int, bool, address, bytes1–bytes32): padded to
    ///   32 bytes, stored directly — the value is recoverable.
    /// - **Reference types** (string, bytes): stored as the `keccak256` of
    ///   their contents — the original value is **unrecoverable**. The raw
    ///   32-byte hash is returned as `Bytes`.
    fn decode_topic(topic_hex: &str, kind: &ParamKind) -> Result<AbiValue, DecodeError> {
        let hex = topic_hex.strip_prefix("0x").unwrap_or(topic_hex);
        let bytes = hex::decode(hex).map_err(|e| DecodeError::InvalidRawLog {
            reason: format!("invalid topic hex: {e}"),
        })?;

        // Reference types are hashed in indexed position — return raw bytes.
        if matches!(kind, ParamKind::Str | ParamKind::Bytes) {
            return Ok(AbiValue::Bytes(bytes));
        }

        match Self::kind_to_dyn(kind).abi_decode(&bytes) {
            Ok(val) => Ok(normalize(val)),
            Err(e) => Err(DecodeError::AbiDecodeFailed {
                reason: format!("topic decode: {e}"),
            }),
        }
    }

    /// Decode the data payload (non-indexed params) as an ABI-encoded tuple.
    ///
    /// Event data is encoded as a parameter sequence, so offsets of dynamic
    /// members are relative to the start of the payload.
    fn decode_data(
        raw_data: &[u8],
        data_inputs: &[&EventParam],
    ) -> Result<HashMap<String, AbiValue>, DecodeError> {
        if data_inputs.is_empty() {
            return Ok(HashMap::new());
        }

        let tuple_type = DynSolType::Tuple(
            data_inputs
                .iter()
                .map(|p| Self::kind_to_dyn(&p.kind))
                .collect(),
        );
        let decoded = tuple_type
            .abi_decode_params(raw_data)
            .map_err(|e| DecodeError::AbiDecodeFailed {
                reason: e.to_string(),
            })?;

        let values = match decoded {
            DynSolValue::Tuple(vals) => vals,
            other => vec![other],
        };

        let mut out = HashMap::new();
        for (param, val) in data_inputs.iter().zip(values.into_iter()) {
            out.insert(param.name.clone(), normalize(val));
        }
        Ok(out)
    }
}

impl LogDecoder for AbiLogDecoder {
    fn decode(
        &self,
        interface: &InterfaceSpec,
        contract: &str,
        log: &RawLogEvent,
    ) -> Result<DecodedEvent, DecodeError> {
        let topic0 = log.topic0().ok_or(DecodeError::MissingTopic)?;
        let schema =
            interface
                .event_for_topic(topic0)
                .ok_or_else(|| DecodeError::UnknownTopic {
                    contract: contract.to_string(),
                    topic: topic0.to_string(),
                })?;

        let indexed = schema.indexed_inputs();
        if log.topics.len() != indexed.len() + 1 {
            return Err(DecodeError::AbiDecodeFailed {
                reason: format!(
                    "'{}' declares {} indexed parameters but the log carries {}",
                    schema.name,
                    indexed.len(),
                    log.topics.len() - 1,
                ),
            });
        }

        let mut args = HashMap::new();
        for (i, param) in indexed.iter().enumerate() {
            // topics[0] is the fingerprint; indexed params start at topics[1].
            let val = Self::decode_topic(&log.topics[i + 1], &param.kind)?;
            args.insert(param.name.clone(), val);
        }
        args.extend(Self::decode_data(&log.data, &schema.data_inputs())?);

        Ok(DecodedEvent {
            contract: contract.to_string(),
            event: schema.name.clone(),
            address: log.address.clone(),
            block_number: log.block_number,
            log_index: log.log_index,
            args,
        })
    }
}

/// Convert a decoded `DynSolValue` into an [`AbiValue`].
///
/// Integers that fit the native 128-bit types stay numeric; wider values are
/// carried as decimal strings so no precision is lost.
fn normalize(val: DynSolValue) -> AbiValue {
    match val {
        DynSolValue::Bool(b) => AbiValue::Bool(b),

        DynSolValue::Int(i, _bits) => match i128::try_from(i) {
            Ok(v) => AbiValue::Int(v),
            Err(_) => AbiValue::BigInt(i.to_string()),
        },

        DynSolValue::Uint(u, _bits) => match u128::try_from(u) {
            Ok(v) => AbiValue::Uint(v),
            Err(_) => AbiValue::BigUint(u.to_string()),
        },

        DynSolValue::FixedBytes(word, size) => AbiValue::Bytes(word[..size].to_vec()),

        DynSolValue::Bytes(b) => AbiValue::Bytes(b),

        DynSolValue::String(s) => AbiValue::Str(s),

        DynSolValue::Address(a) => AbiValue::Address(format!("{a:#x}")),

        // Composite values cannot arise from `ParamKind`; surface the raw
        // encoding rather than dropping the argument.
        other => AbiValue::Bytes(other.abi_encode()),
    }
}
