//! EVM log source.
//!
//! Adapts a JSON-RPC provider (`eth_blockNumber`, `eth_getLogs`, plus a
//! new-heads subscription) to the engine's [`ChainSource`]. Logs are fetched
//! unfiltered for the whole window; contract resolution happens client-side
//! in the router. Reorg-removed logs are dropped here, and the output is
//! normalized to `(block_number, log_index)` order regardless of what the
//! node returned.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use logsync_core::error::SyncError;
use logsync_core::source::{ChainSource, HeightStream};
use logsync_core::types::{BlockRange, RawLogEvent};

/// A raw EVM log as returned by `eth_getLogs`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawLog {
    pub address: String,
    pub topics: Vec<String>,
    #[serde(rename = "data")]
    pub data: String,
    #[serde(rename = "blockNumber")]
    pub block_number: String,
    #[serde(rename = "blockHash")]
    pub block_hash: String,
    #[serde(rename = "transactionHash")]
    pub tx_hash: String,
    #[serde(rename = "logIndex")]
    pub log_index: String,
    #[serde(rename = "removed")]
    pub removed: Option<bool>,
}

impl RawLog {
    /// Returns `true` if this log was removed by a reorg.
    pub fn is_removed(&self) -> bool {
        self.removed.unwrap_or(false)
    }

    /// Convert the wire log into the engine's raw event shape.
    ///
    /// Fails if the quantity fields are not valid hex; a node that reports
    /// unparsable positions cannot be scanned safely.
    pub fn into_event(self) -> Result<RawLogEvent, SyncError> {
        let block_number = parse_hex_u64(&self.block_number).ok_or_else(|| {
            SyncError::Source(format!("Bad blockNumber in log: {:?}", self.block_number))
        })?;
        let log_index = parse_hex_u64(&self.log_index)
            .ok_or_else(|| SyncError::Source(format!("Bad logIndex in log: {:?}", self.log_index)))?;
        let data = decode_hex(&self.data)
            .map_err(|e| SyncError::Source(format!("Bad data blob in log: {e}")))?;
        Ok(RawLogEvent {
            address: self.address,
            block_number,
            log_index,
            topics: self.topics,
            data,
        })
    }
}

/// Trait for fetching EVM data from a JSON-RPC provider.
#[async_trait]
pub trait EvmRpcClient: Send + Sync {
    /// `eth_blockNumber`.
    async fn get_block_number(&self) -> Result<u64, SyncError>;

    /// `eth_getLogs` over an inclusive block range, no address/topic filter.
    async fn get_logs(&self, from: u64, to: u64) -> Result<Vec<RawLog>, SyncError>;

    /// Subscribe to new-head height notifications (`eth_subscribe
    /// newHeads`, or polling where the transport has no subscriptions).
    async fn subscribe_heads(&self) -> Result<HeightStream, SyncError>;
}

/// [`ChainSource`] backed by an [`EvmRpcClient`].
pub struct EvmLogSource<C> {
    client: C,
}

impl<C: EvmRpcClient> EvmLogSource<C> {
    pub fn new(client: C) -> Self {
        Self { client }
    }
}

#[async_trait]
impl<C: EvmRpcClient> ChainSource for EvmLogSource<C> {
    async fn current_height(&self) -> Result<u64, SyncError> {
        self.client.get_block_number().await
    }

    async fn logs_in_range(&self, range: BlockRange) -> Result<Vec<RawLogEvent>, SyncError> {
        if range.is_empty() {
            return Ok(vec![]);
        }
        let raw = self.client.get_logs(range.from, range.to).await?;
        let mut events = Vec::with_capacity(raw.len());
        for log in raw {
            if log.is_removed() {
                continue;
            }
            events.push(log.into_event()?);
        }
        events.sort_by_key(|e| (e.block_number, e.log_index));
        Ok(events)
    }

    async fn subscribe_heights(&self) -> Result<HeightStream, SyncError> {
        self.client.subscribe_heads().await
    }
}

/// Parse a hex-encoded quantity (with or without `0x`) to u64.
pub fn parse_hex_u64(s: &str) -> Option<u64> {
    let s = s.strip_prefix("0x").unwrap_or(s);
    u64::from_str_radix(s, 16).ok()
}

/// Decode a `0x`-prefixed hex blob into bytes. `"0x"` decodes to empty.
pub fn decode_hex(s: &str) -> Result<Vec<u8>, hex::FromHexError> {
    hex::decode(s.strip_prefix("0x").unwrap_or(s))
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::stream;
    use std::sync::Mutex;

    #[test]
    fn parse_hex_u64_basic() {
        assert_eq!(parse_hex_u64("0x1"), Some(1));
        assert_eq!(parse_hex_u64("0xff"), Some(255));
        assert_eq!(parse_hex_u64("1234"), Some(0x1234));
        assert_eq!(parse_hex_u64("0xzz"), None);
        assert_eq!(parse_hex_u64(""), None);
    }

    #[test]
    fn raw_log_deserializes_from_rpc_json() {
        let json = r#"{
            "address": "0xa0b86991c6218b36c1d19d4a2e9eb0ce3606eb48",
            "topics": [
                "0xddf252ad1be2c89b69c2b068fc378daa952ba7f163c4a11628f55a4df523b3ef",
                "0x00000000000000000000000028c6c06298d514db089934071355e5743bf21d60"
            ],
            "data": "0x00000000000000000000000000000000000000000000000000000002540be400",
            "blockNumber": "0x112a880",
            "blockHash": "0x7d5a4369c8e1f05ab296b02e0da346c4e0c01e342e3c6e4de34b07a9ce7d3b9a",
            "transactionHash": "0x9e7d9f1bcd23a34cf5c8a3ad4d7e1f6bb3a1f2f3a60c5a8cf0b4d9e2c71a5b08",
            "transactionIndex": "0x42",
            "logIndex": "0x9f",
            "removed": false
        }"#;

        let log: RawLog = serde_json::from_str(json).unwrap();
        assert_eq!(log.topics.len(), 2);
        assert!(!log.is_removed());

        let event = log.into_event().unwrap();
        assert_eq!(event.block_number, 18_000_000);
        assert_eq!(event.log_index, 0x9f);
        assert_eq!(event.data.len(), 32);
        // 0x2540be400 sits in the low bytes of the word.
        assert_eq!(event.data[27], 0x02);
        assert_eq!(event.data[31], 0x00);
    }

    #[test]
    fn into_event_rejects_bad_quantities() {
        let log = RawLog {
            address: "0x0".into(),
            topics: vec![],
            data: "0x".into(),
            block_number: "not-hex".into(),
            block_hash: "0x0".into(),
            tx_hash: "0x0".into(),
            log_index: "0x5".into(),
            removed: None,
        };
        assert!(log.into_event().is_err());
    }

    // ─── Source behavior ──────────────────────────────────────────────────────

    struct MockRpc {
        logs: Mutex<Vec<RawLog>>,
        head: u64,
    }

    fn wire_log(block: &str, index: &str, removed: bool) -> RawLog {
        RawLog {
            address: "0xa0b86991c6218b36c1d19d4a2e9eb0ce3606eb48".into(),
            topics: vec!["0xddf252ad".into()],
            data: "0x".into(),
            block_number: block.into(),
            block_hash: "0x0".into(),
            tx_hash: "0x0".into(),
            log_index: index.into(),
            removed: Some(removed),
        }
    }

    #[async_trait]
    impl EvmRpcClient for MockRpc {
        async fn get_block_number(&self) -> Result<u64, SyncError> {
            Ok(self.head)
        }

        async fn get_logs(&self, _from: u64, _to: u64) -> Result<Vec<RawLog>, SyncError> {
            Ok(self.logs.lock().unwrap().clone())
        }

        async fn subscribe_heads(&self) -> Result<HeightStream, SyncError> {
            Ok(Box::pin(stream::iter(Vec::new())))
        }
    }

    #[tokio::test]
    async fn source_orders_and_filters_logs() {
        // Node returns logs out of order, with one removed by a reorg.
        let rpc = MockRpc {
            logs: Mutex::new(vec![
                wire_log("0x6e", "0x2", false), // (110, 2)
                wire_log("0x65", "0x0", false), // (101, 0)
                wire_log("0x6e", "0x0", true),  // removed
                wire_log("0x6e", "0x1", false), // (110, 1)
            ]),
            head: 0x6e,
        };
        let source = EvmLogSource::new(rpc);

        let events = source
            .logs_in_range(BlockRange::new(100, 110))
            .await
            .unwrap();
        let positions: Vec<(u64, u64)> =
            events.iter().map(|e| (e.block_number, e.log_index)).collect();
        assert_eq!(positions, vec![(101, 0), (110, 1), (110, 2)]);
    }

    #[tokio::test]
    async fn empty_range_skips_the_rpc() {
        let rpc = MockRpc {
            logs: Mutex::new(vec![wire_log("0x65", "0x0", false)]),
            head: 110,
        };
        let source = EvmLogSource::new(rpc);
        let events = source
            .logs_in_range(BlockRange::new(110, 100))
            .await
            .unwrap();
        assert!(events.is_empty());
    }

    #[tokio::test]
    async fn head_query_passes_through() {
        let rpc = MockRpc {
            logs: Mutex::new(vec![]),
            head: 18_000_000,
        };
        let source = EvmLogSource::new(rpc);
        assert_eq!(source.current_height().await.unwrap(), 18_000_000);
    }
}
