//! The `ChainSource` trait — everything the engine needs from a chain.

use async_trait::async_trait;
use futures::Stream;
use std::pin::Pin;

use crate::error::SyncError;
use crate::types::{BlockRange, RawLogEvent};

/// Stream of chain-head height notifications.
///
/// `Ok(height)` items are new chain heads; an `Err` item reports a broken
/// subscription. The engine treats end-of-stream as a graceful stop and an
/// `Err` item as fatal.
pub type HeightStream = Pin<Box<dyn Stream<Item = Result<u64, SyncError>> + Send>>;

/// Read access to a chain's logs and head, plus a head subscription.
///
/// Implementations must return logs ordered by `(block_number, log_index)`
/// ascending; the cursor arithmetic in the engine depends on it.
#[async_trait]
pub trait ChainSource: Send + Sync {
    /// The current chain head height.
    async fn current_height(&self) -> Result<u64, SyncError>;

    /// All logs emitted in the inclusive block range, ordered by
    /// `(block_number, log_index)`.
    async fn logs_in_range(&self, range: BlockRange) -> Result<Vec<RawLogEvent>, SyncError>;

    /// Subscribe to chain-head height notifications.
    async fn subscribe_heights(&self) -> Result<HeightStream, SyncError>;
}
