//! Sync cursor — tracks the engine's durable position in the log stream.

use serde::{Deserialize, Serialize};

/// The engine's current position in the chain's log stream.
///
/// The cursor knows:
/// - Which block the engine last touched
/// - The index of the last log dispatched inside that block
///
/// Positions are ordered lexicographically on `(block, log_position)`, and
/// every mutation moves the cursor forward under that ordering. Once a block
/// range has been fully scanned, `log_position` is set to [`Cursor::DRAINED`]
/// so that resumption never replays any log of the final block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cursor {
    /// Block the engine last touched.
    pub block: u64,
    /// Index of the last log dispatched within `block`, or [`Cursor::DRAINED`]
    /// when the block is known to hold no further logs of interest.
    pub log_position: u64,
}

impl Cursor {
    /// Sentinel log position marking a block as fully drained. Compares
    /// greater than any real log index.
    pub const DRAINED: u64 = u64::MAX;

    /// Create a cursor at the start of the given block.
    pub fn start_at(block: u64) -> Self {
        Self {
            block,
            log_position: 0,
        }
    }

    /// Move the cursor onto a dispatched log.
    pub fn advance_to(&mut self, block: u64, log_index: u64) {
        self.block = block;
        self.log_position = log_index;
    }

    /// Mark every block up to and including `block` as fully scanned.
    pub fn complete_through(&mut self, block: u64) {
        self.block = block;
        self.log_position = Self::DRAINED;
    }

    /// Returns `true` if a log at `(block, log_index)` is already covered by
    /// this cursor, i.e. it is not strictly after the cursor position and a
    /// resuming engine must not dispatch it again.
    pub fn covers(&self, block: u64, log_index: u64) -> bool {
        block < self.block || (block == self.block && log_index <= self.log_position)
    }

    /// The cursor position as an ordered pair, for comparisons.
    pub fn position(&self) -> (u64, u64) {
        (self.block, self.log_position)
    }
}
