//! The scan cursor and block ranges

use std::fmt::{self, Display};

/// When the scan cursor advances relative to the log fetch
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum CursorPolicy {
    /// Advance the cursor to the end of the range before fetching logs
    ///
    /// A failed fetch is not retried, each range is processed at most once
    #[default]
    AdvanceBeforeFetch,
    /// Advance the cursor only once every fetch in the range succeeded
    ///
    /// A failed fetch discards the range's logs and the range is retried on
    /// the next trigger
    AdvanceAfterFetch,
}

/// An inclusive range of blocks
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct BlockRange {
    /// The first block in the range
    pub from: u64,
    /// The last block in the range
    pub to: u64,
}

impl BlockRange {
    /// Create a new block range
    pub fn new(from: u64, to: u64) -> Self {
        debug_assert!(from <= to, "empty block range");
        Self { from, to }
    }

    /// The number of blocks in the range
    pub fn block_count(&self) -> u64 {
        self.to - self.from + 1
    }

    /// Split the range into consecutive chunks of at most `max` blocks
    pub fn chunks(self, max: u64) -> impl Iterator<Item = BlockRange> {
        let max = max.max(1);
        let mut next = Some(self.from);
        std::iter::from_fn(move || {
            let from = next?;
            let to = from.saturating_add(max - 1).min(self.to);
            next = if to < self.to { Some(to + 1) } else { None };
            Some(BlockRange { from, to })
        })
    }
}

impl Display for BlockRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}]", self.from, self.to)
    }
}

/// The last block whose events have been processed
///
/// The cursor never moves backwards
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ScanCursor {
    /// The last block scanned
    last_block_scanned: u64,
}

impl ScanCursor {
    /// Create a cursor positioned at the given block
    pub fn new(last_block_scanned: u64) -> Self {
        Self { last_block_scanned }
    }

    /// The last block scanned
    pub fn last_block_scanned(&self) -> u64 {
        self.last_block_scanned
    }

    /// The unprocessed range ending at the target block
    ///
    /// Returns `None` if the target has already been scanned
    pub fn pending_range(&self, target: u64) -> Option<BlockRange> {
        if target <= self.last_block_scanned {
            return None;
        }

        Some(BlockRange::new(self.last_block_scanned + 1, target))
    }

    /// Advance the cursor to the given block
    ///
    /// A block at or behind the cursor leaves it unchanged
    pub fn advance_to(&mut self, block: u64) {
        self.last_block_scanned = self.last_block_scanned.max(block);
    }
}
