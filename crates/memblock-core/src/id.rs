//! Process-unique block identifiers.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Counter for unique [`BlockId`] allocation.
static BLOCK_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Unique per-instance identifier for a block.
///
/// Allocated from a monotonic atomic counter via [`BlockId::next`]. Two
/// distinct blocks always have different ids, even if one is disposed and
/// the other is allocated at the same address afterwards — ids are never
/// reused within a process. This lets diagnostics and error reports refer
/// to a block without touching its (possibly freed) memory.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BlockId(u64);

impl BlockId {
    /// Allocate a fresh, unique block id.
    ///
    /// Each call returns an id that has never been returned before within
    /// this process. Thread-safe: safe under concurrent block construction
    /// from multiple threads.
    pub fn next() -> Self {
        Self(BLOCK_ID_COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// The raw counter value.
    pub fn value(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
