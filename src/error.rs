//! Error types shared by the arena and the index layers.

use thiserror::Error;

/// Failure to change the slot capacity of an arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ArenaError {
    /// The requested capacity cannot hold the elements currently stored.
    #[error("requested capacity {requested} is below the live element count {len}")]
    BelowLen { requested: usize, len: usize },
    /// The requested capacity does not fit in 32-bit slot indices.
    #[error("requested capacity {0} exceeds the maximum of {max}", max = crate::config::MAX_CAPACITY)]
    CapacityOverflow(usize),
    /// The global allocator refused the reservation; nothing was changed.
    #[error("allocation of {slots} slots failed")]
    AllocFailed { slots: usize },
}

/// Returned by `try_insert` when the container could not make room for a
/// new element. The rejected value is handed back untouched.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("insert failed: {error}")]
pub struct InsertError<T> {
    pub error: ArenaError,
    pub value: T,
}

impl<T> InsertError<T> {
    pub fn into_value(self) -> T {
        self.value
    }
}

/// A structural invariant reported broken by `check()`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CheckError {
    #[error("sentinel slot 0 is active")]
    SentinelActive,
    #[error("recorded count {recorded} differs from {actual} active slots")]
    CountMismatch { recorded: usize, actual: usize },
    #[error("slot {0} is active but unreachable from the index")]
    Unreachable(u32),
    #[error("slot {0} is reachable more than once")]
    Revisited(u32),
    #[error("slot {0} is linked but inactive")]
    InactiveLinked(u32),
    #[error("broken back link at slot {0}")]
    BrokenLink(u32),
    #[error("slot {slot} sits in bucket {found} but its hash selects bucket {expected}")]
    WrongBucket { slot: u32, found: usize, expected: usize },
    #[error("slot {0} caches a stale hash")]
    StaleHash(u32),
    #[error("slot {slot} stores balance {stored}, height difference is {actual}")]
    BadBalance { slot: u32, stored: i8, actual: i64 },
    #[error("in-order traversal is not strictly increasing at slot {0}")]
    Unordered(u32),
}
