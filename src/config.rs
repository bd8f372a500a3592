//! Construction options and capacity limits.

use crate::error::ArenaError;

/// Slot count a container grows to on its first insert.
pub const MIN_CAPACITY: usize = 8;

/// Largest element capacity. Slot indices are `u32`, slot 0 is reserved
/// and `u32::MAX` is kept free so `capacity + 1` never overflows.
pub const MAX_CAPACITY: usize = (u32::MAX - 2) as usize;

/// Bucket table size as a percentage of the element capacity.
pub const DEFAULT_LOAD_FACTOR: u8 = 75;

/// Options for `HashSet::with_config` / `HashMap::with_config`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HashConfig {
    /// Elements to reserve room for up front; 0 defers allocation.
    pub capacity: usize,
    /// Buckets per hundred elements of capacity, in `1..=100`.
    pub load_factor: u8,
}

impl Default for HashConfig {
    fn default() -> Self {
        Self {
            capacity: 0,
            load_factor: DEFAULT_LOAD_FACTOR,
        }
    }
}

impl HashConfig {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity,
            ..Self::default()
        }
    }

    /// Clamps the load factor into `1..=100` and checks the capacity limit.
    pub(crate) fn validated(self) -> Result<Self, ArenaError> {
        if self.capacity > MAX_CAPACITY {
            return Err(ArenaError::CapacityOverflow(self.capacity));
        }
        Ok(Self {
            capacity: self.capacity,
            load_factor: self.load_factor.clamp(1, 100),
        })
    }

    /// Number of buckets for an arena of `slots` slots.
    pub(crate) fn bucket_count(&self, slots: usize) -> usize {
        if slots == 0 {
            return 0;
        }
        // u64 keeps `slots * load_factor` from overflowing 32-bit usize.
        ((slots as u64 * self.load_factor as u64 / 100) as usize).max(1)
    }
}

/// Options for `TreeSet::with_config` / `TreeMap::with_config`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TreeConfig {
    /// Elements to reserve room for up front; 0 defers allocation.
    pub capacity: usize,
}

impl TreeConfig {
    pub fn with_capacity(capacity: usize) -> Self {
        Self { capacity }
    }

    pub(crate) fn validated(self) -> Result<Self, ArenaError> {
        if self.capacity > MAX_CAPACITY {
            return Err(ArenaError::CapacityOverflow(self.capacity));
        }
        Ok(self)
    }
}

/// Next slot count when a full arena of `slots` slots must grow.
pub(crate) fn grown_slots(slots: usize) -> usize {
    slots.saturating_mul(2).max(MIN_CAPACITY + 1).min(MAX_CAPACITY + 1)
}
