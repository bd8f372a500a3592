//! arena-collections: hash and AVL-tree sets and maps that keep every
//! element in one contiguous, reallocatable slot arena.
//!
//! Internal Design:
//!
//! Summary
//! - Goal: associative containers that never allocate per element. All
//!   structural links are 32-bit slot indices, so the arena may move on
//!   growth without invalidating the structure.
//! - Layers:
//!   - Arena<T, M>: `Vec` of slots (`active`, metadata `M`, `Option<T>`)
//!     with a sentinel at index 0, tombstones for deleted slots and
//!     compaction that reports every move to the index layer.
//!   - HashSet<T, F>: chained hashing. `M` is a doubly linked chain link
//!     plus the cached 32-bit hash; a separate bucket table of chain heads
//!     is sized from the load factor.
//!   - TreeSet<T, F>: AVL tree. `M` holds parent/left/right indices and a
//!     balance factor in {-1, 0, 1}.
//!   - HashMap / TreeMap: sets of `KeyValue<K, V>` whose functor looks at
//!     the key only.
//!
//! Constraints
//! - Single-threaded; no internal synchronization.
//! - At most `MAX_CAPACITY` elements per container (32-bit indices with
//!   the sentinel reserved).
//! - Unique elements: a duplicate insert returns the existing handle and
//!   drops the new value.
//! - Growth doubles; when at least half the slots are tombstones a full
//!   arena is compacted instead.
//!
//! Handles
//! - `Handle` is a slot index. Growth keeps it valid; compaction
//!   (`reorder`, `resize`, or an insert that compacts) does not. A stale
//!   handle is memory safe: it resolves to `None` or to the current
//!   occupant of its slot.
//!
//! Reentrancy policy
//! - User functors run while chains or tree links are half rewritten. A
//!   debug-only guard panics if a functor re-enters its own container;
//!   release builds carry no guard state.
//!
//! Detached nodes
//! - `extract` unlinks an element but leaves it in its slot; the returned
//!   `Detached` borrows the container mutably until it is reinserted (same
//!   slot, new position) or consumed. Dropping it discards the element.
//!
//! Features
//! - `paranoid`: in debug builds, run `check()` after every mutation.

mod arena;
pub mod config;
pub mod error;
pub mod functor;
mod guard;
pub mod hash_map;
mod hash_set_proptest;
pub mod hash_set;
pub mod key_value;
pub mod tree_map;
mod tree_set_proptest;
pub mod tree_set;

// Public surface
pub use arena::Handle;
pub use config::{HashConfig, TreeConfig, DEFAULT_LOAD_FACTOR, MAX_CAPACITY, MIN_CAPACITY};
pub use error::{ArenaError, CheckError, InsertError};
pub use functor::{CompareFunctor, DefaultFunctor, HashFunctor, Reverse};
pub use hash_map::HashMap;
pub use hash_set::HashSet;
pub use key_value::{KeyFunctor, KeyValue};
pub use tree_map::TreeMap;
pub use tree_set::TreeSet;
