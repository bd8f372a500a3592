//! HashSet: chained hashing over the slot arena.
//!
//! Each slot carries a `ChainLink` (previous/next slot in its bucket chain
//! plus the cached 32-bit hash). A side table maps buckets to chain heads.
//! New elements are constructed at the arena's `next` slot and prepended
//! to their chain; removal unlinks and leaves a tombstone. When the arena
//! fills up and at least half of it is tombstones, the set compacts in
//! place instead of growing.

use crate::arena::{Arena, Handle, SlotIter, SlotIterMut};
use crate::config::{grown_slots, HashConfig, MAX_CAPACITY};
use crate::error::{ArenaError, CheckError, InsertError};
use crate::functor::{DefaultFunctor, HashFunctor};
use crate::guard::DebugReentrancy;
use core::fmt;
use core::hash::Hash;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct ChainLink {
    prev: u32,
    next: u32,
    hash: u32,
}

pub struct HashSet<T, F = DefaultFunctor> {
    arena: Arena<T, ChainLink>,
    buckets: Vec<u32>,
    load_factor: u8,
    functor: F,
    reentrancy: DebugReentrancy,
}

impl<T> HashSet<T>
where
    T: Hash + Eq,
{
    pub fn new() -> Self {
        Self::with_hasher(DefaultFunctor::default())
    }

    /// # Panics
    /// If `capacity` exceeds `MAX_CAPACITY` or the allocation fails.
    pub fn with_capacity(capacity: usize) -> Self {
        Self::with_capacity_and_hasher(capacity, DefaultFunctor::default())
    }
}

impl<T, F> Default for HashSet<T, F>
where
    F: HashFunctor<T> + Default,
{
    fn default() -> Self {
        Self::with_hasher(F::default())
    }
}

/// Elements in slot order.
pub struct Iter<'a, T> {
    it: SlotIter<'a, T, ChainLink>,
}

impl<'a, T> Iterator for Iter<'a, T> {
    type Item = &'a T;
    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        self.it.next().map(|(_, v)| v)
    }
    fn size_hint(&self) -> (usize, Option<usize>) {
        self.it.size_hint()
    }
}

impl<T> DoubleEndedIterator for Iter<'_, T> {
    #[inline]
    fn next_back(&mut self) -> Option<Self::Item> {
        self.it.next_back().map(|(_, v)| v)
    }
}

impl<T> ExactSizeIterator for Iter<'_, T> {}

/// Elements with their handles, in slot order.
pub struct Entries<'a, T> {
    it: SlotIter<'a, T, ChainLink>,
}

impl<'a, T> Iterator for Entries<'a, T> {
    type Item = (Handle, &'a T);
    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        self.it.next()
    }
    fn size_hint(&self) -> (usize, Option<usize>) {
        self.it.size_hint()
    }
}

impl<T> DoubleEndedIterator for Entries<'_, T> {
    #[inline]
    fn next_back(&mut self) -> Option<Self::Item> {
        self.it.next_back()
    }
}

impl<T> ExactSizeIterator for Entries<'_, T> {}

/// Mutable elements in slot order. Changing anything the functor hashes
/// requires a `rehash()` afterwards.
pub struct IterMut<'a, T> {
    it: SlotIterMut<'a, T, ChainLink>,
}

impl<'a, T> Iterator for IterMut<'a, T> {
    type Item = &'a mut T;
    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        self.it.next().map(|(_, v)| v)
    }
    fn size_hint(&self) -> (usize, Option<usize>) {
        self.it.size_hint()
    }
}

impl<T> DoubleEndedIterator for IterMut<'_, T> {
    #[inline]
    fn next_back(&mut self) -> Option<Self::Item> {
        self.it.next_back().map(|(_, v)| v)
    }
}

impl<T> ExactSizeIterator for IterMut<'_, T> {}

impl<T, F> HashSet<T, F>
where
    F: HashFunctor<T>,
{
    pub fn with_hasher(functor: F) -> Self {
        Self {
            arena: Arena::new(),
            buckets: Vec::new(),
            load_factor: HashConfig::default().load_factor,
            functor,
            reentrancy: DebugReentrancy::new(),
        }
    }

    /// # Panics
    /// If `capacity` exceeds `MAX_CAPACITY` or the allocation fails.
    pub fn with_capacity_and_hasher(capacity: usize, functor: F) -> Self {
        match Self::with_config(HashConfig::with_capacity(capacity), functor) {
            Ok(set) => set,
            Err(e) => panic!("HashSet::with_capacity: {e}"),
        }
    }

    pub fn with_config(config: HashConfig, functor: F) -> Result<Self, ArenaError> {
        let config = config.validated()?;
        let mut set = Self::with_hasher(functor);
        set.load_factor = config.load_factor;
        if config.capacity > 0 {
            set.resize_slots(config.capacity + 1)?;
        }
        Ok(set)
    }

    pub fn hasher(&self) -> &F {
        &self.functor
    }

    pub fn len(&self) -> usize {
        self.arena.len()
    }

    pub fn is_empty(&self) -> bool {
        self.arena.len() == 0
    }

    /// Elements storable before the next growth or compaction.
    pub fn capacity(&self) -> usize {
        self.arena.slot_capacity().saturating_sub(1)
    }

    pub fn bucket_count(&self) -> usize {
        self.buckets.len()
    }

    pub fn load_factor(&self) -> u8 {
        self.load_factor
    }

    #[inline]
    fn bucket_of(&self, hash: u32) -> usize {
        hash as usize % self.buckets.len()
    }

    fn hash_of(&self, value: &T) -> u32 {
        let _g = self.reentrancy.enter();
        self.functor.hash(value)
    }

    fn find_hashed(&self, hash: u32, eq: impl Fn(&T) -> bool) -> Option<u32> {
        if self.buckets.is_empty() {
            return None;
        }
        let _g = self.reentrancy.enter();
        let mut i = self.buckets[self.bucket_of(hash)];
        while i != 0 {
            let link = self.arena.meta(i);
            if link.hash == hash && eq(self.arena.value(i)) {
                return Some(i);
            }
            i = link.next;
        }
        None
    }

    pub fn find(&self, value: &T) -> Option<Handle> {
        let hash = self.hash_of(value);
        self.find_hashed(hash, |x| self.functor.equal(x, value))
            .map(Handle::new)
    }

    /// Lookup with a caller-computed hash, for probing by a projection of
    /// `T` (a map key, say). `hash` must be what the functor would return
    /// for any element `eq` accepts.
    pub fn find_by(&self, hash: u32, eq: impl Fn(&T) -> bool) -> Option<Handle> {
        self.find_hashed(hash, eq).map(Handle::new)
    }

    pub fn contains(&self, value: &T) -> bool {
        self.find(value).is_some()
    }

    pub fn get(&self, handle: Handle) -> Option<&T> {
        self.arena.get(handle.index())
    }

    /// Changing anything the functor hashes requires a `rehash()`.
    pub fn get_mut(&mut self, handle: Handle) -> Option<&mut T> {
        self.arena.get_mut(handle.index())
    }

    /// Handle of an element given a reference into this set.
    pub fn handle_of(&self, value: &T) -> Option<Handle> {
        self.arena.index_of(value).map(Handle::new)
    }

    /// Inserts `value` unless an equal element exists. Returns the handle
    /// of the stored element and whether `value` was inserted; a rejected
    /// duplicate is dropped.
    ///
    /// # Panics
    /// If growing the set fails; see `try_insert`.
    pub fn insert(&mut self, value: T) -> (Handle, bool) {
        match self.try_insert(value) {
            Ok(r) => r,
            Err(e) => panic!("HashSet::insert: {}", e.error),
        }
    }

    pub fn try_insert(&mut self, value: T) -> Result<(Handle, bool), InsertError<T>> {
        let hash = self.hash_of(&value);
        if let Some(i) = self.find_hashed(hash, |x| self.functor.equal(x, &value)) {
            return Ok((Handle::new(i), false));
        }
        if let Err(error) = self.reserve_one() {
            return Err(InsertError { error, value });
        }
        let i = self.link_new(hash, value);
        self.debug_check();
        Ok((Handle::new(i), true))
    }

    /// Emplace: builds the element with `make` only when no element
    /// accepted by `eq` exists in bucket `hash`. Same hash contract as
    /// `find_by`.
    ///
    /// # Panics
    /// If growing the set fails.
    pub fn insert_with(
        &mut self,
        hash: u32,
        eq: impl Fn(&T) -> bool,
        make: impl FnOnce() -> T,
    ) -> (Handle, bool) {
        self.insert_keyed(hash, (), |_, _, x| eq(x), |()| make())
    }

    /// `insert_with` for callers probing by an owned key: `eq` sees the
    /// functor and the key, and `make` consumes the key on a miss.
    pub(crate) fn insert_keyed<Q>(
        &mut self,
        hash: u32,
        key: Q,
        eq: impl Fn(&F, &Q, &T) -> bool,
        make: impl FnOnce(Q) -> T,
    ) -> (Handle, bool) {
        if let Some(i) = self.find_hashed(hash, |x| eq(&self.functor, &key, x)) {
            return (Handle::new(i), false);
        }
        if let Err(e) = self.reserve_one() {
            panic!("HashSet::insert_with: {e}");
        }
        let value = make(key);
        debug_assert_eq!(self.hash_of(&value), hash, "insert_with: hash mismatch");
        let i = self.link_new(hash, value);
        self.debug_check();
        (Handle::new(i), true)
    }

    /// Runs `f` on the functor with the reentrancy guard held, for
    /// wrappers hashing a projection of `T`.
    pub(crate) fn with_functor<R>(&self, f: impl FnOnce(&F) -> R) -> R {
        let _g = self.reentrancy.enter();
        f(&self.functor)
    }

    /// Element behind a handle this set just returned.
    pub(crate) fn value_at_mut(&mut self, handle: Handle) -> &mut T {
        self.arena.value_mut(handle.index())
    }

    /// Removes the element at `handle`, returning it.
    pub fn remove(&mut self, handle: Handle) -> Option<T> {
        let i = handle.index();
        if !self.arena.is_active(i) {
            return None;
        }
        self.unlink(i);
        let value = self.arena.take(i);
        self.debug_check();
        value
    }

    /// Removes and returns the element equal to `value`.
    pub fn take(&mut self, value: &T) -> Option<T> {
        let h = self.find(value)?;
        self.remove(h)
    }

    /// Unlinks the element at `handle` but leaves it in its slot. The set
    /// stays borrowed until the returned node is reinserted or consumed.
    pub fn extract(&mut self, handle: Handle) -> Option<Detached<'_, T, F>> {
        let i = handle.index();
        if !self.arena.is_active(i) {
            return None;
        }
        self.unlink(i);
        self.arena.detach(i);
        Some(Detached {
            set: self,
            index: i,
            done: false,
        })
    }

    /// Recomputes every cached hash and rebuilds all chains. Needed after
    /// mutating elements through `get_mut`/`iter_mut` in a way that
    /// changes their hash.
    pub fn rehash(&mut self) {
        {
            let _g = self.reentrancy.enter();
            let functor = &self.functor;
            self.arena
                .for_each_active_mut(|_, link, v| link.hash = functor.hash(v));
        }
        self.rebucket();
        tracing::debug!(len = self.len(), buckets = self.buckets.len(), "rehashed");
        self.debug_check();
    }

    /// Moves elements into tombstone gaps so slots `1..=len` are dense.
    /// Invalidates every handle.
    pub fn reorder(&mut self) {
        if self.arena.tombstones() == 0 {
            return;
        }
        self.arena.compact(|_, _, _| {});
        self.rebucket();
        self.debug_check();
    }

    /// Sets the element capacity. Fails without side effects when
    /// `capacity < len()`; may compact (invalidating handles) when the
    /// tombstones would not fit.
    pub fn resize(&mut self, capacity: usize) -> Result<(), ArenaError> {
        if capacity < self.len() {
            return Err(ArenaError::BelowLen {
                requested: capacity,
                len: self.len(),
            });
        }
        if capacity > MAX_CAPACITY {
            return Err(ArenaError::CapacityOverflow(capacity));
        }
        let slots = if capacity == 0 { 0 } else { capacity + 1 };
        if slots < self.arena.next() {
            self.reorder();
        }
        self.resize_slots(slots)?;
        self.debug_check();
        Ok(())
    }

    /// Makes room for `additional` more inserts without further growth.
    pub fn reserve(&mut self, additional: usize) -> Result<(), ArenaError> {
        let used = self.arena.next() - 1;
        if used.saturating_add(additional) <= self.capacity() {
            return Ok(());
        }
        let needed = self.len().saturating_add(additional);
        if needed <= self.capacity() {
            self.reorder();
            return Ok(());
        }
        self.resize(needed.max(grown_slots(self.arena.slot_capacity()) - 1))
    }

    /// Drops every element; keeps the allocation.
    pub fn clear(&mut self) {
        self.arena.clear();
        self.buckets.fill(0);
    }

    pub fn iter(&self) -> Iter<'_, T> {
        Iter {
            it: self.arena.iter(),
        }
    }

    pub fn entries(&self) -> Entries<'_, T> {
        Entries {
            it: self.arena.iter(),
        }
    }

    pub fn iter_mut(&mut self) -> IterMut<'_, T> {
        IterMut {
            it: self.arena.iter_mut(),
        }
    }

    /// Verifies chain linkage, cached hashes and counts.
    pub fn check(&self) -> Result<(), CheckError> {
        let slots = self.arena.slots();
        if slots.first().is_some_and(|s| s.active) {
            return Err(CheckError::SentinelActive);
        }
        let actual = slots.iter().filter(|s| s.active).count();
        if actual != self.len() {
            return Err(CheckError::CountMismatch {
                recorded: self.len(),
                actual,
            });
        }
        let mut seen = vec![false; slots.len()];
        let mut reached = 0usize;
        for (b, &head) in self.buckets.iter().enumerate() {
            let mut prev = 0u32;
            let mut i = head;
            while i != 0 {
                let Some(slot) = slots.get(i as usize) else {
                    return Err(CheckError::BrokenLink(prev));
                };
                if !slot.active {
                    return Err(CheckError::InactiveLinked(i));
                }
                if seen[i as usize] {
                    return Err(CheckError::Revisited(i));
                }
                seen[i as usize] = true;
                reached += 1;
                if slot.meta.prev != prev {
                    return Err(CheckError::BrokenLink(i));
                }
                let expected = self.bucket_of(slot.meta.hash);
                if expected != b {
                    return Err(CheckError::WrongBucket {
                        slot: i,
                        found: b,
                        expected,
                    });
                }
                if self.hash_of(self.arena.value(i)) != slot.meta.hash {
                    return Err(CheckError::StaleHash(i));
                }
                prev = i;
                i = slot.meta.next;
            }
        }
        if reached != actual {
            let lost = (1..slots.len())
                .find(|&i| slots[i].active && !seen[i])
                .unwrap_or(0);
            return Err(CheckError::Unreachable(lost as u32));
        }
        Ok(())
    }

    #[inline]
    fn debug_check(&self) {
        #[cfg(all(debug_assertions, feature = "paranoid"))]
        if let Err(e) = self.check() {
            panic!("HashSet invariant violated: {e}");
        }
    }

    /// Makes sure `next` has a free slot: compacts when at least half the
    /// capacity is tombstones, otherwise doubles.
    fn reserve_one(&mut self) -> Result<(), ArenaError> {
        if !self.arena.is_full() {
            return Ok(());
        }
        let slots = self.arena.slot_capacity();
        if self.arena.tombstones() > 0 && self.len() * 2 <= slots {
            self.arena.compact(|_, _, _| {});
            self.rebucket();
            return Ok(());
        }
        let grown = grown_slots(slots);
        if grown <= slots {
            return Err(ArenaError::CapacityOverflow(slots));
        }
        self.resize_slots(grown)
    }

    fn resize_slots(&mut self, slots: usize) -> Result<(), ArenaError> {
        let count = HashConfig {
            capacity: 0,
            load_factor: self.load_factor,
        }
        .bucket_count(slots);
        let mut buckets = Vec::new();
        buckets
            .try_reserve_exact(count)
            .map_err(|_| ArenaError::AllocFailed { slots })?;
        self.arena.resize(slots)?;
        buckets.resize(count, 0);
        self.buckets = buckets;
        self.rebucket();
        Ok(())
    }

    fn link_new(&mut self, hash: u32, value: T) -> u32 {
        let i = self.arena.push(value, ChainLink::default());
        self.link_head(i, hash);
        i
    }

    fn link_head(&mut self, i: u32, hash: u32) {
        let b = self.bucket_of(hash);
        let head = self.buckets[b];
        *self.arena.meta_mut(i) = ChainLink {
            prev: 0,
            next: head,
            hash,
        };
        if head != 0 {
            self.arena.meta_mut(head).prev = i;
        }
        self.buckets[b] = i;
    }

    fn unlink(&mut self, i: u32) {
        let ChainLink { prev, next, hash } = *self.arena.meta(i);
        if prev != 0 {
            self.arena.meta_mut(prev).next = next;
        } else {
            let b = self.bucket_of(hash);
            debug_assert_eq!(self.buckets[b], i, "chain head mismatch");
            self.buckets[b] = next;
        }
        if next != 0 {
            self.arena.meta_mut(next).prev = prev;
        }
        *self.arena.meta_mut(i) = ChainLink {
            prev: 0,
            next: 0,
            hash,
        };
    }

    /// Rebuilds every chain from the cached hashes.
    fn rebucket(&mut self) {
        self.buckets.fill(0);
        if self.buckets.is_empty() {
            return;
        }
        for i in 1..self.arena.next() as u32 {
            if self.arena.is_active(i) {
                let hash = self.arena.meta(i).hash;
                self.link_head(i, hash);
            }
        }
        tracing::trace!(len = self.len(), buckets = self.buckets.len(), "rebucketed");
    }
}

/// An element unlinked by `HashSet::extract`, still living in its slot.
///
/// Holds the set mutably borrowed, so nothing else can touch the set until
/// the node is reinserted or consumed. Dropping it discards the element.
pub struct Detached<'a, T, F>
where
    F: HashFunctor<T>,
{
    set: &'a mut HashSet<T, F>,
    index: u32,
    done: bool,
}

impl<T, F> Detached<'_, T, F>
where
    F: HashFunctor<T>,
{
    pub fn value(&self) -> &T {
        self.set.arena.value(self.index)
    }

    pub fn value_mut(&mut self) -> &mut T {
        self.set.arena.value_mut(self.index)
    }

    /// Links the element back into the set in its original slot. If an
    /// equal element was inserted meanwhile, this one is dropped and the
    /// other's handle is returned with `false`.
    pub fn reinsert(mut self) -> (Handle, bool) {
        self.done = true;
        let i = self.index;
        let set = &mut *self.set;
        let value = set.arena.value(i);
        let hash = set.hash_of(value);
        match set.find_hashed(hash, |x| set.functor.equal(x, value)) {
            Some(existing) => {
                drop(set.arena.discard(i));
                (Handle::new(existing), false)
            }
            None => {
                set.arena.reattach(i);
                set.link_head(i, hash);
                set.debug_check();
                (Handle::new(i), true)
            }
        }
    }

    /// Takes the element out for good, leaving a tombstone.
    pub fn into_value(mut self) -> T {
        self.done = true;
        self.set
            .arena
            .discard(self.index)
            .expect("detached slot must hold its value")
    }
}

impl<T, F> Drop for Detached<'_, T, F>
where
    F: HashFunctor<T>,
{
    fn drop(&mut self) {
        if !self.done {
            drop(self.set.arena.discard(self.index));
        }
    }
}

impl<T: fmt::Debug, F: HashFunctor<T>> fmt::Debug for Detached<'_, T, F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Detached").field(self.value()).finish()
    }
}

impl<T: Clone, F: Clone> Clone for HashSet<T, F> {
    fn clone(&self) -> Self {
        Self {
            arena: self.arena.clone(),
            buckets: self.buckets.clone(),
            load_factor: self.load_factor,
            functor: self.functor.clone(),
            reentrancy: DebugReentrancy::new(),
        }
    }
}

impl<T: fmt::Debug, F> fmt::Debug for HashSet<T, F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set()
            .entries(self.arena.iter().map(|(_, v)| v))
            .finish()
    }
}

impl<T, F: HashFunctor<T>> PartialEq for HashSet<T, F> {
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len() && self.iter().all(|v| other.contains(v))
    }
}

impl<T, F: HashFunctor<T>> Eq for HashSet<T, F> {}

impl<T, F: HashFunctor<T>> Extend<T> for HashSet<T, F> {
    fn extend<I: IntoIterator<Item = T>>(&mut self, iter: I) {
        for v in iter {
            self.insert(v);
        }
    }
}

impl<T, F: HashFunctor<T> + Default> FromIterator<T> for HashSet<T, F> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let mut set = Self::default();
        set.extend(iter);
        set
    }
}

impl<T, F: HashFunctor<T> + Default, const N: usize> From<[T; N]> for HashSet<T, F> {
    fn from(values: [T; N]) -> Self {
        let mut set = Self::default();
        if let Err(e) = set.reserve(N) {
            panic!("HashSet::from: {e}");
        }
        set.extend(values);
        set
    }
}

impl<'a, T, F: HashFunctor<T>> IntoIterator for &'a HashSet<T, F> {
    type Item = &'a T;
    type IntoIter = Iter<'a, T>;
    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    #[derive(Clone, Default)]
    struct ConstHash;
    impl HashFunctor<String> for ConstHash {
        fn hash(&self, _: &String) -> u32 {
            7
        }
        fn equal(&self, a: &String, b: &String) -> bool {
            a == b
        }
    }

    fn sorted<T: Ord + Clone, F: HashFunctor<T>>(s: &HashSet<T, F>) -> Vec<T> {
        s.iter().cloned().collect::<BTreeSet<_>>().into_iter().collect()
    }

    /// Invariant: duplicate inserts return the existing handle and leave the
    /// set unchanged.
    #[test]
    fn duplicate_insert_returns_existing() {
        let mut s: HashSet<String> = HashSet::new();
        let (h1, fresh) = s.insert("dup".to_string());
        assert!(fresh);
        let (h2, fresh) = s.insert("dup".to_string());
        assert!(!fresh);
        assert_eq!(h1, h2);
        assert_eq!(s.len(), 1);
        s.check().unwrap();
    }

    /// Invariant: `find(v).is_some() == contains(v)`; found value equals `v`.
    #[test]
    fn find_contains_parity() {
        let mut s: HashSet<i32> = HashSet::new();
        for v in [5, 10, 15] {
            s.insert(v);
        }
        for v in [5, 10, 15] {
            let h = s.find(&v).expect("present");
            assert_eq!(s.get(h), Some(&v));
            assert!(s.contains(&v));
        }
        for v in [0, 6, 20] {
            assert!(s.find(&v).is_none());
            assert!(!s.contains(&v));
        }
    }

    /// Invariant: removal by handle and by value returns the stored element
    /// exactly once.
    #[test]
    fn remove_and_take() {
        let mut s: HashSet<i32> = HashSet::from([1, 2, 3]);
        let h = s.find(&2).unwrap();
        assert_eq!(s.remove(h), Some(2));
        assert_eq!(s.remove(h), None);
        assert_eq!(s.take(&3), Some(3));
        assert_eq!(s.take(&3), None);
        assert!(!s.contains(&2));
        assert_eq!(s.len(), 1);
        s.check().unwrap();
    }

    /// Invariant: a full set mostly made of tombstones compacts instead of
    /// growing.
    #[test]
    fn churn_compacts_instead_of_growing() {
        let mut s: HashSet<u32> = HashSet::with_capacity(16);
        let cap = s.capacity();
        for round in 0..50u32 {
            for v in 0..4 {
                s.insert(round * 10 + v);
            }
            for v in 0..4 {
                assert!(s.take(&(round * 10 + v)).is_some());
            }
        }
        assert_eq!(s.capacity(), cap);
        assert!(s.is_empty());
        s.check().unwrap();
    }

    /// Invariant: growth keeps every element reachable and the bucket table
    /// no larger than the capacity.
    #[test]
    fn growth_keeps_elements() {
        let mut s: HashSet<u64> = HashSet::new();
        for v in 0..1000 {
            s.insert(v * 31);
        }
        assert_eq!(s.len(), 1000);
        assert!(s.bucket_count() <= s.capacity());
        for v in 0..1000 {
            assert!(s.contains(&(v * 31)));
        }
        s.check().unwrap();
    }

    /// Invariant: equality resolves the right element when every hash
    /// collides.
    #[test]
    fn collisions_resolved_by_equality() {
        let mut s: HashSet<String, ConstHash> = HashSet::with_hasher(ConstHash);
        for k in ["a", "b", "c", "d"] {
            s.insert(k.to_string());
        }
        let hb = s.find(&"b".to_string()).unwrap();
        assert_eq!(s.get(hb).map(String::as_str), Some("b"));
        s.take(&"c".to_string()).unwrap();
        assert!(s.contains(&"a".to_string()));
        assert!(s.contains(&"d".to_string()));
        assert!(!s.contains(&"c".to_string()));
        s.check().unwrap();
    }

    /// Invariant: an extracted element can be mutated and reinserted; the
    /// new value is found and the old one is gone.
    #[test]
    fn extract_mutate_reinsert() {
        let mut s: HashSet<i32> = HashSet::from([1, 2, 204]);
        let h = s.find(&204).unwrap();
        let mut node = s.extract(h).unwrap();
        assert_eq!(*node.value(), 204);
        *node.value_mut() = 205;
        let (h2, fresh) = node.reinsert();
        assert!(fresh);
        assert_eq!(h2, h, "reinsert reuses the original slot");
        assert!(s.contains(&205));
        assert!(!s.contains(&204));
        assert_eq!(s.len(), 3);
        s.check().unwrap();
    }

    /// Invariant: reinserting onto an equal element drops the detached one.
    #[test]
    fn reinsert_onto_duplicate_discards() {
        let mut s: HashSet<i32> = HashSet::from([1, 2]);
        let h = s.find(&1).unwrap();
        let mut node = s.extract(h).unwrap();
        *node.value_mut() = 2;
        let (h2, fresh) = node.reinsert();
        assert!(!fresh);
        assert_eq!(s.get(h2), Some(&2));
        assert_eq!(s.len(), 1);
        s.check().unwrap();
    }

    /// Invariant: dropping or consuming a detached node removes the element.
    #[test]
    fn detached_drop_and_into_value() {
        let mut s: HashSet<i32> = HashSet::from([1, 2]);
        let h = s.find(&1).unwrap();
        drop(s.extract(h).unwrap());
        assert_eq!(s.len(), 1);
        let h = s.find(&2).unwrap();
        assert_eq!(s.extract(h).unwrap().into_value(), 2);
        assert!(s.is_empty());
        s.check().unwrap();
    }

    /// Invariant: after mutating elements in place, `rehash` puts each one in
    /// the bucket its new hash selects.
    #[test]
    fn rehash_after_external_mutation() {
        let mut s: HashSet<i32> = (0..20).collect();
        for v in s.iter_mut() {
            *v += 100;
        }
        assert!(s.check().is_err(), "cached hashes are stale");
        s.rehash();
        s.check().unwrap();
        for v in 100..120 {
            assert!(s.contains(&v));
        }
    }

    /// Invariant: `resize` below `len` fails and changes nothing; resizing
    /// at or above `len` keeps every element.
    #[test]
    fn resize_safety() {
        let mut s: HashSet<i32> = (0..10).collect();
        s.take(&3);
        let before = sorted(&s);
        let cap = s.capacity();
        assert_eq!(
            s.resize(5),
            Err(ArenaError::BelowLen {
                requested: 5,
                len: 9
            })
        );
        assert_eq!(s.capacity(), cap);
        assert_eq!(sorted(&s), before);
        s.resize(9).unwrap();
        assert_eq!(s.capacity(), 9);
        assert_eq!(sorted(&s), before);
        s.resize(128).unwrap();
        assert_eq!(s.capacity(), 128);
        assert_eq!(sorted(&s), before);
        s.check().unwrap();
    }

    /// Invariant: `reorder` leaves no tombstones and keeps membership.
    #[test]
    fn reorder_compacts() {
        let mut s: HashSet<i32> = (0..32).collect();
        for v in (0..32).step_by(3) {
            s.take(&v);
        }
        let before = sorted(&s);
        s.reorder();
        assert_eq!(s.arena.tombstones(), 0);
        assert_eq!(sorted(&s), before);
        let indices: Vec<u32> = s.entries().map(|(h, _)| h.index()).collect();
        assert_eq!(indices, (1..=s.len() as u32).collect::<Vec<_>>());
        s.check().unwrap();
    }

    #[test]
    fn handle_of_reference_from_iteration() {
        let s: HashSet<i32> = HashSet::from([3, 4, 5]);
        for (h, v) in s.entries() {
            assert_eq!(s.handle_of(v), Some(h));
        }
        assert_eq!(s.handle_of(&4), None);
    }

    #[test]
    fn iteration_both_directions() {
        let s: HashSet<i32> = HashSet::from([1, 2, 3, 4]);
        let fwd: Vec<i32> = s.iter().copied().collect();
        let mut bwd: Vec<i32> = s.iter().rev().copied().collect();
        bwd.reverse();
        assert_eq!(fwd, bwd);
        assert_eq!(s.iter().len(), 4);
    }

    #[test]
    fn clear_keeps_capacity() {
        let mut s: HashSet<i32> = (0..10).collect();
        let cap = s.capacity();
        s.clear();
        assert!(s.is_empty());
        assert_eq!(s.capacity(), cap);
        assert!(!s.contains(&1));
        s.insert(1);
        assert!(s.contains(&1));
        s.check().unwrap();
    }

    #[test]
    fn insert_with_is_lazy() {
        let mut s: HashSet<i32> = HashSet::new();
        let hash = s.hasher().hash(&9);
        let (_, fresh) = s.insert_with(hash, |x| *x == 9, || 9);
        assert!(fresh);
        let (_, fresh) = s.insert_with(hash, |x| *x == 9, || unreachable!());
        assert!(!fresh);
        assert_eq!(s.len(), 1);
    }

    #[test]
    fn clone_and_eq() {
        let a: HashSet<i32> = (0..50).collect();
        let mut b = a.clone();
        assert_eq!(a, b);
        b.take(&7);
        assert_ne!(a, b);
        b.check().unwrap();
    }

    #[test]
    fn resize_beyond_index_limit_rejected() {
        let mut s: HashSet<i32> = HashSet::new();
        let err = s.resize(MAX_CAPACITY + 1).unwrap_err();
        assert_eq!(err, ArenaError::CapacityOverflow(MAX_CAPACITY + 1));
        assert!(s.try_insert(1).is_ok());
    }

    /// Invariant (debug-only): a functor reentering its own set panics.
    #[cfg(debug_assertions)]
    #[test]
    fn reentrancy_panics_from_functor() {
        struct Nosy(*const HashSet<i32, Nosy>);
        impl HashFunctor<i32> for Nosy {
            fn hash(&self, v: &i32) -> u32 {
                *v as u32
            }
            fn equal(&self, a: &i32, b: &i32) -> bool {
                if !self.0.is_null() {
                    // Aliased access from inside a probe.
                    unsafe {
                        let _ = (*self.0).len();
                        let _ = (*self.0).contains(b);
                    }
                }
                a == b
            }
        }
        let mut s: HashSet<i32, Nosy> = HashSet::with_hasher(Nosy(core::ptr::null()));
        s.insert(1);
        s.functor.0 = &s as *const _;
        let res = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _ = s.contains(&1);
        }));
        assert!(res.is_err(), "expected reentrancy to panic in debug builds");
    }

    /// Invariant: a refused allocation leaves the set exactly as it was.
    #[test]
    fn alloc_failure_leaves_set_unchanged() {
        type Big = [u8; 1 << 16];
        let mut s: HashSet<Big> = HashSet::new();
        s.insert([7; 1 << 16]);
        let (len, cap, buckets) = (s.len(), s.capacity(), s.bucket_count());
        let err = s.resize(MAX_CAPACITY).unwrap_err();
        assert!(matches!(err, ArenaError::AllocFailed { .. }), "{err}");
        assert_eq!((s.len(), s.capacity(), s.bucket_count()), (len, cap, buckets));
        assert!(s.contains(&[7; 1 << 16]));
        s.check().unwrap();

        let built = HashSet::<Big>::with_config(
            HashConfig::with_capacity(MAX_CAPACITY),
            DefaultFunctor::default(),
        );
        assert!(matches!(built, Err(ArenaError::AllocFailed { .. })));
    }
}
