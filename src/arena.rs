//! Slot arena: one reallocatable array of slots addressed by `u32` index.
//!
//! Slot 0 is a sentinel that is never active, so index 0 doubles as the
//! null link for the index layers. Values are constructed at `next` and
//! never move until the arena is compacted; deleted slots stay behind as
//! tombstones. Growth may reallocate, which is why every structural link
//! stored in slot metadata is an index rather than a pointer.

use crate::config::MAX_CAPACITY;
use crate::error::ArenaError;
use core::iter::Enumerate;
use core::slice;

/// Position of an element inside its container.
///
/// A handle stays valid until the next call that may grow or compact the
/// container (`insert`, `resize`, `reorder`, `clear`, ...). A stale handle
/// never causes unsafety: it resolves to `None` or to whichever element
/// now occupies the slot.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct Handle(u32);

impl Handle {
    pub(crate) fn new(index: u32) -> Self {
        debug_assert!(index != 0, "sentinel slot has no handle");
        Handle(index)
    }

    /// Raw slot index, always `>= 1`.
    pub fn index(self) -> u32 {
        self.0
    }
}

#[derive(Debug, Clone)]
pub(crate) struct Slot<T, M> {
    pub(crate) active: bool,
    pub(crate) meta: M,
    pub(crate) value: Option<T>,
}

impl<T, M: Default> Slot<T, M> {
    fn sentinel() -> Self {
        Slot {
            active: false,
            meta: M::default(),
            value: None,
        }
    }
}

#[derive(Debug)]
pub(crate) struct Arena<T, M> {
    // `slots.len()` is `next` once the sentinel exists.
    slots: Vec<Slot<T, M>>,
    // Reserved slots, sentinel included; 0 before the first allocation.
    capacity: usize,
    count: usize,
}

impl<T, M> Arena<T, M> {
    pub(crate) const fn new() -> Self {
        Self {
            slots: Vec::new(),
            capacity: 0,
            count: 0,
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.count
    }

    pub(crate) fn next(&self) -> usize {
        self.slots.len().max(1)
    }

    pub(crate) fn slot_capacity(&self) -> usize {
        self.capacity
    }

    pub(crate) fn tombstones(&self) -> usize {
        self.next() - 1 - self.count
    }

    /// True when constructing another value needs a resize or compaction.
    pub(crate) fn is_full(&self) -> bool {
        self.next() >= self.capacity
    }

    pub(crate) fn slots(&self) -> &[Slot<T, M>] {
        &self.slots
    }

    pub(crate) fn is_active(&self, i: u32) -> bool {
        self.slots.get(i as usize).is_some_and(|s| s.active)
    }

    pub(crate) fn get(&self, i: u32) -> Option<&T> {
        self.slots
            .get(i as usize)
            .filter(|s| s.active)
            .and_then(|s| s.value.as_ref())
    }

    pub(crate) fn get_mut(&mut self, i: u32) -> Option<&mut T> {
        self.slots
            .get_mut(i as usize)
            .filter(|s| s.active)
            .and_then(|s| s.value.as_mut())
    }

    /// Value of a slot known to be linked or detached.
    pub(crate) fn value(&self, i: u32) -> &T {
        self.slots[i as usize]
            .value
            .as_ref()
            .expect("linked slot must hold a value")
    }

    pub(crate) fn value_mut(&mut self, i: u32) -> &mut T {
        self.slots[i as usize]
            .value
            .as_mut()
            .expect("linked slot must hold a value")
    }

    pub(crate) fn meta(&self, i: u32) -> &M {
        &self.slots[i as usize].meta
    }

    pub(crate) fn meta_mut(&mut self, i: u32) -> &mut M {
        &mut self.slots[i as usize].meta
    }

    /// Constructs `value` at `next`. The caller must have made room.
    pub(crate) fn push(&mut self, value: T, meta: M) -> u32 {
        debug_assert!(!self.slots.is_empty(), "sentinel missing");
        debug_assert!(!self.is_full(), "push into a full arena");
        let i = self.slots.len();
        self.slots.push(Slot {
            active: true,
            meta,
            value: Some(value),
        });
        self.count += 1;
        i as u32
    }

    /// Destroys an active value, leaving a tombstone.
    pub(crate) fn take(&mut self, i: u32) -> Option<T> {
        let slot = self.slots.get_mut(i as usize).filter(|s| s.active)?;
        slot.active = false;
        self.count -= 1;
        slot.value.take()
    }

    /// Marks a slot inactive but keeps its value in place.
    pub(crate) fn detach(&mut self, i: u32) {
        let slot = &mut self.slots[i as usize];
        debug_assert!(slot.active && slot.value.is_some());
        slot.active = false;
        self.count -= 1;
    }

    /// Re-activates a detached slot without reconstructing its value.
    pub(crate) fn reattach(&mut self, i: u32) {
        let slot = &mut self.slots[i as usize];
        debug_assert!(!slot.active && slot.value.is_some());
        slot.active = true;
        self.count += 1;
    }

    /// Moves the value out of a detached slot, turning it into a tombstone.
    pub(crate) fn discard(&mut self, i: u32) -> Option<T> {
        let slot = &mut self.slots[i as usize];
        debug_assert!(!slot.active);
        slot.value.take()
    }

    /// Runs `f` over every active slot in index order.
    pub(crate) fn for_each_active_mut(&mut self, mut f: impl FnMut(u32, &mut M, &T)) {
        for (i, slot) in self.slots.iter_mut().enumerate() {
            if let (true, Some(v)) = (slot.active, slot.value.as_ref()) {
                f(i as u32, &mut slot.meta, v);
            }
        }
    }

    /// Slot index of `value` if it points into this arena's current
    /// storage, found by address arithmetic alone.
    pub(crate) fn index_of(&self, value: &T) -> Option<u32> {
        let stride = core::mem::size_of::<Slot<T, M>>();
        let base = self.slots.as_ptr() as usize;
        let addr = value as *const T as usize;
        if stride == 0 || addr < base {
            return None;
        }
        let i = (addr - base) / stride;
        let slot = self.slots.get(i)?;
        match &slot.value {
            Some(v) if slot.active && core::ptr::eq(v, value) => Some(i as u32),
            _ => None,
        }
    }

    /// Changes the reserved slot count, sentinel included.
    ///
    /// Never drops live values; shrinking below `next` requires a prior
    /// `compact`. On error the arena is left exactly as it was.
    pub(crate) fn resize(&mut self, slots: usize) -> Result<(), ArenaError>
    where
        M: Default,
    {
        if slots > MAX_CAPACITY + 1 {
            return Err(ArenaError::CapacityOverflow(slots - 1));
        }
        let requested = slots.saturating_sub(1);
        if requested < self.count {
            return Err(ArenaError::BelowLen {
                requested,
                len: self.count,
            });
        }
        if slots < self.slots.len() && !(slots == 0 && self.count == 0) {
            return Err(ArenaError::BelowLen {
                requested,
                len: self.next() - 1,
            });
        }
        let from = self.capacity;
        if slots == 0 {
            self.slots = Vec::new();
        } else if slots > self.slots.len() {
            let additional = slots - self.slots.len();
            self.slots
                .try_reserve_exact(additional)
                .map_err(|_| ArenaError::AllocFailed { slots })?;
            if self.slots.is_empty() {
                self.slots.push(Slot::sentinel());
            }
        } else {
            self.slots.shrink_to(slots);
        }
        self.capacity = slots;
        tracing::debug!(from, to = slots, len = self.count, "arena resized");
        Ok(())
    }

    /// Moves the highest active slots into the lowest tombstones and
    /// lowers `next` to `len + 1`. `relocate(slots, from, to)` runs after
    /// each move so the caller can repoint links to the moved slot.
    pub(crate) fn compact(&mut self, mut relocate: impl FnMut(&mut [Slot<T, M>], u32, u32)) {
        if self.slots.len() <= 1 {
            return;
        }
        let before = self.slots.len();
        let mut moved = 0usize;
        let mut lo = 1;
        let mut hi = self.slots.len() - 1;
        loop {
            while lo < hi && self.slots[lo].active {
                lo += 1;
            }
            while hi > lo && !self.slots[hi].active {
                hi -= 1;
            }
            if lo >= hi {
                break;
            }
            self.slots.swap(lo, hi);
            relocate(&mut self.slots, hi as u32, lo as u32);
            moved += 1;
            lo += 1;
            hi -= 1;
        }
        self.slots.truncate(self.count + 1);
        tracing::debug!(moved, from = before, to = self.slots.len(), "arena compacted");
    }

    /// Destroys every value; keeps the reserved storage.
    pub(crate) fn clear(&mut self) {
        self.slots.truncate(1);
        if let Some(sentinel) = self.slots.first_mut() {
            sentinel.active = false;
        }
        self.count = 0;
    }

    pub(crate) fn iter(&self) -> SlotIter<'_, T, M> {
        SlotIter {
            inner: self.slots.iter().enumerate(),
            remaining: self.count,
        }
    }

    pub(crate) fn iter_mut(&mut self) -> SlotIterMut<'_, T, M> {
        SlotIterMut {
            remaining: self.count,
            inner: self.slots.iter_mut().enumerate(),
        }
    }
}

impl<T: Clone, M: Clone> Clone for Arena<T, M> {
    fn clone(&self) -> Self {
        let mut slots = Vec::with_capacity(self.capacity);
        slots.extend(self.slots.iter().cloned());
        Self {
            slots,
            capacity: self.capacity,
            count: self.count,
        }
    }
}

/// Active slots in index order, from either end.
pub(crate) struct SlotIter<'a, T, M> {
    inner: Enumerate<slice::Iter<'a, Slot<T, M>>>,
    remaining: usize,
}

impl<'a, T, M> Iterator for SlotIter<'a, T, M> {
    type Item = (Handle, &'a T);

    fn next(&mut self) -> Option<Self::Item> {
        for (i, slot) in self.inner.by_ref() {
            if let (true, Some(v)) = (slot.active, slot.value.as_ref()) {
                self.remaining -= 1;
                return Some((Handle::new(i as u32), v));
            }
        }
        None
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<T, M> DoubleEndedIterator for SlotIter<'_, T, M> {
    fn next_back(&mut self) -> Option<Self::Item> {
        while let Some((i, slot)) = self.inner.next_back() {
            if let (true, Some(v)) = (slot.active, slot.value.as_ref()) {
                self.remaining -= 1;
                return Some((Handle::new(i as u32), v));
            }
        }
        None
    }
}

impl<T, M> ExactSizeIterator for SlotIter<'_, T, M> {}

pub(crate) struct SlotIterMut<'a, T, M> {
    inner: Enumerate<slice::IterMut<'a, Slot<T, M>>>,
    remaining: usize,
}

impl<'a, T, M> Iterator for SlotIterMut<'a, T, M> {
    type Item = (Handle, &'a mut T);

    fn next(&mut self) -> Option<Self::Item> {
        for (i, slot) in self.inner.by_ref() {
            if let (true, Some(v)) = (slot.active, slot.value.as_mut()) {
                self.remaining -= 1;
                return Some((Handle::new(i as u32), v));
            }
        }
        None
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<T, M> DoubleEndedIterator for SlotIterMut<'_, T, M> {
    fn next_back(&mut self) -> Option<Self::Item> {
        while let Some((i, slot)) = self.inner.next_back() {
            if let (true, Some(v)) = (slot.active, slot.value.as_mut()) {
                self.remaining -= 1;
                return Some((Handle::new(i as u32), v));
            }
        }
        None
    }
}

impl<T, M> ExactSizeIterator for SlotIterMut<'_, T, M> {}

#[cfg(test)]
mod tests {
    use super::*;
    use std::rc::Rc;

    fn arena_with(values: &[i32]) -> Arena<i32, u32> {
        let mut a = Arena::new();
        a.resize(values.len() + 1).unwrap();
        for &v in values {
            a.push(v, 0);
        }
        a
    }

    #[test]
    fn empty_arena_allocates_nothing() {
        let a: Arena<i32, u32> = Arena::new();
        assert_eq!(a.len(), 0);
        assert_eq!(a.next(), 1);
        assert_eq!(a.slot_capacity(), 0);
        assert!(a.is_full());
        assert_eq!(a.iter().count(), 0);
    }

    #[test]
    fn push_take_leaves_tombstones() {
        let mut a = arena_with(&[10, 20, 30]);
        assert_eq!(a.len(), 3);
        assert!(a.is_full());
        assert_eq!(a.take(2), Some(20));
        assert_eq!(a.take(2), None, "tombstone cannot be taken twice");
        assert_eq!(a.len(), 2);
        assert_eq!(a.next(), 4);
        assert_eq!(a.tombstones(), 1);
        assert_eq!(a.get(2), None);
        assert_eq!(a.get(0), None, "sentinel is never active");
        let seen: Vec<_> = a.iter().map(|(h, v)| (h.index(), *v)).collect();
        assert_eq!(seen, vec![(1, 10), (3, 30)]);
        let back: Vec<_> = a.iter().rev().map(|(_, v)| *v).collect();
        assert_eq!(back, vec![30, 10]);
    }

    #[test]
    fn resize_below_len_fails_and_keeps_state() {
        let mut a = arena_with(&[1, 2, 3]);
        let err = a.resize(3).unwrap_err();
        assert_eq!(err, ArenaError::BelowLen { requested: 2, len: 3 });
        assert_eq!(a.slot_capacity(), 4);
        assert_eq!(a.iter().map(|(_, v)| *v).collect::<Vec<_>>(), vec![1, 2, 3]);
        assert!(matches!(
            a.resize(MAX_CAPACITY + 2),
            Err(ArenaError::CapacityOverflow(_))
        ));
    }

    #[test]
    fn resize_below_next_requires_compaction() {
        let mut a = arena_with(&[1, 2, 3, 4]);
        a.take(1);
        a.take(2);
        assert!(a.resize(3).is_err());
        a.compact(|_, _, _| {});
        assert_eq!(a.next(), 3);
        a.resize(3).unwrap();
        assert_eq!(a.slot_capacity(), 3);
        let mut vals: Vec<_> = a.iter().map(|(_, v)| *v).collect();
        vals.sort();
        assert_eq!(vals, vec![3, 4]);
    }

    #[test]
    fn compact_moves_tail_into_gaps() {
        let mut a = arena_with(&[1, 2, 3, 4, 5, 6]);
        a.take(2);
        a.take(3);
        a.take(5);
        let mut moves = Vec::new();
        a.compact(|slots, from, to| {
            assert!(slots[to as usize].active);
            assert!(!slots[from as usize].active);
            moves.push((from, to));
        });
        assert_eq!(moves, vec![(6, 2), (4, 3)]);
        assert_eq!(a.next(), 4);
        assert_eq!(a.tombstones(), 0);
        let seen: Vec<_> = a.iter().map(|(h, v)| (h.index(), *v)).collect();
        assert_eq!(seen, vec![(1, 1), (2, 6), (3, 4)]);
    }

    #[test]
    fn detach_and_reattach_keep_value_in_place() {
        let mut a = arena_with(&[7, 8]);
        a.detach(1);
        assert_eq!(a.len(), 1);
        assert_eq!(a.get(1), None);
        *a.value_mut(1) += 1;
        a.reattach(1);
        assert_eq!(a.get(1), Some(&8));
        assert_eq!(a.len(), 2);
        a.detach(2);
        assert_eq!(a.discard(2), Some(8));
        assert_eq!(a.tombstones(), 1);
    }

    #[test]
    fn index_of_recovers_slot_from_reference() {
        let a = arena_with(&[5, 6, 7]);
        let (h, v) = a.iter().nth(1).unwrap();
        assert_eq!(a.index_of(v), Some(h.index()));
        let outside = 6;
        assert_eq!(a.index_of(&outside), None);
        let other = arena_with(&[6]);
        assert_eq!(a.index_of(other.get(1).unwrap()), None);
    }

    #[test]
    fn clear_drops_values_but_keeps_capacity() {
        let token = Rc::new(());
        let mut a: Arena<Rc<()>, u32> = Arena::new();
        a.resize(5).unwrap();
        for _ in 0..4 {
            a.push(token.clone(), 0);
        }
        assert_eq!(Rc::strong_count(&token), 5);
        a.clear();
        assert_eq!(Rc::strong_count(&token), 1);
        assert_eq!(a.len(), 0);
        assert_eq!(a.next(), 1);
        assert_eq!(a.slot_capacity(), 5);
    }

    #[test]
    fn clone_preserves_layout() {
        let mut a = arena_with(&[1, 2, 3]);
        a.take(2);
        let b = a.clone();
        assert_eq!(b.len(), 2);
        assert_eq!(b.next(), 4);
        assert_eq!(b.slot_capacity(), a.slot_capacity());
        assert_eq!(b.get(3), Some(&3));
    }
}
