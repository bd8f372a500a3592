//! TreeSet: an AVL tree threaded through the slot arena.
//!
//! Each slot carries a `TreeLink` with parent/left/right slot indices and
//! a balance factor `height(right) - height(left)`. Insertions retrace
//! toward the root until a balance returns to zero or one rotation
//! restores the height; deletions retrace from the point of physical
//! removal. Compaction moves slots and repoints the neighbours' links, so
//! the shape of the tree never has to be rebuilt.

use crate::arena::{Arena, Handle, Slot};
use crate::config::{grown_slots, TreeConfig, MAX_CAPACITY};
use crate::error::{ArenaError, CheckError, InsertError};
use crate::functor::{CompareFunctor, DefaultFunctor};
use crate::guard::DebugReentrancy;
use core::cmp::Ordering;
use core::fmt;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct TreeLink {
    parent: u32,
    left: u32,
    right: u32,
    balance: i8,
}

pub struct TreeSet<T, F = DefaultFunctor> {
    arena: Arena<T, TreeLink>,
    root: u32,
    functor: F,
    reentrancy: DebugReentrancy,
}

enum Probe {
    Found(u32),
    Vacant { parent: u32, left: bool },
}

impl<T: Ord> TreeSet<T> {
    pub fn new() -> Self {
        Self::with_comparator(DefaultFunctor::default())
    }

    /// # Panics
    /// If `capacity` exceeds `MAX_CAPACITY` or the allocation fails.
    pub fn with_capacity(capacity: usize) -> Self {
        Self::with_capacity_and_comparator(capacity, DefaultFunctor::default())
    }
}

impl<T, F> Default for TreeSet<T, F>
where
    F: CompareFunctor<T> + Default,
{
    fn default() -> Self {
        Self::with_comparator(F::default())
    }
}

fn min_of<T>(arena: &Arena<T, TreeLink>, mut i: u32) -> u32 {
    while i != 0 {
        let l = arena.meta(i).left;
        if l == 0 {
            break;
        }
        i = l;
    }
    i
}

fn max_of<T>(arena: &Arena<T, TreeLink>, mut i: u32) -> u32 {
    while i != 0 {
        let r = arena.meta(i).right;
        if r == 0 {
            break;
        }
        i = r;
    }
    i
}

fn successor<T>(arena: &Arena<T, TreeLink>, i: u32) -> u32 {
    let m = arena.meta(i);
    if m.right != 0 {
        return min_of(arena, m.right);
    }
    let mut child = i;
    let mut p = m.parent;
    while p != 0 && arena.meta(p).right == child {
        child = p;
        p = arena.meta(p).parent;
    }
    p
}

fn predecessor<T>(arena: &Arena<T, TreeLink>, i: u32) -> u32 {
    let m = arena.meta(i);
    if m.left != 0 {
        return max_of(arena, m.left);
    }
    let mut child = i;
    let mut p = m.parent;
    while p != 0 && arena.meta(p).left == child {
        child = p;
        p = arena.meta(p).parent;
    }
    p
}

/// Repoints the neighbours of a slot that compaction moved `from -> to`.
fn relink_moved<T>(slots: &mut [Slot<T, TreeLink>], root: &mut u32, from: u32, to: u32) {
    let TreeLink {
        parent,
        left,
        right,
        ..
    } = slots[to as usize].meta;
    if parent == 0 {
        debug_assert_eq!(*root, from);
        *root = to;
    } else {
        let pm = &mut slots[parent as usize].meta;
        if pm.left == from {
            pm.left = to;
        } else {
            debug_assert_eq!(pm.right, from);
            pm.right = to;
        }
    }
    if left != 0 {
        slots[left as usize].meta.parent = to;
    }
    if right != 0 {
        slots[right as usize].meta.parent = to;
    }
}

/// In-order iterator; double-ended.
pub struct Iter<'a, T> {
    arena: &'a Arena<T, TreeLink>,
    front: u32,
    back: u32,
    remaining: usize,
}

impl<'a, T> Iterator for Iter<'a, T> {
    type Item = &'a T;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        let i = self.front;
        self.front = successor(self.arena, i);
        self.remaining -= 1;
        Some(self.arena.value(i))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<T> DoubleEndedIterator for Iter<'_, T> {
    fn next_back(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        let i = self.back;
        self.back = predecessor(self.arena, i);
        self.remaining -= 1;
        Some(self.arena.value(i))
    }
}

impl<T> ExactSizeIterator for Iter<'_, T> {}

/// In-order iterator yielding handles alongside elements.
pub struct Entries<'a, T> {
    inner: Iter<'a, T>,
}

impl<'a, T> Iterator for Entries<'a, T> {
    type Item = (Handle, &'a T);

    fn next(&mut self) -> Option<Self::Item> {
        let i = self.inner.front;
        self.inner.next().map(|v| (Handle::new(i), v))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<T> DoubleEndedIterator for Entries<'_, T> {
    fn next_back(&mut self) -> Option<Self::Item> {
        let i = self.inner.back;
        self.inner.next_back().map(|v| (Handle::new(i), v))
    }
}

impl<T> ExactSizeIterator for Entries<'_, T> {}

impl<T, F> TreeSet<T, F>
where
    F: CompareFunctor<T>,
{
    pub fn with_comparator(functor: F) -> Self {
        Self {
            arena: Arena::new(),
            root: 0,
            functor,
            reentrancy: DebugReentrancy::new(),
        }
    }

    /// # Panics
    /// If `capacity` exceeds `MAX_CAPACITY` or the allocation fails.
    pub fn with_capacity_and_comparator(capacity: usize, functor: F) -> Self {
        match Self::with_config(TreeConfig::with_capacity(capacity), functor) {
            Ok(set) => set,
            Err(e) => panic!("TreeSet::with_capacity: {e}"),
        }
    }

    pub fn with_config(config: TreeConfig, functor: F) -> Result<Self, ArenaError> {
        let config = config.validated()?;
        let mut set = Self::with_comparator(functor);
        if config.capacity > 0 {
            set.arena.resize(config.capacity + 1)?;
        }
        Ok(set)
    }

    pub fn comparator(&self) -> &F {
        &self.functor
    }

    pub fn len(&self) -> usize {
        self.arena.len()
    }

    pub fn is_empty(&self) -> bool {
        self.arena.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.arena.slot_capacity().saturating_sub(1)
    }

    /// `cmp(stored)` orders a stored element relative to the probe.
    fn probe(&self, cmp: impl Fn(&T) -> Ordering) -> Probe {
        let _g = self.reentrancy.enter();
        let mut parent = 0;
        let mut left = false;
        let mut n = self.root;
        while n != 0 {
            parent = n;
            let m = self.arena.meta(n);
            match cmp(self.arena.value(n)) {
                Ordering::Equal => return Probe::Found(n),
                Ordering::Greater => {
                    left = true;
                    n = m.left;
                }
                Ordering::Less => {
                    left = false;
                    n = m.right;
                }
            }
        }
        Probe::Vacant { parent, left }
    }

    /// Last node on the search path on the requested side of the probe.
    fn bound(&self, cmp: impl Fn(&T) -> Ordering, below: bool, inclusive: bool) -> Option<u32> {
        let _g = self.reentrancy.enter();
        let mut best = 0;
        let mut n = self.root;
        while n != 0 {
            let m = self.arena.meta(n);
            match cmp(self.arena.value(n)) {
                Ordering::Equal if inclusive => return Some(n),
                Ordering::Equal => n = if below { m.left } else { m.right },
                Ordering::Less if below => {
                    best = n;
                    n = m.right;
                }
                Ordering::Less => n = m.right,
                Ordering::Greater if !below => {
                    best = n;
                    n = m.left;
                }
                Ordering::Greater => n = m.left,
            }
        }
        (best != 0).then_some(best)
    }

    pub fn find(&self, value: &T) -> Option<Handle> {
        self.find_by(|x| self.functor.compare(x, value))
    }

    /// Lookup by a probe closure returning how a stored element orders
    /// against the target. Must agree with the set's comparator.
    pub fn find_by(&self, cmp: impl Fn(&T) -> Ordering) -> Option<Handle> {
        match self.probe(cmp) {
            Probe::Found(i) => Some(Handle::new(i)),
            Probe::Vacant { .. } => None,
        }
    }

    pub fn contains(&self, value: &T) -> bool {
        self.find(value).is_some()
    }

    pub fn get(&self, handle: Handle) -> Option<&T> {
        self.arena.get(handle.index())
    }

    /// The element must keep its position under the comparator.
    pub fn get_mut(&mut self, handle: Handle) -> Option<&mut T> {
        self.arena.get_mut(handle.index())
    }

    pub fn handle_of(&self, value: &T) -> Option<Handle> {
        self.arena.index_of(value).map(Handle::new)
    }

    pub fn lowest(&self) -> Option<&T> {
        self.arena.get(min_of(&self.arena, self.root))
    }

    pub fn highest(&self) -> Option<&T> {
        self.arena.get(max_of(&self.arena, self.root))
    }

    /// Greatest element strictly less than `value`.
    pub fn lower(&self, value: &T) -> Option<&T> {
        self.lower_by(|x| self.functor.compare(x, value))
            .and_then(|h| self.get(h))
    }

    /// Greatest element less than or equal to `value`.
    pub fn floor(&self, value: &T) -> Option<&T> {
        self.floor_by(|x| self.functor.compare(x, value))
            .and_then(|h| self.get(h))
    }

    /// Least element greater than or equal to `value`.
    pub fn ceil(&self, value: &T) -> Option<&T> {
        self.ceil_by(|x| self.functor.compare(x, value))
            .and_then(|h| self.get(h))
    }

    /// Least element strictly greater than `value`.
    pub fn higher(&self, value: &T) -> Option<&T> {
        self.higher_by(|x| self.functor.compare(x, value))
            .and_then(|h| self.get(h))
    }

    pub fn lower_by(&self, cmp: impl Fn(&T) -> Ordering) -> Option<Handle> {
        self.bound(cmp, true, false).map(Handle::new)
    }

    pub fn floor_by(&self, cmp: impl Fn(&T) -> Ordering) -> Option<Handle> {
        self.bound(cmp, true, true).map(Handle::new)
    }

    pub fn ceil_by(&self, cmp: impl Fn(&T) -> Ordering) -> Option<Handle> {
        self.bound(cmp, false, true).map(Handle::new)
    }

    pub fn higher_by(&self, cmp: impl Fn(&T) -> Ordering) -> Option<Handle> {
        self.bound(cmp, false, false).map(Handle::new)
    }

    /// In-order successor of the element at `handle`.
    pub fn next_of(&self, handle: Handle) -> Option<Handle> {
        if !self.arena.is_active(handle.index()) {
            return None;
        }
        let i = successor(&self.arena, handle.index());
        (i != 0).then(|| Handle::new(i))
    }

    /// In-order predecessor of the element at `handle`.
    pub fn prev_of(&self, handle: Handle) -> Option<Handle> {
        if !self.arena.is_active(handle.index()) {
            return None;
        }
        let i = predecessor(&self.arena, handle.index());
        (i != 0).then(|| Handle::new(i))
    }

    /// # Panics
    /// If growing the set fails; see `try_insert`.
    pub fn insert(&mut self, value: T) -> (Handle, bool) {
        match self.try_insert(value) {
            Ok(r) => r,
            Err(e) => panic!("TreeSet::insert: {}", e.error),
        }
    }

    pub fn try_insert(&mut self, value: T) -> Result<(Handle, bool), InsertError<T>> {
        let (mut parent, mut left) = match self.probe(|x| self.functor.compare(x, &value)) {
            Probe::Found(i) => return Ok((Handle::new(i), false)),
            Probe::Vacant { parent, left } => (parent, left),
        };
        match self.reserve_one() {
            Err(error) => return Err(InsertError { error, value }),
            Ok(true) => {
                if let Probe::Vacant { parent: p, left: l } =
                    self.probe(|x| self.functor.compare(x, &value))
                {
                    parent = p;
                    left = l;
                }
            }
            Ok(false) => {}
        }
        let i = self.arena.push(value, TreeLink::default());
        self.attach(i, parent, left);
        self.debug_check();
        Ok((Handle::new(i), true))
    }

    /// Emplace: builds the element with `make` only when nothing matches
    /// the probe `cmp`.
    ///
    /// # Panics
    /// If growing the set fails.
    pub fn insert_with(
        &mut self,
        cmp: impl Fn(&T) -> Ordering,
        make: impl FnOnce() -> T,
    ) -> (Handle, bool) {
        self.insert_keyed((), |_, _, x| cmp(x), |()| make())
    }

    /// `insert_with` for callers probing by an owned key: `cmp` sees the
    /// functor and the key, and `make` consumes the key on a miss.
    pub(crate) fn insert_keyed<Q>(
        &mut self,
        key: Q,
        cmp: impl Fn(&F, &Q, &T) -> Ordering,
        make: impl FnOnce(Q) -> T,
    ) -> (Handle, bool) {
        let (mut parent, mut left) = match self.probe(|x| cmp(&self.functor, &key, x)) {
            Probe::Found(i) => return (Handle::new(i), false),
            Probe::Vacant { parent, left } => (parent, left),
        };
        match self.reserve_one() {
            Err(e) => panic!("TreeSet::insert_with: {e}"),
            Ok(true) => {
                if let Probe::Vacant { parent: p, left: l } =
                    self.probe(|x| cmp(&self.functor, &key, x))
                {
                    parent = p;
                    left = l;
                }
            }
            Ok(false) => {}
        }
        let i = self.arena.push(make(key), TreeLink::default());
        self.attach(i, parent, left);
        self.debug_check();
        (Handle::new(i), true)
    }

    /// Element behind a handle this set just returned.
    pub(crate) fn value_at_mut(&mut self, handle: Handle) -> &mut T {
        self.arena.value_mut(handle.index())
    }

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

    pub fn take(&mut self, value: &T) -> Option<T> {
        let h = self.find(value)?;
        self.remove(h)
    }

    /// Unlinks the element at `handle`, leaving it in its slot until the
    /// returned node is reinserted or consumed.
    pub fn extract(&mut self, handle: Handle) -> Option<Detached<'_, T, F>> {
        let i = handle.index();
        if !self.arena.is_active(i) {
            return None;
        }
        self.unlink(i);
        self.arena.detach(i);
        self.debug_check();
        Some(Detached {
            set: self,
            index: i,
            done: false,
        })
    }

    /// Compacts the arena; relinks moved slots. Invalidates every handle.
    pub fn reorder(&mut self) {
        if self.arena.tombstones() == 0 {
            return;
        }
        let root = &mut self.root;
        self.arena
            .compact(|slots, from, to| relink_moved(slots, root, from, to));
        self.debug_check();
    }

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
        self.arena.resize(slots)?;
        self.debug_check();
        Ok(())
    }

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

    pub fn clear(&mut self) {
        self.arena.clear();
        self.root = 0;
    }

    pub fn iter(&self) -> Iter<'_, T> {
        Iter {
            arena: &self.arena,
            front: min_of(&self.arena, self.root),
            back: max_of(&self.arena, self.root),
            remaining: self.len(),
        }
    }

    pub fn entries(&self) -> Entries<'_, T> {
        Entries { inner: self.iter() }
    }

    /// Visits every element in order with mutable access. `f` must not
    /// change how elements compare.
    pub fn for_each_mut(&mut self, mut f: impl FnMut(&mut T)) {
        let mut i = min_of(&self.arena, self.root);
        while i != 0 {
            f(self.arena.value_mut(i));
            i = successor(&self.arena, i);
        }
    }

    /// Verifies links, balance factors, ordering and counts.
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
        self.check_subtree(self.root, 0, &mut seen, &mut reached)?;
        if reached != actual {
            let lost = (1..slots.len())
                .find(|&i| slots[i].active && !seen[i])
                .unwrap_or(0);
            return Err(CheckError::Unreachable(lost as u32));
        }
        let _g = self.reentrancy.enter();
        let mut prev = 0u32;
        let mut i = min_of(&self.arena, self.root);
        while i != 0 {
            if prev != 0
                && self
                    .functor
                    .compare(self.arena.value(prev), self.arena.value(i))
                    != Ordering::Less
            {
                return Err(CheckError::Unordered(i));
            }
            prev = i;
            i = successor(&self.arena, i);
        }
        Ok(())
    }

    fn check_subtree(
        &self,
        n: u32,
        parent: u32,
        seen: &mut [bool],
        reached: &mut usize,
    ) -> Result<i64, CheckError> {
        if n == 0 {
            return Ok(0);
        }
        let Some(slot) = self.arena.slots().get(n as usize) else {
            return Err(CheckError::BrokenLink(parent));
        };
        if !slot.active {
            return Err(CheckError::InactiveLinked(n));
        }
        if seen[n as usize] {
            return Err(CheckError::Revisited(n));
        }
        seen[n as usize] = true;
        *reached += 1;
        if slot.meta.parent != parent {
            return Err(CheckError::BrokenLink(n));
        }
        let hl = self.check_subtree(slot.meta.left, n, seen, reached)?;
        let hr = self.check_subtree(slot.meta.right, n, seen, reached)?;
        let diff = hr - hl;
        if diff != slot.meta.balance as i64 || diff.abs() > 1 {
            return Err(CheckError::BadBalance {
                slot: n,
                stored: slot.meta.balance,
                actual: diff,
            });
        }
        Ok(1 + hl.max(hr))
    }

    #[inline]
    fn debug_check(&self) {
        #[cfg(all(debug_assertions, feature = "paranoid"))]
        if let Err(e) = self.check() {
            panic!("TreeSet invariant violated: {e}");
        }
    }

    /// Makes room at `next`. Returns `true` when compaction renumbered
    /// the slots, so any probe result is stale.
    fn reserve_one(&mut self) -> Result<bool, ArenaError> {
        if !self.arena.is_full() {
            return Ok(false);
        }
        let slots = self.arena.slot_capacity();
        if self.arena.tombstones() > 0 && self.len() * 2 <= slots {
            let root = &mut self.root;
            self.arena
                .compact(|s, from, to| relink_moved(s, root, from, to));
            return Ok(true);
        }
        let grown = grown_slots(slots);
        if grown <= slots {
            return Err(ArenaError::CapacityOverflow(slots));
        }
        self.arena.resize(grown)?;
        Ok(false)
    }

    fn set_parent(&mut self, i: u32, parent: u32) {
        if i != 0 {
            self.arena.meta_mut(i).parent = parent;
        }
    }

    fn set_balance(&mut self, i: u32, balance: i8) {
        self.arena.meta_mut(i).balance = balance;
    }

    fn replace_child(&mut self, parent: u32, old: u32, new: u32) {
        if parent == 0 {
            self.root = new;
            return;
        }
        let m = self.arena.meta_mut(parent);
        if m.left == old {
            m.left = new;
        } else {
            debug_assert_eq!(m.right, old, "parent does not own child");
            m.right = new;
        }
    }

    fn rotate_left(&mut self, x: u32) {
        let z = self.arena.meta(x).right;
        let t = self.arena.meta(z).left;
        let p = self.arena.meta(x).parent;
        self.arena.meta_mut(x).right = t;
        self.set_parent(t, x);
        self.arena.meta_mut(z).left = x;
        self.arena.meta_mut(x).parent = z;
        self.arena.meta_mut(z).parent = p;
        self.replace_child(p, x, z);
    }

    fn rotate_right(&mut self, x: u32) {
        let z = self.arena.meta(x).left;
        let t = self.arena.meta(z).right;
        let p = self.arena.meta(x).parent;
        self.arena.meta_mut(x).left = t;
        self.set_parent(t, x);
        self.arena.meta_mut(z).right = x;
        self.arena.meta_mut(x).parent = z;
        self.arena.meta_mut(z).parent = p;
        self.replace_child(p, x, z);
    }

    /// Restores a node whose balance reached +/-2. Returns the new subtree
    /// root and whether the subtree lost one level of height.
    fn rebalance(&mut self, x: u32) -> (u32, bool) {
        if self.arena.meta(x).balance > 0 {
            let z = self.arena.meta(x).right;
            let bz = self.arena.meta(z).balance;
            if bz >= 0 {
                self.rotate_left(x);
                if bz == 0 {
                    self.set_balance(x, 1);
                    self.set_balance(z, -1);
                    (z, false)
                } else {
                    self.set_balance(x, 0);
                    self.set_balance(z, 0);
                    (z, true)
                }
            } else {
                let y = self.arena.meta(z).left;
                let by = self.arena.meta(y).balance;
                self.rotate_right(z);
                self.rotate_left(x);
                self.set_balance(x, if by > 0 { -1 } else { 0 });
                self.set_balance(z, if by < 0 { 1 } else { 0 });
                self.set_balance(y, 0);
                (y, true)
            }
        } else {
            let z = self.arena.meta(x).left;
            let bz = self.arena.meta(z).balance;
            if bz <= 0 {
                self.rotate_right(x);
                if bz == 0 {
                    self.set_balance(x, -1);
                    self.set_balance(z, 1);
                    (z, false)
                } else {
                    self.set_balance(x, 0);
                    self.set_balance(z, 0);
                    (z, true)
                }
            } else {
                let y = self.arena.meta(z).right;
                let by = self.arena.meta(y).balance;
                self.rotate_left(z);
                self.rotate_right(x);
                self.set_balance(x, if by < 0 { 1 } else { 0 });
                self.set_balance(z, if by > 0 { -1 } else { 0 });
                self.set_balance(y, 0);
                (y, true)
            }
        }
    }

    /// Hangs slot `i` under `parent` and rebalances upward.
    fn attach(&mut self, i: u32, parent: u32, left: bool) {
        *self.arena.meta_mut(i) = TreeLink {
            parent,
            ..TreeLink::default()
        };
        if parent == 0 {
            self.root = i;
            return;
        }
        if left {
            self.arena.meta_mut(parent).left = i;
        } else {
            self.arena.meta_mut(parent).right = i;
        }
        let mut child = i;
        loop {
            let p = self.arena.meta(child).parent;
            if p == 0 {
                return;
            }
            let grew_left = self.arena.meta(p).left == child;
            let b = self.arena.meta(p).balance + if grew_left { -1 } else { 1 };
            self.set_balance(p, b);
            match b {
                0 => return,
                -1 | 1 => child = p,
                _ => {
                    self.rebalance(p);
                    return;
                }
            }
        }
    }

    /// Removes slot `d` from the tree structure and rebalances upward.
    fn unlink(&mut self, d: u32) {
        let TreeLink {
            parent,
            left,
            right,
            balance,
        } = *self.arena.meta(d);
        let start;
        let from_left;
        if left != 0 && right != 0 {
            let s = min_of(&self.arena, right);
            if s == right {
                // Successor is the right child; it keeps its own right subtree.
                let sm = self.arena.meta_mut(s);
                sm.left = left;
                sm.parent = parent;
                sm.balance = balance;
                self.set_parent(left, s);
                self.replace_child(parent, d, s);
                start = s;
                from_left = false;
            } else {
                let TreeLink {
                    parent: sp,
                    right: sr,
                    ..
                } = *self.arena.meta(s);
                self.arena.meta_mut(sp).left = sr;
                self.set_parent(sr, sp);
                *self.arena.meta_mut(s) = TreeLink {
                    parent,
                    left,
                    right,
                    balance,
                };
                self.set_parent(left, s);
                self.set_parent(right, s);
                self.replace_child(parent, d, s);
                start = sp;
                from_left = true;
            }
        } else {
            let child = if left != 0 { left } else { right };
            from_left = parent != 0 && self.arena.meta(parent).left == d;
            self.set_parent(child, parent);
            self.replace_child(parent, d, child);
            start = parent;
        }
        *self.arena.meta_mut(d) = TreeLink::default();
        self.retrace_removal(start, from_left);
    }

    /// `n` lost one level of height on its left (`from_left`) or right.
    fn retrace_removal(&mut self, mut n: u32, mut from_left: bool) {
        while n != 0 {
            let parent = self.arena.meta(n).parent;
            let b = self.arena.meta(n).balance + if from_left { 1 } else { -1 };
            self.set_balance(n, b);
            let top = match b {
                -1 | 1 => return,
                0 => n,
                _ => {
                    let (top, shrank) = self.rebalance(n);
                    if !shrank {
                        return;
                    }
                    top
                }
            };
            if parent == 0 {
                return;
            }
            from_left = self.arena.meta(parent).left == top;
            n = parent;
        }
    }
}

/// An element unlinked by `TreeSet::extract`, still living in its slot.
///
/// Holds the set mutably borrowed until reinserted or consumed. Dropping it
/// discards the element.
pub struct Detached<'a, T, F>
where
    F: CompareFunctor<T>,
{
    set: &'a mut TreeSet<T, F>,
    index: u32,
    done: bool,
}

impl<T, F> Detached<'_, T, F>
where
    F: CompareFunctor<T>,
{
    pub fn value(&self) -> &T {
        self.set.arena.value(self.index)
    }

    pub fn value_mut(&mut self) -> &mut T {
        self.set.arena.value_mut(self.index)
    }

    /// Links the element back in at its (possibly new) ordered position,
    /// reusing its slot. An equal element inserted meanwhile wins and this
    /// one is dropped.
    pub fn reinsert(mut self) -> (Handle, bool) {
        self.done = true;
        let i = self.index;
        let set = &mut *self.set;
        let value = set.arena.value(i);
        match set.probe(|x| set.functor.compare(x, value)) {
            Probe::Found(existing) => {
                drop(set.arena.discard(i));
                (Handle::new(existing), false)
            }
            Probe::Vacant { parent, left } => {
                set.arena.reattach(i);
                set.attach(i, parent, left);
                set.debug_check();
                (Handle::new(i), true)
            }
        }
    }

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
    F: CompareFunctor<T>,
{
    fn drop(&mut self) {
        if !self.done {
            drop(self.set.arena.discard(self.index));
        }
    }
}

impl<T: fmt::Debug, F: CompareFunctor<T>> fmt::Debug for Detached<'_, T, F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Detached").field(self.value()).finish()
    }
}

impl<T: Clone, F: Clone> Clone for TreeSet<T, F> {
    fn clone(&self) -> Self {
        Self {
            arena: self.arena.clone(),
            root: self.root,
            functor: self.functor.clone(),
            reentrancy: DebugReentrancy::new(),
        }
    }
}

impl<T: fmt::Debug, F: CompareFunctor<T>> fmt::Debug for TreeSet<T, F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

impl<T, F: CompareFunctor<T>> PartialEq for TreeSet<T, F> {
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len()
            && self
                .iter()
                .zip(other.iter())
                .all(|(a, b)| self.functor.compare(a, b) == Ordering::Equal)
    }
}

impl<T, F: CompareFunctor<T>> Eq for TreeSet<T, F> {}

impl<T, F: CompareFunctor<T>> Extend<T> for TreeSet<T, F> {
    fn extend<I: IntoIterator<Item = T>>(&mut self, iter: I) {
        for v in iter {
            self.insert(v);
        }
    }
}

impl<T, F: CompareFunctor<T> + Default> FromIterator<T> for TreeSet<T, F> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let mut set = Self::default();
        set.extend(iter);
        set
    }
}

impl<T, F: CompareFunctor<T> + Default, const N: usize> From<[T; N]> for TreeSet<T, F> {
    fn from(values: [T; N]) -> Self {
        let mut set = Self::default();
        if let Err(e) = set.reserve(N) {
            panic!("TreeSet::from: {e}");
        }
        set.extend(values);
        set
    }
}

impl<'a, T, F: CompareFunctor<T>> IntoIterator for &'a TreeSet<T, F> {
    type Item = &'a T;
    type IntoIter = Iter<'a, T>;
    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
