//! TreeMap: a `TreeSet` of `KeyValue` entries ordered by key.

use crate::arena::Handle;
use crate::config::TreeConfig;
use crate::error::{ArenaError, CheckError, InsertError};
use crate::functor::{CompareFunctor, DefaultFunctor};
use crate::key_value::{KeyFunctor, KeyValue};
use crate::tree_set::{self, Detached, TreeSet};
use core::cmp::Ordering;
use core::fmt;
use core::ops::Index;

pub struct TreeMap<K, V, F = DefaultFunctor> {
    set: TreeSet<KeyValue<K, V>, KeyFunctor<F>>,
}

impl<K: Ord, V> TreeMap<K, V> {
    pub fn new() -> Self {
        Self::with_comparator(DefaultFunctor::default())
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self::with_capacity_and_comparator(capacity, DefaultFunctor::default())
    }
}

impl<K, V, F> Default for TreeMap<K, V, F>
where
    F: CompareFunctor<K> + Default,
{
    fn default() -> Self {
        Self::with_comparator(F::default())
    }
}

impl<K, V, F> TreeMap<K, V, F>
where
    F: CompareFunctor<K>,
{
    pub fn with_comparator(functor: F) -> Self {
        Self {
            set: TreeSet::with_comparator(KeyFunctor(functor)),
        }
    }

    pub fn with_capacity_and_comparator(capacity: usize, functor: F) -> Self {
        Self {
            set: TreeSet::with_capacity_and_comparator(capacity, KeyFunctor(functor)),
        }
    }

    pub fn with_config(config: TreeConfig, functor: F) -> Result<Self, ArenaError> {
        Ok(Self {
            set: TreeSet::with_config(config, KeyFunctor(functor))?,
        })
    }

    pub fn comparator(&self) -> &F {
        self.set.comparator().inner()
    }

    pub fn len(&self) -> usize {
        self.set.len()
    }

    pub fn is_empty(&self) -> bool {
        self.set.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.set.capacity()
    }

    fn probe<'a>(&'a self, key: &'a K) -> impl Fn(&KeyValue<K, V>) -> Ordering + 'a {
        let f = self.comparator();
        move |kv| f.compare(&kv.key, key)
    }

    pub fn find(&self, key: &K) -> Option<Handle> {
        self.set.find_by(self.probe(key))
    }

    pub fn contains_key(&self, key: &K) -> bool {
        self.find(key).is_some()
    }

    pub fn get(&self, key: &K) -> Option<&V> {
        let h = self.find(key)?;
        self.set.get(h).map(|kv| &kv.value)
    }

    pub fn get_mut(&mut self, key: &K) -> Option<&mut V> {
        let h = self.find(key)?;
        self.set.get_mut(h).map(|kv| &mut kv.value)
    }

    pub fn get_key_value(&self, key: &K) -> Option<(&K, &V)> {
        let h = self.find(key)?;
        self.entry(h)
    }

    /// Entry at `handle`, if the slot is live.
    pub fn entry(&self, handle: Handle) -> Option<(&K, &V)> {
        self.set.get(handle).map(|kv| (&kv.key, &kv.value))
    }

    pub fn entry_mut(&mut self, handle: Handle) -> Option<(&K, &mut V)> {
        self.set.get_mut(handle).map(|kv| (&kv.key, &mut kv.value))
    }

    pub fn first_key_value(&self) -> Option<(&K, &V)> {
        self.set.lowest().map(|kv| (&kv.key, &kv.value))
    }

    pub fn last_key_value(&self) -> Option<(&K, &V)> {
        self.set.highest().map(|kv| (&kv.key, &kv.value))
    }

    /// Entry with the greatest key strictly below `key`.
    pub fn lower(&self, key: &K) -> Option<(&K, &V)> {
        self.set.lower_by(self.probe(key)).and_then(|h| self.entry(h))
    }

    pub fn floor(&self, key: &K) -> Option<(&K, &V)> {
        self.set.floor_by(self.probe(key)).and_then(|h| self.entry(h))
    }

    pub fn ceil(&self, key: &K) -> Option<(&K, &V)> {
        self.set.ceil_by(self.probe(key)).and_then(|h| self.entry(h))
    }

    /// Entry with the least key strictly above `key`.
    pub fn higher(&self, key: &K) -> Option<(&K, &V)> {
        self.set.higher_by(self.probe(key)).and_then(|h| self.entry(h))
    }

    pub fn next_of(&self, handle: Handle) -> Option<Handle> {
        self.set.next_of(handle)
    }

    pub fn prev_of(&self, handle: Handle) -> Option<Handle> {
        self.set.prev_of(handle)
    }

    /// Inserts unless `key` is present, in which case the stored entry is
    /// kept and `value` is dropped.
    pub fn insert(&mut self, key: K, value: V) -> (Handle, bool) {
        self.set.insert(KeyValue { key, value })
    }

    pub fn try_insert(
        &mut self,
        key: K,
        value: V,
    ) -> Result<(Handle, bool), InsertError<KeyValue<K, V>>> {
        self.set.try_insert(KeyValue { key, value })
    }

    /// Inserts or overwrites; returns the previous value.
    pub fn replace(&mut self, key: K, value: V) -> Option<V> {
        match self.find(&key) {
            Some(h) => self
                .set
                .get_mut(h)
                .map(|kv| core::mem::replace(&mut kv.value, value)),
            None => {
                self.set.insert(KeyValue { key, value });
                None
            }
        }
    }

    /// Value for `key`, constructing it with `make` first if absent.
    pub fn get_or_insert_with(&mut self, key: K, make: impl FnOnce() -> V) -> &mut V {
        let (h, _) = self.set.insert_keyed(
            key,
            |f, key, kv| f.inner().compare(&kv.key, key),
            |key| KeyValue {
                key,
                value: make(),
            },
        );
        &mut self.set.value_at_mut(h).value
    }

    pub fn get_or_default(&mut self, key: K) -> &mut V
    where
        V: Default,
    {
        self.get_or_insert_with(key, V::default)
    }

    pub fn remove(&mut self, key: &K) -> Option<V> {
        self.remove_entry(key).map(|(_, v)| v)
    }

    pub fn remove_entry(&mut self, key: &K) -> Option<(K, V)> {
        let h = self.find(key)?;
        self.set.remove(h).map(KeyValue::into_pair)
    }

    pub fn remove_at(&mut self, handle: Handle) -> Option<(K, V)> {
        self.set.remove(handle).map(KeyValue::into_pair)
    }

    pub fn pop_first(&mut self) -> Option<(K, V)> {
        let h = self.set.entries().next()?.0;
        self.remove_at(h)
    }

    pub fn pop_last(&mut self) -> Option<(K, V)> {
        let h = self.set.entries().next_back()?.0;
        self.remove_at(h)
    }

    /// Unlinks the entry for `key`; the key may be changed before the
    /// node is reinserted at its new position.
    pub fn extract(&mut self, key: &K) -> Option<Detached<'_, KeyValue<K, V>, KeyFunctor<F>>> {
        let h = self.find(key)?;
        self.set.extract(h)
    }

    pub fn resize(&mut self, capacity: usize) -> Result<(), ArenaError> {
        self.set.resize(capacity)
    }

    pub fn reserve(&mut self, additional: usize) -> Result<(), ArenaError> {
        self.set.reserve(additional)
    }

    pub fn reorder(&mut self) {
        self.set.reorder();
    }

    pub fn clear(&mut self) {
        self.set.clear();
    }

    pub fn check(&self) -> Result<(), CheckError> {
        self.set.check()
    }

    /// In key order.
    pub fn iter(&self) -> Iter<'_, K, V> {
        Iter {
            inner: self.set.iter(),
        }
    }

    pub fn keys(&self) -> impl DoubleEndedIterator<Item = &K> + ExactSizeIterator + '_ {
        self.set.iter().map(|kv| &kv.key)
    }

    pub fn values(&self) -> impl DoubleEndedIterator<Item = &V> + ExactSizeIterator + '_ {
        self.set.iter().map(|kv| &kv.value)
    }

    /// Visits every entry in key order with the value mutable.
    pub fn for_each_mut(&mut self, mut f: impl FnMut(&K, &mut V)) {
        self.set.for_each_mut(|kv| f(&kv.key, &mut kv.value));
    }
}

pub struct Iter<'a, K, V> {
    inner: tree_set::Iter<'a, KeyValue<K, V>>,
}

impl<'a, K, V> Iterator for Iter<'a, K, V> {
    type Item = (&'a K, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|kv| (&kv.key, &kv.value))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<K, V> DoubleEndedIterator for Iter<'_, K, V> {
    fn next_back(&mut self) -> Option<Self::Item> {
        self.inner.next_back().map(|kv| (&kv.key, &kv.value))
    }
}

impl<K, V> ExactSizeIterator for Iter<'_, K, V> {}

impl<K, V, F: CompareFunctor<K>> Index<&K> for TreeMap<K, V, F> {
    type Output = V;

    /// # Panics
    /// If `key` is absent.
    fn index(&self, key: &K) -> &V {
        match self.get(key) {
            Some(v) => v,
            None => panic!("TreeMap: key not found"),
        }
    }
}

impl<K: Clone, V: Clone, F: Clone> Clone for TreeMap<K, V, F> {
    fn clone(&self) -> Self {
        Self {
            set: self.set.clone(),
        }
    }
}

impl<K: fmt::Debug, V: fmt::Debug, F: CompareFunctor<K>> fmt::Debug for TreeMap<K, V, F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

impl<K, V: PartialEq, F: CompareFunctor<K>> PartialEq for TreeMap<K, V, F> {
    fn eq(&self, other: &Self) -> bool {
        let f = self.comparator();
        self.len() == other.len()
            && self
                .iter()
                .zip(other.iter())
                .all(|((ka, va), (kb, vb))| f.compare(ka, kb) == Ordering::Equal && va == vb)
    }
}

impl<K, V: Eq, F: CompareFunctor<K>> Eq for TreeMap<K, V, F> {}

impl<K, V, F: CompareFunctor<K>> Extend<(K, V)> for TreeMap<K, V, F> {
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        for (k, v) in iter {
            self.insert(k, v);
        }
    }
}

impl<K, V, F: CompareFunctor<K> + Default> FromIterator<(K, V)> for TreeMap<K, V, F> {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map = Self::default();
        map.extend(iter);
        map
    }
}

impl<K, V, F: CompareFunctor<K> + Default, const N: usize> From<[(K, V); N]> for TreeMap<K, V, F> {
    fn from(pairs: [(K, V); N]) -> Self {
        let mut map = Self::default();
        if let Err(e) = map.reserve(N) {
            panic!("TreeMap::from: {e}");
        }
        map.extend(pairs);
        map
    }
}

impl<'a, K, V, F: CompareFunctor<K>> IntoIterator for &'a TreeMap<K, V, F> {
    type Item = (&'a K, &'a V);
    type IntoIter = Iter<'a, K, V>;
    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
