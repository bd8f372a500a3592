//! HashMap: a `HashSet` of `KeyValue` entries hashed by key.

use crate::arena::Handle;
use crate::config::HashConfig;
use crate::error::{ArenaError, CheckError, InsertError};
use crate::functor::{DefaultFunctor, HashFunctor};
use crate::hash_set::{self, Detached, HashSet};
use crate::key_value::{KeyFunctor, KeyValue};
use core::fmt;
use core::ops::Index;

pub struct HashMap<K, V, F = DefaultFunctor> {
    set: HashSet<KeyValue<K, V>, KeyFunctor<F>>,
}

impl<K, V> HashMap<K, V>
where
    K: core::hash::Hash + Eq,
{
    pub fn new() -> Self {
        Self::with_hasher(DefaultFunctor::default())
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self::with_capacity_and_hasher(capacity, DefaultFunctor::default())
    }
}

impl<K, V, F> Default for HashMap<K, V, F>
where
    F: HashFunctor<K> + Default,
{
    fn default() -> Self {
        Self::with_hasher(F::default())
    }
}

impl<K, V, F> HashMap<K, V, F>
where
    F: HashFunctor<K>,
{
    pub fn with_hasher(functor: F) -> Self {
        Self {
            set: HashSet::with_hasher(KeyFunctor(functor)),
        }
    }

    pub fn with_capacity_and_hasher(capacity: usize, functor: F) -> Self {
        Self {
            set: HashSet::with_capacity_and_hasher(capacity, KeyFunctor(functor)),
        }
    }

    pub fn with_config(config: HashConfig, functor: F) -> Result<Self, ArenaError> {
        Ok(Self {
            set: HashSet::with_config(config, KeyFunctor(functor))?,
        })
    }

    pub fn hasher(&self) -> &F {
        self.set.hasher().inner()
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

    pub fn bucket_count(&self) -> usize {
        self.set.bucket_count()
    }

    /// Handle of the entry for `key`.
    pub fn find(&self, key: &K) -> Option<Handle> {
        let hash = self.key_hash(key);
        let f = self.hasher();
        self.set.find_by(hash, |kv| f.equal(&kv.key, key))
    }

    fn key_hash(&self, key: &K) -> u32 {
        self.set.with_functor(|f| f.inner().hash(key))
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
        let hash = self.key_hash(&key);
        let (h, _) = self.set.insert_keyed(
            hash,
            key,
            |f, key, kv| f.inner().equal(&kv.key, key),
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

    /// Unlinks the entry for `key`; the key may be changed before the
    /// node is reinserted.
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

    pub fn rehash(&mut self) {
        self.set.rehash();
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

    pub fn iter(&self) -> Iter<'_, K, V> {
        Iter {
            inner: self.set.iter(),
        }
    }

    pub fn iter_mut(&mut self) -> IterMut<'_, K, V> {
        IterMut {
            inner: self.set.iter_mut(),
        }
    }

    pub fn keys(&self) -> impl DoubleEndedIterator<Item = &K> + ExactSizeIterator + '_ {
        self.set.iter().map(|kv| &kv.key)
    }

    pub fn values(&self) -> impl DoubleEndedIterator<Item = &V> + ExactSizeIterator + '_ {
        self.set.iter().map(|kv| &kv.value)
    }

    pub fn values_mut(
        &mut self,
    ) -> impl DoubleEndedIterator<Item = &mut V> + ExactSizeIterator + '_ {
        self.set.iter_mut().map(|kv| &mut kv.value)
    }
}

pub struct Iter<'a, K, V> {
    inner: hash_set::Iter<'a, KeyValue<K, V>>,
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

pub struct IterMut<'a, K, V> {
    inner: hash_set::IterMut<'a, KeyValue<K, V>>,
}

impl<'a, K, V> Iterator for IterMut<'a, K, V> {
    type Item = (&'a K, &'a mut V);

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|kv| (&kv.key, &mut kv.value))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<K, V> DoubleEndedIterator for IterMut<'_, K, V> {
    fn next_back(&mut self) -> Option<Self::Item> {
        self.inner.next_back().map(|kv| (&kv.key, &mut kv.value))
    }
}

impl<K, V> ExactSizeIterator for IterMut<'_, K, V> {}

impl<K, V, F: HashFunctor<K>> Index<&K> for HashMap<K, V, F> {
    type Output = V;

    /// # Panics
    /// If `key` is absent.
    fn index(&self, key: &K) -> &V {
        match self.get(key) {
            Some(v) => v,
            None => panic!("HashMap: key not found"),
        }
    }
}

impl<K: Clone, V: Clone, F: Clone> Clone for HashMap<K, V, F> {
    fn clone(&self) -> Self {
        Self {
            set: self.set.clone(),
        }
    }
}

impl<K: fmt::Debug, V: fmt::Debug, F: HashFunctor<K>> fmt::Debug for HashMap<K, V, F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

impl<K, V: PartialEq, F: HashFunctor<K>> PartialEq for HashMap<K, V, F> {
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len() && self.iter().all(|(k, v)| other.get(k) == Some(v))
    }
}

impl<K, V: Eq, F: HashFunctor<K>> Eq for HashMap<K, V, F> {}

impl<K, V, F: HashFunctor<K>> Extend<(K, V)> for HashMap<K, V, F> {
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        for (k, v) in iter {
            self.insert(k, v);
        }
    }
}

impl<K, V, F: HashFunctor<K> + Default> FromIterator<(K, V)> for HashMap<K, V, F> {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map = Self::default();
        map.extend(iter);
        map
    }
}

impl<K, V, F: HashFunctor<K> + Default, const N: usize> From<[(K, V); N]> for HashMap<K, V, F> {
    fn from(pairs: [(K, V); N]) -> Self {
        let mut map = Self::default();
        if let Err(e) = map.reserve(N) {
            panic!("HashMap::from: {e}");
        }
        map.extend(pairs);
        map
    }
}

impl<'a, K, V, F: HashFunctor<K>> IntoIterator for &'a HashMap<K, V, F> {
    type Item = (&'a K, &'a V);
    type IntoIter = Iter<'a, K, V>;
    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_keeps_first_value() {
        let mut m: HashMap<&str, i32> = HashMap::new();
        assert!(m.insert("a", 1).1);
        assert!(!m.insert("a", 2).1);
        assert_eq!(m.get(&"a"), Some(&1));
        assert_eq!(m.replace("a", 3), Some(1));
        assert_eq!(m[&"a"], 3);
        assert_eq!(m.replace("b", 4), None);
        assert_eq!(m.len(), 2);
    }

    #[test]
    fn get_or_insert_with_fetches_or_builds() {
        let mut m: HashMap<u32, Vec<u32>> = HashMap::new();
        m.get_or_default(7).push(1);
        m.get_or_default(7).push(2);
        let mut built = 0;
        m.get_or_insert_with(7, || {
            built += 1;
            Vec::new()
        });
        assert_eq!(built, 0);
        assert_eq!(m.get(&7), Some(&vec![1, 2]));
    }

    #[test]
    fn remove_variants() {
        let mut m: HashMap<i32, &str> = HashMap::from([(1, "a"), (2, "b"), (3, "c")]);
        assert_eq!(m.remove(&1), Some("a"));
        assert_eq!(m.remove(&1), None);
        assert_eq!(m.remove_entry(&2), Some((2, "b")));
        let h = m.find(&3).unwrap();
        assert_eq!(m.entry(h), Some((&3, &"c")));
        assert_eq!(m.remove_at(h), Some((3, "c")));
        assert!(m.is_empty());
        assert_eq!(m.check(), Ok(()));
    }

    #[test]
    fn rekey_through_extract() {
        let mut m: HashMap<i32, &str> = HashMap::from([(1, "one")]);
        let mut node = m.extract(&1).unwrap();
        node.value_mut().key = 10;
        assert!(node.reinsert().1);
        assert_eq!(m.get(&10), Some(&"one"));
        assert!(!m.contains_key(&1));
        assert_eq!(m.check(), Ok(()));
    }

    #[test]
    fn iteration_and_value_mutation() {
        let mut m: HashMap<i32, i32> = (0..10).map(|k| (k, k)).collect();
        for (_, v) in m.iter_mut() {
            *v *= 2;
        }
        for v in m.values_mut() {
            *v += 1;
        }
        let mut pairs: Vec<(i32, i32)> = m.iter().map(|(k, v)| (*k, *v)).collect();
        pairs.sort_unstable();
        assert_eq!(pairs, (0..10).map(|k| (k, 2 * k + 1)).collect::<Vec<_>>());
        assert_eq!(m.keys().count(), 10);
        assert_eq!(m.values().sum::<i32>(), 100);
    }

    #[test]
    fn equality_ignores_layout() {
        let a: HashMap<i32, i32> = HashMap::from([(1, 1), (2, 2)]);
        let b: HashMap<i32, i32> = HashMap::from([(2, 2), (1, 1)]);
        let c: HashMap<i32, i32> = HashMap::from([(2, 2), (1, 3)]);
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.clone(), a);
    }

    #[test]
    #[should_panic(expected = "key not found")]
    fn index_missing_key_panics() {
        let m: HashMap<i32, i32> = HashMap::new();
        let _ = m[&1];
    }

    /// Invariant (debug-only): a key hasher reentering its own map panics.
    #[cfg(debug_assertions)]
    #[test]
    fn reentrancy_panics_from_key_hasher() {
        use core::cell::Cell;

        thread_local! {
            static MAP: Cell<*const HashMap<i32, i32, Nosy>> = Cell::new(core::ptr::null());
        }

        struct Nosy;
        impl HashFunctor<i32> for Nosy {
            fn hash(&self, k: &i32) -> u32 {
                let m = MAP.with(|c| c.replace(core::ptr::null()));
                if !m.is_null() {
                    // Aliased access from inside a key hash.
                    unsafe {
                        let _ = (*m).contains_key(k);
                    }
                }
                *k as u32
            }
            fn equal(&self, a: &i32, b: &i32) -> bool {
                a == b
            }
        }

        let mut m: HashMap<i32, i32, Nosy> = HashMap::with_hasher(Nosy);
        m.insert(1, 10);
        MAP.with(|c| c.set(&m as *const _));
        let res = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _ = m.get(&1);
        }));
        MAP.with(|c| c.set(core::ptr::null()));
        assert!(res.is_err(), "expected reentrancy to panic in debug builds");
    }

    #[test]
    fn get_or_insert_with_builds_once_on_miss() {
        let mut m: HashMap<u32, u32> = HashMap::with_capacity(8);
        for k in 0..8 {
            m.insert(k, k);
        }
        for k in 0..6 {
            m.remove(&k);
        }
        let mut built = 0;
        *m.get_or_insert_with(100, || {
            built += 1;
            1
        }) += 1;
        assert_eq!(built, 1);
        assert_eq!(m.get(&100), Some(&2));
        assert_eq!(m.capacity(), 8);
        assert_eq!(m.len(), 3);
        assert_eq!(m.check(), Ok(()));
    }
}
