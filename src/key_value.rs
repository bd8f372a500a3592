//! Key/value pair stored by the map adapters.
//!
//! Equality, ordering and hashing look at the key alone, so a set of
//! `KeyValue`s behaves as a map keyed by `K`.

use crate::functor::{CompareFunctor, HashFunctor};
use core::cmp::Ordering;
use core::hash::{Hash, Hasher};

#[derive(Debug, Clone, Copy, Default)]
pub struct KeyValue<K, V> {
    pub key: K,
    pub value: V,
}

impl<K, V> KeyValue<K, V> {
    pub fn new(key: K, value: V) -> Self {
        Self { key, value }
    }

    pub fn into_pair(self) -> (K, V) {
        (self.key, self.value)
    }
}

impl<K, V> From<(K, V)> for KeyValue<K, V> {
    fn from((key, value): (K, V)) -> Self {
        Self { key, value }
    }
}

impl<K: PartialEq, V> PartialEq for KeyValue<K, V> {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key
    }
}

impl<K: Eq, V> Eq for KeyValue<K, V> {}

impl<K: PartialOrd, V> PartialOrd for KeyValue<K, V> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        self.key.partial_cmp(&other.key)
    }
}

impl<K: Ord, V> Ord for KeyValue<K, V> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.key.cmp(&other.key)
    }
}

impl<K: Hash, V> Hash for KeyValue<K, V> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key.hash(state);
    }
}

/// Lifts a key functor to `KeyValue` entries.
#[derive(Debug, Clone, Default)]
pub struct KeyFunctor<F>(pub F);

impl<F> KeyFunctor<F> {
    pub fn inner(&self) -> &F {
        &self.0
    }
}

impl<K, V, F: HashFunctor<K>> HashFunctor<KeyValue<K, V>> for KeyFunctor<F> {
    #[inline]
    fn hash(&self, kv: &KeyValue<K, V>) -> u32 {
        self.0.hash(&kv.key)
    }

    #[inline]
    fn equal(&self, a: &KeyValue<K, V>, b: &KeyValue<K, V>) -> bool {
        self.0.equal(&a.key, &b.key)
    }
}

impl<K, V, F: CompareFunctor<K>> CompareFunctor<KeyValue<K, V>> for KeyFunctor<F> {
    #[inline]
    fn compare(&self, a: &KeyValue<K, V>, b: &KeyValue<K, V>) -> Ordering {
        self.0.compare(&a.key, &b.key)
    }
}
