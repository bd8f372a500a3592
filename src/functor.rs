//! Comparator and hash functor traits.
//!
//! Containers take their functor as a type parameter and store one
//! instance, so dispatch is static. `DefaultFunctor` covers every type with
//! `Hash + Eq` or `Ord` impls, which includes integers, strings, tuples and
//! [`KeyValue`](crate::KeyValue).

use core::cmp::Ordering;
use core::hash::{BuildHasher, Hash};
use hashbrown::hash_map::DefaultHashBuilder;

/// Hashing contract for `HashSet`/`HashMap`.
///
/// Values that are `equal` must hash identically.
pub trait HashFunctor<T: ?Sized> {
    fn hash(&self, value: &T) -> u32;
    fn equal(&self, a: &T, b: &T) -> bool;
}

/// Three-way ordering contract for `TreeSet`/`TreeMap`.
///
/// Must be a strict total order; `Equal` means "same key".
pub trait CompareFunctor<T: ?Sized> {
    fn compare(&self, a: &T, b: &T) -> Ordering;
}

/// Functor backed by the standard `Hash`/`Eq`/`Ord` impls and a
/// `BuildHasher` whose 64-bit output is folded down to 32 bits.
#[derive(Debug, Clone, Default)]
pub struct DefaultFunctor<S = DefaultHashBuilder> {
    build: S,
}

impl<S> DefaultFunctor<S> {
    pub fn with_hasher(build: S) -> Self {
        Self { build }
    }

    pub fn hasher(&self) -> &S {
        &self.build
    }
}

#[inline]
pub(crate) fn fold64(h: u64) -> u32 {
    (h ^ (h >> 32)) as u32
}

impl<T, S> HashFunctor<T> for DefaultFunctor<S>
where
    T: ?Sized + Hash + Eq,
    S: BuildHasher,
{
    #[inline]
    fn hash(&self, value: &T) -> u32 {
        fold64(self.build.hash_one(value))
    }

    #[inline]
    fn equal(&self, a: &T, b: &T) -> bool {
        a == b
    }
}

impl<T, S> CompareFunctor<T> for DefaultFunctor<S>
where
    T: ?Sized + Ord,
{
    #[inline]
    fn compare(&self, a: &T, b: &T) -> Ordering {
        a.cmp(b)
    }
}

/// Orders by the reverse of another functor.
#[derive(Debug, Clone, Default)]
pub struct Reverse<F>(pub F);

impl<T: ?Sized, F: CompareFunctor<T>> CompareFunctor<T> for Reverse<F> {
    #[inline]
    fn compare(&self, a: &T, b: &T) -> Ordering {
        self.0.compare(b, a)
    }
}
