#![cfg(test)]

// Property tests for HashSet/HashMap kept inside the crate so they can call
// `check()` against private structure after every step.

use crate::functor::DefaultFunctor;
use crate::hash_map::HashMap;
use crate::hash_set::HashSet;
use proptest::prelude::*;
use std::collections::{BTreeMap, BTreeSet};
use std::hash::{BuildHasher, Hasher};

// Pool-indexed operations: indices shrink toward earlier keys.
#[derive(Clone, Debug)]
enum Op {
    Insert(usize),
    Take(usize),
    RemoveFound(usize),
    Rekey(usize, usize),
    Reorder,
    Resize(usize),
    Reserve(usize),
    Rehash,
    Clear,
    Iterate,
}

fn arb_ops(pool_len: usize) -> impl Strategy<Value = Vec<Op>> {
    let idx = 0..pool_len;
    let op = prop_oneof![
        6 => idx.clone().prop_map(Op::Insert),
        3 => idx.clone().prop_map(Op::Take),
        2 => idx.clone().prop_map(Op::RemoveFound),
        2 => (idx.clone(), idx.clone()).prop_map(|(a, b)| Op::Rekey(a, b)),
        1 => Just(Op::Reorder),
        1 => (0usize..8).prop_map(Op::Resize),
        1 => (0usize..40).prop_map(Op::Reserve),
        1 => Just(Op::Rehash),
        1 => Just(Op::Clear),
        1 => Just(Op::Iterate),
    ];
    proptest::collection::vec(op, 1..120)
}

fn arb_scenario() -> impl Strategy<Value = (Vec<u32>, Vec<Op>)> {
    proptest::collection::vec(any::<u32>(), 1..=24)
        .prop_flat_map(|pool| arb_ops(pool.len()).prop_map(move |ops| (pool.clone(), ops)))
}

fn run<S: BuildHasher>(
    mut sut: HashSet<u32, DefaultFunctor<S>>,
    pool: &[u32],
    ops: Vec<Op>,
) -> Result<(), TestCaseError> {
    let mut model: BTreeSet<u32> = BTreeSet::new();
    for op in ops {
        match op {
            Op::Insert(i) => {
                let v = pool[i];
                let (h, fresh) = sut.insert(v);
                prop_assert_eq!(fresh, model.insert(v));
                prop_assert_eq!(sut.get(h), Some(&v));
            }
            Op::Take(i) => {
                let v = pool[i];
                prop_assert_eq!(sut.take(&v), model.take(&v));
            }
            Op::RemoveFound(i) => {
                let v = pool[i];
                match sut.find(&v) {
                    Some(h) => {
                        prop_assert_eq!(sut.remove(h), Some(v));
                        prop_assert!(sut.get(h).is_none());
                        model.remove(&v);
                    }
                    None => prop_assert!(!model.contains(&v)),
                }
            }
            Op::Rekey(a, b) => {
                let (from, to) = (pool[a], pool[b]);
                if let Some(h) = sut.find(&from) {
                    let mut node = sut.extract(h).expect("found handle is live");
                    *node.value_mut() = to;
                    let (h2, fresh) = node.reinsert();
                    model.remove(&from);
                    prop_assert_eq!(fresh, model.insert(to));
                    prop_assert_eq!(sut.get(h2), Some(&to));
                    if fresh {
                        prop_assert_eq!(h2, h);
                    }
                }
            }
            Op::Reorder => {
                sut.reorder();
                prop_assert!(sut.capacity() >= sut.len());
            }
            Op::Resize(slack) => {
                let target = model.len() + slack;
                prop_assert!(sut.resize(target).is_ok());
                prop_assert_eq!(sut.capacity(), target);
                if !model.is_empty() {
                    prop_assert!(sut.resize(model.len() - 1).is_err());
                }
            }
            Op::Reserve(n) => {
                prop_assert!(sut.reserve(n).is_ok());
                prop_assert!(sut.capacity() >= sut.len() + n);
            }
            Op::Rehash => sut.rehash(),
            Op::Clear => {
                sut.clear();
                model.clear();
            }
            Op::Iterate => {
                let forward: Vec<u32> = sut.iter().copied().collect();
                let mut backward: Vec<u32> = sut.iter().rev().copied().collect();
                backward.reverse();
                prop_assert_eq!(&forward, &backward);
                let seen: BTreeSet<u32> = forward.into_iter().collect();
                prop_assert_eq!(&seen, &model);
            }
        }

        prop_assert_eq!(sut.len(), model.len());
        prop_assert!(sut.bucket_count() <= sut.capacity().max(1));
        if let Err(e) = sut.check() {
            return Err(TestCaseError::fail(format!("invariant violated: {e}")));
        }
        for v in &model {
            prop_assert!(sut.contains(v));
        }
    }
    Ok(())
}

// Property: state-machine equivalence against BTreeSet.
// - insert/take/remove parity and handle resolution for fresh inserts.
// - extract + mutate + reinsert matches remove-then-insert on the model,
//   and reuses the slot when the new value is not a duplicate.
// - resize/reserve/reorder/rehash never lose elements; check() holds after
//   every step.
proptest! {
    #![proptest_config(ProptestConfig { cases: 96, .. ProptestConfig::default() })]
    #[test]
    fn prop_state_machine((pool, ops) in arb_scenario()) {
        run(HashSet::with_capacity(4), &pool, ops)?;
    }

    #[test]
    fn prop_state_machine_colliding((pool, ops) in arb_scenario()) {
        let sut = HashSet::with_hasher(DefaultFunctor::with_hasher(ConstBuildHasher));
        run(sut, &pool, ops)?;
    }
}

// Every value hashes to the same bucket, so lookups rest on equality.
#[derive(Clone, Default)]
struct ConstBuildHasher;
struct ConstHasher;
impl BuildHasher for ConstBuildHasher {
    type Hasher = ConstHasher;
    fn build_hasher(&self) -> Self::Hasher {
        ConstHasher
    }
}
impl Hasher for ConstHasher {
    fn write(&mut self, _bytes: &[u8]) {}
    fn finish(&self) -> u64 {
        0
    }
}

// Property: HashMap emplace-or-fetch and removal agree with BTreeMap.
proptest! {
    #![proptest_config(ProptestConfig { cases: 64, .. ProptestConfig::default() })]
    #[test]
    fn prop_map_counts(words in proptest::collection::vec(0u8..16, 0..200), drops in proptest::collection::vec(0u8..16, 0..20)) {
        let mut sut: HashMap<u8, usize> = HashMap::new();
        let mut model: BTreeMap<u8, usize> = BTreeMap::new();
        for w in &words {
            *sut.get_or_default(*w) += 1;
            *model.entry(*w).or_default() += 1;
        }
        for d in &drops {
            prop_assert_eq!(sut.remove(d), model.remove(d));
        }
        let got: BTreeMap<u8, usize> = sut.iter().map(|(k, v)| (*k, *v)).collect();
        prop_assert_eq!(got, model);
        prop_assert!(sut.check().is_ok());
    }
}
