#![cfg(test)]

// Property tests for TreeSet/TreeMap against the std ordered collections.
// Kept inside the crate so `check()` runs after every step.

use crate::tree_map::TreeMap;
use crate::tree_set::TreeSet;
use proptest::prelude::*;
use std::collections::{BTreeMap, BTreeSet};
use std::ops::Bound::{Excluded, Included, Unbounded};

#[derive(Clone, Debug)]
enum Op {
    Insert(i16),
    Take(i16),
    RemoveFound(i16),
    Rekey(i16, i16),
    Navigate(i16),
    Reorder,
    Resize(usize),
    Clear,
}

fn arb_op() -> impl Strategy<Value = Op> {
    // Narrow key range so inserts, removals and navigations overlap.
    let key = -64i16..64;
    prop_oneof![
        8 => key.clone().prop_map(Op::Insert),
        4 => key.clone().prop_map(Op::Take),
        2 => key.clone().prop_map(Op::RemoveFound),
        2 => (key.clone(), key.clone()).prop_map(|(a, b)| Op::Rekey(a, b)),
        3 => key.clone().prop_map(Op::Navigate),
        1 => Just(Op::Reorder),
        1 => (0usize..6).prop_map(Op::Resize),
        1 => Just(Op::Clear),
    ]
}

// Property: state-machine equivalence against BTreeSet.
// - In-order iteration (both directions) equals the model after each step.
// - lower/floor/ceil/higher agree with BTreeSet range queries.
// - AVL balance, parent links and ordering hold after every mutation,
//   including compaction and extract/reinsert re-keying.
proptest! {
    #![proptest_config(ProptestConfig { cases: 128, .. ProptestConfig::default() })]
    #[test]
    fn prop_state_machine(ops in proptest::collection::vec(arb_op(), 1..200)) {
        let mut sut: TreeSet<i16> = TreeSet::new();
        let mut model: BTreeSet<i16> = BTreeSet::new();
        for op in ops {
            match op {
                Op::Insert(v) => {
                    let (h, fresh) = sut.insert(v);
                    prop_assert_eq!(fresh, model.insert(v));
                    prop_assert_eq!(sut.get(h), Some(&v));
                }
                Op::Take(v) => {
                    prop_assert_eq!(sut.take(&v), model.take(&v));
                }
                Op::RemoveFound(v) => match sut.find(&v) {
                    Some(h) => {
                        prop_assert_eq!(sut.remove(h), Some(v));
                        model.remove(&v);
                    }
                    None => prop_assert!(!model.contains(&v)),
                },
                Op::Rekey(from, to) => {
                    if let Some(h) = sut.find(&from) {
                        let mut node = sut.extract(h).expect("found handle is live");
                        *node.value_mut() = to;
                        let (h2, fresh) = node.reinsert();
                        model.remove(&from);
                        prop_assert_eq!(fresh, model.insert(to));
                        prop_assert_eq!(sut.get(h2), Some(&to));
                    }
                }
                Op::Navigate(v) => {
                    prop_assert_eq!(sut.lower(&v), model.range(..v).next_back());
                    prop_assert_eq!(sut.floor(&v), model.range(..=v).next_back());
                    prop_assert_eq!(sut.ceil(&v), model.range(v..).next());
                    prop_assert_eq!(
                        sut.higher(&v),
                        model.range((Excluded(v), Unbounded)).next()
                    );
                    prop_assert_eq!(
                        sut.floor(&v).is_some(),
                        model.range((Unbounded, Included(v))).next().is_some()
                    );
                }
                Op::Reorder => sut.reorder(),
                Op::Resize(slack) => {
                    prop_assert!(sut.resize(model.len() + slack).is_ok());
                    prop_assert_eq!(sut.capacity(), model.len() + slack);
                }
                Op::Clear => {
                    sut.clear();
                    model.clear();
                }
            }

            prop_assert_eq!(sut.len(), model.len());
            if let Err(e) = sut.check() {
                return Err(TestCaseError::fail(format!("invariant violated: {e}")));
            }
            prop_assert!(sut.iter().eq(model.iter()));
            prop_assert!(sut.iter().rev().eq(model.iter().rev()));
            prop_assert_eq!(sut.lowest(), model.first());
            prop_assert_eq!(sut.highest(), model.last());
        }
    }

    #[test]
    fn prop_handle_walk_matches_order(values in proptest::collection::btree_set(any::<i32>(), 0..64)) {
        let sut: TreeSet<i32> = values.iter().copied().collect();
        let mut walked = Vec::new();
        let mut cur = sut.entries().next().map(|(h, _)| h);
        while let Some(h) = cur {
            walked.push(*sut.get(h).expect("walk stays on live slots"));
            cur = sut.next_of(h);
        }
        prop_assert!(walked.iter().eq(values.iter()));
    }

    #[test]
    fn prop_map_matches_btreemap(pairs in proptest::collection::vec((0u8..32, any::<u16>()), 0..100)) {
        let mut sut: TreeMap<u8, u16> = TreeMap::new();
        let mut model: BTreeMap<u8, u16> = BTreeMap::new();
        for (k, v) in pairs {
            prop_assert_eq!(sut.replace(k, v), model.insert(k, v));
        }
        prop_assert!(sut.iter().eq(model.iter()));
        while let Some((k, v)) = sut.pop_first() {
            prop_assert_eq!(model.pop_first(), Some((k, v)));
        }
        prop_assert!(model.is_empty());
        prop_assert!(sut.check().is_ok());
    }
}
