// End-to-end scenarios for the set containers.
//
// Both scenarios run the same script: a burst of inserts with one
// duplicate, two erasures, a re-key through extract/reinsert, a resize and
// a final burst with a duplicate. The hash variant checks the final
// contents; the tree variant checks structural invariants after every
// mutating call.
use arena_collections::{CheckError, HashSet, TreeSet};
use std::collections::BTreeSet;

const FIRST_BURST: [i32; 12] = [888, 999, 13, 3, 42, 23, 7, 13, 1549, 666, 3085, 204];
const EXPECTED: [i32; 12] = [888, 999, 13, 3, 42, 23, 7, 1549, 1572877, 205, 32, 52];

fn assert_ok(r: Result<(), CheckError>) {
    if let Err(e) = r {
        panic!("invariant violated: {e}");
    }
}

// Test: the scripted HashSet<int> scenario.
// Verifies: duplicates are no-ops, extract/mutate/reinsert re-keys in
// place, resize keeps every element, and the final contents equal the
// distinct inserted values minus the erased ones.
#[test]
fn hash_set_scenario() {
    let mut s: HashSet<i32> = HashSet::new();
    for v in FIRST_BURST {
        s.insert(v);
    }
    assert_eq!(s.len(), 11);
    assert!(s.take(&666).is_some());
    assert!(s.take(&3085).is_some());
    assert!(s.insert(1572877).1);

    let h = s.find(&204).expect("204 present");
    let mut node = s.extract(h).expect("live handle");
    *node.value_mut() = 205;
    let (h2, fresh) = node.reinsert();
    assert!(fresh);
    assert_eq!(h2, h);
    assert!(!s.contains(&204));

    assert!(!s.insert(13).1);
    s.resize(128).expect("resize above len");
    assert_eq!(s.capacity(), 128);
    for v in [32, 42, 52] {
        s.insert(v);
    }

    assert_eq!(s.len(), EXPECTED.len());
    let got: BTreeSet<i32> = s.iter().copied().collect();
    let want: BTreeSet<i32> = EXPECTED.into_iter().collect();
    assert_eq!(got, want);
    assert!(s.bucket_count() <= s.capacity());
    assert_ok(s.check());
}

// Test: the same script on TreeSet<int>.
// Verifies: check() (AVL balance, parent links, strict order, counts)
// holds after every mutating call, and iteration is sorted at the end.
#[test]
fn tree_set_scenario() {
    let mut s: TreeSet<i32> = TreeSet::new();
    for v in FIRST_BURST {
        s.insert(v);
        assert_ok(s.check());
    }
    assert!(s.take(&666).is_some());
    assert_ok(s.check());
    assert!(s.take(&3085).is_some());
    assert_ok(s.check());
    s.insert(1572877);
    assert_ok(s.check());

    let h = s.find(&204).expect("204 present");
    let mut node = s.extract(h).expect("live handle");
    *node.value_mut() = 205;
    assert!(node.reinsert().1);
    assert_ok(s.check());

    assert!(!s.insert(13).1);
    assert_ok(s.check());
    s.resize(128).expect("resize above len");
    assert_ok(s.check());
    for v in [32, 42, 52] {
        s.insert(v);
        assert_ok(s.check());
    }

    let mut want = EXPECTED.to_vec();
    want.sort_unstable();
    assert_eq!(s.iter().copied().collect::<Vec<_>>(), want);
}

// Test: extract followed by an unmodified reinsert.
// Verifies: size, membership and iteration contents are unchanged.
#[test]
fn extract_reinsert_round_trip() {
    let mut h: HashSet<String> = ["a", "b", "c"].iter().map(|s| s.to_string()).collect();
    let before: BTreeSet<String> = h.iter().cloned().collect();
    let handle = h.find(&"b".to_string()).expect("present");
    let node = h.extract(handle).expect("live");
    assert!(node.reinsert().1);
    assert_eq!(h.len(), 3);
    assert_eq!(h.iter().cloned().collect::<BTreeSet<_>>(), before);

    let mut t: TreeSet<String> = before.iter().cloned().collect();
    let handle = t.find(&"a".to_string()).expect("present");
    let node = t.extract(handle).expect("live");
    assert!(node.reinsert().1);
    assert!(t.iter().eq(before.iter()));
    assert_ok(t.check());
}

// Test: resize below the live count.
// Verifies: the call fails and leaves contents and capacity untouched.
#[test]
fn resize_below_len_is_rejected() {
    let mut h: HashSet<u32> = (0..50).collect();
    let cap = h.capacity();
    assert!(h.resize(49).is_err());
    assert_eq!(h.capacity(), cap);
    assert_eq!(h.len(), 50);

    let mut t: TreeSet<u32> = (0..50).collect();
    let cap = t.capacity();
    assert!(t.resize(10).is_err());
    assert_eq!(t.capacity(), cap);
    assert!(t.iter().copied().eq(0..50));
}

// Test: the debug-only reentrancy guard.
// Verifies: a comparator that reaches back into its own container panics
// in debug builds instead of observing half-linked state.
#[cfg(debug_assertions)]
#[test]
fn reentrant_comparator_panics_in_debug() {
    use arena_collections::CompareFunctor;
    use std::cell::Cell;
    use std::cmp::Ordering;

    thread_local! {
        static SET: Cell<*const TreeSet<i32, Sneaky>> = const { Cell::new(std::ptr::null()) };
    }

    #[derive(Default)]
    struct Sneaky;
    impl CompareFunctor<i32> for Sneaky {
        fn compare(&self, a: &i32, b: &i32) -> Ordering {
            let p = SET.with(|c| c.get());
            if !p.is_null() {
                // SAFETY: the set outlives every call made while `p` is set.
                let _ = unsafe { &*p }.contains(a);
            }
            a.cmp(b)
        }
    }

    let mut s: TreeSet<i32, Sneaky> = TreeSet::default();
    s.insert(1);
    SET.with(|c| c.set(&s as *const _));
    let res = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| s.contains(&1)));
    SET.with(|c| c.set(std::ptr::null()));
    assert!(res.is_err(), "expected nested entry to panic");
}
