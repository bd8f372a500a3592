//! Debug-only reentrancy guard.
//!
//! The index layers call into user functors (`hash`, `equal`, `compare`)
//! while chains or tree links are half rewritten. A functor that reaches
//! back into the same container through an aliased pointer would observe
//! that state. Debug builds catch this by panicking on nested entry;
//! release builds compile the guard away.

#[cfg(debug_assertions)]
use core::cell::Cell;
use core::marker::PhantomData;

#[derive(Debug, Default)]
pub(crate) struct DebugReentrancy {
    #[cfg(debug_assertions)]
    busy: Cell<bool>,
    // Containers are single-threaded; keep them !Sync.
    _nosync: PhantomData<Cell<()>>,
}

impl Clone for DebugReentrancy {
    fn clone(&self) -> Self {
        Self::new()
    }
}

impl DebugReentrancy {
    pub(crate) const fn new() -> Self {
        Self {
            #[cfg(debug_assertions)]
            busy: Cell::new(false),
            _nosync: PhantomData,
        }
    }

    /// Marks the owning container busy until the returned guard drops.
    #[inline]
    pub(crate) fn enter(&self) -> Entered<'_> {
        #[cfg(debug_assertions)]
        {
            assert!(
                !self.busy.replace(true),
                "reentrancy detected: container accessed from inside its own functor"
            );
            Entered { owner: self }
        }
        #[cfg(not(debug_assertions))]
        {
            Entered { _lt: PhantomData }
        }
    }
}

pub(crate) struct Entered<'a> {
    #[cfg(debug_assertions)]
    owner: &'a DebugReentrancy,
    #[cfg(not(debug_assertions))]
    _lt: PhantomData<&'a ()>,
}

impl Drop for Entered<'_> {
    fn drop(&mut self) {
        #[cfg(debug_assertions)]
        self.owner.busy.set(false);
    }
}

#[cfg(test)]
mod tests {
    use super::DebugReentrancy;

    #[test]
    fn sequential_entries_are_fine() {
        let r = DebugReentrancy::new();
        drop(r.enter());
        drop(r.enter());
    }

    #[cfg(debug_assertions)]
    #[test]
    fn nested_entry_panics_in_debug() {
        let r = DebugReentrancy::new();
        let res = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _outer = r.enter();
            let _inner = r.enter();
        }));
        assert!(res.is_err(), "expected nested entry to panic");
        // The unwinding outer guard released the flag.
        drop(r.enter());
    }
}
