//! Reusable visited set for beam search.
//!
//! One per thread. Clearing bumps an epoch instead of zeroing the array, so a
//! query only pays for the nodes it touches.
use std::cell::RefCell;

thread_local! {
    static VISITED: RefCell<VisitedSet> = RefCell::new(VisitedSet::default());
}

#[derive(Debug, Default)]
pub(crate) struct VisitedSet {
    epochs: Vec<u32>,
    current: u32,
}

impl VisitedSet {
    /// Forget every mark and make room for ids below `capacity`.
    fn clear(&mut self, capacity: usize) {
        if self.epochs.len() < capacity {
            self.epochs.resize(capacity, 0);
        }
        self.current = self.current.wrapping_add(1);
        if self.current == 0 {
            self.epochs.fill(0);
            self.current = 1;
        }
    }

    /// Mark `id`. Returns `false` if it was already marked.
    pub fn insert(&mut self, id: usize) -> bool {
        let slot = &mut self.epochs[id];
        if *slot == self.current {
            false
        } else {
            *slot = self.current;
            true
        }
    }
}

/// Run `f` with this thread's visited set, cleared for ids below `capacity`.
pub(crate) fn with_visited<R>(capacity: usize, f: impl FnOnce(&mut VisitedSet) -> R) -> R {
    VISITED.with(|cell| match cell.try_borrow_mut() {
        Ok(mut set) => {
            set.clear(capacity);
            f(&mut set)
        }
        // Re-entrant use gets a private set.
        Err(_) => {
            let mut set = VisitedSet::default();
            set.clear(capacity);
            f(&mut set)
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn marks_reset_between_uses() {
        with_visited(4, |v| {
            assert!(v.insert(2));
            assert!(!v.insert(2));
        });
        with_visited(8, |v| {
            assert!(v.insert(2));
            assert!(v.insert(7));
        });
    }

    #[test]
    fn epoch_wraparound_clears_old_marks() {
        let mut set = VisitedSet::default();
        set.clear(3);
        set.insert(1);
        set.current = u32::MAX;
        set.epochs[0] = u32::MAX;
        set.clear(3);
        assert_eq!(set.current, 1);
        assert!(set.insert(0));
        assert!(set.insert(1));
    }

    #[test]
    fn nested_use_does_not_share_marks() {
        with_visited(2, |outer| {
            outer.insert(0);
            with_visited(2, |inner| assert!(inner.insert(0)));
            assert!(!outer.insert(0));
        });
    }
}
