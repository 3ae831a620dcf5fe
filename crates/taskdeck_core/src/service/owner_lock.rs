//! Per-owner mutual exclusion for task mutations.
//!
//! At most one mutating operation per owner runs at a time; different owners
//! never wait on each other. Entries exist only while held, so the registry
//! does not grow with the number of owners ever seen.

use crate::model::user::UserId;
use std::collections::HashSet;
use std::sync::{Condvar, Mutex, PoisonError};

/// Registry of owners with an in-flight mutation.
#[derive(Debug, Default)]
pub struct OwnerLocks {
    busy: Mutex<HashSet<UserId>>,
    released: Condvar,
}

/// Held lock for one owner; released on drop.
#[derive(Debug)]
pub struct OwnerGuard<'a> {
    locks: &'a OwnerLocks,
    owner: UserId,
}

impl OwnerLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Blocks until no other mutation for `owner` is in flight.
    pub fn acquire(&self, owner: UserId) -> OwnerGuard<'_> {
        // The set holds no invariant a panicking holder could break.
        let mut busy = self.busy.lock().unwrap_or_else(PoisonError::into_inner);
        while busy.contains(&owner) {
            busy = self
                .released
                .wait(busy)
                .unwrap_or_else(PoisonError::into_inner);
        }
        busy.insert(owner);
        OwnerGuard {
            locks: self,
            owner,
        }
    }

    /// Returns whether a mutation for `owner` is currently in flight.
    pub fn is_held(&self, owner: UserId) -> bool {
        self.busy
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(&owner)
    }
}

impl Drop for OwnerGuard<'_> {
    fn drop(&mut self) {
        let mut busy = self
            .locks
            .busy
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        busy.remove(&self.owner);
        drop(busy);
        self.locks.released.notify_all();
    }
}

#[cfg(test)]
mod tests {
    use super::OwnerLocks;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;
    use uuid::Uuid;

    #[test]
    fn guard_release_clears_entry() {
        let locks = OwnerLocks::new();
        let owner = Uuid::new_v4();
        {
            let _guard = locks.acquire(owner);
            assert!(locks.is_held(owner));
        }
        assert!(!locks.is_held(owner));
    }

    #[test]
    fn different_owners_do_not_block_each_other() {
        let locks = OwnerLocks::new();
        let _first = locks.acquire(Uuid::new_v4());
        let _second = locks.acquire(Uuid::new_v4());
    }

    #[test]
    fn same_owner_mutations_never_overlap() {
        let locks = Arc::new(OwnerLocks::new());
        let owner = Uuid::new_v4();
        let in_flight = Arc::new(AtomicUsize::new(0));
        let max_seen = Arc::new(AtomicUsize::new(0));

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let locks = Arc::clone(&locks);
                let in_flight = Arc::clone(&in_flight);
                let max_seen = Arc::clone(&max_seen);
                thread::spawn(move || {
                    for _ in 0..5 {
                        let _guard = locks.acquire(owner);
                        let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                        max_seen.fetch_max(now, Ordering::SeqCst);
                        thread::sleep(Duration::from_millis(2));
                        in_flight.fetch_sub(1, Ordering::SeqCst);
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(max_seen.load(Ordering::SeqCst), 1);
        assert!(!locks.is_held(owner));
    }
}
