//! Per-key mutual exclusion for cache fills.
//!
//! Uses `Mutex + Condvar` from std. A caller holding the guard for a key
//! blocks every other caller asking for the same key; different keys never
//! contend. Holding the guard across "check cache, fetch, write cache"
//! collapses concurrent identical fetches into one: later callers wake up to
//! a cache hit.

use std::hash::Hash;
use std::sync::{Condvar, Mutex, PoisonError};

use rustc_hash::FxHashSet;

/// Set of keys currently held, with a condition variable for waiters.
pub struct KeyedLocks<K> {
    held: Mutex<FxHashSet<K>>,
    cond: Condvar,
}

/// RAII guard that releases its key on drop.
pub struct KeyGuard<'a, K: Eq + Hash> {
    locks: &'a KeyedLocks<K>,
    key: Option<K>,
}

impl<K: Eq + Hash + Clone> KeyedLocks<K> {
    pub fn new() -> Self {
        Self {
            held: Mutex::new(FxHashSet::default()),
            cond: Condvar::new(),
        }
    }

    /// Block until `key` is free, then hold it.
    pub fn acquire(&self, key: K) -> KeyGuard<'_, K> {
        let mut held = self.held.lock().unwrap_or_else(PoisonError::into_inner);
        while held.contains(&key) {
            held = self
                .cond
                .wait(held)
                .unwrap_or_else(PoisonError::into_inner);
        }
        held.insert(key.clone());
        KeyGuard {
            locks: self,
            key: Some(key),
        }
    }

    /// Number of keys currently held.
    pub fn held(&self) -> usize {
        self.held
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

impl<K: Eq + Hash + Clone> Default for KeyedLocks<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Eq + Hash> Drop for KeyGuard<'_, K> {
    fn drop(&mut self) {
        if let Some(key) = self.key.take() {
            let mut held = self
                .locks
                .held
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            held.remove(&key);
            // waiters on different keys share the condvar
            self.locks.cond.notify_all();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn acquire_and_release() {
        let locks = KeyedLocks::new();
        let g1 = locks.acquire("a");
        let _g2 = locks.acquire("b");
        assert_eq!(locks.held(), 2);
        drop(g1);
        assert_eq!(locks.held(), 1);
    }

    #[test]
    fn same_key_blocks() {
        let locks = Arc::new(KeyedLocks::new());
        let guard = locks.acquire("k".to_string());

        let locks2 = locks.clone();
        let handle = std::thread::spawn(move || {
            let _g = locks2.acquire("k".to_string());
            42
        });

        // Give thread time to block
        std::thread::sleep(std::time::Duration::from_millis(50));
        assert_eq!(locks.held(), 1);
        drop(guard);

        assert_eq!(handle.join().unwrap(), 42);
        assert_eq!(locks.held(), 0);
    }

    #[test]
    fn critical_sections_do_not_overlap() {
        let locks = Arc::new(KeyedLocks::new());
        let inside = Arc::new(AtomicUsize::new(0));
        let max_seen = Arc::new(AtomicUsize::new(0));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let locks = locks.clone();
                let inside = inside.clone();
                let max_seen = max_seen.clone();
                std::thread::spawn(move || {
                    let _g = locks.acquire(7u32);
                    let now = inside.fetch_add(1, Ordering::SeqCst) + 1;
                    max_seen.fetch_max(now, Ordering::SeqCst);
                    std::thread::sleep(std::time::Duration::from_millis(5));
                    inside.fetch_sub(1, Ordering::SeqCst);
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(max_seen.load(Ordering::SeqCst), 1);
    }
}
