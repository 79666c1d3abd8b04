//! Per-key async mutual exclusion.
//!
//! The purchase reconciler serialises two read-then-write spans: the average price update
//! of a product, and the duplicate check plus insert of a user's purchase. Each span takes
//! the guard for its key; unrelated keys never wait on each other.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

type Slots = Arc<Mutex<HashMap<i64, Arc<AsyncMutex<()>>>>>;

/// A table of async mutexes keyed by record id.
///
/// A key's slot lives only while someone holds or waits for it.
#[derive(Debug, Default, Clone)]
pub struct KeyedLocks {
    slots: Slots,
}

/// Exclusive hold on one key. Dropping it releases the key.
#[derive(Debug)]
pub struct KeyGuard {
    key: i64,
    slots: Slots,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for KeyGuard {
    fn drop(&mut self) {
        drop(self.guard.take());
        let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        if slots
            .get(&self.key)
            .is_some_and(|slot| Arc::strong_count(slot) == 1)
        {
            slots.remove(&self.key);
        }
    }
}

impl KeyedLocks {
    /// Creates an empty lock table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(&self, key: i64) -> Arc<AsyncMutex<()>> {
        let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(slots.entry(key).or_default())
    }

    /// Waits for and returns the guard for `key`. The lock is released when the guard drops.
    pub async fn lock(&self, key: i64) -> KeyGuard {
        let guard = self.slot(key).lock_owned().await;
        KeyGuard {
            key,
            slots: Arc::clone(&self.slots),
            guard: Some(guard),
        }
    }

    /// Locks several keys in ascending order, skipping duplicates.
    ///
    /// Always acquiring in the same order keeps two callers with overlapping key sets from
    /// deadlocking.
    pub async fn lock_many(&self, keys: impl IntoIterator<Item = i64>) -> Vec<KeyGuard> {
        let mut keys: Vec<i64> = keys.into_iter().collect();
        keys.sort_unstable();
        keys.dedup();

        let mut guards = Vec::with_capacity(keys.len());
        for key in keys {
            guards.push(self.lock(key).await);
        }
        guards
    }

    /// Number of keys currently held or awaited.
    #[must_use]
    pub fn len(&self) -> usize {
        self.slots
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Whether no key is held or awaited.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
