//! Per-key exclusive locking.
//!
//! Maps the pessimistic row locking of a transactional store onto an
//! in-process mutex keyed by an arbitrary key. The contract: a second
//! concurrent acquisition for the same key blocks until the first holder
//! releases; different keys never contend.
//!
//! Guards hold a `tokio::sync::OwnedMutexGuard` so they may be kept across
//! store awaits. The outer map is a `parking_lot::Mutex`; it is only held
//! long enough to clone the per-key `Arc`, never across an await. Releasing
//! a guard evicts the map entry once no other task holds or waits on that
//! key, so the map tracks live contention rather than every key ever seen.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

/// A map of independently lockable keys.
pub struct KeyedMutex<K> {
    locks: Mutex<HashMap<K, Arc<AsyncMutex<()>>>>,
}

/// Exclusive hold on one key. Dropping it releases the key and removes the
/// map entry if no other task is holding or waiting on it.
pub struct KeyedMutexGuard<'a, K>
where
    K: Eq + Hash + Clone,
{
    owner: &'a KeyedMutex<K>,
    key: K,
    guard: Option<OwnedMutexGuard<()>>,
}

impl<K> Drop for KeyedMutexGuard<'_, K>
where
    K: Eq + Hash + Clone,
{
    fn drop(&mut self) {
        // Release the per-key mutex (and its Arc) before inspecting the map.
        self.guard.take();

        // Every waiter clones the Arc under the map lock, so observing a
        // strong count of 1 here means only the map itself still reaches
        // this entry and it can go.
        let mut locks = self.owner.locks.lock();
        if let Some(entry) = locks.get(&self.key) {
            if Arc::strong_count(entry) == 1 {
                locks.remove(&self.key);
            }
        }
    }
}

impl<K> KeyedMutex<K>
where
    K: Eq + Hash + Clone,
{
    /// Create an empty lock map.
    pub fn new() -> Self {
        Self {
            locks: Mutex::new(HashMap::new()),
        }
    }

    /// Acquire the exclusive lock for `key`, waiting if another task holds it.
    pub async fn lock(&self, key: &K) -> KeyedMutexGuard<'_, K> {
        let entry = {
            let mut locks = self.locks.lock();
            Arc::clone(locks.entry(key.clone()).or_default())
        };
        let guard = entry.lock_owned().await;
        KeyedMutexGuard {
            owner: self,
            key: key.clone(),
            guard: Some(guard),
        }
    }

    /// Number of keys currently held or contended.
    pub fn len(&self) -> usize {
        self.locks.lock().len()
    }

    /// Whether no key is currently held or contended.
    pub fn is_empty(&self) -> bool {
        self.locks.lock().is_empty()
    }
}

impl<K> Default for KeyedMutex<K>
where
    K: Eq + Hash + Clone,
{
    fn default() -> Self {
        Self::new()
    }
}
