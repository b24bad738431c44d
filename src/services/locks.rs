// src/services/locks.rs

//! Keyed lock registry.
//!
//! Each key maps to its own async mutex, so holders of different keys never
//! wait on each other. Slots are held weakly and dropped once unused.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::{Arc, Weak};
use std::time::Duration;

use tokio::sync::{Mutex, OwnedMutexGuard};
use tokio::time::error::Elapsed;

const MIN_PRUNE_THRESHOLD: usize = 64;

/// Held for as long as the key is locked.
pub type KeyGuard = OwnedMutexGuard<()>;

#[derive(Debug)]
pub struct KeyedLocks<K> {
    inner: Mutex<Slots<K>>,
}

#[derive(Debug)]
struct Slots<K> {
    slots: HashMap<K, Weak<Mutex<()>>>,
    prune_at: usize,
}

impl<K> Default for KeyedLocks<K> {
    fn default() -> Self {
        Self {
            inner: Mutex::new(Slots {
                slots: HashMap::new(),
                prune_at: MIN_PRUNE_THRESHOLD,
            }),
        }
    }
}

impl<K: Eq + Hash + Clone> KeyedLocks<K> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Waits at most `wait` for exclusive access to `key`.
    pub async fn acquire(&self, key: &K, wait: Duration) -> Result<KeyGuard, Elapsed> {
        let slot = self.slot(key).await;
        tokio::time::timeout(wait, slot.lock_owned()).await
    }

    async fn slot(&self, key: &K) -> Arc<Mutex<()>> {
        let mut inner = self.inner.lock().await;

        if inner.slots.len() >= inner.prune_at {
            inner.slots.retain(|_, slot| slot.strong_count() > 0);
            inner.prune_at = (inner.slots.len() * 2).max(MIN_PRUNE_THRESHOLD);
        }

        if let Some(slot) = inner.slots.get(key).and_then(Weak::upgrade) {
            return slot;
        }

        let slot = Arc::new(Mutex::new(()));
        inner.slots.insert(key.clone(), Arc::downgrade(&slot));
        slot
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_same_key_waits_and_times_out() {
        let locks = KeyedLocks::new();
        let _held = locks.acquire(&(1, 1), Duration::from_millis(50)).await.unwrap();

        let second = locks.acquire(&(1, 1), Duration::from_millis(20)).await;
        assert!(second.is_err());
    }

    #[tokio::test]
    async fn test_different_keys_do_not_block() {
        let locks = KeyedLocks::new();
        let _a = locks.acquire(&(1, 1), Duration::from_millis(50)).await.unwrap();
        let b = locks.acquire(&(1, 2), Duration::from_millis(20)).await;
        assert!(b.is_ok());
    }

    #[tokio::test]
    async fn test_released_key_can_be_reacquired() {
        let locks = KeyedLocks::new();
        let guard = locks.acquire(&"k", Duration::from_millis(50)).await.unwrap();
        drop(guard);
        assert!(locks.acquire(&"k", Duration::from_millis(20)).await.is_ok());
    }

    #[tokio::test]
    async fn test_unused_slots_are_pruned() {
        let locks = KeyedLocks::new();
        for i in 0..(MIN_PRUNE_THRESHOLD * 3) {
            let _guard = locks.acquire(&i, Duration::from_millis(50)).await.unwrap();
        }
        let inner = locks.inner.lock().await;
        assert!(inner.slots.values().all(|slot| slot.strong_count() == 0));
        assert!(inner.slots.len() <= MIN_PRUNE_THRESHOLD);
    }
}
