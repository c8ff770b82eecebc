//! Per-key async locks so concurrent misses for one key do the work once.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, Weak};

use log::warn;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

/// Hands out one async lock per key. Entries are weak and pruned once no
/// caller holds or waits on them.
#[derive(Default)]
pub struct KeyedLocks {
    locks: Mutex<HashMap<String, Weak<AsyncMutex<()>>>>,
}

impl KeyedLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive ownership of `key`.
    pub async fn acquire(&self, key: &str) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.lock_map();
            locks.retain(|_, weak| weak.strong_count() > 0);
            match locks.get(key).and_then(Weak::upgrade) {
                Some(lock) => lock,
                None => {
                    let lock = Arc::new(AsyncMutex::new(()));
                    locks.insert(key.to_string(), Arc::downgrade(&lock));
                    lock
                }
            }
        };
        lock.lock_owned().await
    }

    /// Keys currently held or awaited.
    pub fn in_flight(&self) -> usize {
        self.lock_map()
            .values()
            .filter(|weak| weak.strong_count() > 0)
            .count()
    }

    fn lock_map(&self) -> MutexGuard<'_, HashMap<String, Weak<AsyncMutex<()>>>> {
        self.locks.lock().unwrap_or_else(|poisoned| {
            warn!("Single-flight lock map was poisoned, recovering");
            poisoned.into_inner()
        })
    }
}
