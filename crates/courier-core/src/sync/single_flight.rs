//! Per-user single-flight guard for sync cycles

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

type LockMap = HashMap<String, Arc<AsyncMutex<()>>>;

/// One async lock per user id.
///
/// Holding the guard returned by [`UserLocks::acquire`] excludes every other
/// cycle for the same user; different users never contend. An entry lives
/// only while some cycle holds or waits for it.
#[derive(Debug, Clone, Default)]
pub struct UserLocks {
    locks: Arc<Mutex<LockMap>>,
}

/// Exclusive access for one user; released on drop.
#[derive(Debug)]
pub struct UserLockGuard {
    guard: Option<OwnedMutexGuard<()>>,
    user_id: String,
    locks: Arc<Mutex<LockMap>>,
}

impl UserLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access for `user_id`.
    pub async fn acquire(&self, user_id: &str) -> UserLockGuard {
        let lock = {
            let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
            Arc::clone(locks.entry(user_id.to_string()).or_default())
        };
        UserLockGuard {
            guard: Some(lock.lock_owned().await),
            user_id: user_id.to_string(),
            locks: Arc::clone(&self.locks),
        }
    }

    #[cfg(test)]
    pub(crate) fn is_busy(&self, user_id: &str) -> bool {
        let locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        locks
            .get(user_id)
            .is_some_and(|lock| lock.try_lock().is_err())
    }

    #[cfg(test)]
    pub(crate) fn tracked_users(&self) -> usize {
        self.locks.lock().unwrap_or_else(PoisonError::into_inner).len()
    }
}

impl Drop for UserLockGuard {
    fn drop(&mut self) {
        drop(self.guard.take());
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        // Waiters clone the Arc under the map lock; a count of one is the map itself.
        if locks
            .get(&self.user_id)
            .is_some_and(|lock| Arc::strong_count(lock) == 1)
        {
            locks.remove(&self.user_id);
        }
    }
}
