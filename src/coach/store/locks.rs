//! Per-session mutual exclusion.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::coach::core::ids::SessionKey;

/// Exclusive hold on one session's transcript.
///
/// Appends require a guard, so transcript writes for one key are serialized while
/// distinct keys never contend.
pub struct SessionGuard {
    key: SessionKey,
    _lock: OwnedMutexGuard<()>,
}

impl SessionGuard {
    /// Session this guard covers.
    #[must_use]
    pub const fn key(&self) -> &SessionKey {
        &self.key
    }
}

/// Lazily created lock per session key.
#[derive(Default)]
pub struct SessionLocks {
    locks: DashMap<SessionKey, Arc<Mutex<()>>>,
}

impl SessionLocks {
    /// Create an empty lock table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to `key`.
    pub async fn acquire(&self, key: &SessionKey) -> SessionGuard {
        let lock = Arc::clone(
            self.locks
                .entry(key.clone())
                .or_insert_with(|| Arc::new(Mutex::new(())))
                .value(),
        );
        let guard = lock.lock_owned().await;
        SessionGuard {
            key: key.clone(),
            _lock: guard,
        }
    }

    /// Number of keys that have been locked at least once.
    #[must_use]
    pub fn len(&self) -> usize {
        self.locks.len()
    }

    /// Whether no key has been locked yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }
}
