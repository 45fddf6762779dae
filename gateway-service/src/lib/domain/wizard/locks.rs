use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::Mutex;
use tokio::sync::OwnedMutexGuard;
use tokio::sync::RwLock;

/// Per-session advisory locks.
///
/// One guest, one conversation: requests for a session are expected to
/// arrive serially, but nothing stops a client from firing two at once.
/// Wizard mutations hold the session's lock so concurrent requests are
/// serialized within this process instead of racing read-modify-write
/// against the store.
#[derive(Debug, Clone, Default)]
pub struct SessionLocks {
    locks: Arc<RwLock<HashMap<String, Arc<Mutex<()>>>>>,
}

impl SessionLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquire the lock for a session, creating it on first use.
    pub async fn acquire(&self, session_id: &str) -> OwnedMutexGuard<()> {
        let lock = {
            let locks = self.locks.read().await;
            locks.get(session_id).cloned()
        };

        let lock = match lock {
            Some(lock) => lock,
            None => {
                let mut locks = self.locks.write().await;
                locks
                    .entry(session_id.to_string())
                    .or_insert_with(|| Arc::new(Mutex::new(())))
                    .clone()
            }
        };

        lock.lock_owned().await
    }

    /// Drop lock entries nobody holds. Called from the maintenance sweep so
    /// the map does not grow with every session ever seen.
    pub async fn prune(&self) -> usize {
        let mut locks = self.locks.write().await;
        let before = locks.len();
        locks.retain(|_, lock| Arc::strong_count(lock) > 1 || lock.try_lock().is_err());
        before - locks.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_same_session_serializes() {
        let locks = SessionLocks::new();

        let guard = locks.acquire("guest_aa").await;

        let locks_clone = locks.clone();
        let contender = tokio::spawn(async move { locks_clone.acquire("guest_aa").await });

        // The contender cannot finish while the guard is held.
        tokio::task::yield_now().await;
        assert!(!contender.is_finished());

        drop(guard);
        contender.await.expect("contender completes after release");
    }

    #[tokio::test]
    async fn test_different_sessions_do_not_contend() {
        let locks = SessionLocks::new();

        let _a = locks.acquire("guest_aa").await;
        // Must not deadlock
        let _b = locks.acquire("guest_bb").await;
    }

    #[tokio::test]
    async fn test_prune_removes_idle_locks() {
        let locks = SessionLocks::new();

        {
            let _guard = locks.acquire("guest_aa").await;
        }

        let pruned = locks.prune().await;
        assert_eq!(pruned, 1);
    }
}
