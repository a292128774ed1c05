use std::sync::Arc;

use super::CoordinationStore;

/// RAII guard over a held coordination-store lock.
///
/// Callers should prefer the explicit async `release()` so the release is
/// awaited and observable; the `Drop` impl is a best-effort backstop that
/// spawns the release so a forgotten guard does not hold the lock for its
/// full TTL after the guard goes out of scope.
pub struct LockGuard {
    store: Arc<dyn CoordinationStore>,
    key: String,
    holder: String,
    released: bool,
}

impl LockGuard {
    pub(super) fn new(store: Arc<dyn CoordinationStore>, key: String, holder: String) -> Self {
        Self {
            store,
            key,
            holder,
            released: false,
        }
    }

    pub async fn release(mut self) {
        let _ = self.store.lock_release(&self.key, &self.holder).await;
        self.released = true;
    }

    pub async fn extend(&self, ttl_ms: u64) -> bool {
        self.store
            .lock_extend(&self.key, &self.holder, ttl_ms)
            .await
            .unwrap_or(false)
    }
}

impl Drop for LockGuard {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        let store = self.store.clone();
        let key = self.key.clone();
        let holder = self.holder.clone();
        tokio::spawn(async move {
            let _ = store.lock_release(&key, &holder).await;
        });
    }
}
