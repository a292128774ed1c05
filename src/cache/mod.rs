//! Coordination Store Client: a thin typed wrapper over a Redis-compatible
//! store, used for the credential pool lists, cooling sets, rate-limit
//! counters and per-model usage hashes, and the scoped cross-process locks
//! credential acquisition relies on.

mod fake;
mod lock;
mod redis_store;

pub use fake::FakeCache;
pub use lock::LockGuard;
pub use redis_store::RedisStore;

use async_trait::async_trait;

use crate::error::ApiError;

/// Typed async operations over the coordination store, implemented once
/// against real Redis (`RedisStore`) and once in-memory (`FakeCache`) so
/// pool/quota logic can be unit-tested without a live server.
#[async_trait]
pub trait CoordinationStore: Send + Sync {
    async fn get_string(&self, key: &str) -> Result<Option<String>, ApiError>;
    async fn set_string_ex(&self, key: &str, value: &str, ttl_secs: u64) -> Result<(), ApiError>;
    async fn del(&self, key: &str) -> Result<(), ApiError>;

    /// Increment a counter, returning the post-increment value.
    async fn incr(&self, key: &str) -> Result<i64, ApiError>;

    /// Increment a counter by an arbitrary delta (e.g. token counts), returning
    /// the post-increment value.
    async fn incr_by(&self, key: &str, delta: i64) -> Result<i64, ApiError>;

    /// Increment a counter and set its TTL only the first time it becomes 1
    /// (used for `RATE_LIMIT:<user>` windows).
    async fn incr_with_ttl_if_first(&self, key: &str, ttl_secs: u64) -> Result<i64, ApiError>;

    async fn hincr(&self, key: &str, field: &str, delta: i64) -> Result<i64, ApiError>;
    async fn hgetall(&self, key: &str) -> Result<Vec<(String, String)>, ApiError>;

    async fn sadd(&self, key: &str, member: &str) -> Result<(), ApiError>;
    async fn srem(&self, key: &str, member: &str) -> Result<(), ApiError>;
    async fn sismember(&self, key: &str, member: &str) -> Result<bool, ApiError>;
    async fn smembers(&self, key: &str) -> Result<Vec<String>, ApiError>;

    async fn list_push_back(&self, key: &str, value: &str) -> Result<(), ApiError>;

    /// Atomically move the list's tail element to the head and return it
    /// (the RPOPLPUSH-onto-self idiom used for pool round-robin rotation).
    async fn list_rotate_tail_to_head(&self, key: &str) -> Result<Option<String>, ApiError>;

    async fn list_remove(&self, key: &str, value: &str) -> Result<(), ApiError>;
    async fn list_to_vec(&self, key: &str) -> Result<Vec<String>, ApiError>;

    /// `SET key value NX PX ttl_ms`. Returns `true` if the lock was acquired.
    async fn lock_acquire(&self, key: &str, holder: &str, ttl_ms: u64) -> Result<bool, ApiError>;

    /// Extend a lock's TTL, but only if `holder` still owns it.
    async fn lock_extend(&self, key: &str, holder: &str, ttl_ms: u64) -> Result<bool, ApiError>;

    /// Release a lock, but only if `holder` still owns it (compare-and-delete).
    async fn lock_release(&self, key: &str, holder: &str) -> Result<(), ApiError>;

    async fn publish(&self, channel: &str, message: &str) -> Result<(), ApiError>;
}

/// Acquire a scoped lock, returning an RAII guard that releases on explicit
/// `release()` or, best-effort, on `Drop`. Kept as a free function (rather
/// than a trait default method) so it composes with `Arc<dyn
/// CoordinationStore>`, the shape every caller actually holds.
pub async fn scoped_lock(
    store: std::sync::Arc<dyn CoordinationStore>,
    key: &str,
    holder: &str,
    ttl_ms: u64,
) -> Result<Option<LockGuard>, ApiError> {
    if store.lock_acquire(key, holder, ttl_ms).await? {
        Ok(Some(LockGuard::new(store, key.to_string(), holder.to_string())))
    } else {
        Ok(None)
    }
}
