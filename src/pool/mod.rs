//! Credential Pool Engine: round-robin rotation over refreshable OAuth
//! credentials, with per-user locks, cooling/dead state transitions, and
//! access-token caching. One `CloudCodePool` and one `AntigravityPool` are
//! constructed once at boot and shared across all handlers.

mod antigravity;
mod cloudcode;

pub use antigravity::AntigravityPool;
pub use cloudcode::{CloudCodePool, PoolKind};

/// A leased, refreshed credential ready to authenticate an upstream call.
/// The caller holds `CRED_LOCK:<credential_id>` for the lifetime of the
/// request and must release it (via the pool) when done.
#[derive(Debug, Clone)]
pub struct AcquiredCredential {
    pub credential_id: i64,
    pub access_token: String,
    pub project_id: String,
}

const ACCESS_TOKEN_CACHE_TTL_SECS: u64 = 55 * 60;
