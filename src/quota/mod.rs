//! Quota & Rate Governor: tier derivation, dynamic daily quota, per-minute
//! rate limiting, and usage accounting, all backed by the coordination
//! store with the persistent store as the source of truth for credential
//! counts, `today_used`, and the admin-adjustable `system_settings` mirror.

use std::sync::Arc;

use chrono::Utc;

use crate::cache::CoordinationStore;
use crate::config::QuotaConfig;
use crate::db::{Db, User};
use crate::error::ApiError;
use crate::utils::time::utc8_day_key;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tier {
    Newbie,
    Contributor,
    V3Contributor,
}

#[derive(Clone)]
pub struct Governor {
    store: Arc<dyn CoordinationStore>,
    db: Db,
    config: QuotaConfig,
}

impl Governor {
    pub fn new(store: Arc<dyn CoordinationStore>, db: Db, config: QuotaConfig) -> Self {
        Self { store, db, config }
    }

    fn base_quota_and_rpm(&self, tier: Tier) -> (i64, u32) {
        match tier {
            Tier::Newbie => (self.config.newbie_daily, self.config.newbie_rpm),
            Tier::Contributor => (self.config.contributor_daily, self.config.contributor_rpm),
            Tier::V3Contributor => (
                self.config.v3_contributor_daily,
                self.config.v3_contributor_rpm,
            ),
        }
    }

    /// Tier derived from the caller's ACTIVE+COOLING credential holdings.
    pub async fn derive_tier(&self, user_id: i64) -> Result<Tier, ApiError> {
        let (total, v3) = self.db.count_google_credentials_for_owner(user_id).await?;
        Ok(if v3 >= 1 {
            Tier::V3Contributor
        } else if total >= 1 {
            Tier::Contributor
        } else {
            Tier::Newbie
        })
    }

    /// `baseQuota(tier) + max(0, activeCount - 1) * incrementPerCredential`.
    /// `increment_per_credential` is read from the live `system_settings`
    /// mirror so an admin's runtime edit takes effect without a restart.
    pub async fn dynamic_daily_quota(&self, user_id: i64, tier: Tier) -> Result<i64, ApiError> {
        let active = self.db.count_active_google_credentials_for_owner(user_id).await?;
        let (base, _rpm) = self.base_quota_and_rpm(tier);
        let settings = self.db.load_system_settings().await?;
        let extra = (active - 1).max(0) * settings.increment_per_credential;
        Ok(base + extra)
    }

    /// Increments `RATE_LIMIT:<user>`, setting a 60s TTL the first time it
    /// becomes 1. Admins always pass. Returns `Ok(true)` if the slot is granted.
    pub async fn check_and_reserve_rate_slot(
        &self,
        user: &User,
        tier: Tier,
    ) -> Result<bool, ApiError> {
        if user.is_admin() {
            return Ok(true);
        }
        let (_base, rpm) = self.base_quota_and_rpm(tier);
        let key = format!("RATE_LIMIT:{}", user.id);
        let count = self.store.incr_with_ttl_if_first(&key, 60).await?;
        Ok(count <= i64::from(rpm))
    }

    /// Checks whether the user's `today_used` has room for one more call
    /// against their dynamically computed quota. Admins always pass.
    pub async fn has_daily_quota(&self, user: &User, tier: Tier) -> Result<bool, ApiError> {
        if user.is_admin() {
            return Ok(true);
        }
        let quota = self.dynamic_daily_quota(user.id, tier).await?;
        Ok(user.today_used < quota)
    }

    /// Records a successful call: bumps `today_used`, the per-user and
    /// global per-model stats hashes.
    pub async fn record_usage(&self, user_id: i64, model: &str) -> Result<(), ApiError> {
        self.db.increment_today_used(user_id, 1).await?;
        let day = utc8_day_key(Utc::now());
        self.store
            .hincr(&format!("USER_STATS:{user_id}:{day}"), model, 1)
            .await?;
        self.store
            .hincr(&format!("GLOBAL_STATS:{day}"), model, 1)
            .await?;
        Ok(())
    }

    /// Antigravity usage accounting: increments both the `requests` and
    /// `tokens` legacy-form counters, per `spec.md` §3.6's dual-key note.
    pub async fn record_antigravity_usage(
        &self,
        user_id: i64,
        model: &str,
        completion_tokens: i64,
    ) -> Result<(), ApiError> {
        let day = utc8_day_key(Utc::now());
        self.store
            .incr(&format!("USAGE:requests:{day}:{user_id}:antigravity:{model}"))
            .await?;
        let tokens_key = format!("USAGE:tokens:{day}:{user_id}:antigravity:{model}");
        self.store.incr_by(&tokens_key, completion_tokens.max(0)).await?;
        Ok(())
    }

    /// Current Antigravity usage for `user_id`/`model` today, read back from
    /// whichever of the dual `USAGE:requests:...`/`USAGE:tokens:...` keys
    /// `record_antigravity_usage` writes, matching the live `use_token_quota`
    /// mode so the gate and the accounting never disagree mid-day.
    pub async fn antigravity_used(&self, user_id: i64, model: &str) -> Result<i64, ApiError> {
        let day = utc8_day_key(Utc::now());
        let settings = self.db.load_system_settings().await?;
        if settings.use_token_quota {
            let key = format!("USAGE:tokens:{day}:{user_id}:antigravity:{model}");
            let used = self
                .store
                .get_string(&key)
                .await?
                .and_then(|value| value.parse().ok())
                .unwrap_or(0);
            Ok(used)
        } else {
            let key = format!("USAGE:requests:{day}:{user_id}:antigravity:{model}");
            let used = self
                .store
                .get_string(&key)
                .await?
                .and_then(|value| value.parse().ok())
                .unwrap_or(0);
            Ok(used)
        }
    }

    /// Antigravity quota-mode switch: `use_token_quota` selects between
    /// request-count and token-count enforcement against the relevant
    /// `claude_limit`/`gemini3_limit` (or their `_token_quota` variants).
    /// A user's own override (`User.antigravity_claude_limit`/`antigravity_gemini3_limit`)
    /// wins over the system default when request-count mode is active.
    pub async fn antigravity_quota_remaining(
        &self,
        user: &User,
        model_is_claude: bool,
        used: i64,
    ) -> Result<i64, ApiError> {
        let settings = self.db.load_system_settings().await?;
        let limit = if settings.use_token_quota {
            if model_is_claude {
                settings.antigravity_claude_token_quota
            } else {
                settings.antigravity_gemini3_token_quota
            }
        } else if model_is_claude {
            user.antigravity_claude_limit.unwrap_or(settings.antigravity_claude_limit)
        } else {
            user.antigravity_gemini3_limit.unwrap_or(settings.antigravity_gemini3_limit)
        };
        Ok((limit - used).max(0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::FakeCache;
    use crate::db::UserRole;

    fn test_user(id: i64, role: UserRole, today_used: i64) -> User {
        User {
            id,
            username: format!("user-{id}"),
            password_hash: String::new(),
            role,
            today_used,
            daily_limit: 300,
            level: 0,
            antigravity_claude_limit: None,
            antigravity_gemini3_limit: None,
            active: true,
            linked_external_id: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    async fn test_governor() -> Governor {
        let store: Arc<dyn CoordinationStore> = Arc::new(FakeCache::new());
        let db = Db::connect("sqlite::memory:").await.unwrap();
        Governor::new(store, db, QuotaConfig::default())
    }

    #[tokio::test]
    async fn tier_is_newbie_with_no_credentials() {
        let governor = test_governor().await;
        let tier = governor.derive_tier(1).await.unwrap();
        assert_eq!(tier, Tier::Newbie);
    }

    #[tokio::test]
    async fn dynamic_quota_matches_tier_base_with_no_credentials() {
        let governor = test_governor().await;
        let quota = governor.dynamic_daily_quota(1, Tier::Newbie).await.unwrap();
        assert_eq!(quota, 300);
    }

    #[tokio::test]
    async fn rate_slot_denied_past_tier_limit() {
        let governor = test_governor().await;
        let user = test_user(1, UserRole::User, 0);
        for _ in 0..10 {
            assert!(
                governor
                    .check_and_reserve_rate_slot(&user, Tier::Newbie)
                    .await
                    .unwrap()
            );
        }
        assert!(
            !governor
                .check_and_reserve_rate_slot(&user, Tier::Newbie)
                .await
                .unwrap()
        );
    }

    #[tokio::test]
    async fn admin_bypasses_rate_limit() {
        let governor = test_governor().await;
        let admin = test_user(1, UserRole::Admin, 0);
        for _ in 0..50 {
            assert!(
                governor
                    .check_and_reserve_rate_slot(&admin, Tier::Newbie)
                    .await
                    .unwrap()
            );
        }
    }

    #[tokio::test]
    async fn admin_bypasses_daily_quota() {
        let governor = test_governor().await;
        let admin = test_user(1, UserRole::Admin, 999_999);
        assert!(governor.has_daily_quota(&admin, Tier::Newbie).await.unwrap());
    }
}
