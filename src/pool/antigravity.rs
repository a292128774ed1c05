use std::sync::Arc;

use chrono::Utc;
use tracing::{info, warn};

use crate::cache::CoordinationStore;
use crate::db::{CredentialStatus, Db};
use crate::error::{ApiError, ApiErrorKind};
use crate::oauth::AntigravityOauthClient;
use crate::utils::time::next_utc7_midnight;

use super::{ACCESS_TOKEN_CACHE_TTL_SECS, AcquiredCredential};

const POOL_ANTIGRAVITY: &str = "POOL_ANTIGRAVITY";
const COOLING_SET: &str = "ANTIGRAVITY_COOLING_SET";

#[derive(Clone)]
pub struct AntigravityPool {
    store: Arc<dyn CoordinationStore>,
    db: Db,
    oauth: AntigravityOauthClient,
}

impl AntigravityPool {
    pub fn new(store: Arc<dyn CoordinationStore>, db: Db, oauth: AntigravityOauthClient) -> Self {
        Self { store, db, oauth }
    }

    pub async fn sync_to_cache(&self) -> Result<(), ApiError> {
        let active = self.db.list_active_antigravity_tokens().await?;
        for id in self.store.list_to_vec(POOL_ANTIGRAVITY).await? {
            self.store.list_remove(POOL_ANTIGRAVITY, &id).await?;
        }
        for token in &active {
            self.store
                .list_push_back(POOL_ANTIGRAVITY, &token.id.to_string())
                .await?;
        }
        info!(count = active.len(), "antigravity pool resynced from store");
        Ok(())
    }

    pub async fn acquire(
        &self,
        user: &str,
        ttl_ms: u64,
    ) -> Result<Option<AcquiredCredential>, ApiError> {
        let mut candidates = self.store.list_to_vec(POOL_ANTIGRAVITY).await?;
        if candidates.is_empty() {
            self.sync_to_cache().await?;
            candidates = self.store.list_to_vec(POOL_ANTIGRAVITY).await?;
            if candidates.is_empty() {
                return Ok(None);
            }
        }

        let max_attempts = candidates.len() + 2;

        for _ in 0..max_attempts {
            let Some(id_str) = self.store.list_rotate_tail_to_head(POOL_ANTIGRAVITY).await? else {
                break;
            };
            let Ok(id) = id_str.parse::<i64>() else {
                continue;
            };

            let lock_key = format!("CRED_LOCK:antigravity:{id}");
            if let Some(holder) = self.store.get_string(&lock_key).await?
                && holder != user
            {
                continue;
            }

            let Some(mut token) = self.db.get_antigravity_token(id).await? else {
                continue;
            };
            if token.status != CredentialStatus::Active || !token.enabled {
                continue;
            }

            let now = Utc::now();
            if token.access_token_expired(now) {
                match self.oauth.refresh(&token.refresh_token).await {
                    Ok(refreshed) => {
                        self.db
                            .update_antigravity_token(id, &refreshed.access_token, refreshed.expires_at)
                            .await?;
                        let cache_key = format!("ACCESS_TOKEN:antigravity:{id}");
                        self.store
                            .set_string_ex(
                                &cache_key,
                                &refreshed.access_token,
                                ACCESS_TOKEN_CACHE_TTL_SECS,
                            )
                            .await?;
                        token.access_token = Some(refreshed.access_token);
                    }
                    Err(err) if is_permanent_refresh_failure(&err) => {
                        warn!(credential_id = id, "antigravity refresh permanently failed, marking dead");
                        self.mark_dead(id).await?;
                        continue;
                    }
                    Err(err) => {
                        warn!(credential_id = id, error = %err, "transient antigravity refresh failure");
                        continue;
                    }
                }
            }

            let acquired = if self.store.lock_acquire(&lock_key, user, ttl_ms).await? {
                true
            } else if self.store.get_string(&lock_key).await?.as_deref() == Some(user) {
                self.store.lock_extend(&lock_key, user, ttl_ms).await?
            } else {
                false
            };
            if !acquired {
                continue;
            }

            let Some(access_token) = token.access_token.clone() else {
                continue;
            };
            return Ok(Some(AcquiredCredential {
                credential_id: id,
                access_token,
                project_id: token.project_id,
            }));
        }

        Ok(None)
    }

    pub async fn release(&self, credential_id: i64, user: &str) -> Result<(), ApiError> {
        self.store
            .lock_release(&format!("CRED_LOCK:antigravity:{credential_id}"), user)
            .await
    }

    pub async fn mark_cooling(
        &self,
        id: i64,
        reset_hint: Option<chrono::DateTime<Utc>>,
    ) -> Result<(), ApiError> {
        let cooling_expires_at = reset_hint.unwrap_or_else(|| next_utc7_midnight(Utc::now()));
        self.db
            .set_antigravity_status(id, CredentialStatus::Cooling, Some(cooling_expires_at))
            .await?;
        self.store.list_remove(POOL_ANTIGRAVITY, &id.to_string()).await?;
        self.store.sadd(COOLING_SET, &id.to_string()).await?;
        Ok(())
    }

    pub async fn mark_dead(&self, id: i64) -> Result<(), ApiError> {
        self.db
            .set_antigravity_status(id, CredentialStatus::Dead, None)
            .await?;
        self.store.list_remove(POOL_ANTIGRAVITY, &id.to_string()).await?;
        self.store.srem(COOLING_SET, &id.to_string()).await?;
        Ok(())
    }

    /// 2-strike rule for a permanent (403) upstream denial: increment
    /// `fail_count`; a second strike marks the credential dead.
    pub async fn record_permanent_denial(&self, id: i64) -> Result<(), ApiError> {
        let fail_count = self.db.increment_antigravity_fail_count(id).await?;
        if fail_count >= 2 {
            warn!(credential_id = id, "second strike, marking dead");
            self.mark_dead(id).await?;
        }
        Ok(())
    }

    pub async fn restore_cooling(&self) -> Result<usize, ApiError> {
        let now = Utc::now();
        let cooling = self.db.list_cooling_antigravity_tokens().await?;
        let mut restored = 0;
        for token in cooling {
            let Some(expires_at) = token.cooling_expires_at else {
                continue;
            };
            if expires_at > now {
                continue;
            }
            self.db
                .set_antigravity_status(token.id, CredentialStatus::Active, None)
                .await?;
            self.db.reset_antigravity_fail_count(token.id).await?;
            self.store.srem(COOLING_SET, &token.id.to_string()).await?;
            self.store
                .list_push_back(POOL_ANTIGRAVITY, &token.id.to_string())
                .await?;
            restored += 1;
        }
        Ok(restored)
    }
}

fn is_permanent_refresh_failure(err: &ApiError) -> bool {
    matches!(err.kind, ApiErrorKind::Unauthorized | ApiErrorKind::Forbidden)
}
