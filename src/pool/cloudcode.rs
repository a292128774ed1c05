use std::sync::Arc;

use chrono::Utc;
use tracing::{info, warn};

use crate::cache::CoordinationStore;
use crate::db::{CredentialStatus, Db};
use crate::error::{ApiError, ApiErrorKind};
use crate::oauth::GoogleOauthClient;
use crate::utils::time::next_utc7_midnight;
use crate::utils::token::hash_credential_pair;

use super::{ACCESS_TOKEN_CACHE_TTL_SECS, AcquiredCredential};

const POOL_GENERAL: &str = "POOL_GENERAL";
const POOL_V3: &str = "POOL_V3";
const COOLING_SET: &str = "COOLING_SET";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PoolKind {
    General,
    V3,
}

impl PoolKind {
    fn key(self) -> &'static str {
        match self {
            PoolKind::General => POOL_GENERAL,
            PoolKind::V3 => POOL_V3,
        }
    }
}

#[derive(Clone)]
pub struct CloudCodePool {
    store: Arc<dyn CoordinationStore>,
    db: Db,
    oauth: GoogleOauthClient,
}

impl CloudCodePool {
    pub fn new(store: Arc<dyn CoordinationStore>, db: Db, oauth: GoogleOauthClient) -> Self {
        Self { store, db, oauth }
    }

    /// Rebuild `POOL_GENERAL`/`POOL_V3` from the persistent store. Called at
    /// boot and whenever a pool is found empty at acquisition time.
    pub async fn sync_to_cache(&self) -> Result<(), ApiError> {
        let active = self.db.list_active_google_credentials().await?;

        for key in [POOL_GENERAL, POOL_V3] {
            for id in self.store.list_to_vec(key).await? {
                self.store.list_remove(key, &id).await?;
            }
        }

        for credential in &active {
            self.store
                .list_push_back(POOL_GENERAL, &credential.id.to_string())
                .await?;
            if credential.supports_v3 {
                self.store
                    .list_push_back(POOL_V3, &credential.id.to_string())
                    .await?;
            }
        }
        info!(count = active.len(), "cloud code pool resynced from store");
        Ok(())
    }

    pub async fn acquire(
        &self,
        pool: PoolKind,
        user: &str,
        ttl_ms: u64,
    ) -> Result<Option<AcquiredCredential>, ApiError> {
        let key = pool.key();

        let mut candidates = self.store.list_to_vec(key).await?;
        if candidates.is_empty() {
            self.sync_to_cache().await?;
            candidates = self.store.list_to_vec(key).await?;
            if candidates.is_empty() {
                return Ok(None);
            }
        }

        let max_attempts = candidates.len() + 2;

        for _ in 0..max_attempts {
            let Some(id_str) = self.store.list_rotate_tail_to_head(key).await? else {
                break;
            };
            let Ok(id) = id_str.parse::<i64>() else {
                continue;
            };

            let lock_key = format!("CRED_LOCK:{id}");
            if let Some(holder) = self.store.get_string(&lock_key).await?
                && holder != user
            {
                continue;
            }

            let Some(mut credential) = self.db.get_google_credential(id).await? else {
                continue;
            };
            if credential.status != CredentialStatus::Active {
                continue;
            }

            let now = Utc::now();
            if credential.access_token_expired(now) {
                match self
                    .oauth
                    .refresh(
                        &credential.client_id,
                        &credential.client_secret,
                        &credential.refresh_token,
                    )
                    .await
                {
                    Ok(refreshed) => {
                        self.db
                            .update_google_credential_token(
                                id,
                                &refreshed.access_token,
                                refreshed.expires_at,
                            )
                            .await?;
                        let cache_key = format!(
                            "ACCESS_TOKEN:{}",
                            hash_credential_pair(&credential.client_id, &credential.refresh_token)
                        );
                        self.store
                            .set_string_ex(
                                &cache_key,
                                &refreshed.access_token,
                                ACCESS_TOKEN_CACHE_TTL_SECS,
                            )
                            .await?;
                        credential.access_token = Some(refreshed.access_token);
                    }
                    Err(err) if is_permanent_refresh_failure(&err) => {
                        warn!(credential_id = id, "refresh permanently failed, marking dead");
                        self.mark_dead(id).await?;
                        continue;
                    }
                    Err(err) => {
                        warn!(credential_id = id, error = %err, "transient refresh failure");
                        continue;
                    }
                }
            }

            let acquired = if self.store.lock_acquire(&lock_key, user, ttl_ms).await? {
                true
            } else if self
                .store
                .get_string(&lock_key)
                .await?
                .as_deref()
                == Some(user)
            {
                self.store.lock_extend(&lock_key, user, ttl_ms).await?
            } else {
                false
            };
            if !acquired {
                continue;
            }

            let Some(access_token) = credential.access_token.clone() else {
                continue;
            };
            return Ok(Some(AcquiredCredential {
                credential_id: id,
                access_token,
                project_id: credential.project_id,
            }));
        }

        Ok(None)
    }

    pub async fn release(&self, credential_id: i64, user: &str) -> Result<(), ApiError> {
        self.store
            .lock_release(&format!("CRED_LOCK:{credential_id}"), user)
            .await
    }

    pub async fn mark_cooling(
        &self,
        id: i64,
        reset_hint: Option<chrono::DateTime<Utc>>,
    ) -> Result<(), ApiError> {
        let cooling_expires_at = reset_hint.unwrap_or_else(|| next_utc7_midnight(Utc::now()));
        self.db
            .set_google_credential_status(id, CredentialStatus::Cooling, Some(cooling_expires_at))
            .await?;
        self.store.list_remove(POOL_GENERAL, &id.to_string()).await?;
        self.store.list_remove(POOL_V3, &id.to_string()).await?;
        self.store.sadd(COOLING_SET, &id.to_string()).await?;
        Ok(())
    }

    pub async fn mark_dead(&self, id: i64) -> Result<(), ApiError> {
        self.db
            .set_google_credential_status(id, CredentialStatus::Dead, None)
            .await?;
        self.store.list_remove(POOL_GENERAL, &id.to_string()).await?;
        self.store.list_remove(POOL_V3, &id.to_string()).await?;
        self.store.srem(COOLING_SET, &id.to_string()).await?;
        Ok(())
    }

    /// 2-strike rule for a permanent (403) upstream denial: increment
    /// `fail_count`; a second strike marks the credential dead.
    pub async fn record_permanent_denial(&self, id: i64) -> Result<(), ApiError> {
        let fail_count = self.db.increment_google_fail_count(id).await?;
        if fail_count >= 2 {
            warn!(credential_id = id, "second strike, marking dead");
            self.mark_dead(id).await?;
        }
        Ok(())
    }

    /// Re-activate every cooling credential whose `cooling_expires_at` has
    /// passed. Called by the `cooling_restore` worker every 10 minutes.
    pub async fn restore_cooling(&self) -> Result<usize, ApiError> {
        let now = Utc::now();
        let cooling = self.db.list_cooling_google_credentials().await?;
        let mut restored = 0;
        for credential in cooling {
            let Some(expires_at) = credential.cooling_expires_at else {
                continue;
            };
            if expires_at > now {
                continue;
            }
            self.db
                .set_google_credential_status(credential.id, CredentialStatus::Active, None)
                .await?;
            self.db.reset_google_fail_count(credential.id).await?;
            self.store
                .srem(COOLING_SET, &credential.id.to_string())
                .await?;
            self.store
                .list_push_back(POOL_GENERAL, &credential.id.to_string())
                .await?;
            if credential.supports_v3 {
                self.store
                    .list_push_back(POOL_V3, &credential.id.to_string())
                    .await?;
            }
            restored += 1;
        }
        Ok(restored)
    }
}

/// A refresh-token exchange that itself returns 400/401 (e.g. `invalid_grant`
/// for a revoked token) is permanent per `spec.md` §4.4's error table;
/// anything else (network, 5xx, malformed body) is treated as transient.
fn is_permanent_refresh_failure(err: &ApiError) -> bool {
    matches!(err.kind, ApiErrorKind::Unauthorized | ApiErrorKind::Forbidden)
}
