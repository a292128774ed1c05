//! Persistence Gateway: typed async accessors over a `sqlx::SqlitePool`.
//!
//! `Db` is constructed once at boot and passed around by dependency
//! injection — no module-global pool, so tests can spin up an in-memory
//! pool and pass it straight into the pool/quota/router layers.

pub mod models;
pub mod schema;

pub use models::{
    AntigravityToken, ApiKey, ApiKeyType, CredentialStatus, GoogleCredential, PlanClass,
    SystemSettings, User, UserRole,
};

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use std::str::FromStr;
use std::time::Duration;
use tracing::info;

use crate::error::ApiError;
use crate::utils::token::hash_token;
use schema::SQLITE_INIT;

#[derive(Clone)]
pub struct Db {
    pool: SqlitePool,
}

impl Db {
    pub async fn connect(database_url: &str) -> Result<Self, ApiError> {
        let connect_opts = SqliteConnectOptions::from_str(database_url)
            .map_err(|e| ApiError::internal(format!("invalid database url: {e}")))?
            .create_if_missing(true)
            .busy_timeout(Duration::from_secs(5))
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal);

        let pool = SqlitePoolOptions::new().connect_with(connect_opts).await?;

        let db = Self { pool };
        db.apply_schema().await?;
        info!("database initialized");
        Ok(db)
    }

    async fn apply_schema(&self) -> Result<(), ApiError> {
        for stmt in SQLITE_INIT.split(';') {
            let stmt = stmt.trim();
            if stmt.is_empty() {
                continue;
            }
            sqlx::query(stmt).execute(&self.pool).await?;
        }
        Ok(())
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }

    // -- Users ---------------------------------------------------------

    pub async fn find_user_by_id(&self, id: i64) -> Result<Option<User>, ApiError> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    pub async fn increment_today_used(&self, user_id: i64, by: i64) -> Result<(), ApiError> {
        sqlx::query("UPDATE users SET today_used = today_used + ?, updated_at = ? WHERE id = ?")
            .bind(by)
            .bind(Utc::now())
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn reset_all_today_used(&self) -> Result<u64, ApiError> {
        let res = sqlx::query("UPDATE users SET today_used = 0, updated_at = ?")
            .bind(Utc::now())
            .execute(&self.pool)
            .await?;
        Ok(res.rows_affected())
    }

    // -- API keys --------------------------------------------------------

    pub async fn find_api_key_by_token(&self, token: &str) -> Result<Option<ApiKey>, ApiError> {
        let hash = hash_token(token);
        let key = sqlx::query_as::<_, ApiKey>("SELECT * FROM api_keys WHERE token_hash = ?")
            .bind(hash)
            .fetch_optional(&self.pool)
            .await?;
        Ok(key)
    }

    // -- Google (Cloud Code) credentials ---------------------------------

    pub async fn get_google_credential(&self, id: i64) -> Result<Option<GoogleCredential>, ApiError> {
        let row = sqlx::query_as::<_, GoogleCredential>("SELECT * FROM google_credentials WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    pub async fn list_active_google_credentials(&self) -> Result<Vec<GoogleCredential>, ApiError> {
        let rows = sqlx::query_as::<_, GoogleCredential>(
            "SELECT * FROM google_credentials WHERE status = 'ACTIVE' ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    pub async fn list_cooling_google_credentials(&self) -> Result<Vec<GoogleCredential>, ApiError> {
        let rows = sqlx::query_as::<_, GoogleCredential>(
            "SELECT * FROM google_credentials WHERE status = 'COOLING' ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    pub async fn count_google_credentials_for_owner(
        &self,
        owner_user_id: i64,
    ) -> Result<(i64, i64), ApiError> {
        let total: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM google_credentials WHERE owner_user_id = ? AND status IN ('ACTIVE', 'COOLING')",
        )
        .bind(owner_user_id)
        .fetch_one(&self.pool)
        .await?;
        let v3: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM google_credentials WHERE owner_user_id = ? AND status IN ('ACTIVE', 'COOLING') AND supports_v3 = 1",
        )
        .bind(owner_user_id)
        .fetch_one(&self.pool)
        .await?;
        Ok((total, v3))
    }

    /// ACTIVE-only count, distinct from `count_google_credentials_for_owner`'s
    /// ACTIVE+COOLING total: the dynamic daily quota's increment term is
    /// defined over `activeCount`, while tier derivation uses the wider set.
    pub async fn count_active_google_credentials_for_owner(
        &self,
        owner_user_id: i64,
    ) -> Result<i64, ApiError> {
        let active: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM google_credentials WHERE owner_user_id = ? AND status = 'ACTIVE'",
        )
        .bind(owner_user_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(active)
    }

    pub async fn update_google_credential_token(
        &self,
        id: i64,
        access_token: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<(), ApiError> {
        sqlx::query(
            "UPDATE google_credentials SET access_token = ?, expires_at = ?, updated_at = ? WHERE id = ?",
        )
        .bind(access_token)
        .bind(expires_at)
        .bind(Utc::now())
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn set_google_credential_status(
        &self,
        id: i64,
        status: CredentialStatus,
        cooling_expires_at: Option<DateTime<Utc>>,
    ) -> Result<(), ApiError> {
        sqlx::query(
            "UPDATE google_credentials SET status = ?, cooling_expires_at = ?, updated_at = ? WHERE id = ?",
        )
        .bind(status)
        .bind(cooling_expires_at)
        .bind(Utc::now())
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn increment_google_fail_count(&self, id: i64) -> Result<i64, ApiError> {
        let fail_count: i64 = sqlx::query_scalar(
            "UPDATE google_credentials SET fail_count = fail_count + 1, updated_at = ? WHERE id = ? RETURNING fail_count",
        )
        .bind(Utc::now())
        .bind(id)
        .fetch_one(&self.pool)
        .await?;
        Ok(fail_count)
    }

    pub async fn reset_google_fail_count(&self, id: i64) -> Result<(), ApiError> {
        sqlx::query("UPDATE google_credentials SET fail_count = 0, updated_at = ? WHERE id = ?")
            .bind(Utc::now())
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    // -- Antigravity tokens -----------------------------------------------

    pub async fn get_antigravity_token(&self, id: i64) -> Result<Option<AntigravityToken>, ApiError> {
        let row = sqlx::query_as::<_, AntigravityToken>("SELECT * FROM antigravity_tokens WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    pub async fn list_active_antigravity_tokens(&self) -> Result<Vec<AntigravityToken>, ApiError> {
        let rows = sqlx::query_as::<_, AntigravityToken>(
            "SELECT * FROM antigravity_tokens WHERE status = 'ACTIVE' AND enabled = 1 ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    pub async fn list_cooling_antigravity_tokens(&self) -> Result<Vec<AntigravityToken>, ApiError> {
        let rows = sqlx::query_as::<_, AntigravityToken>(
            "SELECT * FROM antigravity_tokens WHERE status = 'COOLING' ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    pub async fn update_antigravity_token(
        &self,
        id: i64,
        access_token: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<(), ApiError> {
        sqlx::query(
            "UPDATE antigravity_tokens SET access_token = ?, expires_at = ?, updated_at = ? WHERE id = ?",
        )
        .bind(access_token)
        .bind(expires_at)
        .bind(Utc::now())
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn set_antigravity_status(
        &self,
        id: i64,
        status: CredentialStatus,
        cooling_expires_at: Option<DateTime<Utc>>,
    ) -> Result<(), ApiError> {
        sqlx::query(
            "UPDATE antigravity_tokens SET status = ?, cooling_expires_at = ?, updated_at = ? WHERE id = ?",
        )
        .bind(status)
        .bind(cooling_expires_at)
        .bind(Utc::now())
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn increment_antigravity_fail_count(&self, id: i64) -> Result<i64, ApiError> {
        let fail_count: i64 = sqlx::query_scalar(
            "UPDATE antigravity_tokens SET fail_count = fail_count + 1, updated_at = ? WHERE id = ? RETURNING fail_count",
        )
        .bind(Utc::now())
        .bind(id)
        .fetch_one(&self.pool)
        .await?;
        Ok(fail_count)
    }

    pub async fn reset_antigravity_fail_count(&self, id: i64) -> Result<(), ApiError> {
        sqlx::query("UPDATE antigravity_tokens SET fail_count = 0, updated_at = ? WHERE id = ?")
            .bind(Utc::now())
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn set_antigravity_plan_class(
        &self,
        id: i64,
        plan_class: PlanClass,
    ) -> Result<(), ApiError> {
        sqlx::query("UPDATE antigravity_tokens SET plan_class = ?, updated_at = ? WHERE id = ?")
            .bind(plan_class)
            .bind(Utc::now())
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    // -- Usage logs & settings --------------------------------------------

    pub async fn insert_usage_log(
        &self,
        user_id: i64,
        credential_id: Option<i64>,
        status_code: i32,
    ) -> Result<(), ApiError> {
        sqlx::query(
            "INSERT INTO usage_logs (user_id, credential_id, status_code, created_at) VALUES (?, ?, ?, ?)",
        )
        .bind(user_id)
        .bind(credential_id)
        .bind(status_code)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn load_system_settings(&self) -> Result<SystemSettings, ApiError> {
        let row = sqlx::query_as::<_, SystemSettings>("SELECT * FROM system_settings WHERE id = 1")
            .fetch_one(&self.pool)
            .await?;
        Ok(row)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn test_db() -> Db {
        Db::connect("sqlite::memory:").await.unwrap()
    }

    #[tokio::test]
    async fn system_settings_default_row_exists() {
        let db = test_db().await;
        let settings = db.load_system_settings().await.unwrap();
        assert!(settings.cli_shared_mode);
        assert_eq!(settings.increment_per_credential, 1000);
    }

    #[tokio::test]
    async fn reset_all_today_used_is_idempotent() {
        let db = test_db().await;
        sqlx::query(
            "INSERT INTO users (username, password_hash, role, today_used, daily_limit, active, created_at, updated_at) VALUES ('a', 'h', 'USER', 5, 300, 1, ?, ?)",
        )
        .bind(Utc::now())
        .bind(Utc::now())
        .execute(&db.pool)
        .await
        .unwrap();

        let affected = db.reset_all_today_used().await.unwrap();
        assert_eq!(affected, 1);
        let user = db.find_user_by_id(1).await.unwrap().unwrap();
        assert_eq!(user.today_used, 0);
    }
}
