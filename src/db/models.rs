use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "TEXT", rename_all = "UPPERCASE")]
pub enum UserRole {
    User,
    Admin,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "TEXT", rename_all = "UPPERCASE")]
pub enum ApiKeyType {
    Normal,
    Admin,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "TEXT", rename_all = "UPPERCASE")]
pub enum CredentialStatus {
    Validating,
    Active,
    Cooling,
    Dead,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "TEXT", rename_all = "PascalCase")]
pub enum PlanClass {
    Pro,
    Normal,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, FromRow)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub password_hash: String,
    pub role: UserRole,
    pub today_used: i64,
    pub daily_limit: i64,
    pub level: i64,
    pub antigravity_claude_limit: Option<i64>,
    pub antigravity_gemini3_limit: Option<i64>,
    pub active: bool,
    pub linked_external_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, FromRow)]
pub struct ApiKey {
    pub id: i64,
    pub user_id: i64,
    pub token_hash: String,
    pub key_type: ApiKeyType,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ApiKey {
    pub fn is_admin(&self) -> bool {
        self.key_type == ApiKeyType::Admin
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, FromRow)]
pub struct GoogleCredential {
    pub id: i64,
    pub owner_user_id: i64,
    pub client_id: String,
    pub client_secret: String,
    pub refresh_token: String,
    pub project_id: String,
    pub access_token: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
    pub google_email: Option<String>,
    pub supports_v3: bool,
    pub fail_count: i64,
    pub status: CredentialStatus,
    pub cooling_expires_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl GoogleCredential {
    /// Strict `<`: a token expiring in exactly 5 minutes is still valid.
    pub fn access_token_expired(&self, now: DateTime<Utc>) -> bool {
        match (&self.access_token, self.expires_at) {
            (Some(_), Some(expires_at)) => expires_at - now < chrono::Duration::minutes(5),
            _ => true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, FromRow)]
pub struct AntigravityToken {
    pub id: i64,
    pub owner_user_id: i64,
    pub refresh_token: String,
    pub project_id: String,
    pub session_id: Option<String>,
    pub access_token: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
    pub email: Option<String>,
    pub fail_count: i64,
    pub status: CredentialStatus,
    pub cooling_expires_at: Option<DateTime<Utc>>,
    pub enabled: bool,
    pub plan_class: Option<PlanClass>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl AntigravityToken {
    pub fn access_token_expired(&self, now: DateTime<Utc>) -> bool {
        match (&self.access_token, self.expires_at) {
            (Some(_), Some(expires_at)) => expires_at - now < chrono::Duration::minutes(5),
            _ => true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, FromRow)]
pub struct UsageLog {
    pub id: i64,
    pub user_id: i64,
    pub credential_id: Option<i64>,
    pub status_code: i32,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, FromRow)]
pub struct SystemSettings {
    pub id: i64,
    pub enable_gemini3_open_access: bool,
    pub force_discord_bind: bool,
    pub cli_shared_mode: bool,
    pub use_token_quota: bool,
    pub increment_per_credential: i64,
    pub antigravity_claude_limit: i64,
    pub antigravity_gemini3_limit: i64,
    pub antigravity_claude_token_quota: i64,
    pub antigravity_gemini3_token_quota: i64,
    pub updated_at: DateTime<Utc>,
}
