use serde::{Deserialize, Serialize};

/// Quota and rate-governance configuration managed by Figment. These are
/// the boot-time defaults; `system_settings` in the database mirrors the
/// admin-adjustable subset and is the live source of truth once seeded.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct QuotaConfig {
    /// Daily request quota and per-minute rate limit for the `newbie` tier
    /// (no credentials contributed). TOML: `quota.newbie_daily`/`quota.newbie_rpm`.
    /// Default: `300`/`10`.
    #[serde(default = "default_newbie_daily")]
    pub newbie_daily: i64,
    #[serde(default = "default_newbie_rpm")]
    pub newbie_rpm: u32,

    /// Daily request quota and per-minute rate limit for the `contributor`
    /// tier (≥1 credential). TOML: `quota.contributor_daily`/`quota.contributor_rpm`.
    /// Default: `1500`/`60`.
    #[serde(default = "default_contributor_daily")]
    pub contributor_daily: i64,
    #[serde(default = "default_contributor_rpm")]
    pub contributor_rpm: u32,

    /// Daily request quota and per-minute rate limit for the `v3_contributor`
    /// tier (≥1 V3-capable credential). TOML: `quota.v3_contributor_daily`/`quota.v3_contributor_rpm`.
    /// Default: `3000`/`120`.
    #[serde(default = "default_v3_contributor_daily")]
    pub v3_contributor_daily: i64,
    #[serde(default = "default_v3_contributor_rpm")]
    pub v3_contributor_rpm: u32,

    /// Per-healthy-credential bonus added to a user's dynamic daily quota.
    /// TOML: `quota.increment_per_credential`. Default: `1000`.
    #[serde(default = "default_increment_per_credential")]
    pub increment_per_credential: i64,

    /// Whether the Gemini 3 preview model family is open to all tiers.
    /// TOML: `quota.enable_gemini3_open_access`. Default: `false`.
    #[serde(default)]
    pub enable_gemini3_open_access: bool,

    /// Whether Antigravity quota is tracked in token units instead of request counts.
    /// TOML: `quota.use_token_quota`. Default: `false`.
    #[serde(default)]
    pub use_token_quota: bool,

    /// Whether Antigravity's credential pool is shared across all CLI-authenticated users.
    /// TOML: `quota.cli_shared_mode`. Default: `true`.
    #[serde(default = "default_cli_shared_mode")]
    pub cli_shared_mode: bool,
}

impl Default for QuotaConfig {
    fn default() -> Self {
        Self {
            newbie_daily: default_newbie_daily(),
            newbie_rpm: default_newbie_rpm(),
            contributor_daily: default_contributor_daily(),
            contributor_rpm: default_contributor_rpm(),
            v3_contributor_daily: default_v3_contributor_daily(),
            v3_contributor_rpm: default_v3_contributor_rpm(),
            increment_per_credential: default_increment_per_credential(),
            enable_gemini3_open_access: false,
            use_token_quota: false,
            cli_shared_mode: default_cli_shared_mode(),
        }
    }
}

fn default_newbie_daily() -> i64 {
    300
}

fn default_newbie_rpm() -> u32 {
    10
}

fn default_contributor_daily() -> i64 {
    1500
}

fn default_contributor_rpm() -> u32 {
    60
}

fn default_v3_contributor_daily() -> i64 {
    3000
}

fn default_v3_contributor_rpm() -> u32 {
    120
}

fn default_increment_per_credential() -> i64 {
    1000
}

fn default_cli_shared_mode() -> bool {
    true
}
