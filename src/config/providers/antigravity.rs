use serde::{Deserialize, Serialize};
use url::Url;

use super::ProviderDefaults;

/// Agent system preamble required by Antigravity's upstream strict-match validation.
///
/// Antigravity applies strict text matching against the leading system
/// instruction. Any character change (including missing spaces) may fail
/// validation and trigger HTTP 429, so this value is sourced at build time
/// via `AGENT_SYSTEM_PREAMBLE` rather than hardcoded, and falls back to an
/// empty string when unset so local builds without the secret still compile.
pub const AGENT_SYSTEM_PREAMBLE: &str = match option_env!("AGENT_SYSTEM_PREAMBLE") {
    Some(v) => v,
    None => "",
};

/// Antigravity provider configuration managed by Figment.
///
/// Notes:
/// - Provider defaults (proxy/multiplexing/retry) follow the same fallback semantics as other
///   providers: provider-level overrides win, otherwise `providers.defaults.*`.
/// - OAuth endpoints/client credentials default to placeholders and must be supplied via
///   `config.toml` or environment for a real deployment.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct AntigravityConfig {
    /// Base API URL for the antigravity upstream.
    /// TOML: `providers.antigravity.api_url`.
    #[serde(default = "default_api_url")]
    pub api_url: Url,

    /// Optional upstream HTTP proxy. If set, used for reqwest clients.
    /// TOML: `providers.antigravity.proxy`. Example: `http://127.0.0.1:1080`.
    /// Falls back to `providers.defaults.proxy` when unset.
    #[serde(default)]
    pub proxy: Option<Url>,

    /// OAuth refresh requests per second (TPS) for the refresh worker.
    /// TOML: `providers.antigravity.oauth_tps`. Default: `5`.
    #[serde(default = "default_oauth_tps")]
    pub oauth_tps: usize,

    /// List of supported model names (allowlist). Each name corresponds to an
    /// independent credential pool.
    /// TOML: `providers.antigravity.model_list`.
    #[serde(default = "default_model_list")]
    pub model_list: Vec<String>,

    /// Allow HTTP/2 multiplexing for reqwest clients; disabled forces HTTP/1.
    /// TOML: `providers.antigravity.enable_multiplexing`.
    /// Falls back to `providers.defaults.enable_multiplexing`.
    #[serde(default)]
    pub enable_multiplexing: Option<bool>,

    /// Max retry attempts for antigravity upstream calls.
    /// TOML: `providers.antigravity.retry_max_times`.
    /// Falls back to `providers.defaults.retry_max_times`.
    #[serde(default)]
    pub retry_max_times: Option<usize>,

    /// OAuth authorize endpoint.
    #[serde(default = "default_oauth_auth_url")]
    pub oauth_auth_url: Url,

    /// OAuth token endpoint.
    #[serde(default = "default_oauth_token_url")]
    pub oauth_token_url: Url,

    /// OAuth redirect endpoint registered for this deployment.
    #[serde(default = "default_oauth_redirect_url")]
    pub oauth_redirect_url: Url,

    /// OAuth client id. Must be overridden in `config.toml` for a real deployment.
    #[serde(default = "default_oauth_client_id")]
    pub oauth_client_id: String,

    /// OAuth client secret. Must be overridden in `config.toml` for a real deployment.
    #[serde(default = "default_oauth_client_secret")]
    pub oauth_client_secret: String,

    /// OAuth scopes requested during the consent flow.
    #[serde(default = "default_oauth_scopes")]
    pub oauth_scopes: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct AntigravityResolvedConfig {
    pub api_url: Url,
    pub proxy: Option<Url>,
    pub oauth_tps: usize,
    pub model_list: Vec<String>,
    pub enable_multiplexing: bool,
    pub retry_max_times: usize,
    pub oauth_auth_url: Url,
    pub oauth_token_url: Url,
    pub oauth_redirect_url: Url,
    pub oauth_client_id: String,
    pub oauth_client_secret: String,
    pub oauth_scopes: Vec<String>,
}

impl AntigravityConfig {
    pub fn resolve(&self, defaults: &ProviderDefaults) -> AntigravityResolvedConfig {
        AntigravityResolvedConfig {
            api_url: self.api_url.clone(),
            proxy: self.proxy.clone().or_else(|| defaults.proxy.clone()),
            oauth_tps: self.oauth_tps,
            model_list: self.model_list.clone(),
            enable_multiplexing: self
                .enable_multiplexing
                .unwrap_or(defaults.enable_multiplexing),
            retry_max_times: self.retry_max_times.unwrap_or(defaults.retry_max_times),
            oauth_auth_url: self.oauth_auth_url.clone(),
            oauth_token_url: self.oauth_token_url.clone(),
            oauth_redirect_url: self.oauth_redirect_url.clone(),
            oauth_client_id: self.oauth_client_id.clone(),
            oauth_client_secret: self.oauth_client_secret.clone(),
            oauth_scopes: self.oauth_scopes.clone(),
        }
    }
}

impl Default for AntigravityConfig {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            proxy: None,
            oauth_tps: default_oauth_tps(),
            model_list: default_model_list(),
            enable_multiplexing: None,
            retry_max_times: None,
            oauth_auth_url: default_oauth_auth_url(),
            oauth_token_url: default_oauth_token_url(),
            oauth_redirect_url: default_oauth_redirect_url(),
            oauth_client_id: default_oauth_client_id(),
            oauth_client_secret: default_oauth_client_secret(),
            oauth_scopes: default_oauth_scopes(),
        }
    }
}

fn default_api_url() -> Url {
    Url::parse("https://daily-cloudcode-pa.googleapis.com")
        .expect("default antigravity api_url must be a valid URL")
}

fn default_oauth_tps() -> usize {
    5
}

fn default_model_list() -> Vec<String> {
    vec!["claude-sonnet-4-5-thinking".to_string(), "gemini-3-flash".to_string()]
}

fn default_oauth_auth_url() -> Url {
    Url::parse("https://accounts.google.com/o/oauth2/v2/auth")
        .expect("default oauth_auth_url must be a valid URL")
}

fn default_oauth_token_url() -> Url {
    Url::parse("https://oauth2.googleapis.com/token")
        .expect("default oauth_token_url must be a valid URL")
}

fn default_oauth_redirect_url() -> Url {
    Url::parse("http://localhost:8188").expect("default oauth_redirect_url must be a valid URL")
}

fn default_oauth_client_id() -> String {
    "CHANGE-ME.apps.googleusercontent.com".to_string()
}

fn default_oauth_client_secret() -> String {
    "CHANGE-ME".to_string()
}

fn default_oauth_scopes() -> Vec<String> {
    vec![
        "https://www.googleapis.com/auth/cloud-platform".to_string(),
        "https://www.googleapis.com/auth/userinfo.email".to_string(),
        "https://www.googleapis.com/auth/userinfo.profile".to_string(),
    ]
}
