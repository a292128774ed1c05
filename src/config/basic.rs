use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::net::{IpAddr, Ipv4Addr};

/// Basic (core) configuration managed by Figment.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BasicConfig {
    /// HTTP server listen address (e.g., "0.0.0.0", "127.0.0.1").
    /// TOML: `basic.listen_addr`. Default: `0.0.0.0`.
    #[serde(default = "default_listen_ip")]
    pub listen_addr: IpAddr,

    /// HTTP server listen port.
    /// TOML: `basic.listen_port`. Default: `8188`.
    #[serde(default = "default_listen_port")]
    pub listen_port: u16,

    /// Database URL for SQLite.
    /// TOML: `basic.database_url`. Default: `sqlite://data.db`.
    #[serde(default = "default_database_url")]
    pub database_url: String,

    /// Coordination store (Redis-compatible) URL.
    /// TOML: `basic.cache_url`. Default: `redis://127.0.0.1:6379`.
    #[serde(default = "default_cache_url")]
    pub cache_url: String,

    /// Log level for tracing subscriber initialization (e.g., "error", "warn", "info", "debug", "trace").
    /// TOML: `basic.loglevel`. Default: `info`.
    #[serde(default = "default_loglevel")]
    pub loglevel: String,

    /// Authentication key gating internal/administrative surfaces (required, non-empty).
    /// TOML: `basic.gateway_key`. Must be provided.
    #[serde(default)]
    #[serde(deserialize_with = "deserialize_string_lax")]
    pub gateway_key: String,

    /// Bootstrap admin username, used only by external registration/admin tooling.
    /// TOML: `basic.admin_username`.
    #[serde(default)]
    pub admin_username: String,

    /// Bootstrap admin password, used only by external registration/admin tooling.
    /// TOML: `basic.admin_password`.
    #[serde(default)]
    pub admin_password: String,

    /// Require a linked external (Discord) identity before serving a user's requests.
    /// TOML: `basic.force_discord_bind`. Default: `false`.
    #[serde(default)]
    pub force_discord_bind: bool,
}

impl Default for BasicConfig {
    fn default() -> Self {
        Self {
            listen_addr: default_listen_ip(),
            listen_port: default_listen_port(),
            database_url: default_database_url(),
            cache_url: default_cache_url(),
            loglevel: default_loglevel(),
            // No insecure default. `Config::from_toml()` enforces non-empty.
            gateway_key: String::new(),
            admin_username: String::new(),
            admin_password: String::new(),
            force_discord_bind: false,
        }
    }
}

fn deserialize_string_lax<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let v = Value::deserialize(deserializer)?;

    match v {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        _ => Err(serde::de::Error::custom(
            "expected a string or a number for basic.gateway_key",
        )),
    }
}

fn default_listen_ip() -> IpAddr {
    Ipv4Addr::new(0, 0, 0, 0).into()
}

fn default_listen_port() -> u16 {
    8188
}

fn default_database_url() -> String {
    "sqlite://data.db".to_string()
}

fn default_cache_url() -> String {
    "redis://127.0.0.1:6379".to_string()
}

fn default_loglevel() -> String {
    "info".to_string()
}
