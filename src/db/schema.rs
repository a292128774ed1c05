//! SQL DDL for initializing the database schema.
//! SQLite-first design; can be adapted for other RDBMS.

/// Schema covers the six tables the core owns: `users`, `api_keys`,
/// `google_credentials`, `antigravity_tokens`, `usage_logs`, and
/// `system_settings`. Registration, admin CRUD, and the Discord-linking
/// flow are external collaborators; this schema only carries the columns
/// the request-serving pipeline itself reads or writes.
pub const SQLITE_INIT: &str = r#"
-- ---------------------------------------------------------------------------
-- Users
-- ---------------------------------------------------------------------------
CREATE TABLE IF NOT EXISTS users (
    id INTEGER PRIMARY KEY NOT NULL,
    username TEXT NOT NULL UNIQUE,
    password_hash TEXT NOT NULL,
    role TEXT NOT NULL DEFAULT 'USER',
    today_used INTEGER NOT NULL DEFAULT 0,
    daily_limit INTEGER NOT NULL DEFAULT 300,
    level INTEGER NOT NULL DEFAULT 0,
    antigravity_claude_limit INTEGER NULL,
    antigravity_gemini3_limit INTEGER NULL,
    active INTEGER NOT NULL DEFAULT 1,
    linked_external_id TEXT NULL,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

-- ---------------------------------------------------------------------------
-- API keys
-- ---------------------------------------------------------------------------
CREATE TABLE IF NOT EXISTS api_keys (
    id INTEGER PRIMARY KEY NOT NULL,
    user_id INTEGER NOT NULL REFERENCES users(id),
    token_hash TEXT NOT NULL UNIQUE,
    key_type TEXT NOT NULL DEFAULT 'NORMAL',
    active INTEGER NOT NULL DEFAULT 1,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_api_keys_user_id ON api_keys(user_id);

-- ---------------------------------------------------------------------------
-- Google (Cloud Code) credentials
-- ---------------------------------------------------------------------------
CREATE TABLE IF NOT EXISTS google_credentials (
    id INTEGER PRIMARY KEY NOT NULL,
    owner_user_id INTEGER NOT NULL REFERENCES users(id),
    client_id TEXT NOT NULL,
    client_secret TEXT NOT NULL,
    refresh_token TEXT NOT NULL UNIQUE,
    project_id TEXT NOT NULL,
    access_token TEXT NULL,
    expires_at TEXT NULL,
    google_email TEXT NULL UNIQUE,
    supports_v3 INTEGER NOT NULL DEFAULT 0,
    fail_count INTEGER NOT NULL DEFAULT 0,
    status TEXT NOT NULL DEFAULT 'VALIDATING',
    cooling_expires_at TEXT NULL,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_google_credentials_status ON google_credentials(status);
CREATE INDEX IF NOT EXISTS idx_google_credentials_owner ON google_credentials(owner_user_id);

-- ---------------------------------------------------------------------------
-- Antigravity tokens
-- ---------------------------------------------------------------------------
CREATE TABLE IF NOT EXISTS antigravity_tokens (
    id INTEGER PRIMARY KEY NOT NULL,
    owner_user_id INTEGER NOT NULL REFERENCES users(id),
    refresh_token TEXT NOT NULL UNIQUE,
    project_id TEXT NOT NULL,
    session_id TEXT NULL,
    access_token TEXT NULL,
    expires_at TEXT NULL,
    email TEXT NULL,
    fail_count INTEGER NOT NULL DEFAULT 0,
    status TEXT NOT NULL DEFAULT 'VALIDATING',
    cooling_expires_at TEXT NULL,
    enabled INTEGER NOT NULL DEFAULT 1,
    plan_class TEXT NULL,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_antigravity_tokens_status ON antigravity_tokens(status);
CREATE INDEX IF NOT EXISTS idx_antigravity_tokens_owner ON antigravity_tokens(owner_user_id);

-- ---------------------------------------------------------------------------
-- Usage logs
-- ---------------------------------------------------------------------------
CREATE TABLE IF NOT EXISTS usage_logs (
    id INTEGER PRIMARY KEY NOT NULL,
    user_id INTEGER NOT NULL REFERENCES users(id),
    credential_id INTEGER NULL,
    status_code INTEGER NOT NULL,
    created_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_usage_logs_user_id ON usage_logs(user_id, created_at);

-- ---------------------------------------------------------------------------
-- System settings (single-row mirror of hot config)
-- ---------------------------------------------------------------------------
CREATE TABLE IF NOT EXISTS system_settings (
    id INTEGER PRIMARY KEY NOT NULL CHECK (id = 1),
    enable_gemini3_open_access INTEGER NOT NULL DEFAULT 0,
    force_discord_bind INTEGER NOT NULL DEFAULT 0,
    cli_shared_mode INTEGER NOT NULL DEFAULT 1,
    use_token_quota INTEGER NOT NULL DEFAULT 0,
    increment_per_credential INTEGER NOT NULL DEFAULT 1000,
    antigravity_claude_limit INTEGER NOT NULL DEFAULT 0,
    antigravity_gemini3_limit INTEGER NOT NULL DEFAULT 0,
    antigravity_claude_token_quota INTEGER NOT NULL DEFAULT 0,
    antigravity_gemini3_token_quota INTEGER NOT NULL DEFAULT 0,
    updated_at TEXT NOT NULL
);

INSERT OR IGNORE INTO system_settings (id, updated_at) VALUES (1, '1970-01-01T00:00:00Z');
"#;
