//! Serial, jittered credential health-checks with the 2-strike rule
//! (`spec.md` §4.6). Runs once daily at 03:00 UTC+8.

use std::time::Duration;

use tracing::{info, warn};

use crate::db::Db;
use crate::dispatch::{UpstreamOutcome, classify_upstream_status};
use crate::oauth::{AntigravityOauthClient, GoogleOauthClient};
use crate::pool::{AntigravityPool, CloudCodePool};
use crate::utils::time::next_utc8_midnight;

use super::jitter;

pub async fn credential_health_check(
    db: Db,
    pool: CloudCodePool,
    oauth: GoogleOauthClient,
    http: reqwest::Client,
) {
    loop {
        sleep_until_next_03_00_utc8().await;
        info!(job = "credential_health_check", "starting");

        let credentials = match db.list_active_google_credentials().await {
            Ok(mut rows) => {
                if let Ok(cooling) = db.list_cooling_google_credentials().await {
                    rows.extend(cooling);
                }
                rows
            }
            Err(err) => {
                warn!(error = %err, "failed to list google credentials for health check");
                continue;
            }
        };

        for credential in credentials {
            tokio::time::sleep(jitter(500, 1000)).await;

            let refreshed = oauth
                .refresh(&credential.client_id, &credential.client_secret, &credential.refresh_token)
                .await;
            let access_token = match refreshed {
                Ok(token) => token.access_token,
                Err(_) => continue,
            };

            let response = http
                .get("https://www.googleapis.com/oauth2/v2/userinfo")
                .bearer_auth(&access_token)
                .send()
                .await;
            let Ok(response) = response else { continue };

            match classify_upstream_status(response.status()) {
                UpstreamOutcome::PermanentDenial => {
                    let _ = pool.record_permanent_denial(credential.id).await;
                }
                UpstreamOutcome::Success => {
                    let _ = db.reset_google_fail_count(credential.id).await;
                }
                UpstreamOutcome::RateLimited | UpstreamOutcome::Transient => {}
            }
        }

        info!(job = "credential_health_check", "finished");
    }
}

pub async fn antigravity_health_check(
    db: Db,
    pool: AntigravityPool,
    oauth: AntigravityOauthClient,
    http: reqwest::Client,
) {
    loop {
        sleep_until_next_03_00_utc8().await;
        info!(job = "antigravity_health_check", "starting");

        let tokens = match db.list_active_antigravity_tokens().await {
            Ok(mut rows) => {
                if let Ok(cooling) = db.list_cooling_antigravity_tokens().await {
                    rows.extend(cooling);
                }
                rows
            }
            Err(err) => {
                warn!(error = %err, "failed to list antigravity tokens for health check");
                continue;
            }
        };

        for token in tokens {
            tokio::time::sleep(jitter(200, 1000)).await;

            let Ok(refreshed) = oauth.refresh(&token.refresh_token).await else {
                continue;
            };

            let trivial_chat = serde_json::json!({
                "contents": [{"role": "user", "parts": [{"text": "ping"}]}],
            });
            let response = http
                .post("https://daily-cloudcode-pa.googleapis.com/v1internal:generateContent")
                .bearer_auth(&refreshed.access_token)
                .json(&serde_json::json!({
                    "project": token.project_id,
                    "request": trivial_chat,
                    "model": "gemini-3-flash",
                }))
                .send()
                .await;
            let Ok(response) = response else { continue };

            match classify_upstream_status(response.status()) {
                UpstreamOutcome::PermanentDenial => {
                    let _ = pool.record_permanent_denial(token.id).await;
                }
                UpstreamOutcome::Success => {
                    let _ = db.reset_antigravity_fail_count(token.id).await;
                }
                UpstreamOutcome::RateLimited | UpstreamOutcome::Transient => {}
            }
        }

        info!(job = "antigravity_health_check", "finished");
    }
}

async fn sleep_until_next_03_00_utc8() {
    let now = chrono::Utc::now();
    let next_midnight = next_utc8_midnight(now);
    let next_03_00 = next_midnight + chrono::Duration::hours(3);
    let target = if next_03_00 > now {
        next_03_00
    } else {
        next_03_00 + chrono::Duration::days(1)
    };
    let sleep_for = (target - now).to_std().unwrap_or(Duration::from_secs(60));
    tokio::time::sleep(sleep_for).await;
}
