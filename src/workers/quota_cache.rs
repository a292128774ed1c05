//! Antigravity quota-cache refresh: polls each token's quota summary,
//! classifies it Pro/Normal by the upstream reset-window duration, and
//! persists the classification with a confidence band so a single noisy
//! reading can't flip it (`spec.md` §4.6).

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Semaphore;
use tracing::{info, warn};

use crate::cache::CoordinationStore;
use crate::db::{Db, PlanClass};

use super::QUOTA_CACHE_REFRESH_PERIOD;

const MAX_CONCURRENT_REFRESHES: usize = 30;
const PLAN_CLASS_TTL_SECS: u64 = 7 * 24 * 60 * 60;
const PRO_WINDOW: Duration = Duration::from_secs(4 * 60 * 60);
const NORMAL_WINDOW: Duration = Duration::from_secs(24 * 60 * 60);

pub async fn quota_cache_refresh(db: Db, store: Arc<dyn CoordinationStore>, http: reqwest::Client) {
    let mut ticker = tokio::time::interval(QUOTA_CACHE_REFRESH_PERIOD);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;
        info!(job = "quota_cache_refresh", "starting");

        let tokens = match db.list_active_antigravity_tokens().await {
            Ok(tokens) => tokens,
            Err(err) => {
                warn!(error = %err, "failed to list antigravity tokens for quota refresh");
                continue;
            }
        };
        let total = tokens.len();
        let semaphore = Arc::new(Semaphore::new(MAX_CONCURRENT_REFRESHES));
        let mut handles = Vec::with_capacity(total);

        for (index, token) in tokens.into_iter().enumerate() {
            let semaphore = Arc::clone(&semaphore);
            let db = db.clone();
            let store = Arc::clone(&store);
            let http = http.clone();

            handles.push(tokio::spawn(async move {
                let _permit = semaphore.acquire_owned().await;
                refresh_one(&db, store.as_ref(), &http, token.id).await;
                let _ = store
                    .publish(
                        "QUOTA_CACHE_REFRESH_PROGRESS",
                        &format!("{}/{}", index + 1, total),
                    )
                    .await;
            }));
        }

        for handle in handles {
            let _ = handle.await;
        }

        info!(job = "quota_cache_refresh", total, "finished");
    }
}

async fn refresh_one(db: &Db, store: &dyn CoordinationStore, http: &reqwest::Client, token_id: i64) {
    let Ok(Some(token)) = db.get_antigravity_token(token_id).await else {
        return;
    };
    let Some(access_token) = &token.access_token else {
        return;
    };

    let response = http
        .get("https://daily-cloudcode-pa.googleapis.com/v1internal:getQuota")
        .bearer_auth(access_token)
        .send()
        .await;
    let Ok(response) = response else {
        return;
    };
    let Ok(body) = response.json::<serde_json::Value>().await else {
        return;
    };
    let Some(window_seconds) = body.get("resetWindowSeconds").and_then(|v| v.as_u64()) else {
        return;
    };
    let window = Duration::from_secs(window_seconds);

    let plan_class = if window <= PRO_WINDOW {
        Some(PlanClass::Pro)
    } else if window >= NORMAL_WINDOW {
        Some(PlanClass::Normal)
    } else {
        None
    };

    let Some(plan_class) = plan_class else {
        return;
    };

    let cache_key = format!("ANTIGRAVITY_PLAN_CLASS:{token_id}");
    let value = match plan_class {
        PlanClass::Pro => "Pro",
        PlanClass::Normal => "Normal",
    };
    let _ = store.set_string_ex(&cache_key, value, PLAN_CLASS_TTL_SECS).await;
    let _ = db.set_antigravity_plan_class(token_id, plan_class).await;
}
