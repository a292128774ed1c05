//! Scheduled Workers: daily quota reset, cooling-pool restoration,
//! credential health-checks, and the Antigravity quota-cache refresh.
//!
//! Started explicitly by the caller at boot (`WorkerScheduler::start`) and
//! stopped on shutdown — no background timers as constructor side effects,
//! per `spec.md` §9's redesign note.

mod health_check;
mod quota_cache;

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{MissedTickBehavior, interval};
use tracing::{error, info};

use crate::cache::CoordinationStore;
use crate::db::Db;
use crate::oauth::{AntigravityOauthClient, GoogleOauthClient};
use crate::pool::{AntigravityPool, CloudCodePool};
use crate::utils::time::next_utc8_midnight;

const COOLING_RESTORE_PERIOD: Duration = Duration::from_secs(10 * 60);
const QUOTA_CACHE_REFRESH_PERIOD: Duration = Duration::from_secs(30 * 60);

pub struct WorkerScheduler {
    handles: Vec<JoinHandle<()>>,
}

impl WorkerScheduler {
    /// Spawn all five scheduled jobs. Each runs on its own task so a panic
    /// or a long health-check run never blocks the others.
    pub fn start(
        db: Db,
        store: Arc<dyn CoordinationStore>,
        cloudcode_pool: CloudCodePool,
        antigravity_pool: AntigravityPool,
        google_oauth: GoogleOauthClient,
        antigravity_oauth: AntigravityOauthClient,
        http: reqwest::Client,
    ) -> Self {
        let handles = vec![
            tokio::spawn(daily_reset(db.clone())),
            tokio::spawn(cooling_restore(cloudcode_pool.clone(), antigravity_pool.clone())),
            tokio::spawn(health_check::credential_health_check(db.clone(), cloudcode_pool.clone(), google_oauth, http.clone())),
            tokio::spawn(health_check::antigravity_health_check(db.clone(), antigravity_pool.clone(), antigravity_oauth, http.clone())),
            tokio::spawn(quota_cache::quota_cache_refresh(db, store, http)),
        ];
        info!("worker scheduler started");
        Self { handles }
    }

    /// Abort every job. Per `spec.md` §5, scheduled jobs are never cancelled
    /// mid-credential — the health-check loops check a cooperative flag
    /// between credentials rather than relying solely on task abort, but
    /// `abort()` is still the backstop for jobs asleep between ticks.
    pub fn shutdown(self) {
        for handle in self.handles {
            handle.abort();
        }
        info!("worker scheduler stopped");
    }
}

async fn daily_reset(db: Db) {
    loop {
        let now = chrono::Utc::now();
        let next = next_utc8_midnight(now);
        let sleep_for = (next - now).to_std().unwrap_or(Duration::from_secs(60));
        tokio::time::sleep(sleep_for).await;

        match db.reset_all_today_used().await {
            Ok(affected) => info!(affected, "daily quota reset"),
            Err(err) => error!(error = %err, "daily reset failed"),
        }
    }
}

async fn cooling_restore(cloudcode: CloudCodePool, antigravity: AntigravityPool) {
    let mut ticker = interval(COOLING_RESTORE_PERIOD);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    loop {
        ticker.tick().await;
        match cloudcode.restore_cooling().await {
            Ok(restored) if restored > 0 => info!(restored, family = "cloudcode", "cooling restored"),
            Ok(_) => {}
            Err(err) => error!(error = %err, family = "cloudcode", "cooling restore failed"),
        }
        match antigravity.restore_cooling().await {
            Ok(restored) if restored > 0 => info!(restored, family = "antigravity", "cooling restored"),
            Ok(_) => {}
            Err(err) => error!(error = %err, family = "antigravity", "cooling restore failed"),
        }
    }
}

pub(crate) fn jitter(min_ms: u64, max_ms: u64) -> Duration {
    use rand::Rng;
    Duration::from_millis(rand::rng().random_range(min_ms..=max_ms))
}
