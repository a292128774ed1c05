use mimalloc::MiMalloc;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::{net::TcpListener, signal};
use tracing::info;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use meridian::cache::{CoordinationStore, RedisStore};
use meridian::config::Config;
use meridian::db::Db;
use meridian::oauth::{AntigravityOauthClient, GoogleOauthClient};
use meridian::pool::{AntigravityPool, CloudCodePool};
use meridian::server::router::{self, AppState};
use meridian::workers::WorkerScheduler;

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // The server binary requires a real config file with a non-empty gateway_key.
    // (Library code uses `config::CONFIG` which is best-effort and does not validate.)
    let cfg = Config::from_toml();

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(cfg.basic.loglevel.clone()));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_level(true).with_target(false))
        .init();

    let db = Db::connect(&cfg.basic.database_url).await?;
    let store: Arc<dyn CoordinationStore> = Arc::new(RedisStore::connect(&cfg.basic.cache_url).await?);
    let http = reqwest::Client::builder().user_agent("meridian/1.0").build()?;

    let google_oauth = GoogleOauthClient::new(http.clone());
    let antigravity_oauth = AntigravityOauthClient::new(http.clone(), &cfg.antigravity())?;

    let state = AppState::new(
        &cfg,
        db.clone(),
        store.clone(),
        http.clone(),
        google_oauth.clone(),
        antigravity_oauth.clone(),
    );

    let cloudcode_pool = CloudCodePool::new(store.clone(), db.clone(), google_oauth.clone());
    let antigravity_pool = AntigravityPool::new(store.clone(), db.clone(), antigravity_oauth.clone());
    let scheduler = WorkerScheduler::start(
        db,
        store,
        cloudcode_pool,
        antigravity_pool,
        google_oauth,
        antigravity_oauth,
        http,
    );

    let app = router::build(state);

    let addr = SocketAddr::from((cfg.basic.listen_addr, cfg.basic.listen_port));
    let listener = TcpListener::bind(addr).await?;
    info!("HTTP server listening on {}", addr);
    axum::serve(listener, app).with_graceful_shutdown(shutdown_signal()).await?;

    scheduler.shutdown();
    info!("Server has shut down gracefully.");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c().await.expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => { /* ... */ },
        _ = terminate => { /* ... */ },
    }
}
