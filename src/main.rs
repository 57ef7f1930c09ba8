use std::{sync::Arc, time::Duration};

use anyhow::Context;
use axum::{Router, routing::get};
use soulmates::{
    AppState,
    config::Config,
    db,
    engine::MatchEngine,
    router::SessionRouter,
    store::{InteractionLedger, ProfileStore},
    transport::{WsChannel, ws},
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env()?;

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_new(&config.rust_log).context("invalid RUST_LOG")?)
        .init();

    let db_pool = db::connect(&config.database_url, config.max_connections).await?;

    let engine = MatchEngine::with_seed(
        ProfileStore::new(db_pool.clone()),
        InteractionLedger::new(db_pool),
        config.shuffle_seed,
    );
    let channel = WsChannel::default();
    let router = SessionRouter::new(engine, Arc::new(channel.clone()));

    let sweeper = router.clone();
    let max_idle = config.session_idle;
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval((max_idle / 4).max(Duration::from_secs(1)));
        loop {
            ticker.tick().await;
            sweeper.evict_idle(max_idle);
        }
    });

    let app_state = AppState { router, channel };

    let app = Router::new()
        .route("/health", get(health))
        .route("/chat/{user_id}/ws", get(ws::chat_ws))
        .with_state(app_state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("cannot bind {}", config.bind_addr))?;
    info!(addr = %config.bind_addr, "listening");
    axum::serve(listener, app).await?;
    Ok(())
}

async fn health() -> &'static str {
    "ok"
}
