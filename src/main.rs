//! Shopy storefront backend

use std::sync::Arc;

use anyhow::Result;
use shopy_backend::store::{MemoryStore, PgStore};
use shopy_backend::{router, AppState, Config, EventPublisher};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::registry().with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into())).with(tracing_subscriber::fmt::layer()).init();
    let config = Config::from_env()?;

    let events = match config.nats_url.as_deref() {
        Some(url) => EventPublisher::connect(url).await.unwrap_or_else(|e| {
            tracing::warn!(error = %e, "NATS unavailable, events will not be published");
            EventPublisher::disabled()
        }),
        None => EventPublisher::disabled(),
    };

    let listener = tokio::net::TcpListener::bind(config.bind_addr()).await?;
    tracing::info!("🚀 shopy backend listening on {}", config.bind_addr());

    match config.database_url.as_deref() {
        Some(url) => {
            let store = Arc::new(PgStore::connect(url, config.max_connections).await?);
            store.migrate().await?;
            let app = router(AppState::new(store.clone(), events.clone()));
            axum::serve(listener, app).with_graceful_shutdown(shutdown_signal()).await?;
            store.close().await;
        }
        None => {
            tracing::warn!("DATABASE_URL not set, using the in-memory store; data is lost on exit");
            let app = router(AppState::new(Arc::new(MemoryStore::new()), events.clone()));
            axum::serve(listener, app).with_graceful_shutdown(shutdown_signal()).await?;
        }
    }

    events.flush().await;
    tracing::info!("shopy backend stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown requested");
}
