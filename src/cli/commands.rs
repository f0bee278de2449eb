use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tracing::{info, warn};
use uuid::Uuid;

use crate::app::{app, AppState};
use crate::auth::JwtKeys;
use crate::config::AppConfig;
use crate::database::postgres::PgConfigStore;
use crate::database::seed::SystemSeed;
use crate::database::DatabaseManager;
use crate::services::ConfigCache;

fn load_config() -> anyhow::Result<AppConfig> {
    let config = crate::config::config().clone();
    config.validate().map_err(anyhow::Error::msg)?;
    Ok(config)
}

pub async fn serve(port: Option<u16>) -> anyhow::Result<()> {
    let config = load_config()?;
    info!("Starting Incident Ops API in {:?} mode", config.environment);
    if config.uses_development_secret() {
        warn!("JWT_SECRET is not set; tokens are signed with the development secret");
    }

    let db = DatabaseManager::connect_lazy(&config.database)?;
    let store = Arc::new(PgConfigStore::new(db.pool().clone()));
    let cache = Arc::new(ConfigCache::new());
    let purger = cache
        .clone()
        .spawn_purger(Duration::from_secs(config.cache.purge_interval_secs));
    let jwt = JwtKeys::from_config(&config.security)?;

    let state = AppState::new(store, cache, jwt, &config);
    let router = app(state, &config);

    let bind_addr = format!("0.0.0.0:{}", port.unwrap_or(config.api.port));
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", bind_addr))?;
    info!("Incident Ops API listening on http://{}", bind_addr);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    purger.abort();
    db.close().await;
    info!("Shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}

pub async fn migrate() -> anyhow::Result<()> {
    let config = load_config()?;
    let db = DatabaseManager::connect(&config.database).await?;
    db.migrate().await?;
    db.close().await;
    Ok(())
}

pub async fn seed() -> anyhow::Result<()> {
    let config = load_config()?;
    let seed = SystemSeed::bundled()?;
    let db = DatabaseManager::connect(&config.database).await?;
    PgConfigStore::new(db.pool().clone()).apply_seed(&seed).await?;
    db.close().await;
    Ok(())
}

pub fn token(user: Uuid, email: Option<String>) -> anyhow::Result<()> {
    let config = load_config()?;
    let token = JwtKeys::from_config(&config.security)?.issue(user, email)?;
    println!("{}", token);
    Ok(())
}
