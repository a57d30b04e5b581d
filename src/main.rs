//! Binary entrypoint: load configuration, connect the store, serve webhooks.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use tracing_subscriber::EnvFilter;

use maitred::config::Settings;
use maitred::db::PgStore;
use maitred::server::{build_state, routes, WebhookServer};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("maitred=info,tower_http=info")),
        )
        .init();

    let settings = Settings::from_env().context("loading configuration")?;

    let store = PgStore::new(&settings.database)
        .await
        .context("connecting to the store")?;
    store.run_migrations().await.context("running migrations")?;

    let state = build_state(
        Arc::new(store),
        settings.restaurant.timezone,
        settings.restaurant.fallback_number.clone(),
    );

    let addr: SocketAddr = format!("{}:{}", settings.server.host, settings.server.port)
        .parse()
        .context("parsing bind address")?;

    let mut server = WebhookServer::new(addr);
    server.start(routes(state)).await?;

    tokio::signal::ctrl_c()
        .await
        .context("waiting for shutdown signal")?;
    server.shutdown().await;

    Ok(())
}
