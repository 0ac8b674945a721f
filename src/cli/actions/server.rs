use crate::{
    api,
    cli::telemetry,
    config::ServerConfig,
    password::Hasher,
    service::AuthService,
    store::PgCredentialStore,
};
use anyhow::{Context, Result};
use secrecy::ExposeSecret;
use std::{net::SocketAddr, sync::Arc};
use tokio::net::TcpListener;
use tracing::info;

/// Connect the store, build the router and serve until SIGINT/SIGTERM.
/// # Errors
/// Returns an error if the database is unreachable, the port cannot be bound
/// or the server fails.
pub async fn execute(config: ServerConfig) -> Result<()> {
    let store = PgCredentialStore::connect(config.dsn().expose_secret())
        .await
        .context("Failed to connect to database")?;
    store
        .migrate()
        .await
        .context("Failed to apply database schema")?;

    let service = Arc::new(AuthService::new(
        Arc::new(store.clone()),
        config.token_issuer(),
        Hasher::default(),
    ));
    let app = api::app(service, config.frontend_origin())?;

    let addr = SocketAddr::from(([0, 0, 0, 0, 0, 0, 0, 0], config.port()));
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;

    info!(
        "access ttl {}s, refresh ttl {}s",
        config.access_ttl().as_secs(),
        config.refresh_ttl().as_secs()
    );

    let served = api::serve(listener, app, api::shutdown_signal()).await;

    info!("shutting down");
    store.close().await;
    telemetry::shutdown_tracer();

    served
}
