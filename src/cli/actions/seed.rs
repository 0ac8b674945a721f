use crate::{
    config::ServerConfig,
    password::Hasher,
    service::{AuthError, AuthService},
    store::PgCredentialStore,
};
use anyhow::{Context, Result};
use secrecy::ExposeSecret;
use std::sync::Arc;
use tracing::info;

pub const DEMO_EMAIL: &str = "test@example.com";
pub const DEMO_PASSWORD: &str = "password123";
pub const DEMO_NAME: &str = "Test User";

/// Create the demo account. Running it twice is a no-op.
/// # Errors
/// Returns an error if the database is unreachable or the insert fails.
pub async fn execute(config: ServerConfig) -> Result<()> {
    let store = PgCredentialStore::connect(config.dsn().expose_secret())
        .await
        .context("Failed to connect to database")?;
    store
        .migrate()
        .await
        .context("Failed to apply database schema")?;

    let service = AuthService::new(
        Arc::new(store.clone()),
        config.token_issuer(),
        Hasher::default(),
    );
    let result = seed_demo_account(&service).await;
    store.close().await;
    result
}

pub(crate) async fn seed_demo_account(service: &AuthService) -> Result<()> {
    match service
        .create_account(DEMO_EMAIL, DEMO_PASSWORD, Some(DEMO_NAME.to_string()))
        .await
    {
        Ok(account) => {
            info!(account_id = %account.id, "demo account created");
            println!("Created {DEMO_EMAIL} / {DEMO_PASSWORD}");
            Ok(())
        }
        Err(AuthError::Conflict { .. }) => {
            println!("{DEMO_EMAIL} already exists");
            Ok(())
        }
        Err(err) => Err(err).context("Failed to create demo account"),
    }
}
