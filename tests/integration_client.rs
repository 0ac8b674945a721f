//! Client and server wired together over a real socket.

use anyhow::{Context, Result};
use authgate::{
    api,
    client::{AuthClient, ClientError, ReqwestTransport, StorageScope, TokenStorage},
    password::Hasher,
    service::AuthService,
    store::MemoryCredentialStore,
    token::{TokenIssuer, TokenKind},
};
use chrono::{Duration as ChronoDuration, Utc};
use secrecy::SecretString;
use std::{sync::Arc, time::Duration};
use tokio::{net::TcpListener, sync::oneshot};
use url::Url;

struct Harness {
    service: Arc<AuthService>,
    base_url: Url,
    stop: Option<oneshot::Sender<()>>,
}

impl Drop for Harness {
    fn drop(&mut self) {
        if let Some(stop) = self.stop.take() {
            let _ = stop.send(());
        }
    }
}

async fn boot() -> Result<Harness> {
    let tokens = TokenIssuer::new(
        &SecretString::from("integration-access-secret"),
        Duration::from_secs(15 * 60),
        &SecretString::from("integration-refresh-secret"),
        Duration::from_secs(24 * 3600),
    );
    let service = Arc::new(AuthService::new(
        Arc::new(MemoryCredentialStore::new()),
        tokens,
        Hasher::default(),
    ));
    service
        .create_account("test@example.com", "password123", Some("Test User".to_string()))
        .await?;

    let app = api::app(Arc::clone(&service), "http://localhost:8088")?;
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    let (stop, stopped) = oneshot::channel::<()>();
    tokio::spawn(api::serve(listener, app, async move {
        let _ = stopped.await;
    }));

    Ok(Harness {
        service,
        base_url: Url::parse(&format!("http://{addr}"))?,
        stop: Some(stop),
    })
}

fn client(harness: &Harness) -> Result<AuthClient> {
    let transport = ReqwestTransport::new(harness.base_url.clone())?;
    Ok(AuthClient::new(Arc::new(transport), TokenStorage::in_memory()))
}

#[tokio::test]
async fn login_refresh_and_logout_over_http() -> Result<()> {
    let harness = boot().await?;
    let client = client(&harness)?;

    let user = client.login("  Test@Example.com ", "password123", true).await?;
    assert_eq!(user.email, "test@example.com");
    assert!(client.state().snapshot().is_authenticated());
    assert_eq!(client.storage().active_scope()?, StorageScope::Persistent);

    let me = client.me().await?;
    assert_eq!(me.id, user.id);

    // Swap in an access token that expired a month ago; the client has to
    // refresh once and retry.
    let expired = harness.service.tokens().issue_at(
        TokenKind::Access,
        user.id,
        Utc::now() - ChronoDuration::days(30),
    )?;
    let refresh = client
        .storage()
        .refresh_token()?
        .context("missing refresh token")?;
    client
        .storage()
        .set_tokens(&expired, &refresh, StorageScope::Persistent)?;

    let me = client.me().await?;
    assert_eq!(me.email, "test@example.com");
    let rotated = client
        .storage()
        .access_token()?
        .context("missing access token")?;
    assert_ne!(rotated, expired);
    assert_ne!(client.storage().refresh_token()?, Some(refresh));

    client.logout().await?;
    assert!(!client.state().snapshot().is_authenticated());
    assert_eq!(client.storage().access_token()?, None);
    assert_eq!(client.storage().refresh_token()?, None);
    Ok(())
}

#[tokio::test]
async fn wrong_password_surfaces_server_message() -> Result<()> {
    let harness = boot().await?;
    let client = client(&harness)?;

    let err = client
        .login("test@example.com", "wrong-password", false)
        .await
        .err()
        .context("login should fail")?;
    assert!(matches!(err, ClientError::Api { .. }));
    assert_eq!(err.user_message(), "Invalid email or password");
    assert_eq!(err.status().map(|status| status.as_u16()), Some(401));
    assert_eq!(client.storage().access_token()?, None);
    Ok(())
}

#[tokio::test]
async fn init_restores_a_stored_session() -> Result<()> {
    let harness = boot().await?;
    let storage = TokenStorage::in_memory();

    let first = AuthClient::new(
        Arc::new(ReqwestTransport::new(harness.base_url.clone())?),
        storage.clone(),
    );
    first.login("test@example.com", "password123", false).await?;

    let second = AuthClient::new(
        Arc::new(ReqwestTransport::new(harness.base_url.clone())?),
        storage,
    );
    let snapshot = second.init().await;
    assert!(snapshot.is_authenticated());
    assert_eq!(
        snapshot.user.map(|user| user.email),
        Some("test@example.com".to_string())
    );
    Ok(())
}
