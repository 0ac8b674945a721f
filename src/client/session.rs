//! Refresh interceptor and the login/logout/init flows built on it.
//!
//! Flow Overview:
//! 1) Attach the stored access token (if any) and send.
//! 2) On a first 401, take the refresh lock. If another caller already
//!    rotated the tokens while we waited, reuse the result; otherwise
//!    exchange the refresh token once.
//! 3) Retry the original request exactly once with the new access token.
//!    A second 401 is final.
//! 4) A failed exchange clears both storage scopes and signs the session out.

use super::{
    state::{AuthSnapshot, SessionState},
    storage::{StorageScope, TokenStorage},
    transport::{ApiReply, ApiRequest, Transport},
    ClientError, GENERIC_FAILURE,
};
use crate::{
    envelope::{ApiResponse, ErrorDetail},
    service::AuthSession,
    store::Account,
};
use reqwest::StatusCode;
use serde::{de::DeserializeOwned, Deserialize};
use serde_json::{json, Value};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

#[derive(Deserialize)]
struct UserData {
    user: Account,
}

pub struct AuthClient {
    transport: Arc<dyn Transport>,
    storage: TokenStorage,
    state: SessionState,
    refresh_lock: Mutex<()>,
}

impl std::fmt::Debug for AuthClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthClient")
            .field("state", &self.state.snapshot())
            .finish_non_exhaustive()
    }
}

impl AuthClient {
    #[must_use]
    pub fn new(transport: Arc<dyn Transport>, storage: TokenStorage) -> Self {
        Self {
            transport,
            storage,
            state: SessionState::new(),
            refresh_lock: Mutex::new(()),
        }
    }

    #[must_use]
    pub fn state(&self) -> &SessionState {
        &self.state
    }

    #[must_use]
    pub fn storage(&self) -> &TokenStorage {
        &self.storage
    }

    /// Sign in and keep the tokens in the scope picked by `remember_me`.
    ///
    /// # Errors
    /// Returns the server's failure (message included) or a transport error;
    /// the session state moves to `Failed` with the same message.
    pub async fn login(
        &self,
        email: &str,
        password: &str,
        remember_me: bool,
    ) -> Result<Account, ClientError> {
        self.state.begin_loading();

        let request = ApiRequest::post(
            "/auth/login",
            Some(json!({ "email": email, "password": password })),
        );
        let result = match self.transport.send(&request).await {
            Ok(reply) => into_data::<AuthSession>(reply),
            Err(err) => Err(err.into()),
        };

        match result {
            Ok(session) => {
                self.storage.set_tokens(
                    &session.access_token,
                    &session.refresh_token,
                    StorageScope::from_remember_me(remember_me),
                )?;
                info!(account_id = %session.user.id, "signed in");
                self.state.authenticated(session.user.clone());
                Ok(session.user)
            }
            Err(err) => {
                self.state.failed(err.user_message());
                Err(err)
            }
        }
    }

    /// Drop local tokens, then tell the server, ignoring its answer.
    ///
    /// # Errors
    /// Returns an error only if the local token store cannot be cleared; the
    /// server is not called in that case.
    pub async fn logout(&self) -> Result<(), ClientError> {
        let mut request = ApiRequest::post("/auth/logout", None);
        request.bearer = self.storage.access_token().ok().flatten();

        self.state.signed_out();
        self.storage.clear()?;

        if let Err(err) = self.transport.send(&request).await {
            debug!("logout call failed: {err}");
        }
        Ok(())
    }

    /// Restore the session from stored tokens on startup.
    ///
    /// Ends either authenticated with a profile or unauthenticated with no
    /// tokens left behind.
    pub async fn init(&self) -> AuthSnapshot {
        match self.storage.access_token() {
            Ok(Some(_)) => {}
            Ok(None) => {
                self.state.signed_out();
                return self.state.snapshot();
            }
            Err(err) => {
                warn!("cannot read stored tokens: {err}");
                self.discard_session();
                return self.state.snapshot();
            }
        }

        self.state.begin_loading();
        match self.me().await {
            Ok(user) => self.state.authenticated(user),
            Err(err) => {
                debug!("session restore failed: {err}");
                self.discard_session();
            }
        }
        self.state.snapshot()
    }

    /// Profile of the current token holder.
    ///
    /// # Errors
    /// See [`AuthClient::send_authenticated`].
    pub async fn me(&self) -> Result<Account, ClientError> {
        let data: UserData = self.call(ApiRequest::get("/auth/me")).await?;
        Ok(data.user)
    }

    /// Authenticated call decoded from the envelope's `data`.
    ///
    /// # Errors
    /// See [`AuthClient::send_authenticated`]; also fails on failure envelopes.
    pub async fn call<T: DeserializeOwned>(&self, request: ApiRequest) -> Result<T, ClientError> {
        let reply = self.send_authenticated(request).await?;
        into_data(reply)
    }

    /// Send with the stored access token, refreshing and retrying once on 401.
    ///
    /// # Errors
    /// [`ClientError::SessionExpired`] when the refresh exchange fails, and
    /// transport or storage errors. Non-401 replies are returned as is. A 401
    /// that survives the refresh attempt signs the session state out.
    pub async fn send_authenticated(&self, mut request: ApiRequest) -> Result<ApiReply, ClientError> {
        let presented = self.storage.access_token()?;
        request.bearer.clone_from(&presented);

        let reply = self.transport.send(&request).await?;
        if reply.status != StatusCode::UNAUTHORIZED {
            return Ok(reply);
        }

        let Some(fresh) = self.refreshed_access_token(presented.as_deref()).await? else {
            self.rejected(&request);
            return Ok(reply);
        };

        debug!(path = %request.path, "retrying with refreshed access token");
        request.bearer = Some(fresh);
        let reply = self.transport.send(&request).await?;
        if reply.status == StatusCode::UNAUTHORIZED {
            self.rejected(&request);
        }
        Ok(reply)
    }

    /// A final 401 proves the access token invalid; tokens stay stored.
    fn rejected(&self, request: &ApiRequest) {
        debug!(path = %request.path, "request rejected after refresh attempt");
        self.state.signed_out();
    }

    /// One refresh exchange shared by every caller that saw the same stale token.
    ///
    /// `Ok(None)` means there is no refresh token, so the 401 stands.
    async fn refreshed_access_token(
        &self,
        stale: Option<&str>,
    ) -> Result<Option<String>, ClientError> {
        let _guard = self.refresh_lock.lock().await;

        let current = self.storage.access_token()?;
        if let Some(current) = current.filter(|current| Some(current.as_str()) != stale) {
            debug!("tokens already rotated by a concurrent request");
            return Ok(Some(current));
        }

        let Some(refresh_token) = self.storage.refresh_token()? else {
            return Ok(None);
        };

        let request = ApiRequest::post(
            "/auth/refresh",
            Some(json!({ "refreshToken": refresh_token })),
        );
        let exchanged = match self.transport.send(&request).await {
            Ok(reply) => into_data::<AuthSession>(reply),
            Err(err) => Err(err.into()),
        };

        match exchanged {
            Ok(session) => {
                self.storage
                    .replace_tokens(&session.access_token, &session.refresh_token)?;
                debug!(account_id = %session.user.id, "tokens refreshed");
                Ok(Some(session.access_token))
            }
            Err(err) => {
                warn!("refresh failed, signing out: {err}");
                self.discard_session();
                Err(ClientError::SessionExpired)
            }
        }
    }

    fn discard_session(&self) {
        if let Err(err) = self.storage.clear() {
            warn!("failed to clear stored tokens: {err}");
        }
        self.state.signed_out();
    }
}

fn into_data<T: DeserializeOwned>(reply: ApiReply) -> Result<T, ClientError> {
    let body = reply.body.unwrap_or(Value::Null);
    if !reply.status.is_success() {
        return Err(api_error(reply.status, &body));
    }

    let envelope: ApiResponse<T> =
        serde_json::from_value(body).map_err(|_| ClientError::Decode)?;
    if !envelope.success {
        return Err(ClientError::Api {
            status: reply.status,
            message: envelope
                .message
                .unwrap_or_else(|| GENERIC_FAILURE.to_string()),
            errors: envelope.errors.unwrap_or_default(),
        });
    }
    envelope.data.ok_or(ClientError::Decode)
}

fn api_error(status: StatusCode, body: &Value) -> ClientError {
    let message = body
        .get("message")
        .and_then(Value::as_str)
        .filter(|message| !message.is_empty())
        .map_or_else(
            || format!("Request failed with status code {}", status.as_u16()),
            str::to_string,
        );
    let errors = body
        .get("errors")
        .cloned()
        .and_then(|errors| serde_json::from_value::<Vec<ErrorDetail>>(errors).ok())
        .unwrap_or_default();

    ClientError::Api {
        status,
        message,
        errors,
    }
}
