//! Authentication service: credential check, token issuance and rotation.
//!
//! Flow Overview:
//! 1) `login` normalizes the email, loads the account with its hash, verifies
//!    the password and issues an access/refresh pair.
//! 2) `refresh` verifies a refresh token, reloads the account by id and issues
//!    a brand new pair.
//! 3) `current_user` resolves an access token to a live account.
//!
//! Unknown email and wrong password produce the same error so callers cannot
//! learn which emails are registered. Reads only: nothing here writes to an
//! account except the explicit account management helpers at the bottom.

use crate::{
    password::{Hasher, PasswordError, PasswordHash},
    store::{Account, CredentialStore, NewAccount, StoreError},
    token::{SignError, TokenError, TokenIssuer},
};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, OnceLock};
use thiserror::Error;
use tracing::{debug, info, instrument, warn};
use utoipa::ToSchema;
use uuid::Uuid;

/// Profile plus a fresh token pair, as returned by login and refresh.
#[derive(ToSchema, Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct AuthSession {
    pub user: Account,
    pub access_token: String,
    pub refresh_token: String,
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("invalid email or password")]
    InvalidCredentials,
    #[error(transparent)]
    Token(#[from] TokenError),
    #[error("account no longer exists")]
    AccountGone,
    #[error("{field} already exists")]
    Conflict { field: &'static str },
    #[error(transparent)]
    Password(#[from] PasswordError),
    #[error(transparent)]
    Sign(#[from] SignError),
    #[error("credential store failure: {0}")]
    Store(StoreError),
}

impl From<StoreError> for AuthError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Conflict { field } => Self::Conflict { field },
            StoreError::NotFound => Self::AccountGone,
            other @ StoreError::Database(_) => Self::Store(other),
        }
    }
}

impl AuthError {
    /// True for every failure that must surface as "unauthenticated".
    #[must_use]
    pub const fn is_unauthenticated(&self) -> bool {
        matches!(
            self,
            Self::InvalidCredentials | Self::Token(_) | Self::AccountGone
        )
    }
}

/// Normalize an email for lookup/uniqueness checks.
#[must_use]
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

pub struct AuthService {
    store: Arc<dyn CredentialStore>,
    tokens: TokenIssuer,
    hasher: Hasher,
    // Verified against when the email is unknown so both paths cost the same.
    decoy_hash: OnceLock<Option<PasswordHash>>,
}

impl std::fmt::Debug for AuthService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthService")
            .field("tokens", &self.tokens)
            .field("hasher", &self.hasher)
            .finish_non_exhaustive()
    }
}

impl AuthService {
    #[must_use]
    pub fn new(store: Arc<dyn CredentialStore>, tokens: TokenIssuer, hasher: Hasher) -> Self {
        Self {
            store,
            tokens,
            hasher,
            decoy_hash: OnceLock::new(),
        }
    }

    #[must_use]
    pub fn store(&self) -> &dyn CredentialStore {
        self.store.as_ref()
    }

    #[must_use]
    pub fn tokens(&self) -> &TokenIssuer {
        &self.tokens
    }

    /// Exchange email and password for a token pair.
    ///
    /// # Errors
    /// [`AuthError::InvalidCredentials`] for an unknown email or a wrong
    /// password; store and signing failures otherwise.
    #[instrument(skip_all)]
    pub async fn login(&self, email: &str, password: &str) -> Result<AuthSession, AuthError> {
        let email = normalize_email(email);

        let Some(credentials) = self.store.find_credentials(&email).await? else {
            self.burn_decoy(password);
            debug!("login rejected: unknown email");
            return Err(AuthError::InvalidCredentials);
        };

        if !self.hasher.verify(password, &credentials.password_hash) {
            debug!(account_id = %credentials.account.id, "login rejected: password mismatch");
            return Err(AuthError::InvalidCredentials);
        }

        info!(account_id = %credentials.account.id, "login succeeded");
        self.issue_pair(credentials.account)
    }

    /// Exchange a refresh token for a new token pair (rotation).
    ///
    /// The presented refresh token is not tracked and stays valid until it
    /// expires on its own.
    ///
    /// # Errors
    /// [`AuthError::Token`] for an expired or invalid refresh token and
    /// [`AuthError::AccountGone`] when the subject was deleted.
    #[instrument(skip_all)]
    pub async fn refresh(&self, refresh_token: &str) -> Result<AuthSession, AuthError> {
        let account_id = self.tokens.verify_refresh(refresh_token)?;

        let Some(account) = self.store.find_by_id(account_id).await? else {
            warn!(%account_id, "refresh rejected: account no longer exists");
            return Err(AuthError::AccountGone);
        };

        debug!(%account_id, "refresh succeeded");
        self.issue_pair(account)
    }

    /// Resolve an access token to the account it was issued for.
    ///
    /// # Errors
    /// [`AuthError::Token`] for an expired or invalid access token and
    /// [`AuthError::AccountGone`] when the subject was deleted.
    pub async fn current_user(&self, access_token: &str) -> Result<Account, AuthError> {
        let account_id = self.tokens.verify_access(access_token)?;
        self.store
            .find_by_id(account_id)
            .await?
            .ok_or(AuthError::AccountGone)
    }

    fn issue_pair(&self, account: Account) -> Result<AuthSession, AuthError> {
        let access_token = self.tokens.issue_access(account.id)?;
        let refresh_token = self.tokens.issue_refresh(account.id)?;
        Ok(AuthSession {
            user: account,
            access_token,
            refresh_token,
        })
    }

    fn burn_decoy(&self, password: &str) {
        let decoy = self
            .decoy_hash
            .get_or_init(|| self.hasher.hash("decoy-password").ok());
        if let Some(decoy) = decoy {
            std::hint::black_box(self.hasher.verify(password, decoy));
        }
    }

    /// Create an account, hashing the password before anything is stored.
    ///
    /// # Errors
    /// [`AuthError::Conflict`] when the email is taken, [`AuthError::Password`]
    /// when hashing fails (nothing is written in that case).
    #[instrument(skip(self, password))]
    pub async fn create_account(
        &self,
        email: &str,
        password: &str,
        name: Option<String>,
    ) -> Result<Account, AuthError> {
        let password_hash = self.hasher.hash(password)?;
        let account = self
            .store
            .create(NewAccount {
                email: normalize_email(email),
                password_hash,
                name: name.map(|name| name.trim().to_string()),
            })
            .await?;

        info!(account_id = %account.id, "account created");
        Ok(account)
    }

    /// Set a new password. This is the only place an existing hash is recomputed.
    ///
    /// # Errors
    /// [`AuthError::AccountGone`] for unknown ids, [`AuthError::Password`] when
    /// hashing fails.
    #[instrument(skip(self, new_password))]
    pub async fn change_password(&self, account_id: Uuid, new_password: &str) -> Result<(), AuthError> {
        let password_hash = self.hasher.hash(new_password)?;
        self.store
            .set_password_hash(account_id, password_hash)
            .await?;
        info!(%account_id, "password changed");
        Ok(())
    }

    /// Update the display name; the password hash is not touched.
    ///
    /// # Errors
    /// [`AuthError::AccountGone`] for unknown ids.
    pub async fn update_name(
        &self,
        account_id: Uuid,
        name: Option<String>,
    ) -> Result<Account, AuthError> {
        let name = name
            .map(|name| name.trim().to_string())
            .filter(|name| !name.is_empty());
        Ok(self.store.update_name(account_id, name).await?)
    }
}

#[cfg(test)]
pub(crate) async fn test_service() -> anyhow::Result<(AuthService, Account)> {
    use crate::{password::test_hasher, store::MemoryCredentialStore, token::test_issuer};

    let service = AuthService::new(
        Arc::new(MemoryCredentialStore::new()),
        test_issuer(),
        test_hasher(),
    );
    let account = service
        .create_account("test@example.com", "password123", Some("Test User".to_string()))
        .await?;
    Ok((service, account))
}
