//! Credential store boundary.
//!
//! Accounts are looked up by normalized email or by id. The password hash is
//! never part of the default projection: only [`CredentialStore::find_credentials`]
//! returns it, and only the login path calls that.
//!
//! Two backends are provided: [`PgCredentialStore`] for deployments and
//! [`MemoryCredentialStore`] for tests and local experiments.

mod memory;
mod postgres;

pub use memory::MemoryCredentialStore;
pub use postgres::PgCredentialStore;

use crate::password::PasswordHash;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;
use uuid::Uuid;

/// Public account profile. Safe to serialize to clients.
#[derive(ToSchema, Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    pub id: Uuid,
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Account plus its password hash, as returned by the explicit credentials lookup.
#[derive(Debug, Clone)]
pub struct AccountCredentials {
    pub account: Account,
    pub password_hash: PasswordHash,
}

/// Input for account creation. The password is already hashed.
#[derive(Debug, Clone)]
pub struct NewAccount {
    pub email: String,
    pub password_hash: PasswordHash,
    pub name: Option<String>,
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{field} already exists")]
    Conflict { field: &'static str },
    #[error("account not found")]
    NotFound,
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Insert a new account; the email must be unique.
    async fn create(&self, account: NewAccount) -> Result<Account, StoreError>;

    async fn find_by_email(&self, email: &str) -> Result<Option<Account>, StoreError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Account>, StoreError>;

    /// Lookup by email including the otherwise hidden password hash.
    async fn find_credentials(&self, email: &str)
        -> Result<Option<AccountCredentials>, StoreError>;

    /// Replace the stored hash. This is the only write that touches it.
    async fn set_password_hash(&self, id: Uuid, hash: PasswordHash) -> Result<(), StoreError>;

    /// Update profile fields; the password hash is left untouched.
    async fn update_name(&self, id: Uuid, name: Option<String>) -> Result<Account, StoreError>;

    /// Cheap liveness probe used by `/health`.
    async fn ping(&self) -> Result<(), StoreError>;
}
