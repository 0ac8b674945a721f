use super::{Account, AccountCredentials, CredentialStore, NewAccount, StoreError};
use crate::password::PasswordHash;
use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

#[derive(Debug, Default)]
struct Accounts {
    by_id: HashMap<Uuid, AccountCredentials>,
    id_by_email: HashMap<String, Uuid>,
}

/// In-process store. Email uniqueness is enforced under a single write lock.
#[derive(Debug, Default)]
pub struct MemoryCredentialStore {
    accounts: RwLock<Accounts>,
}

impl MemoryCredentialStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.accounts.read().await.by_id.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl CredentialStore for MemoryCredentialStore {
    async fn create(&self, account: NewAccount) -> Result<Account, StoreError> {
        let mut accounts = self.accounts.write().await;
        if accounts.id_by_email.contains_key(&account.email) {
            return Err(StoreError::Conflict { field: "email" });
        }

        let now = Utc::now();
        let record = Account {
            id: Uuid::new_v4(),
            email: account.email,
            name: account.name,
            created_at: now,
            updated_at: now,
        };
        accounts
            .id_by_email
            .insert(record.email.clone(), record.id);
        accounts.by_id.insert(
            record.id,
            AccountCredentials {
                account: record.clone(),
                password_hash: account.password_hash,
            },
        );
        Ok(record)
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<Account>, StoreError> {
        Ok(self
            .find_credentials(email)
            .await?
            .map(|credentials| credentials.account))
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Account>, StoreError> {
        let accounts = self.accounts.read().await;
        Ok(accounts
            .by_id
            .get(&id)
            .map(|credentials| credentials.account.clone()))
    }

    async fn find_credentials(
        &self,
        email: &str,
    ) -> Result<Option<AccountCredentials>, StoreError> {
        let accounts = self.accounts.read().await;
        Ok(accounts
            .id_by_email
            .get(email)
            .and_then(|id| accounts.by_id.get(id))
            .cloned())
    }

    async fn set_password_hash(&self, id: Uuid, hash: PasswordHash) -> Result<(), StoreError> {
        let mut accounts = self.accounts.write().await;
        let record = accounts.by_id.get_mut(&id).ok_or(StoreError::NotFound)?;
        record.password_hash = hash;
        record.account.updated_at = Utc::now();
        Ok(())
    }

    async fn update_name(&self, id: Uuid, name: Option<String>) -> Result<Account, StoreError> {
        let mut accounts = self.accounts.write().await;
        let record = accounts.by_id.get_mut(&id).ok_or(StoreError::NotFound)?;
        record.account.name = name;
        record.account.updated_at = Utc::now();
        Ok(record.account.clone())
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}
