use super::{Account, AccountCredentials, CredentialStore, NewAccount, StoreError};
use crate::password::PasswordHash;
use async_trait::async_trait;
use sqlx::{
    postgres::{PgPoolOptions, PgRow},
    Connection, PgPool, Row,
};
use std::time::Duration;
use tracing::{info_span, Instrument};
use uuid::Uuid;

const SCHEMA_SQL: &str = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/sql/schema.sql"));

const ACCOUNT_COLUMNS: &str = "id, email, name, created_at, updated_at";

#[derive(Debug, Clone)]
pub struct PgCredentialStore {
    pool: PgPool,
}

impl PgCredentialStore {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Open a small connection pool against `dsn`.
    ///
    /// # Errors
    /// Returns an error if the database is unreachable.
    pub async fn connect(dsn: &str) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .min_connections(1)
            .max_connections(5)
            .max_lifetime(Duration::from_secs(60 * 2))
            .test_before_acquire(true)
            .connect(dsn)
            .await?;

        Ok(Self { pool })
    }

    /// Create the `accounts` table if it does not exist yet.
    ///
    /// # Errors
    /// Returns an error if any schema statement fails.
    pub async fn migrate(&self) -> Result<(), StoreError> {
        let mut conn = self.pool.acquire().await?;
        for statement in split_sql_statements(SCHEMA_SQL) {
            sqlx::query(&statement).execute(&mut *conn).await?;
        }
        Ok(())
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

#[async_trait]
impl CredentialStore for PgCredentialStore {
    async fn create(&self, account: NewAccount) -> Result<Account, StoreError> {
        let query = format!(
            "INSERT INTO accounts (id, email, password_hash, name) VALUES ($1, $2, $3, $4) RETURNING {ACCOUNT_COLUMNS}"
        );
        let span = info_span!("db.query", db.system = "postgresql", db.operation = "INSERT");
        let row = sqlx::query(&query)
            .bind(Uuid::new_v4())
            .bind(&account.email)
            .bind(account.password_hash.as_str())
            .bind(&account.name)
            .fetch_one(&self.pool)
            .instrument(span)
            .await
            .map_err(|err| {
                if is_unique_violation(&err) {
                    StoreError::Conflict { field: "email" }
                } else {
                    StoreError::Database(err)
                }
            })?;

        account_from_row(&row)
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<Account>, StoreError> {
        let query = format!("SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE email = $1");
        let span = info_span!("db.query", db.system = "postgresql", db.operation = "SELECT");
        let row = sqlx::query(&query)
            .bind(email)
            .fetch_optional(&self.pool)
            .instrument(span)
            .await?;

        row.as_ref().map(account_from_row).transpose()
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Account>, StoreError> {
        let query = format!("SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE id = $1");
        let span = info_span!("db.query", db.system = "postgresql", db.operation = "SELECT");
        let row = sqlx::query(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .instrument(span)
            .await?;

        row.as_ref().map(account_from_row).transpose()
    }

    async fn find_credentials(
        &self,
        email: &str,
    ) -> Result<Option<AccountCredentials>, StoreError> {
        let query =
            format!("SELECT {ACCOUNT_COLUMNS}, password_hash FROM accounts WHERE email = $1");
        let span = info_span!("db.query", db.system = "postgresql", db.operation = "SELECT");
        let row = sqlx::query(&query)
            .bind(email)
            .fetch_optional(&self.pool)
            .instrument(span)
            .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        Ok(Some(AccountCredentials {
            account: account_from_row(&row)?,
            password_hash: PasswordHash::from_stored(row.try_get("password_hash")?),
        }))
    }

    async fn set_password_hash(&self, id: Uuid, hash: PasswordHash) -> Result<(), StoreError> {
        let span = info_span!("db.query", db.system = "postgresql", db.operation = "UPDATE");
        let result = sqlx::query(
            "UPDATE accounts SET password_hash = $2, updated_at = NOW() WHERE id = $1",
        )
        .bind(id)
        .bind(hash.as_str())
        .execute(&self.pool)
        .instrument(span)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    async fn update_name(&self, id: Uuid, name: Option<String>) -> Result<Account, StoreError> {
        let query = format!(
            "UPDATE accounts SET name = $2, updated_at = NOW() WHERE id = $1 RETURNING {ACCOUNT_COLUMNS}"
        );
        let span = info_span!("db.query", db.system = "postgresql", db.operation = "UPDATE");
        let row = sqlx::query(&query)
            .bind(id)
            .bind(name)
            .fetch_optional(&self.pool)
            .instrument(span)
            .await?;

        row.as_ref()
            .map(account_from_row)
            .transpose()?
            .ok_or(StoreError::NotFound)
    }

    async fn ping(&self) -> Result<(), StoreError> {
        let span = info_span!("db.ping", db.system = "postgresql", db.operation = "PING");
        async {
            let mut conn = self.pool.acquire().await?;
            conn.ping().await?;
            Ok::<(), StoreError>(())
        }
        .instrument(span)
        .await
    }
}

fn account_from_row(row: &PgRow) -> Result<Account, StoreError> {
    Ok(Account {
        id: row.try_get("id")?,
        email: row.try_get("email")?,
        name: row.try_get("name")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db_err) => db_err.code().is_some_and(|code| code.as_ref() == "23505"),
        _ => false,
    }
}

fn split_sql_statements(sql: &str) -> Vec<String> {
    let mut statements = Vec::new();
    let mut current = String::new();

    for line in sql.lines() {
        let trimmed = line.trim();
        if trimmed.starts_with("--") {
            continue;
        }
        current.push_str(line);
        current.push('\n');

        if trimmed.ends_with(';') {
            let statement = current.trim();
            if !statement.is_empty() {
                statements.push(statement.to_string());
            }
            current.clear();
        }
    }

    let leftover = current.trim();
    if !leftover.is_empty() {
        statements.push(leftover.to_string());
    }

    statements
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::password::test_hasher;
    use anyhow::{Context, Result};

    #[test]
    fn split_sql_statements_skips_comments() {
        let statements = split_sql_statements(SCHEMA_SQL);
        assert_eq!(statements.len(), 1);
        assert!(statements[0].starts_with("CREATE TABLE IF NOT EXISTS accounts"));
    }

    #[test]
    fn split_sql_statements_keeps_trailing_statement() {
        let statements = split_sql_statements("SELECT 1;\nSELECT 2");
        assert_eq!(statements, vec!["SELECT 1;".to_string(), "SELECT 2".to_string()]);
    }

    // Runs only when a disposable database is provided.
    async fn test_store() -> Option<PgCredentialStore> {
        let dsn = std::env::var("AUTHGATE_TEST_DSN").ok()?;
        let store = match PgCredentialStore::connect(&dsn).await {
            Ok(store) => store,
            Err(err) => {
                eprintln!("Skipping postgres test: {err}");
                return None;
            }
        };
        if let Err(err) = store.migrate().await {
            eprintln!("Skipping postgres test: {err}");
            return None;
        }
        Some(store)
    }

    #[tokio::test]
    async fn postgres_round_trip() -> Result<()> {
        let Some(store) = test_store().await else {
            return Ok(());
        };

        let email = format!("user-{}@example.com", Uuid::new_v4().simple());
        let created = store
            .create(NewAccount {
                email: email.clone(),
                password_hash: test_hasher().hash("password123")?,
                name: None,
            })
            .await?;

        let found = store.find_by_id(created.id).await?.context("missing account")?;
        assert_eq!(found.email, email);

        let credentials = store
            .find_credentials(&email)
            .await?
            .context("missing credentials")?;
        assert!(test_hasher().verify("password123", &credentials.password_hash));

        let duplicate = store
            .create(NewAccount {
                email,
                password_hash: test_hasher().hash("password123")?,
                name: None,
            })
            .await;
        assert!(matches!(duplicate, Err(StoreError::Conflict { .. })));

        store.ping().await?;
        Ok(())
    }
}
