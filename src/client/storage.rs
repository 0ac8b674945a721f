//! Token persistence with two scopes.
//!
//! `Persistent` survives restarts ("remember me"), `Session` lives as long as
//! the process. Reads check persistent first, then session; clearing always
//! wipes both.

use serde_json::{Map, Value};
use std::{
    collections::HashMap,
    fs, io,
    path::{Path, PathBuf},
    sync::{Arc, Mutex},
};
use thiserror::Error;

pub const ACCESS_TOKEN_KEY: &str = "accessToken";
pub const REFRESH_TOKEN_KEY: &str = "refreshToken";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageScope {
    Persistent,
    Session,
}

impl StorageScope {
    #[must_use]
    pub const fn from_remember_me(remember_me: bool) -> Self {
        if remember_me {
            Self::Persistent
        } else {
            Self::Session
        }
    }
}

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("token store I/O failed for {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("token store {path} is corrupt: {source}")]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("token store lock poisoned")]
    Poisoned,
}

/// Minimal string key/value backend for one scope.
pub trait KeyValueStore: Send + Sync {
    /// # Errors
    /// Returns an error if the backend cannot be read.
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// # Errors
    /// Returns an error if the backend cannot be written.
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// # Errors
    /// Returns an error if the backend cannot be written.
    fn remove(&self, key: &str) -> Result<(), StorageError>;
}

#[derive(Debug, Default)]
pub struct MemoryKeyValueStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryKeyValueStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryKeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let entries = self.entries.lock().map_err(|_| StorageError::Poisoned)?;
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let mut entries = self.entries.lock().map_err(|_| StorageError::Poisoned)?;
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        let mut entries = self.entries.lock().map_err(|_| StorageError::Poisoned)?;
        entries.remove(key);
        Ok(())
    }
}

/// JSON object on disk, rewritten atomically on every change.
#[derive(Debug)]
pub struct FileKeyValueStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileKeyValueStore {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> Result<Map<String, Value>, StorageError> {
        match fs::read(&self.path) {
            Ok(bytes) if bytes.is_empty() => Ok(Map::new()),
            Ok(bytes) => serde_json::from_slice(&bytes).map_err(|source| StorageError::Corrupt {
                path: self.path.clone(),
                source,
            }),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(Map::new()),
            Err(source) => Err(self.io_error(source)),
        }
    }

    fn save(&self, entries: &Map<String, Value>) -> Result<(), StorageError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|source| self.io_error(source))?;
        }
        let bytes = serde_json::to_vec_pretty(entries).map_err(|source| StorageError::Corrupt {
            path: self.path.clone(),
            source,
        })?;
        let tmp = self.path.with_extension("tmp");
        fs::write(&tmp, bytes).map_err(|source| self.io_error(source))?;
        fs::rename(&tmp, &self.path).map_err(|source| self.io_error(source))
    }

    fn io_error(&self, source: io::Error) -> StorageError {
        StorageError::Io {
            path: self.path.clone(),
            source,
        }
    }
}

impl KeyValueStore for FileKeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let _guard = self.lock.lock().map_err(|_| StorageError::Poisoned)?;
        Ok(self
            .load()?
            .get(key)
            .and_then(Value::as_str)
            .map(str::to_string))
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let _guard = self.lock.lock().map_err(|_| StorageError::Poisoned)?;
        let mut entries = self.load()?;
        entries.insert(key.to_string(), Value::String(value.to_string()));
        self.save(&entries)
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        let _guard = self.lock.lock().map_err(|_| StorageError::Poisoned)?;
        let mut entries = self.load()?;
        if entries.remove(key).is_some() {
            self.save(&entries)?;
        }
        Ok(())
    }
}

/// The access/refresh pair spread over the two scopes.
#[derive(Clone)]
pub struct TokenStorage {
    persistent: Arc<dyn KeyValueStore>,
    session: Arc<dyn KeyValueStore>,
}

impl std::fmt::Debug for TokenStorage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenStorage").finish_non_exhaustive()
    }
}

impl TokenStorage {
    #[must_use]
    pub fn new(persistent: Arc<dyn KeyValueStore>, session: Arc<dyn KeyValueStore>) -> Self {
        Self {
            persistent,
            session,
        }
    }

    /// Both scopes in memory; nothing survives the process.
    #[must_use]
    pub fn in_memory() -> Self {
        Self::new(
            Arc::new(MemoryKeyValueStore::new()),
            Arc::new(MemoryKeyValueStore::new()),
        )
    }

    fn scope(&self, scope: StorageScope) -> &dyn KeyValueStore {
        match scope {
            StorageScope::Persistent => self.persistent.as_ref(),
            StorageScope::Session => self.session.as_ref(),
        }
    }

    /// Store a pair in `scope` and drop whatever the other scope held.
    ///
    /// # Errors
    /// Returns an error if either backend fails.
    pub fn set_tokens(
        &self,
        access_token: &str,
        refresh_token: &str,
        scope: StorageScope,
    ) -> Result<(), StorageError> {
        let other = match scope {
            StorageScope::Persistent => StorageScope::Session,
            StorageScope::Session => StorageScope::Persistent,
        };
        clear_scope(self.scope(other))?;

        let target = self.scope(scope);
        target.set(ACCESS_TOKEN_KEY, access_token)?;
        target.set(REFRESH_TOKEN_KEY, refresh_token)
    }

    /// Persistent if it holds an access token, session otherwise.
    ///
    /// # Errors
    /// Returns an error if the persistent backend cannot be read.
    pub fn active_scope(&self) -> Result<StorageScope, StorageError> {
        if self.persistent.get(ACCESS_TOKEN_KEY)?.is_some() {
            Ok(StorageScope::Persistent)
        } else {
            Ok(StorageScope::Session)
        }
    }

    /// Replace the pair in whichever scope is currently in use.
    ///
    /// # Errors
    /// Returns an error if either backend fails.
    pub fn replace_tokens(&self, access_token: &str, refresh_token: &str) -> Result<(), StorageError> {
        let scope = self.active_scope()?;
        self.set_tokens(access_token, refresh_token, scope)
    }

    /// # Errors
    /// Returns an error if a backend cannot be read.
    pub fn access_token(&self) -> Result<Option<String>, StorageError> {
        self.read(ACCESS_TOKEN_KEY)
    }

    /// # Errors
    /// Returns an error if a backend cannot be read.
    pub fn refresh_token(&self) -> Result<Option<String>, StorageError> {
        self.read(REFRESH_TOKEN_KEY)
    }

    fn read(&self, key: &str) -> Result<Option<String>, StorageError> {
        match self.persistent.get(key)? {
            Some(value) => Ok(Some(value)),
            None => self.session.get(key),
        }
    }

    /// Remove both tokens from both scopes.
    ///
    /// # Errors
    /// Returns the first backend failure; the other scope is still cleared.
    pub fn clear(&self) -> Result<(), StorageError> {
        let persistent = clear_scope(self.persistent.as_ref());
        let session = clear_scope(self.session.as_ref());
        persistent.and(session)
    }
}

fn clear_scope(store: &dyn KeyValueStore) -> Result<(), StorageError> {
    store.remove(ACCESS_TOKEN_KEY)?;
    store.remove(REFRESH_TOKEN_KEY)
}
