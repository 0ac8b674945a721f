//! Salted one-way password hashing.
//!
//! Hashes are Argon2id PHC strings, so the per-call random salt and the cost
//! parameters travel inside the stored value. Verification never reports an
//! error: a malformed stored hash and a wrong password are both a rejection.

use argon2::{
    password_hash::{
        rand_core::OsRng, PasswordHash as PhcHash, PasswordHasher as _, PasswordVerifier as _,
        SaltString,
    },
    Algorithm, Argon2, Params, Version,
};
use std::fmt;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PasswordError {
    #[error("password must not be empty")]
    Empty,
    #[error("invalid argon2 parameters: {0}")]
    Params(argon2::Error),
    #[error("failed to hash password: {0}")]
    Hash(argon2::password_hash::Error),
}

/// A salted password digest in PHC string format.
///
/// The only way to obtain one is [`Hasher::hash`] (or loading a value that was
/// stored earlier), which keeps plaintext out of every persistence path.
#[derive(Clone, PartialEq, Eq)]
pub struct PasswordHash(String);

impl PasswordHash {
    /// Wrap a value read back from the credential store.
    #[must_use]
    pub fn from_stored(phc: String) -> Self {
        Self(phc)
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for PasswordHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("PasswordHash([REDACTED])")
    }
}

#[derive(Clone)]
pub struct Hasher {
    argon2: Argon2<'static>,
}

impl Default for Hasher {
    fn default() -> Self {
        Self {
            argon2: Argon2::default(),
        }
    }
}

impl fmt::Debug for Hasher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Hasher")
            .field("params", self.argon2.params())
            .finish()
    }
}

impl Hasher {
    /// Build a hasher with explicit Argon2id cost parameters.
    ///
    /// # Errors
    /// Returns an error if argon2 rejects the parameters.
    pub fn with_params(memory_kib: u32, iterations: u32, parallelism: u32) -> Result<Self, PasswordError> {
        let params = Params::new(memory_kib, iterations, parallelism, None)
            .map_err(PasswordError::Params)?;
        Ok(Self {
            argon2: Argon2::new(Algorithm::Argon2id, Version::V0x13, params),
        })
    }

    /// Hash a plaintext password with a fresh random salt.
    ///
    /// # Errors
    /// Returns an error for empty input or when hashing fails; callers must
    /// abort the write instead of persisting anything.
    pub fn hash(&self, plaintext: &str) -> Result<PasswordHash, PasswordError> {
        if plaintext.is_empty() {
            return Err(PasswordError::Empty);
        }

        let salt = SaltString::generate(&mut OsRng);
        self.argon2
            .hash_password(plaintext.as_bytes(), &salt)
            .map(|hash| PasswordHash(hash.to_string()))
            .map_err(PasswordError::Hash)
    }

    /// Check a plaintext password against a stored hash.
    ///
    /// Cost parameters are taken from the stored PHC string, so hashes created
    /// with other settings keep verifying.
    #[must_use]
    pub fn verify(&self, plaintext: &str, hash: &PasswordHash) -> bool {
        match PhcHash::new(hash.as_str()) {
            Ok(parsed) => self
                .argon2
                .verify_password(plaintext.as_bytes(), &parsed)
                .is_ok(),
            Err(_) => false,
        }
    }
}

#[cfg(test)]
pub(crate) fn test_hasher() -> Hasher {
    // Minimal cost keeps unit tests fast; production uses `Hasher::default()`.
    match Hasher::with_params(Params::MIN_M_COST, 1, 1) {
        Ok(hasher) => hasher,
        Err(err) => panic!("minimal argon2 params rejected: {err}"),
    }
}
