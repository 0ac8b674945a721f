//! Signed, time-bounded access and refresh tokens.
//!
//! Both classes are HS256 JWTs with independent secrets and lifetimes. A token
//! is valid iff its signature verifies under the secret of its class, its
//! `token_use` claim names that class, and the current time is before `exp`.
//! Nothing is stored server-side; tokens die by expiry only.

use chrono::{DateTime, Utc};
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::{fmt, time::Duration};
use thiserror::Error;
use tracing::debug;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    Access,
    Refresh,
}

impl TokenKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Access => "access",
            Self::Refresh => "refresh",
        }
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a token was rejected.
///
/// `Expired` is only reported once the signature has been checked, so it
/// always refers to a token this service really issued.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TokenError {
    #[error("{0} token expired")]
    Expired(TokenKind),
    #[error("invalid {0} token")]
    Invalid(TokenKind),
}

impl TokenError {
    #[must_use]
    pub const fn is_expired(&self) -> bool {
        matches!(self, Self::Expired(_))
    }

    #[must_use]
    pub const fn kind(&self) -> TokenKind {
        match self {
            Self::Expired(kind) | Self::Invalid(kind) => *kind,
        }
    }
}

#[derive(Debug, Error)]
#[error("failed to sign {kind} token: {source}")]
pub struct SignError {
    kind: TokenKind,
    #[source]
    source: jsonwebtoken::errors::Error,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Claims {
    /// Account id.
    pub sub: String,
    pub iat: i64,
    pub exp: i64,
    /// Unique per token; the natural key for a future revocation list.
    pub jti: String,
    pub token_use: TokenKind,
}

struct KeyPair {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: Duration,
}

impl KeyPair {
    fn new(secret: &SecretString, ttl: Duration) -> Self {
        let bytes = secret.expose_secret().as_bytes();
        Self {
            encoding: EncodingKey::from_secret(bytes),
            decoding: DecodingKey::from_secret(bytes),
            ttl,
        }
    }
}

/// Issues and verifies both token classes.
pub struct TokenIssuer {
    access: KeyPair,
    refresh: KeyPair,
}

impl fmt::Debug for TokenIssuer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenIssuer")
            .field("access_ttl", &self.access.ttl)
            .field("refresh_ttl", &self.refresh.ttl)
            .finish_non_exhaustive()
    }
}

impl TokenIssuer {
    #[must_use]
    pub fn new(
        access_secret: &SecretString,
        access_ttl: Duration,
        refresh_secret: &SecretString,
        refresh_ttl: Duration,
    ) -> Self {
        Self {
            access: KeyPair::new(access_secret, access_ttl),
            refresh: KeyPair::new(refresh_secret, refresh_ttl),
        }
    }

    fn keys(&self, kind: TokenKind) -> &KeyPair {
        match kind {
            TokenKind::Access => &self.access,
            TokenKind::Refresh => &self.refresh,
        }
    }

    #[must_use]
    pub fn ttl(&self, kind: TokenKind) -> Duration {
        self.keys(kind).ttl
    }

    /// # Errors
    /// Returns an error if the claims cannot be signed.
    pub fn issue_access(&self, account_id: Uuid) -> Result<String, SignError> {
        self.issue_at(TokenKind::Access, account_id, Utc::now())
    }

    /// # Errors
    /// Returns an error if the claims cannot be signed.
    pub fn issue_refresh(&self, account_id: Uuid) -> Result<String, SignError> {
        self.issue_at(TokenKind::Refresh, account_id, Utc::now())
    }

    /// Sign a token of `kind` as if it were issued at `issued_at`.
    ///
    /// # Errors
    /// Returns an error if the claims cannot be signed.
    pub fn issue_at(
        &self,
        kind: TokenKind,
        account_id: Uuid,
        issued_at: DateTime<Utc>,
    ) -> Result<String, SignError> {
        let keys = self.keys(kind);
        let ttl = i64::try_from(keys.ttl.as_secs()).unwrap_or(i64::MAX);
        let iat = issued_at.timestamp();
        let claims = Claims {
            sub: account_id.to_string(),
            iat,
            exp: iat.saturating_add(ttl),
            jti: Uuid::new_v4().to_string(),
            token_use: kind,
        };

        encode(&Header::new(Algorithm::HS256), &claims, &keys.encoding)
            .map_err(|source| SignError { kind, source })
    }

    /// # Errors
    /// Returns [`TokenError`] when the token is expired or invalid.
    pub fn verify_access(&self, token: &str) -> Result<Uuid, TokenError> {
        self.verify_at(TokenKind::Access, token, Utc::now())
    }

    /// # Errors
    /// Returns [`TokenError`] when the token is expired or invalid.
    pub fn verify_refresh(&self, token: &str) -> Result<Uuid, TokenError> {
        self.verify_at(TokenKind::Refresh, token, Utc::now())
    }

    /// Verify a token of `kind` against the clock value `now`.
    ///
    /// # Errors
    /// Returns [`TokenError::Expired`] when the signature is good but
    /// `now >= exp`, and [`TokenError::Invalid`] for anything else.
    pub fn verify_at(
        &self,
        kind: TokenKind,
        token: &str,
        now: DateTime<Utc>,
    ) -> Result<Uuid, TokenError> {
        let claims = self.decode_claims(kind, token)?;

        if claims.token_use != kind {
            debug!(expected = %kind, found = %claims.token_use, "token class mismatch");
            return Err(TokenError::Invalid(kind));
        }

        if now.timestamp() >= claims.exp {
            return Err(TokenError::Expired(kind));
        }

        Uuid::parse_str(&claims.sub).map_err(|_| TokenError::Invalid(kind))
    }

    fn decode_claims(&self, kind: TokenKind, token: &str) -> Result<Claims, TokenError> {
        // Expiry is checked by the caller against an explicit clock.
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "sub"]);

        decode::<Claims>(token, &self.keys(kind).decoding, &validation)
            .map(|data| data.claims)
            .map_err(|err| {
                match err.kind() {
                    ErrorKind::InvalidSignature => debug!(%kind, "token signature mismatch"),
                    other => debug!(%kind, error = ?other, "malformed token"),
                }
                TokenError::Invalid(kind)
            })
    }
}

#[cfg(test)]
pub(crate) fn test_issuer() -> TokenIssuer {
    TokenIssuer::new(
        &SecretString::from("access-secret-for-tests".to_string()),
        Duration::from_secs(15 * 60),
        &SecretString::from("refresh-secret-for-tests".to_string()),
        Duration::from_secs(30 * 24 * 60 * 60),
    )
}
