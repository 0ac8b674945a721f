//! Client side of the login flow.
//!
//! [`AuthClient`] owns token storage and the session state, attaches the
//! access token to authenticated calls and recovers from an expired access
//! token with a single refresh-and-retry.

mod session;
pub mod state;
pub mod storage;
pub mod transport;

pub use session::AuthClient;
pub use state::{AuthPhase, AuthSnapshot, SessionState};
pub use storage::{StorageError, StorageScope, TokenStorage};
pub use transport::{ApiReply, ApiRequest, ReqwestTransport, Transport, TransportError};

use crate::envelope::ErrorDetail;
use reqwest::StatusCode;
use thiserror::Error;

pub const GENERIC_FAILURE: &str = "Request failed, please try again later";

#[derive(Debug, Error)]
pub enum ClientError {
    /// The server answered with a failure envelope.
    #[error("{message}")]
    Api {
        status: StatusCode,
        message: String,
        errors: Vec<ErrorDetail>,
    },
    /// The refresh exchange failed; stored tokens were cleared.
    #[error("session expired, please sign in again")]
    SessionExpired,
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error("unexpected response from server")]
    Decode,
}

impl ClientError {
    /// Text suitable for showing to a user.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Api { message, .. } if !message.is_empty() => message.clone(),
            Self::Api { .. } | Self::Decode => GENERIC_FAILURE.to_string(),
            other => other.to_string(),
        }
    }

    #[must_use]
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Self::Api { status, .. } => Some(*status),
            _ => None,
        }
    }
}
