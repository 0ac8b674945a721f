//! HTTP error taxonomy.
//!
//! Each failure category maps to one status code and is rendered through the
//! shared envelope. Internal details are logged; they only reach the response
//! body in debug builds.

use crate::{
    envelope::{ApiResponse, ErrorDetail},
    password::PasswordError,
    service::AuthError,
};
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;
use tracing::{debug, error};

pub const INVALID_CREDENTIALS: &str = "Invalid email or password";

#[derive(Debug, Error)]
pub enum AppError {
    #[error("{message}")]
    Validation {
        message: String,
        errors: Vec<ErrorDetail>,
    },
    #[error("{0}")]
    Authentication(String),
    #[error("{0}")]
    Conflict(String),
    #[error("{0}")]
    NotFound(String),
    #[error("internal error: {0}")]
    Internal(String),
}

impl AppError {
    #[must_use]
    pub fn validation(errors: Vec<ErrorDetail>) -> Self {
        Self::Validation {
            message: "Validation failed".to_string(),
            errors,
        }
    }

    #[must_use]
    pub fn unauthenticated(message: impl Into<String>) -> Self {
        Self::Authentication(message.into())
    }

    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::Validation { .. } => StatusCode::BAD_REQUEST,
            Self::Authentication(_) => StatusCode::UNAUTHORIZED,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<AuthError> for AppError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::InvalidCredentials => Self::unauthenticated(INVALID_CREDENTIALS),
            AuthError::Token(token) => {
                Self::unauthenticated(format!("Invalid or expired {} token", token.kind()))
            }
            AuthError::AccountGone => Self::unauthenticated("Account no longer exists"),
            AuthError::Conflict { field } => Self::Conflict(format!("{field} already exists")),
            AuthError::Password(PasswordError::Empty) => {
                Self::validation(vec![ErrorDetail::field("password", "Password is required")])
            }
            other @ (AuthError::Password(_) | AuthError::Sign(_) | AuthError::Store(_)) => {
                Self::Internal(other.to_string())
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match self {
            Self::Validation { message, errors } => {
                debug!(?errors, "request rejected: {message}");
                ApiResponse::<()>::fail(message, Some(errors))
            }
            Self::Authentication(message) | Self::Conflict(message) | Self::NotFound(message) => {
                debug!(status = status.as_u16(), "request rejected: {message}");
                ApiResponse::fail(message, None)
            }
            Self::Internal(detail) => {
                error!("Internal server error: {detail}");
                let errors = cfg!(debug_assertions).then(|| vec![ErrorDetail::message(detail)]);
                ApiResponse::fail("Internal server error", errors)
            }
        };

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        store::StoreError,
        token::{TokenError, TokenKind},
    };
    use anyhow::Result;
    use axum::body::to_bytes;
    use serde_json::Value;

    async fn render(err: AppError) -> Result<(StatusCode, Value)> {
        let response = err.into_response();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await?;
        Ok((status, serde_json::from_slice(&bytes)?))
    }

    #[tokio::test]
    async fn categories_map_to_status_codes() -> Result<()> {
        let cases = [
            (AppError::validation(Vec::new()), StatusCode::BAD_REQUEST),
            (AppError::unauthenticated("no"), StatusCode::UNAUTHORIZED),
            (AppError::Conflict("taken".into()), StatusCode::CONFLICT),
            (AppError::NotFound("missing".into()), StatusCode::NOT_FOUND),
            (AppError::Internal("boom".into()), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (err, expected) in cases {
            let (status, body) = render(err).await?;
            assert_eq!(status, expected);
            assert_eq!(body["success"], Value::Bool(false));
            assert!(body["message"].is_string());
        }
        Ok(())
    }

    #[tokio::test]
    async fn internal_detail_is_not_the_message() -> Result<()> {
        let (_, body) = render(AppError::Internal("connection refused".into())).await?;
        assert_eq!(body["message"], "Internal server error");
        if cfg!(debug_assertions) {
            assert_eq!(body["errors"][0]["message"], "connection refused");
        } else {
            assert!(body.get("errors").is_none());
        }
        Ok(())
    }

    #[test]
    fn auth_errors_collapse_to_unauthenticated() {
        assert!(matches!(
            AppError::from(AuthError::InvalidCredentials),
            AppError::Authentication(message) if message == INVALID_CREDENTIALS
        ));
        assert!(matches!(
            AppError::from(AuthError::Token(TokenError::Expired(TokenKind::Refresh))),
            AppError::Authentication(message) if message == "Invalid or expired refresh token"
        ));
        assert!(matches!(
            AppError::from(AuthError::AccountGone),
            AppError::Authentication(_)
        ));
        assert!(matches!(
            AppError::from(AuthError::from(StoreError::Conflict { field: "email" })),
            AppError::Conflict(_)
        ));
    }
}
