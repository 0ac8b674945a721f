//! Login, refresh, current-user and logout endpoints.
//!
//! Flow Overview:
//! 1) Validate the payload shape (field errors → 400).
//! 2) Hand normalized input to the [`AuthService`].
//! 3) Wrap the result in the shared envelope; every failure goes through
//!    [`AppError`] so status mapping and logging happen in one place.

use super::{check_credentials, extract_bearer_token};
use crate::{
    envelope::{ApiResponse, ErrorDetail},
    error::AppError,
    service::{normalize_email, AuthService, AuthSession},
    store::Account,
};
use axum::{extract::Extension, http::HeaderMap, response::IntoResponse, Json};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, instrument};
use utoipa::ToSchema;

#[derive(ToSchema, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

#[derive(ToSchema, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct RefreshRequest {
    #[serde(default)]
    pub refresh_token: String,
}

#[derive(ToSchema, Serialize, Deserialize, Debug, Clone)]
pub struct UserData {
    pub user: Account,
}

#[derive(ToSchema, Serialize, Deserialize, Debug, Clone, Default)]
pub struct Empty {}

fn missing_payload() -> AppError {
    AppError::Validation {
        message: "Missing payload".to_string(),
        errors: Vec::new(),
    }
}

#[utoipa::path(
    post,
    path = "/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Credentials accepted, token pair issued", body = ApiResponse<AuthSession>),
        (status = 400, description = "Missing or malformed email/password"),
        (status = 401, description = "Invalid email or password"),
    ),
    tag = "auth"
)]
#[instrument(skip_all)]
pub async fn login(
    service: Extension<Arc<AuthService>>,
    payload: Option<Json<LoginRequest>>,
) -> Result<impl IntoResponse, AppError> {
    let Some(Json(request)) = payload else {
        return Err(missing_payload());
    };

    let email = normalize_email(&request.email);
    let errors = check_credentials(&email, &request.password);
    if !errors.is_empty() {
        return Err(AppError::validation(errors));
    }

    let session = service.login(&email, &request.password).await?;

    Ok(Json(ApiResponse::ok("Login successful", session)))
}

#[utoipa::path(
    post,
    path = "/auth/refresh",
    request_body = RefreshRequest,
    responses(
        (status = 200, description = "New token pair issued", body = ApiResponse<AuthSession>),
        (status = 400, description = "Missing refresh token"),
        (status = 401, description = "Invalid or expired refresh token"),
    ),
    tag = "auth"
)]
#[instrument(skip_all)]
pub async fn refresh(
    service: Extension<Arc<AuthService>>,
    payload: Option<Json<RefreshRequest>>,
) -> Result<impl IntoResponse, AppError> {
    let Some(Json(request)) = payload else {
        return Err(missing_payload());
    };

    let refresh_token = request.refresh_token.trim();
    if refresh_token.is_empty() {
        return Err(AppError::validation(vec![ErrorDetail::field(
            "refreshToken",
            "Refresh token is required",
        )]));
    }

    let session = service.refresh(refresh_token).await?;

    Ok(Json(ApiResponse::ok("Token refreshed", session)))
}

#[utoipa::path(
    get,
    path = "/auth/me",
    responses(
        (status = 200, description = "Profile of the token holder", body = ApiResponse<UserData>),
        (status = 401, description = "Missing, invalid or expired access token, or account deleted"),
    ),
    security(("bearer" = [])),
    tag = "auth"
)]
pub async fn me(
    headers: HeaderMap,
    service: Extension<Arc<AuthService>>,
) -> Result<impl IntoResponse, AppError> {
    let Some(token) = extract_bearer_token(&headers) else {
        debug!("missing bearer token");
        return Err(AppError::unauthenticated("Authentication required"));
    };

    let user = service.current_user(&token).await?;

    Ok(Json(ApiResponse::ok("Current user", UserData { user })))
}

#[utoipa::path(
    post,
    path = "/auth/logout",
    responses(
        (status = 200, description = "Always succeeds; clients drop their stored tokens", body = ApiResponse<Empty>),
    ),
    tag = "auth"
)]
// Tokens are stateless, so there is nothing to revoke here.
pub async fn logout() -> impl IntoResponse {
    Json(ApiResponse::ok("Logged out", Empty {}))
}
