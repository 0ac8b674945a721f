use crate::{envelope::ApiResponse, service::AuthService, GIT_COMMIT_HASH};
use axum::{
    body::Body,
    extract::Extension,
    http::{HeaderMap, HeaderValue, Method, StatusCode},
    response::{IntoResponse, Json},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, error};
use utoipa::ToSchema;

#[derive(ToSchema, Serialize, Deserialize, Debug, Clone)]
pub struct Health {
    name: String,
    version: String,
    build: String,
    database: String,
    timestamp: DateTime<Utc>,
}

#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Credential store is reachable", body = ApiResponse<Health>),
        (status = 503, description = "Credential store is unreachable", body = ApiResponse<Health>),
    ),
    tag = "health"
)]
// axum handler for health
pub async fn health(method: Method, service: Extension<Arc<AuthService>>) -> impl IntoResponse {
    let result = service.store().ping().await;
    if let Err(err) = &result {
        error!("Failed to ping credential store: {}", err);
    } else {
        debug!("Credential store is healthy");
    }

    let health = Health {
        name: env!("CARGO_PKG_NAME").to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        build: GIT_COMMIT_HASH.to_string(),
        database: if result.is_ok() { "ok" } else { "error" }.to_string(),
        timestamp: Utc::now(),
    };

    let short_hash = if health.build.len() > 7 {
        &health.build[0..7]
    } else {
        ""
    };

    let headers = format!("{}:{}:{}", health.name, health.version, short_hash)
        .parse::<HeaderValue>()
        .map(|x_app_header_value| {
            let mut headers = HeaderMap::new();
            headers.insert("X-App", x_app_header_value);
            headers
        })
        .unwrap_or_else(|err| {
            error!("Failed to parse X-App header: {}", err);
            HeaderMap::new()
        });

    let status = if result.is_ok() {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let body = if method == Method::GET {
        let envelope = if result.is_ok() {
            ApiResponse::ok("Service is healthy", health)
        } else {
            ApiResponse {
                success: false,
                message: Some("Credential store is unreachable".to_string()),
                data: Some(health),
                errors: None,
            }
        };
        Json(envelope).into_response()
    } else {
        Body::empty().into_response()
    };

    (status, headers, body)
}
