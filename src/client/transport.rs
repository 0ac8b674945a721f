//! Wire layer for the client: one request in, status plus decoded JSON out.

use crate::APP_USER_AGENT;
use async_trait::async_trait;
use reqwest::{Client, Method, StatusCode};
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, instrument};
use url::Url;

pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub method: Method,
    pub path: String,
    pub body: Option<Value>,
    pub bearer: Option<String>,
}

impl ApiRequest {
    #[must_use]
    pub fn get(path: &str) -> Self {
        Self {
            method: Method::GET,
            path: path.to_string(),
            body: None,
            bearer: None,
        }
    }

    #[must_use]
    pub fn post(path: &str, body: Option<Value>) -> Self {
        Self {
            method: Method::POST,
            path: path.to_string(),
            body,
            bearer: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ApiReply {
    pub status: StatusCode,
    /// `None` when the body was empty or not JSON.
    pub body: Option<Value>,
}

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("invalid request URL: {0}")]
    Url(#[from] url::ParseError),
    #[error(transparent)]
    Http(#[from] reqwest::Error),
}

#[async_trait]
pub trait Transport: Send + Sync {
    /// Send one request. Non-2xx statuses are replies, not errors.
    async fn send(&self, request: &ApiRequest) -> Result<ApiReply, TransportError>;
}

#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: Client,
    base_url: Url,
}

impl ReqwestTransport {
    /// # Errors
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(mut base_url: Url) -> Result<Self, TransportError> {
        // `join` replaces the last segment unless the base ends with a slash.
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }
        let client = Client::builder()
            .user_agent(APP_USER_AGENT)
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self { client, base_url })
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    #[instrument(skip(self, request), fields(method = %request.method, path = %request.path))]
    async fn send(&self, request: &ApiRequest) -> Result<ApiReply, TransportError> {
        let url = self.base_url.join(request.path.trim_start_matches('/'))?;

        let mut builder = self.client.request(request.method.clone(), url);
        if let Some(token) = &request.bearer {
            builder = builder.bearer_auth(token);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder.send().await?;
        let status = response.status();
        let bytes = response.bytes().await?;
        debug!(status = status.as_u16(), "response received");

        Ok(ApiReply {
            status,
            body: serde_json::from_slice(&bytes).ok(),
        })
    }
}
