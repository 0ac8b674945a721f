//! Uniform JSON envelope shared by the server and the client.
//!
//! Every response body, success or failure, is
//! `{ "success": bool, "message"?: string, "data"?: T, "errors"?: [...] }`.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// One problem attached to a failed request.
#[derive(ToSchema, Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ErrorDetail {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    pub message: String,
}

impl ErrorDetail {
    #[must_use]
    pub fn field(field: &str, message: &str) -> Self {
        Self {
            field: Some(field.to_string()),
            message: message.to_string(),
        }
    }

    #[must_use]
    pub fn message(message: impl Into<String>) -> Self {
        Self {
            field: None,
            message: message.into(),
        }
    }
}

#[derive(ToSchema, Serialize, Deserialize, Debug, Clone)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub errors: Option<Vec<ErrorDetail>>,
}

impl<T> ApiResponse<T> {
    #[must_use]
    pub fn ok(message: impl Into<String>, data: T) -> Self {
        Self {
            success: true,
            message: Some(message.into()),
            data: Some(data),
            errors: None,
        }
    }

    #[must_use]
    pub fn fail(message: impl Into<String>, errors: Option<Vec<ErrorDetail>>) -> Self {
        Self {
            success: false,
            message: Some(message.into()),
            data: None,
            errors,
        }
    }
}

impl ApiResponse<()> {
    /// Success without a payload.
    #[must_use]
    pub fn done(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: Some(message.into()),
            data: None,
            errors: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use serde_json::json;

    #[test]
    fn absent_members_are_omitted() -> Result<()> {
        let body = serde_json::to_value(ApiResponse::done("Logged out"))?;
        assert_eq!(body, json!({ "success": true, "message": "Logged out" }));
        Ok(())
    }

    #[test]
    fn failure_carries_field_errors() -> Result<()> {
        let body = serde_json::to_value(ApiResponse::<()>::fail(
            "Validation failed",
            Some(vec![ErrorDetail::field("email", "Email is required")]),
        ))?;
        assert_eq!(
            body,
            json!({
                "success": false,
                "message": "Validation failed",
                "errors": [{ "field": "email", "message": "Email is required" }]
            })
        );
        Ok(())
    }

    #[test]
    fn decodes_minimal_body() -> Result<()> {
        let parsed: ApiResponse<serde_json::Value> =
            serde_json::from_value(json!({ "success": false }))?;
        assert!(!parsed.success);
        assert!(parsed.message.is_none());
        assert!(parsed.data.is_none());
        Ok(())
    }

    #[derive(Deserialize, Debug, PartialEq)]
    struct Token {
        token: String,
    }

    #[test]
    fn decodes_payload_without_default() -> Result<()> {
        let parsed: ApiResponse<Token> = serde_json::from_value(json!({
            "success": true,
            "data": { "token": "abc" }
        }))?;
        assert_eq!(
            parsed.data,
            Some(Token {
                token: "abc".to_string()
            })
        );

        let parsed: ApiResponse<Token> =
            serde_json::from_value(json!({ "success": false, "message": "nope" }))?;
        assert!(parsed.data.is_none());
        Ok(())
    }
}
