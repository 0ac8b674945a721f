pub mod auth;
pub mod health;

// common functions for the handlers
use crate::{envelope::ErrorDetail, error::AppError};
use axum::http::{header::AUTHORIZATION, HeaderMap, Method, Uri};
use regex::Regex;

pub const PASSWORD_MIN_LEN: usize = 6;
pub const PASSWORD_MAX_LEN: usize = 100;

/// Basic email format check on already-normalized input.
#[must_use]
pub fn valid_email(email_normalized: &str) -> bool {
    Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").is_ok_and(|regex| regex.is_match(email_normalized))
}

/// Field errors for a login attempt; an empty vec means the input is usable.
#[must_use]
pub fn check_credentials(email_normalized: &str, password: &str) -> Vec<ErrorDetail> {
    let mut errors = Vec::new();

    if email_normalized.is_empty() {
        errors.push(ErrorDetail::field("email", "Email is required"));
    } else if !valid_email(email_normalized) {
        errors.push(ErrorDetail::field("email", "Email is not valid"));
    }

    let length = password.chars().count();
    if length == 0 {
        errors.push(ErrorDetail::field("password", "Password is required"));
    } else if !(PASSWORD_MIN_LEN..=PASSWORD_MAX_LEN).contains(&length) {
        errors.push(ErrorDetail::field(
            "password",
            "Password must be between 6 and 100 characters",
        ));
    }

    errors
}

/// Pull the token out of `Authorization: Bearer <token>`.
#[must_use]
pub fn extract_bearer_token(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let trimmed = value.trim();
    let token = trimmed
        .strip_prefix("Bearer ")
        .or_else(|| trimmed.strip_prefix("bearer "))?
        .trim();
    if token.is_empty() {
        None
    } else {
        Some(token.to_string())
    }
}

/// Envelope-shaped 404 for every unmatched route.
pub async fn not_found(method: Method, uri: Uri) -> AppError {
    AppError::NotFound(format!("route {method} {} not found", uri.path()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn valid_email_accepts_basic_format() {
        assert!(valid_email("a@example.com"));
        assert!(valid_email("name.surname@example.co"));
    }

    #[test]
    fn valid_email_rejects_missing_parts() {
        assert!(!valid_email("not-an-email"));
        assert!(!valid_email("missing-at.example.com"));
        assert!(!valid_email("missing-domain@"));
    }

    #[test]
    fn credentials_need_both_fields() {
        let errors = check_credentials("", "");
        let fields: Vec<_> = errors.iter().filter_map(|e| e.field.as_deref()).collect();
        assert_eq!(fields, vec!["email", "password"]);
    }

    #[test]
    fn password_length_bounds() {
        assert_eq!(check_credentials("a@example.com", "12345").len(), 1);
        assert!(check_credentials("a@example.com", "123456").is_empty());
        assert!(check_credentials("a@example.com", &"x".repeat(100)).is_empty());
        assert_eq!(check_credentials("a@example.com", &"x".repeat(101)).len(), 1);
    }

    #[test]
    fn bearer_token_extraction() {
        let mut headers = HeaderMap::new();
        assert_eq!(extract_bearer_token(&headers), None);

        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer abc.def"));
        assert_eq!(extract_bearer_token(&headers).as_deref(), Some("abc.def"));

        headers.insert(AUTHORIZATION, HeaderValue::from_static("Basic abc"));
        assert_eq!(extract_bearer_token(&headers), None);

        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer   "));
        assert_eq!(extract_bearer_token(&headers), None);
    }
}
