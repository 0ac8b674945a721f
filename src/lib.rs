//! # Authgate
//!
//! Email/password login backed by two classes of JWT:
//!
//! - **Access tokens** authorize API calls (`GET /auth/me`) and expire after
//!   `--jwt-expires-in` (7 days by default).
//! - **Refresh tokens** are exchanged at `POST /auth/refresh` for a brand new
//!   pair and expire after `--jwt-refresh-expires-in` (30 days by default).
//!
//! Both classes are signed with distinct secrets, so one can never stand in
//! for the other. Every HTTP response uses the same envelope:
//! `{ success, message?, data?, errors? }`.
//!
//! The [`client`] module is the consumer side: it stores tokens in a
//! persistent or session scope and transparently refreshes an expired access
//! token once before retrying the original request.

pub mod api;
pub mod cli;
pub mod client;
pub mod config;
pub mod envelope;
pub mod error;
pub mod password;
pub mod service;
pub mod store;
pub mod token;

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};

pub const APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_git_commit_hash_format() {
        if GIT_COMMIT_HASH == "unknown" {
            // Acceptable in non-git build environments
            return;
        }
        assert!(
            GIT_COMMIT_HASH.chars().all(|c| c.is_ascii_hexdigit()),
            "GIT_COMMIT_HASH should be a hex string, got: {GIT_COMMIT_HASH}"
        );
    }

    #[test]
    fn test_app_user_agent_format() {
        assert!(APP_USER_AGENT.starts_with(env!("CARGO_PKG_NAME")));
        assert!(APP_USER_AGENT.contains(env!("CARGO_PKG_VERSION")));
    }
}
