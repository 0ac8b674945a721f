use crate::config::{
    RawConfig, DEFAULT_ACCESS_EXPIRES_IN, DEFAULT_FRONTEND_URL, DEFAULT_REFRESH_EXPIRES_IN,
};
use clap::{Arg, ArgMatches, Command};
use secrecy::SecretString;

pub const ARG_JWT_SECRET: &str = "jwt-secret";
pub const ARG_JWT_REFRESH_SECRET: &str = "jwt-refresh-secret";
pub const ARG_JWT_EXPIRES_IN: &str = "jwt-expires-in";
pub const ARG_JWT_REFRESH_EXPIRES_IN: &str = "jwt-refresh-expires-in";
pub const ARG_FRONTEND_URL: &str = "frontend-url";

// Secrets are not `required(true)`: their absence is reported by
// `RawConfig::validate` as a typed error.
#[must_use]
pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_JWT_SECRET)
                .long(ARG_JWT_SECRET)
                .help("Secret used to sign access tokens")
                .env("AUTHGATE_JWT_SECRET")
                .hide_env_values(true)
                .global(true),
        )
        .arg(
            Arg::new(ARG_JWT_REFRESH_SECRET)
                .long(ARG_JWT_REFRESH_SECRET)
                .help("Secret used to sign refresh tokens, must differ from --jwt-secret")
                .env("AUTHGATE_JWT_REFRESH_SECRET")
                .hide_env_values(true)
                .global(true),
        )
        .arg(
            Arg::new(ARG_JWT_EXPIRES_IN)
                .long(ARG_JWT_EXPIRES_IN)
                .help("Access token lifetime, e.g. 900, 15m, 12h, 7d")
                .env("AUTHGATE_JWT_EXPIRES_IN")
                .default_value(DEFAULT_ACCESS_EXPIRES_IN)
                .global(true),
        )
        .arg(
            Arg::new(ARG_JWT_REFRESH_EXPIRES_IN)
                .long(ARG_JWT_REFRESH_EXPIRES_IN)
                .help("Refresh token lifetime, e.g. 30d, 2w")
                .env("AUTHGATE_JWT_REFRESH_EXPIRES_IN")
                .default_value(DEFAULT_REFRESH_EXPIRES_IN)
                .global(true),
        )
        .arg(
            Arg::new(ARG_FRONTEND_URL)
                .long(ARG_FRONTEND_URL)
                .help("Frontend URL allowed to call the API from a browser (CORS)")
                .env("AUTHGATE_FRONTEND_URL")
                .default_value(DEFAULT_FRONTEND_URL)
                .global(true),
        )
}

/// Collect the raw (unvalidated) configuration from parsed matches.
#[must_use]
pub fn raw_config(matches: &ArgMatches) -> RawConfig {
    let string = |id: &str| matches.get_one::<String>(id).cloned();
    let secret = |id: &str| string(id).map(SecretString::from);

    RawConfig {
        port: matches.get_one::<u16>("port").copied(),
        dsn: string("dsn"),
        jwt_secret: secret(ARG_JWT_SECRET),
        jwt_refresh_secret: secret(ARG_JWT_REFRESH_SECRET),
        jwt_expires_in: string(ARG_JWT_EXPIRES_IN),
        jwt_refresh_expires_in: string(ARG_JWT_REFRESH_EXPIRES_IN),
        frontend_url: string(ARG_FRONTEND_URL),
    }
}
