use crate::cli::{
    actions::Action,
    commands::{auth, CMD_SEED},
};
use anyhow::{Context, Result};
use clap::ArgMatches;

/// Turn parsed arguments into an [`Action`] with a validated configuration.
///
/// # Errors
/// Returns a [`crate::config::ConfigError`] (wrapped) when a required secret
/// or the database URL is missing or a value is malformed.
pub fn handler(matches: &ArgMatches) -> Result<Action> {
    match matches.subcommand() {
        Some((CMD_SEED, sub_m)) => {
            let config = auth::raw_config(sub_m)
                .validate()
                .context("invalid configuration")?;
            Ok(Action::Seed(config))
        }
        _ => {
            let config = auth::raw_config(matches)
                .validate()
                .context("invalid configuration")?;
            Ok(Action::Server(config))
        }
    }
}
