use crate::cli::{actions::Action, commands, dispatch, telemetry};
use anyhow::Result;

/// Parse arguments, set up logging and return the [`Action`] to run.
///
/// # Errors
/// Returns an error if telemetry initialization fails or the configuration
/// is invalid.
pub fn start() -> Result<Action> {
    let matches = commands::new().get_matches();

    telemetry::init(commands::logging::requested_level(&matches))?;

    dispatch::handler(&matches)
}
