use crate::cli::{actions::Action, commands, dispatch, telemetry};
use anyhow::Result;

/// Parses arguments, sets up logging and returns the action to run.
///
/// # Errors
///
/// Returns an error if logging initialization or action dispatch fails
pub fn start() -> Result<Action> {
    let matches = commands::new().get_matches();
    telemetry::init(commands::logging::level(&matches))?;
    dispatch::handler(&matches)
}
