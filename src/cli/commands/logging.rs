use clap::{Arg, ArgAction, ArgMatches, Command, builder::ValueParser};
use tracing::Level;

pub const ARG_VERBOSITY: &str = "verbosity";

/// Index is the verbosity count; anything past the end means `TRACE`.
const LEVELS: [(&str, Level); 5] = [
    ("error", Level::ERROR),
    ("warn", Level::WARN),
    ("info", Level::INFO),
    ("debug", Level::DEBUG),
    ("trace", Level::TRACE),
];

/// Accepts a level name or a count, so `SCHOLARSHIP_LOG_LEVEL=debug` and `-vvv` agree.
fn parse_level(raw: &str) -> Result<u8, String> {
    let raw = raw.trim();
    if let Ok(count) = raw.parse::<u8>() {
        return Ok(count);
    }
    LEVELS
        .iter()
        .position(|(name, _)| name.eq_ignore_ascii_case(raw))
        .and_then(|index| u8::try_from(index).ok())
        .ok_or_else(|| format!("invalid log level: {raw}"))
}

/// Log level requested on the command line; `None` keeps the default.
#[must_use]
pub fn level(matches: &ArgMatches) -> Option<Level> {
    match matches.get_one::<u8>(ARG_VERBOSITY).copied().unwrap_or(0) {
        0 => None,
        count => Some(
            LEVELS
                .get(usize::from(count))
                .map_or(Level::TRACE, |(_, level)| *level),
        ),
    }
}

#[must_use]
pub fn with_args(command: Command) -> Command {
    command.arg(
        Arg::new(ARG_VERBOSITY)
            .short('v')
            .long("verbose")
            .help("Verbosity level: ERROR, WARN, INFO, DEBUG, TRACE (default: ERROR)")
            .env("SCHOLARSHIP_LOG_LEVEL")
            .global(true)
            .action(ArgAction::Count)
            .value_parser(ValueParser::from(parse_level)),
    )
}
