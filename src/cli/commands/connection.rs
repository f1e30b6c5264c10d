use crate::app_lib::config::{ENV_API_URL, ENV_CREDENTIAL_PATH, ENV_TIMEOUT_SECS};
use clap::{Arg, Command};

pub const ARG_API_URL: &str = "api-url";
pub const ARG_CREDENTIAL_PATH: &str = "credential-path";
pub const ARG_TIMEOUT: &str = "timeout";

pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_API_URL)
                .long("api-url")
                .help("Portal API base URL, example: https://portal.tld")
                .env(ENV_API_URL)
                .global(true),
        )
        .arg(
            Arg::new(ARG_CREDENTIAL_PATH)
                .long("credential-path")
                .help("File holding the signed-in session token")
                .env(ENV_CREDENTIAL_PATH)
                .global(true),
        )
        .arg(
            Arg::new(ARG_TIMEOUT)
                .long("timeout")
                .help("Request timeout in seconds")
                .env(ENV_TIMEOUT_SECS)
                .global(true)
                .value_parser(clap::value_parser!(u64).range(1..)),
        )
}
