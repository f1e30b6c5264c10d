pub mod connection;
pub mod logging;

use clap::{
    Arg, ArgGroup, ColorChoice, Command,
    builder::styling::{AnsiColor, Effects, Styles},
};

pub const ENV_PASSWORD: &str = "SCHOLARSHIP_PASSWORD";

fn email_arg() -> Arg {
    Arg::new("email")
        .short('e')
        .long("email")
        .help("Account email address")
}

fn login() -> Command {
    Command::new("login")
        .about("Sign in and keep the session for later commands")
        .arg(email_arg().required(true))
        .arg(
            Arg::new("password")
                .short('p')
                .long("password")
                .help("Account password")
                .env(ENV_PASSWORD)
                .hide_env_values(true)
                .required(true),
        )
}

fn register() -> Command {
    Command::new("register")
        .about("Create an account (does not sign in)")
        .arg(
            Arg::new("name")
                .short('n')
                .long("name")
                .help("Full name")
                .required(true),
        )
        .arg(email_arg().required(true))
        .arg(
            Arg::new("password")
                .short('p')
                .long("password")
                .help("Account password")
                .env(ENV_PASSWORD)
                .hide_env_values(true)
                .required(true),
        )
        .arg(
            Arg::new("role")
                .long("role")
                .help("Account role (default: student)")
                .value_parser(["student", "admin"]),
        )
}

fn update_profile() -> Command {
    Command::new("update-profile")
        .about("Update the signed-in user's profile")
        .arg(Arg::new("name").short('n').long("name").help("New full name"))
        .arg(email_arg().help("New email address"))
        .arg(Arg::new("bio").long("bio").help("New bio"))
        .arg(Arg::new("phone").long("phone").help("New phone number"))
        .arg(
            Arg::new("current-password")
                .long("current-password")
                .help("Current password, required by the portal to set a new one")
                .requires("new-password"),
        )
        .arg(
            Arg::new("new-password")
                .long("new-password")
                .help("New password")
                .requires("current-password"),
        )
        .group(
            ArgGroup::new("changes")
                .args(["name", "email", "bio", "phone", "new-password"])
                .multiple(true)
                .required(true),
        )
}

fn change_password() -> Command {
    Command::new("change-password")
        .about("Change the signed-in user's password")
        .arg(
            Arg::new("current")
                .long("current")
                .help("Current password")
                .required(true),
        )
        .arg(
            Arg::new("new")
                .long("new")
                .help("New password")
                .required(true),
        )
}

#[must_use]
pub fn new() -> Command {
    let styles = Styles::styled()
        .header(AnsiColor::Yellow.on_default() | Effects::BOLD)
        .usage(AnsiColor::Green.on_default() | Effects::BOLD)
        .literal(AnsiColor::Blue.on_default() | Effects::BOLD)
        .placeholder(AnsiColor::Green.on_default());

    let long_version: &'static str = Box::leak(
        format!("{} - {}", env!("CARGO_PKG_VERSION"), crate::GIT_COMMIT_HASH).into_boxed_str(),
    );

    let command = Command::new("scholarship-client")
        .about(env!("CARGO_PKG_DESCRIPTION"))
        .version(env!("CARGO_PKG_VERSION"))
        .long_version(long_version)
        .color(ColorChoice::Auto)
        .styles(styles)
        .subcommand_required(true)
        .arg_required_else_help(true)
        .subcommand(login())
        .subcommand(register())
        .subcommand(Command::new("logout").about("Sign out and forget the stored session"))
        .subcommand(Command::new("whoami").about("Show the signed-in identity"))
        .subcommand(update_profile())
        .subcommand(change_password())
        .subcommand(
            Command::new("verify-email")
                .about("Confirm an email address with a verification token")
                .arg(Arg::new("token").help("Verification token").required(true)),
        )
        .subcommand(
            Command::new("visit")
                .about("Resolve a portal path against the current session")
                .arg(
                    Arg::new("path")
                        .help("Portal path, example: /admin")
                        .required(true),
                ),
        );

    let command = connection::with_args(command);
    logging::with_args(command)
}
