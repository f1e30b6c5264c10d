use crate::{
    app_lib::ConfigOverrides,
    cli::{
        actions::{Action, navigate, profile, session},
        commands::connection::{ARG_API_URL, ARG_CREDENTIAL_PATH, ARG_TIMEOUT},
    },
    features::auth::{ProfilePatch, Role},
};
use anyhow::{Context, Result, anyhow};
use clap::ArgMatches;
use secrecy::SecretString;

fn overrides(matches: &ArgMatches) -> ConfigOverrides {
    ConfigOverrides {
        api_base_url: matches.get_one::<String>(ARG_API_URL).cloned(),
        credential_path: matches.get_one::<String>(ARG_CREDENTIAL_PATH).cloned(),
        timeout_secs: matches.get_one::<u64>(ARG_TIMEOUT).copied(),
    }
}

fn required(matches: &ArgMatches, id: &str) -> Result<String> {
    matches
        .get_one::<String>(id)
        .cloned()
        .with_context(|| format!("missing required argument: --{id}"))
}

fn secret(matches: &ArgMatches, id: &str) -> Result<SecretString> {
    required(matches, id).map(SecretString::from)
}

/// # Errors
/// Returns an error if required arguments are missing or inconsistent.
pub fn handler(matches: &ArgMatches) -> Result<Action> {
    let overrides = overrides(matches);

    let action = match matches.subcommand() {
        Some(("login", sub)) => Action::Login(session::LoginArgs {
            overrides,
            email: required(sub, "email")?,
            password: secret(sub, "password")?,
        }),
        Some(("register", sub)) => {
            let role = sub
                .get_one::<String>("role")
                .map(|role| role.parse::<Role>())
                .transpose()
                .map_err(|err| anyhow!(err))?;
            Action::Register(session::RegisterArgs {
                overrides,
                name: required(sub, "name")?,
                email: required(sub, "email")?,
                password: secret(sub, "password")?,
                role,
            })
        }
        Some(("logout", _)) => Action::Logout(overrides),
        Some(("whoami", _)) => Action::Whoami(overrides),
        Some(("update-profile", sub)) => {
            let patch = ProfilePatch {
                name: sub.get_one::<String>("name").cloned(),
                email: sub.get_one::<String>("email").cloned(),
                bio: sub.get_one::<String>("bio").cloned(),
                phone: sub.get_one::<String>("phone").cloned(),
                current_password: sub.get_one::<String>("current-password").cloned(),
                new_password: sub.get_one::<String>("new-password").cloned(),
            };
            if patch.is_empty() {
                return Err(anyhow!("nothing to update"));
            }
            Action::UpdateProfile(profile::UpdateArgs { overrides, patch })
        }
        Some(("change-password", sub)) => Action::ChangePassword(profile::PasswordArgs {
            overrides,
            current: secret(sub, "current")?,
            new: secret(sub, "new")?,
        }),
        Some(("verify-email", sub)) => Action::VerifyEmail(navigate::VerifyArgs {
            overrides,
            token: secret(sub, "token")?,
        }),
        Some(("visit", sub)) => Action::Visit(navigate::VisitArgs {
            overrides,
            path: required(sub, "path")?,
        }),
        Some((other, _)) => return Err(anyhow!("unknown command: {other}")),
        None => return Err(anyhow!("missing command")),
    };

    Ok(action)
}
