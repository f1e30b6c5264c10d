use crate::cli::actions::{Action, navigate, profile, session};
use anyhow::Result;

/// Execute the provided action.
// Single dispatch point for all CLI actions.
/// # Errors
/// Returns an error if the action fails.
pub async fn execute(action: Action) -> Result<()> {
    match action {
        Action::Login(args) => session::login(args).await,
        Action::Register(args) => session::register(args).await,
        Action::Logout(overrides) => session::logout(overrides).await,
        Action::Whoami(overrides) => session::whoami(overrides).await,
        Action::UpdateProfile(args) => profile::update(args).await,
        Action::ChangePassword(args) => profile::change_password(args).await,
        Action::VerifyEmail(args) => navigate::verify_email(args).await,
        Action::Visit(args) => navigate::visit(args).await,
    }
}
