pub mod navigate;
pub mod profile;
pub mod session;

// Internal "interpreter" for `Action`.
mod run;

use crate::app_lib::ConfigOverrides;

#[derive(Debug)]
pub enum Action {
    Login(session::LoginArgs),
    Register(session::RegisterArgs),
    Logout(ConfigOverrides),
    Whoami(ConfigOverrides),
    UpdateProfile(profile::UpdateArgs),
    ChangePassword(profile::PasswordArgs),
    VerifyEmail(navigate::VerifyArgs),
    Visit(navigate::VisitArgs),
}

impl Action {
    /// Execute the action.
    /// # Errors
    /// Returns an error if the action fails.
    pub async fn execute(self) -> anyhow::Result<()> {
        run::execute(self).await
    }
}
