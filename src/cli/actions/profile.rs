use crate::{
    app_lib::ConfigOverrides,
    cli::actions::session::{boot, print_identity},
    features::auth::ProfilePatch,
};
use anyhow::Result;
use secrecy::{ExposeSecret, SecretString};

#[derive(Debug)]
pub struct UpdateArgs {
    pub overrides: ConfigOverrides,
    pub patch: ProfilePatch,
}

#[derive(Debug)]
pub struct PasswordArgs {
    pub overrides: ConfigOverrides,
    pub current: SecretString,
    pub new: SecretString,
}

/// # Errors
/// Returns the update failure message, or an error when not signed in.
pub async fn update(args: UpdateArgs) -> Result<()> {
    let auth = boot(args.overrides).await?;
    let identity = auth.update_profile(&args.patch).await?;
    println!("Profile updated");
    print_identity(&identity);
    Ok(())
}

/// # Errors
/// Returns the password change failure message, or an error when not signed in.
pub async fn change_password(args: PasswordArgs) -> Result<()> {
    let auth = boot(args.overrides).await?;
    auth.change_password(args.current.expose_secret(), args.new.expose_secret())
        .await?;
    println!("Password changed");
    Ok(())
}
