use crate::{
    app_lib::{ClientConfig, ConfigOverrides},
    features::auth::{AuthController, Identity, Role},
};
use anyhow::{Result, bail};
use secrecy::{ExposeSecret, SecretString};
use tracing::debug;

#[derive(Debug)]
pub struct LoginArgs {
    pub overrides: ConfigOverrides,
    pub email: String,
    pub password: SecretString,
}

#[derive(Debug)]
pub struct RegisterArgs {
    pub overrides: ConfigOverrides,
    pub name: String,
    pub email: String,
    pub password: SecretString,
    pub role: Option<Role>,
}

/// Builds the controller and runs boot verification, like a fresh page load.
/// # Errors
/// Returns an error if the configuration is invalid.
pub async fn boot(overrides: ConfigOverrides) -> Result<AuthController> {
    let mut config = ClientConfig::load();
    config.apply(overrides);
    debug!(
        api_base_url = %config.api_base_url,
        credential_path = %config.credential_path.display(),
        timeout_secs = config.timeout.as_secs(),
        "client configuration"
    );

    let auth = AuthController::from_config(&config)?;
    auth.initialize().await;
    Ok(auth)
}

pub(crate) fn print_identity(identity: &Identity) {
    println!("{} <{}>", identity.name, identity.email);
    println!("  id:    {}", identity.id);
    println!("  role:  {}", identity.role);
    if let Some(phone) = &identity.phone {
        println!("  phone: {phone}");
    }
    if let Some(bio) = &identity.bio {
        println!("  bio:   {bio}");
    }
}

/// # Errors
/// Returns the login failure message.
pub async fn login(args: LoginArgs) -> Result<()> {
    let auth = boot(args.overrides).await?;
    let identity = auth
        .login(&args.email, args.password.expose_secret())
        .await?;
    println!("Signed in as {} ({})", identity.email, identity.role);
    Ok(())
}

/// # Errors
/// Returns the registration failure message.
pub async fn register(args: RegisterArgs) -> Result<()> {
    let auth = boot(args.overrides).await?;
    auth.register(
        &args.name,
        &args.email,
        args.password.expose_secret(),
        args.role,
    )
    .await?;
    println!("Account created for {}. Sign in to continue.", args.email);
    Ok(())
}

/// # Errors
/// Returns an error only if the configuration is invalid.
pub async fn logout(overrides: ConfigOverrides) -> Result<()> {
    let auth = boot(overrides).await?;
    auth.logout().await;
    println!("Signed out");
    Ok(())
}

/// # Errors
/// Returns an error when no session is signed in.
pub async fn whoami(overrides: ConfigOverrides) -> Result<()> {
    let auth = boot(overrides).await?;
    let Some(identity) = auth.identity() else {
        bail!("Not signed in");
    };
    print_identity(&identity);
    Ok(())
}
