use crate::{
    app_lib::ConfigOverrides,
    cli::actions::session::boot,
    features::auth::client,
    routes::{self, Navigation},
};
use anyhow::{Result, bail};
use secrecy::{ExposeSecret, SecretString};

#[derive(Debug)]
pub struct VisitArgs {
    pub overrides: ConfigOverrides,
    pub path: String,
}

#[derive(Debug)]
pub struct VerifyArgs {
    pub overrides: ConfigOverrides,
    pub token: SecretString,
}

/// Prints where a navigation to `path` ends up.
/// # Errors
/// Returns an error when no route matches.
pub async fn visit(args: VisitArgs) -> Result<()> {
    let auth = boot(args.overrides).await?;
    match routes::navigate(&auth, &args.path).await {
        Navigation::Render(route) => println!("render {route}"),
        Navigation::Redirect { to, denial } => {
            println!("redirect {to}: {}", denial.message());
        }
        Navigation::NotFound => bail!("No page at {}", args.path),
    }
    Ok(())
}

/// # Errors
/// Returns an error if the backend refuses the token.
pub async fn verify_email(args: VerifyArgs) -> Result<()> {
    let auth = boot(args.overrides).await?;
    let message = client::verify_email(auth.api(), args.token.expose_secret()).await?;
    println!("{message}");
    Ok(())
}
