//! Route table of the portal client and guarded navigation. Views themselves
//! live outside this crate; navigation only decides which route may render.

use crate::features::auth::{AuthController, Denial, Gate, GuardDecision};
use std::fmt;
use tracing::debug;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Route {
    Home,
    Scholarships,
    ScholarshipDetail(u64),
    Login,
    Register,
    VerifyEmail(String),
    ForgotPassword,
    Applications,
    Profile,
    Admin,
}

impl Route {
    /// Matches a path against the route table. Query strings, fragments and
    /// trailing slashes are ignored.
    #[must_use]
    pub fn parse(path: &str) -> Option<Self> {
        let path = path.split(['?', '#']).next().unwrap_or_default();
        let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();

        match segments.as_slice() {
            [] => Some(Self::Home),
            ["scholarships"] => Some(Self::Scholarships),
            ["scholarships", id] => id.parse().ok().map(Self::ScholarshipDetail),
            ["login"] => Some(Self::Login),
            ["register"] => Some(Self::Register),
            ["verify-email", token] => Some(Self::VerifyEmail((*token).to_string())),
            ["forgot-password"] => Some(Self::ForgotPassword),
            ["applications"] => Some(Self::Applications),
            ["profile"] => Some(Self::Profile),
            ["admin"] => Some(Self::Admin),
            _ => None,
        }
    }

    /// Gate protecting the route, if any.
    #[must_use]
    pub fn gate(&self) -> Option<Gate> {
        match self {
            Self::Applications | Self::Profile => Some(Gate::RequireAuth),
            Self::Admin => Some(Gate::RequireAdmin),
            Self::Home
            | Self::Scholarships
            | Self::ScholarshipDetail(_)
            | Self::Login
            | Self::Register
            | Self::VerifyEmail(_)
            | Self::ForgotPassword => None,
        }
    }
}

impl fmt::Display for Route {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Home => formatter.write_str("/"),
            Self::Scholarships => formatter.write_str("/scholarships"),
            Self::ScholarshipDetail(id) => write!(formatter, "/scholarships/{id}"),
            Self::Login => formatter.write_str("/login"),
            Self::Register => formatter.write_str("/register"),
            // The token is one-shot; keep it out of rendered paths and logs.
            Self::VerifyEmail(_) => formatter.write_str("/verify-email/:token"),
            Self::ForgotPassword => formatter.write_str("/forgot-password"),
            Self::Applications => formatter.write_str("/applications"),
            Self::Profile => formatter.write_str("/profile"),
            Self::Admin => formatter.write_str("/admin"),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Navigation {
    Render(Route),
    Redirect { to: &'static str, denial: Denial },
    NotFound,
}

/// Resolves a navigation after boot verification has finished.
pub async fn navigate(auth: &AuthController, path: &str) -> Navigation {
    let Some(route) = Route::parse(path) else {
        return Navigation::NotFound;
    };

    let navigation = match route.gate() {
        None => Navigation::Render(route),
        Some(gate) => match gate.check(auth).await {
            GuardDecision::Render => Navigation::Render(route),
            GuardDecision::Redirect(denial) => Navigation::Redirect {
                to: denial.redirect_to(),
                denial,
            },
            // `check` waits for resolution; treat anything else as a denial.
            GuardDecision::Suspend => Navigation::Redirect {
                to: Denial::NotSignedIn.redirect_to(),
                denial: Denial::NotSignedIn,
            },
        },
    };
    match &navigation {
        Navigation::Render(route) => debug!(route = %route, "navigation rendered"),
        Navigation::Redirect { to, denial } => debug!(to, ?denial, "navigation redirected"),
        Navigation::NotFound => debug!("no such route"),
    }
    navigation
}
