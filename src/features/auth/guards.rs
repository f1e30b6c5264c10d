use crate::features::auth::{
    state::{AuthController, SessionState},
    types::Identity,
};
use tracing::debug;

pub const LOGIN_ROUTE: &str = "/login";
pub const HOME_ROUTE: &str = "/";

/// Render-time access policy for a protected view.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Gate {
    /// Any signed-in identity.
    RequireAuth,
    /// Signed-in identity with the admin role.
    RequireAdmin,
}

/// Why a gate refused. Only the redirect target differs; both are denials.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Denial {
    NotSignedIn,
    NotAdmin,
}

impl Denial {
    #[must_use]
    pub fn redirect_to(self) -> &'static str {
        match self {
            Self::NotSignedIn => LOGIN_ROUTE,
            Self::NotAdmin => HOME_ROUTE,
        }
    }

    #[must_use]
    pub fn message(self) -> &'static str {
        match self {
            Self::NotSignedIn => "Please sign in to continue.",
            Self::NotAdmin => "You are not authorized to view this page.",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GuardDecision {
    /// Verification still running: render nothing and do not redirect.
    Suspend,
    Render,
    Redirect(Denial),
}

impl Gate {
    /// Decides from a state snapshot.
    #[must_use]
    pub fn decide(self, state: &SessionState) -> GuardDecision {
        match (self, state) {
            (_, SessionState::Initializing) => GuardDecision::Suspend,
            (_, SessionState::Anonymous) => GuardDecision::Redirect(Denial::NotSignedIn),
            (Self::RequireAuth, SessionState::Authenticated(_)) => GuardDecision::Render,
            (Self::RequireAdmin, SessionState::Authenticated(identity)) => {
                if identity.is_admin() {
                    GuardDecision::Render
                } else {
                    GuardDecision::Redirect(Denial::NotAdmin)
                }
            }
        }
    }

    /// Waits for boot verification, then decides. Never returns `Suspend`.
    pub async fn check(self, auth: &AuthController) -> GuardDecision {
        let state = auth.resolved().await;
        let decision = self.decide(&state);
        debug!(gate = ?self, ?decision, "guard decision");
        decision
    }

    /// Builds the protected view only when access is granted.
    ///
    /// # Errors
    /// Returns the `Denial` when the gate refuses; `view` is not called then.
    pub async fn render<V>(
        self,
        auth: &AuthController,
        view: impl FnOnce(&Identity) -> V,
    ) -> Result<V, Denial> {
        let state = auth.resolved().await;
        match (self.decide(&state), state.identity()) {
            (GuardDecision::Render, Some(identity)) => Ok(view(identity)),
            (GuardDecision::Redirect(denial), _) => Err(denial),
            // Unreachable once resolved; deny rather than render.
            (GuardDecision::Render | GuardDecision::Suspend, _) => Err(Denial::NotSignedIn),
        }
    }
}
