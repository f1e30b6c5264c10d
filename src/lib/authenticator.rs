//! Process-wide default `Authorization` header for calls to the portal API.
//!
//! Every request built by [`super::api::ApiClient`] reads the current value
//! here, so attaching or detaching takes effect for all later calls at once.
//! Only the auth controller and the session verifier write to it.

use super::errors::AppError;
use crate::features::auth::token::Credential;
use reqwest::header::HeaderValue;
use std::sync::{Arc, PoisonError, RwLock};
use tracing::debug;

#[derive(Clone, Debug, Default)]
pub struct RequestAuthenticator {
    header: Arc<RwLock<Option<HeaderValue>>>,
}

impl RequestAuthenticator {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets `Authorization: Bearer <token>`, replacing any previous value.
    ///
    /// # Errors
    /// Returns `AppError::Config` if the token cannot be carried in a header;
    /// the previous header is left untouched in that case.
    pub fn attach(&self, credential: &Credential) -> Result<(), AppError> {
        let value = credential.authorization_value()?;
        self.install(value);
        Ok(())
    }

    pub(crate) fn install(&self, value: HeaderValue) {
        let mut slot = self.header.write().unwrap_or_else(PoisonError::into_inner);
        *slot = Some(value);
        debug!("authorization header attached");
    }

    /// Removes the default header. Safe to call when nothing is attached.
    pub fn detach(&self) {
        let mut slot = self.header.write().unwrap_or_else(PoisonError::into_inner);
        if slot.take().is_some() {
            debug!("authorization header detached");
        }
    }

    #[must_use]
    pub fn current(&self) -> Option<HeaderValue> {
        self.header
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    #[must_use]
    pub fn is_attached(&self) -> bool {
        self.header
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::RequestAuthenticator;
    use crate::features::auth::token::Credential;

    #[test]
    fn attach_replaces_instead_of_stacking() {
        let authenticator = RequestAuthenticator::new();
        authenticator.attach(&Credential::new("first")).unwrap();
        authenticator.attach(&Credential::new("second")).unwrap();

        let value = authenticator.current().unwrap();
        assert_eq!(value.to_str().unwrap(), "Bearer second");
    }

    #[test]
    fn detach_is_idempotent() {
        let authenticator = RequestAuthenticator::new();
        authenticator.detach();
        assert!(!authenticator.is_attached());

        authenticator.attach(&Credential::new("tok")).unwrap();
        authenticator.detach();
        authenticator.detach();
        assert!(authenticator.current().is_none());
    }

    #[test]
    fn clones_share_the_same_header() {
        let authenticator = RequestAuthenticator::new();
        let shared = authenticator.clone();
        authenticator.attach(&Credential::new("tok")).unwrap();
        assert!(shared.is_attached());
        shared.detach();
        assert!(!authenticator.is_attached());
    }

    #[test]
    fn invalid_credential_keeps_previous_header() {
        let authenticator = RequestAuthenticator::new();
        authenticator.attach(&Credential::new("good")).unwrap();
        assert!(authenticator.attach(&Credential::new("bad\r\n")).is_err());
        assert_eq!(
            authenticator.current().unwrap().to_str().unwrap(),
            "Bearer good"
        );
    }
}
