use crate::app_lib::AppError;
use reqwest::header::HeaderValue;
use secrecy::{ExposeSecret, SecretString};
use std::fmt;

/// Opaque bearer token issued by the portal API at login.
///
/// The wrapped value is never printed; `Debug` is redacted.
#[derive(Clone)]
pub struct Credential(SecretString);

impl Credential {
    #[must_use]
    pub fn new(token: impl Into<String>) -> Self {
        Self(SecretString::from(token.into()))
    }

    /// The token exactly as issued, or `None` when it is blank.
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        if raw.trim().is_empty() {
            None
        } else {
            Some(Self::new(raw))
        }
    }

    #[must_use]
    pub fn expose(&self) -> &str {
        self.0.expose_secret()
    }

    /// Builds the `Authorization: Bearer <token>` value, marked sensitive.
    ///
    /// # Errors
    /// Returns `AppError::Config` if the token holds bytes that are not valid in a header.
    pub fn authorization_value(&self) -> Result<HeaderValue, AppError> {
        let mut value = HeaderValue::from_str(&format!("Bearer {}", self.expose())).map_err(
            |_| AppError::Config("Credential is not a valid header value.".to_string()),
        )?;
        value.set_sensitive(true);
        Ok(value)
    }
}

impl PartialEq for Credential {
    fn eq(&self, other: &Self) -> bool {
        self.expose() == other.expose()
    }
}

impl Eq for Credential {}

impl fmt::Debug for Credential {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str("Credential([REDACTED])")
    }
}
