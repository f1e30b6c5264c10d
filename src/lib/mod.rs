//! Shared client utilities for API access, configuration, errors and the
//! default authorization header.
//!
//! ## Core Authentication Flows
//!
//! ### Boot
//!
//! 1. **Read:** The stored bearer token (if any) is loaded from the credential file.
//! 2. **Probe:** The token is attached and `GET /api/profile/` confirms the identity.
//! 3. **Discard:** Any failure clears the file and the header; the session is anonymous.
//!
//! ### Login
//!
//! 1. **Exchange:** `POST /api/auth/login` returns an `access_token`.
//! 2. **Confirm:** The profile is fetched with that token as an explicit bearer.
//! 3. **Commit:** Only then is the token stored, attached and the session marked authenticated.
//!
//! Centralizing these helpers keeps network behavior consistent and avoids
//! duplicated logic in features. Callers must still avoid logging credentials.

pub(crate) mod api;
pub(crate) mod authenticator;
pub(crate) mod config;
pub(crate) mod errors;

pub use api::ApiClient;
pub use authenticator::RequestAuthenticator;
pub use config::{ClientConfig, ConfigOverrides};
pub use errors::AppError;
