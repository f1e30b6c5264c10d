//! Auth feature module covering the credential store, boot verification, the
//! session controller and route guards. It keeps authentication logic out of
//! views and must stay aligned with the portal API's auth endpoints. This
//! module touches security boundaries and must avoid logging secrets or token
//! material.
//!
//! Flow Overview: Boot reads the stored token, attaches it and probes
//! `/api/profile/`; failure discards it. Login exchanges credentials for a
//! token, confirms it with a profile fetch, then stores and attaches it.
//! Logout always clears local state, whatever the backend answers.

pub mod client;
mod guards;
pub mod state;
pub mod storage;
pub mod token;
pub mod types;
pub mod verifier;

pub use guards::{Denial, Gate, GuardDecision, HOME_ROUTE, LOGIN_ROUTE};
pub use state::{AuthController, AuthFailure, SessionState};
pub use storage::{CredentialStore, FileCredentialStore, MemoryCredentialStore};
pub use token::Credential;
pub use types::{Identity, ProfilePatch, Role};
