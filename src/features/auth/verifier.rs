//! Boot-time exchange of a stored credential for a confirmed identity.
//!
//! Runs once per process. Every failure is recovered here: the stored token is
//! discarded, the header detached, and the session simply starts anonymous.
//! There is no retry.

use crate::{
    app_lib::{ApiClient, AppError},
    features::auth::{client, storage::CredentialStore, types::Identity},
};
use tracing::{debug, info, warn};

/// Outcome of the boot verification.
#[derive(Debug)]
pub enum Verification {
    /// Nothing stored; no request was made.
    NoCredential,
    Verified(Identity),
    /// The stored credential was discarded.
    Rejected(AppError),
}

impl Verification {
    #[must_use]
    pub fn into_identity(self) -> Option<Identity> {
        match self {
            Self::Verified(identity) => Some(identity),
            Self::NoCredential | Self::Rejected(_) => None,
        }
    }
}

pub struct SessionVerifier<'a> {
    api: &'a ApiClient,
    store: &'a dyn CredentialStore,
}

impl<'a> SessionVerifier<'a> {
    #[must_use]
    pub fn new(api: &'a ApiClient, store: &'a dyn CredentialStore) -> Self {
        Self { api, store }
    }

    pub async fn verify(&self) -> Verification {
        let Some(credential) = self.store.get() else {
            debug!("no stored credential; starting anonymous");
            return Verification::NoCredential;
        };

        let authenticator = self.api.authenticator();
        if let Err(err) = authenticator.attach(&credential) {
            warn!("stored credential is unusable: {err}");
            self.discard();
            return Verification::Rejected(err);
        }

        match client::fetch_profile(self.api).await {
            Ok(identity) => {
                info!(user_id = identity.id, role = %identity.role, "stored session verified");
                Verification::Verified(identity)
            }
            Err(err) => {
                warn!(
                    status = ?err.status(),
                    transport = err.is_transport(),
                    "stored session rejected: {err}"
                );
                self.discard();
                Verification::Rejected(err)
            }
        }
    }

    fn discard(&self) {
        self.store.clear();
        self.api.authenticator().detach();
    }
}
