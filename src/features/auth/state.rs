//! Auth session state and the controller that owns it. The controller is the
//! only writer of the credential store, the default authorization header and
//! the session state, and it always applies them in that order. Everyone else
//! reads derived facts or subscribes to state changes.

use crate::{
    app_lib::{ApiClient, AppError, ClientConfig, RequestAuthenticator},
    features::auth::{
        client,
        storage::{CredentialStore, FileCredentialStore},
        token::Credential,
        types::{ChangePasswordRequest, Identity, LoginRequest, ProfilePatch, RegisterRequest, Role},
        verifier::SessionVerifier,
    },
};
use std::sync::{Arc, Once};
use thiserror::Error;
use tokio::sync::{Mutex, watch};
use tracing::{debug, info, instrument, warn};

const LOGIN_FAILED: &str = "Login failed";
const REGISTRATION_FAILED: &str = "Registration failed";
const PROFILE_UPDATE_FAILED: &str = "Profile update failed";
const PASSWORD_CHANGE_FAILED: &str = "Password change failed";
const NOT_SIGNED_IN: &str = "You must be signed in";

/// Session lifecycle. `Initializing` is left exactly once, when boot
/// verification resolves.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SessionState {
    Initializing,
    Anonymous,
    Authenticated(Identity),
}

impl SessionState {
    #[must_use]
    pub fn is_resolved(&self) -> bool {
        !matches!(self, Self::Initializing)
    }

    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        matches!(self, Self::Authenticated(_))
    }

    #[must_use]
    pub fn is_admin(&self) -> bool {
        matches!(self, Self::Authenticated(identity) if identity.is_admin())
    }

    #[must_use]
    pub fn identity(&self) -> Option<&Identity> {
        match self {
            Self::Authenticated(identity) => Some(identity),
            Self::Initializing | Self::Anonymous => None,
        }
    }
}

/// User-facing failure of an auth operation. `message` is safe to display;
/// `source` keeps the classified transport error for logs.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("{message}")]
pub struct AuthFailure {
    pub message: String,
    #[source]
    pub source: Option<AppError>,
}

impl AuthFailure {
    fn from_error(err: AppError, fallback: &str) -> Self {
        let message = err
            .backend_message()
            .map_or_else(|| fallback.to_string(), str::to_string);
        Self {
            message,
            source: Some(err),
        }
    }

    fn not_signed_in() -> Self {
        Self {
            message: NOT_SIGNED_IN.to_string(),
            source: None,
        }
    }
}

/// Shared handle to the auth session. Clones refer to the same session.
#[derive(Clone)]
pub struct AuthController {
    inner: Arc<Inner>,
}

struct Inner {
    api: ApiClient,
    store: Arc<dyn CredentialStore>,
    state: watch::Sender<SessionState>,
    // Serializes state-changing operations so no partial transition is observable.
    ops: Mutex<()>,
    boot: Once,
}

impl Inner {
    fn clear_local(&self) {
        self.store.clear();
        self.api.authenticator().detach();
        self.state.send_replace(SessionState::Anonymous);
    }

    async fn verify_stored(&self) {
        let _ops = self.ops.lock().await;
        let verifier = SessionVerifier::new(&self.api, self.store.as_ref());
        let next = match verifier.verify().await.into_identity() {
            Some(identity) => SessionState::Authenticated(identity),
            None => SessionState::Anonymous,
        };
        debug!(authenticated = next.is_authenticated(), "session resolved");
        self.state.send_replace(next);
    }
}

/// Resolves a boot that never finished (panic or runtime shutdown) to
/// anonymous. The stored token is kept for the next process.
struct BootCleanup(Arc<Inner>);

impl Drop for BootCleanup {
    fn drop(&mut self) {
        let resolved = self.0.state.borrow().is_resolved();
        if !resolved {
            warn!("session verification did not finish; starting anonymous");
            self.0.api.authenticator().detach();
            self.0.state.send_replace(SessionState::Anonymous);
        }
    }
}

/// Runs local logout cleanup when dropped, even if the backend call was abandoned.
struct LogoutCleanup<'a>(&'a Inner);

impl Drop for LogoutCleanup<'_> {
    fn drop(&mut self) {
        self.0.clear_local();
        info!("signed out");
    }
}

impl AuthController {
    #[must_use]
    pub fn new(api: ApiClient, store: Arc<dyn CredentialStore>) -> Self {
        let (state, _) = watch::channel(SessionState::Initializing);
        Self {
            inner: Arc::new(Inner {
                api,
                store,
                state,
                ops: Mutex::new(()),
                boot: Once::new(),
            }),
        }
    }

    /// Builds a controller backed by the credential file named in `config`.
    ///
    /// # Errors
    /// Returns `AppError::Config` if the API client cannot be built.
    pub fn from_config(config: &ClientConfig) -> Result<Self, AppError> {
        let api = ApiClient::new(config, RequestAuthenticator::new())?;
        let store = Arc::new(FileCredentialStore::new(config.credential_path.clone()));
        Ok(Self::new(api, store))
    }

    /// Shared API client for the listing, application and admin views.
    #[must_use]
    pub fn api(&self) -> &ApiClient {
        &self.inner.api
    }

    #[must_use]
    pub fn state(&self) -> SessionState {
        self.inner.state.borrow().clone()
    }

    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.inner.state.subscribe()
    }

    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.inner.state.borrow().is_authenticated()
    }

    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.inner.state.borrow().is_admin()
    }

    #[must_use]
    pub fn identity(&self) -> Option<Identity> {
        self.inner.state.borrow().identity().cloned()
    }

    /// Verifies the stored credential. Only the first call starts the check;
    /// every caller waits for it to resolve. The check runs on its own task,
    /// so dropping a caller never cuts it short or causes a second attempt.
    pub async fn initialize(&self) {
        self.inner.boot.call_once(|| {
            let cleanup = BootCleanup(Arc::clone(&self.inner));
            tokio::spawn(async move {
                cleanup.0.verify_stored().await;
                drop(cleanup);
            });
        });

        let mut state = self.inner.state.subscribe();
        // The sender lives in `inner`, so this only ends once resolved.
        let _ = state.wait_for(SessionState::is_resolved).await;
    }

    /// State after boot verification has resolved.
    pub async fn resolved(&self) -> SessionState {
        self.initialize().await;
        self.state()
    }

    /// Signs in and, on success, persists and attaches the issued token.
    ///
    /// # Errors
    /// Returns `AuthFailure` with the backend message, or `"Login failed"`;
    /// the session is left exactly as it was.
    #[instrument(skip(self, password))]
    pub async fn login(&self, email: &str, password: &str) -> Result<Identity, AuthFailure> {
        self.initialize().await;
        let _ops = self.inner.ops.lock().await;
        let api = &self.inner.api;

        let request = LoginRequest {
            email: email.to_string(),
            password: password.to_string(),
        };
        let response = client::login(api, &request)
            .await
            .map_err(|err| AuthFailure::from_error(err, LOGIN_FAILED))?;

        let credential = Credential::parse(&response.access_token).ok_or_else(|| {
            AuthFailure::from_error(
                AppError::Parse("Login response carried an empty token.".to_string()),
                LOGIN_FAILED,
            )
        })?;
        let bearer = credential
            .authorization_value()
            .map_err(|err| AuthFailure::from_error(err, LOGIN_FAILED))?;

        let identity = client::fetch_profile_with(api, &bearer)
            .await
            .map_err(|err| AuthFailure::from_error(err, LOGIN_FAILED))?;

        self.inner.store.set(&credential);
        api.authenticator().install(bearer);
        self.inner
            .state
            .send_replace(SessionState::Authenticated(identity.clone()));

        info!(user_id = identity.id, role = %identity.role, "signed in");
        Ok(identity)
    }

    /// Creates an account; the session is not changed.
    ///
    /// # Errors
    /// Returns `AuthFailure` with the backend message, or `"Registration failed"`.
    #[instrument(skip(self, password))]
    pub async fn register(
        &self,
        name: &str,
        email: &str,
        password: &str,
        role: Option<Role>,
    ) -> Result<(), AuthFailure> {
        let request = RegisterRequest {
            name: name.to_string(),
            email: email.to_string(),
            password: password.to_string(),
            role: role.unwrap_or_default(),
        };
        client::register(&self.inner.api, &request)
            .await
            .map_err(|err| AuthFailure::from_error(err, REGISTRATION_FAILED))?;
        info!(role = %request.role, "account registered");
        Ok(())
    }

    /// Ends the session. Local state is always cleared; backend failures are
    /// only logged. When nothing is signed in no request is made.
    pub async fn logout(&self) {
        self.initialize().await;
        let _ops = self.inner.ops.lock().await;
        let cleanup = LogoutCleanup(&self.inner);

        let signed_in =
            self.inner.state.borrow().is_authenticated() || self.inner.api.authenticator().is_attached();
        if signed_in && let Err(err) = client::logout(&self.inner.api).await {
            warn!("backend logout failed: {err}");
        }

        drop(cleanup);
    }

    /// Sends a profile patch and adopts the backend's returned profile.
    ///
    /// # Errors
    /// Returns `AuthFailure` with the backend message, or `"Profile update failed"`;
    /// the identity is unchanged.
    pub async fn update_profile(&self, patch: &ProfilePatch) -> Result<Identity, AuthFailure> {
        self.initialize().await;
        let _ops = self.inner.ops.lock().await;
        if !self.inner.state.borrow().is_authenticated() {
            return Err(AuthFailure::not_signed_in());
        }

        let identity = client::update_profile(&self.inner.api, patch)
            .await
            .map_err(|err| AuthFailure::from_error(err, PROFILE_UPDATE_FAILED))?;
        self.inner
            .state
            .send_replace(SessionState::Authenticated(identity.clone()));

        info!(user_id = identity.id, "profile updated");
        Ok(identity)
    }

    /// Changes the signed-in user's password; the session is not changed.
    ///
    /// # Errors
    /// Returns `AuthFailure` with the backend message, or `"Password change failed"`.
    pub async fn change_password(
        &self,
        current_password: &str,
        new_password: &str,
    ) -> Result<(), AuthFailure> {
        self.initialize().await;
        let _ops = self.inner.ops.lock().await;
        if !self.inner.state.borrow().is_authenticated() {
            return Err(AuthFailure::not_signed_in());
        }

        let request = ChangePasswordRequest {
            current_password: current_password.to_string(),
            new_password: new_password.to_string(),
        };
        client::change_password(&self.inner.api, &request)
            .await
            .map_err(|err| AuthFailure::from_error(err, PASSWORD_CHANGE_FAILED))?;
        info!("password changed");
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::features::auth::storage::MemoryCredentialStore;
    use serde_json::{Value, json};
    use std::{net::TcpListener, path::PathBuf, time::Duration};
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn can_bind_localhost() -> bool {
        TcpListener::bind("127.0.0.1:0").is_ok()
    }

    fn controller_for(server: &MockServer, store: Arc<MemoryCredentialStore>) -> AuthController {
        controller_at(&server.uri(), store)
    }

    fn controller_at(base_url: &str, store: Arc<MemoryCredentialStore>) -> AuthController {
        let config = ClientConfig {
            api_base_url: base_url.to_string(),
            credential_path: PathBuf::from("unused.json"),
            timeout: Duration::from_secs(2),
        };
        let api = ApiClient::new(&config, RequestAuthenticator::new()).unwrap();
        AuthController::new(api, store)
    }

    fn profile(role: &str) -> Value {
        json!({"id": 1, "name": "A", "email": "a@b.com", "role": role})
    }

    async fn mount_login(server: &MockServer, token: &str) {
        Mock::given(method("POST"))
            .and(path("/api/auth/login"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"access_token": token, "message": "Logged in successfully"})),
            )
            .mount(server)
            .await;
    }

    async fn mount_profile(server: &MockServer, token: &str, role: &str) {
        Mock::given(method("GET"))
            .and(path("/api/profile/"))
            .and(header("Authorization", format!("Bearer {token}").as_str()))
            .respond_with(ResponseTemplate::new(200).set_body_json(profile(role)))
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn boot_without_token_is_anonymous_with_zero_requests() {
        if !can_bind_localhost() {
            eprintln!("Skipping test: cannot bind localhost");
            return;
        }
        let server = MockServer::start().await;
        let auth = controller_for(&server, Arc::new(MemoryCredentialStore::new()));

        assert_eq!(auth.state(), SessionState::Initializing);
        assert_eq!(auth.resolved().await, SessionState::Anonymous);
        assert!(server.received_requests().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn boot_with_valid_token_reports_backend_role() {
        if !can_bind_localhost() {
            eprintln!("Skipping test: cannot bind localhost");
            return;
        }
        for (role, admin) in [("admin", true), ("student", false)] {
            let server = MockServer::start().await;
            mount_profile(&server, "T", role).await;
            let store = Arc::new(MemoryCredentialStore::with_credential(Credential::new("T")));
            let auth = controller_for(&server, store);

            let state = auth.resolved().await;
            assert_eq!(state.identity().unwrap().role.as_str(), role);
            assert_eq!(auth.is_admin(), admin);
            assert!(auth.is_authenticated());
        }
    }

    #[tokio::test]
    async fn boot_with_rejected_token_drops_it() {
        if !can_bind_localhost() {
            eprintln!("Skipping test: cannot bind localhost");
            return;
        }
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/profile/"))
            .respond_with(ResponseTemplate::new(422))
            .expect(1)
            .mount(&server)
            .await;
        let store = Arc::new(MemoryCredentialStore::with_credential(Credential::new("T")));
        let auth = controller_for(&server, store.clone());

        assert_eq!(auth.resolved().await, SessionState::Anonymous);
        assert!(store.get().is_none());
        assert!(!auth.api().authenticator().is_attached());

        // Verification runs once per process.
        auth.initialize().await;
        auth.initialize().await;
    }

    #[tokio::test]
    async fn login_success_persists_and_attaches_token() {
        if !can_bind_localhost() {
            eprintln!("Skipping test: cannot bind localhost");
            return;
        }
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/auth/login"))
            .and(body_json(json!({"email": "a@b.com", "password": "secret"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"access_token": "tok1"})))
            .expect(1)
            .mount(&server)
            .await;
        mount_profile(&server, "tok1", "student").await;

        let store = Arc::new(MemoryCredentialStore::new());
        let auth = controller_for(&server, store.clone());

        let identity = auth.login("a@b.com", "secret").await.unwrap();
        assert_eq!(identity.email, "a@b.com");
        assert!(auth.is_authenticated());
        assert!(!auth.is_admin());
        assert_eq!(store.get(), Some(Credential::new("tok1")));
        assert_eq!(
            auth.api().authenticator().current().unwrap().to_str().unwrap(),
            "Bearer tok1"
        );
    }

    #[tokio::test]
    async fn login_failure_surfaces_backend_message() {
        if !can_bind_localhost() {
            eprintln!("Skipping test: cannot bind localhost");
            return;
        }
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/auth/login"))
            .respond_with(
                ResponseTemplate::new(500).set_body_json(json!({"error": "Internal server error"})),
            )
            .mount(&server)
            .await;
        let store = Arc::new(MemoryCredentialStore::new());
        let auth = controller_for(&server, store.clone());

        let failure = auth.login("a@b.com", "secret").await.unwrap_err();
        assert_eq!(failure.message, "Internal server error");
        assert_eq!(auth.state(), SessionState::Anonymous);
        assert!(store.get().is_none());
    }

    #[tokio::test]
    async fn login_failure_without_payload_uses_fallback() {
        if !can_bind_localhost() {
            eprintln!("Skipping test: cannot bind localhost");
            return;
        }
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/auth/login"))
            .respond_with(ResponseTemplate::new(502).set_body_string("<html>bad gateway</html>"))
            .mount(&server)
            .await;
        let auth = controller_for(&server, Arc::new(MemoryCredentialStore::new()));

        let failure = auth.login("a@b.com", "secret").await.unwrap_err();
        assert_eq!(failure.message, "Login failed");
        assert!(matches!(
            failure.source,
            Some(AppError::Http { status: 502, .. })
        ));
    }

    #[tokio::test]
    async fn login_with_failing_profile_leaves_nothing_behind() {
        if !can_bind_localhost() {
            eprintln!("Skipping test: cannot bind localhost");
            return;
        }
        let server = MockServer::start().await;
        mount_login(&server, "tok1").await;
        Mock::given(method("GET"))
            .and(path("/api/profile/"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;
        let store = Arc::new(MemoryCredentialStore::new());
        let auth = controller_for(&server, store.clone());

        let failure = auth.login("a@b.com", "secret").await.unwrap_err();
        assert_eq!(failure.message, "Login failed");
        assert_eq!(auth.state(), SessionState::Anonymous);
        assert!(store.get().is_none());
        assert!(!auth.api().authenticator().is_attached());
    }

    #[tokio::test]
    async fn login_then_logout_clears_everything_even_if_backend_fails() {
        if !can_bind_localhost() {
            eprintln!("Skipping test: cannot bind localhost");
            return;
        }
        let server = MockServer::start().await;
        mount_login(&server, "tok1").await;
        mount_profile(&server, "tok1", "admin").await;
        Mock::given(method("POST"))
            .and(path("/api/auth/logout"))
            .and(header("Authorization", "Bearer tok1"))
            .respond_with(ResponseTemplate::new(500))
            .expect(1)
            .mount(&server)
            .await;
        let store = Arc::new(MemoryCredentialStore::new());
        let auth = controller_for(&server, store.clone());

        auth.login("a@b.com", "secret").await.unwrap();
        auth.logout().await;

        assert_eq!(auth.state(), SessionState::Anonymous);
        assert!(store.get().is_none());
        assert!(!auth.api().authenticator().is_attached());
    }

    #[tokio::test]
    async fn logout_when_anonymous_makes_no_request() {
        if !can_bind_localhost() {
            eprintln!("Skipping test: cannot bind localhost");
            return;
        }
        let server = MockServer::start().await;
        let auth = controller_for(&server, Arc::new(MemoryCredentialStore::new()));

        auth.logout().await;
        auth.logout().await;

        assert_eq!(auth.state(), SessionState::Anonymous);
        assert!(server.received_requests().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn abandoned_logout_still_clears_local_state() {
        if !can_bind_localhost() {
            eprintln!("Skipping test: cannot bind localhost");
            return;
        }
        let server = MockServer::start().await;
        mount_profile(&server, "T", "student").await;
        Mock::given(method("POST"))
            .and(path("/api/auth/logout"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(5)))
            .mount(&server)
            .await;
        let store = Arc::new(MemoryCredentialStore::with_credential(Credential::new("T")));
        let auth = controller_for(&server, store.clone());
        assert!(auth.resolved().await.is_authenticated());

        let outcome = tokio::time::timeout(Duration::from_millis(200), auth.logout()).await;
        assert!(outcome.is_err());
        assert_eq!(auth.state(), SessionState::Anonymous);
        assert!(store.get().is_none());
        assert!(!auth.api().authenticator().is_attached());
    }

    #[tokio::test]
    async fn update_profile_adopts_backend_representation() {
        if !can_bind_localhost() {
            eprintln!("Skipping test: cannot bind localhost");
            return;
        }
        let server = MockServer::start().await;
        mount_profile(&server, "T", "student").await;
        Mock::given(method("PUT"))
            .and(path("/api/profile/"))
            .and(body_json(json!({"bio": "x"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "message": "Profile updated successfully",
                "user": {"id": 1, "name": "A", "email": "a@b.com", "role": "student", "bio": "X (normalized)"}
            })))
            .expect(1)
            .mount(&server)
            .await;
        let store = Arc::new(MemoryCredentialStore::with_credential(Credential::new("T")));
        let auth = controller_for(&server, store);
        auth.initialize().await;

        let patch = ProfilePatch {
            bio: Some("x".to_string()),
            ..ProfilePatch::default()
        };
        let identity = auth.update_profile(&patch).await.unwrap();
        assert_eq!(identity.bio.as_deref(), Some("X (normalized)"));
        assert_eq!(
            auth.identity().unwrap().bio.as_deref(),
            Some("X (normalized)")
        );
    }

    #[tokio::test]
    async fn update_profile_failure_keeps_identity() {
        if !can_bind_localhost() {
            eprintln!("Skipping test: cannot bind localhost");
            return;
        }
        let server = MockServer::start().await;
        mount_profile(&server, "T", "student").await;
        Mock::given(method("PUT"))
            .and(path("/api/profile/"))
            .respond_with(
                ResponseTemplate::new(400).set_body_json(json!({"error": "Email already in use"})),
            )
            .mount(&server)
            .await;
        let store = Arc::new(MemoryCredentialStore::with_credential(Credential::new("T")));
        let auth = controller_for(&server, store);
        let before = auth.resolved().await;

        let patch = ProfilePatch {
            email: Some("taken@b.com".to_string()),
            ..ProfilePatch::default()
        };
        let failure = auth.update_profile(&patch).await.unwrap_err();
        assert_eq!(failure.message, "Email already in use");
        assert_eq!(auth.state(), before);
    }

    #[tokio::test]
    async fn update_profile_requires_a_session() {
        if !can_bind_localhost() {
            eprintln!("Skipping test: cannot bind localhost");
            return;
        }
        let server = MockServer::start().await;
        let auth = controller_for(&server, Arc::new(MemoryCredentialStore::new()));

        let failure = auth
            .update_profile(&ProfilePatch::default())
            .await
            .unwrap_err();
        assert_eq!(failure.message, NOT_SIGNED_IN);
        assert!(server.received_requests().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn register_defaults_to_student_and_keeps_session() {
        if !can_bind_localhost() {
            eprintln!("Skipping test: cannot bind localhost");
            return;
        }
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/auth/register"))
            .and(body_json(json!({
                "name": "A", "email": "a@b.com", "password": "secret", "role": "student"
            })))
            .respond_with(ResponseTemplate::new(201))
            .expect(1)
            .mount(&server)
            .await;
        let auth = controller_for(&server, Arc::new(MemoryCredentialStore::new()));
        auth.initialize().await;

        auth.register("A", "a@b.com", "secret", None).await.unwrap();
        assert_eq!(auth.state(), SessionState::Anonymous);
    }

    #[tokio::test]
    async fn register_failure_uses_backend_message_or_fallback() {
        if !can_bind_localhost() {
            eprintln!("Skipping test: cannot bind localhost");
            return;
        }
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/auth/register"))
            .respond_with(
                ResponseTemplate::new(400).set_body_json(json!({"error": "User already exists"})),
            )
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/api/auth/register"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;
        let auth = controller_for(&server, Arc::new(MemoryCredentialStore::new()));

        let first = auth.register("A", "a@b.com", "pw", None).await.unwrap_err();
        assert_eq!(first.message, "User already exists");
        let second = auth.register("A", "a@b.com", "pw", None).await.unwrap_err();
        assert_eq!(second.message, "Registration failed");
    }

    #[tokio::test]
    async fn concurrent_logins_never_mix_store_and_header() {
        if !can_bind_localhost() {
            eprintln!("Skipping test: cannot bind localhost");
            return;
        }
        let server = MockServer::start().await;
        for (email, token) in [("a@b.com", "tokA"), ("c@d.com", "tokB")] {
            Mock::given(method("POST"))
                .and(path("/api/auth/login"))
                .and(body_json(json!({"email": email, "password": "pw"})))
                .respond_with(
                    ResponseTemplate::new(200)
                        .set_body_json(json!({"access_token": token}))
                        .set_delay(Duration::from_millis(50)),
                )
                .mount(&server)
                .await;
            mount_profile(&server, token, "student").await;
        }
        let store = Arc::new(MemoryCredentialStore::new());
        let auth = controller_for(&server, store.clone());

        let (first, second) = tokio::join!(auth.login("a@b.com", "pw"), auth.login("c@d.com", "pw"));
        assert!(first.is_ok() && second.is_ok());

        let stored = store.get().unwrap();
        let header = auth.api().authenticator().current().unwrap();
        assert_eq!(
            header.to_str().unwrap(),
            format!("Bearer {}", stored.expose())
        );
        assert!(auth.is_authenticated());
    }

    #[tokio::test]
    async fn subscribers_observe_transitions() {
        if !can_bind_localhost() {
            eprintln!("Skipping test: cannot bind localhost");
            return;
        }
        let server = MockServer::start().await;
        mount_login(&server, "tok1").await;
        mount_profile(&server, "tok1", "student").await;
        let auth = controller_for(&server, Arc::new(MemoryCredentialStore::new()));
        let mut updates = auth.subscribe();
        assert_eq!(*updates.borrow(), SessionState::Initializing);

        auth.initialize().await;
        updates.changed().await.unwrap();
        assert_eq!(*updates.borrow_and_update(), SessionState::Anonymous);

        auth.login("a@b.com", "pw").await.unwrap();
        updates.changed().await.unwrap();
        assert!(updates.borrow_and_update().is_authenticated());
    }

    #[tokio::test]
    async fn change_password_keeps_session() {
        if !can_bind_localhost() {
            eprintln!("Skipping test: cannot bind localhost");
            return;
        }
        let server = MockServer::start().await;
        mount_profile(&server, "T", "student").await;
        Mock::given(method("POST"))
            .and(path("/api/profile/change-password"))
            .and(body_json(json!({"current_password": "old", "new_password": "newpass"})))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"message": "Password changed successfully"})),
            )
            .expect(1)
            .mount(&server)
            .await;
        let store = Arc::new(MemoryCredentialStore::with_credential(Credential::new("T")));
        let auth = controller_for(&server, store);
        let before = auth.resolved().await;

        auth.change_password("old", "newpass").await.unwrap();
        assert_eq!(auth.state(), before);
    }

    #[test]
    fn derived_facts_follow_the_state() {
        let student: Identity = serde_json::from_value(profile("student")).unwrap();
        let admin: Identity = serde_json::from_value(profile("admin")).unwrap();

        assert!(!SessionState::Initializing.is_resolved());
        assert!(!SessionState::Initializing.is_authenticated());
        assert!(!SessionState::Anonymous.is_admin());

        let state = SessionState::Authenticated(student);
        assert!(state.is_authenticated() && !state.is_admin());
        let state = SessionState::Authenticated(admin);
        assert!(state.is_authenticated() && state.is_admin());
    }

    #[tokio::test]
    async fn abandoned_boot_still_verifies_exactly_once() {
        if !can_bind_localhost() {
            eprintln!("Skipping test: cannot bind localhost");
            return;
        }
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/profile/"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(profile("student"))
                    .set_delay(Duration::from_millis(300)),
            )
            .expect(1)
            .mount(&server)
            .await;
        let store = Arc::new(MemoryCredentialStore::with_credential(Credential::new("T")));
        let auth = controller_for(&server, store.clone());

        let outcome = tokio::time::timeout(Duration::from_millis(50), auth.initialize()).await;
        assert!(outcome.is_err());

        auth.initialize().await;
        assert!(auth.is_authenticated());
        assert_eq!(store.get(), Some(Credential::new("T")));
        assert_eq!(server.received_requests().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn boot_against_unreachable_backend_drops_token() {
        let Ok(listener) = TcpListener::bind("127.0.0.1:0") else {
            eprintln!("Skipping test: cannot bind localhost");
            return;
        };
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let store = Arc::new(MemoryCredentialStore::with_credential(Credential::new("T")));
        let auth = controller_at(&format!("http://127.0.0.1:{port}"), store.clone());

        assert_eq!(auth.resolved().await, SessionState::Anonymous);
        assert!(store.get().is_none());
        assert!(!auth.api().authenticator().is_attached());
    }

    #[tokio::test]
    async fn login_against_unreachable_backend_uses_fallback() {
        let Ok(listener) = TcpListener::bind("127.0.0.1:0") else {
            eprintln!("Skipping test: cannot bind localhost");
            return;
        };
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let store = Arc::new(MemoryCredentialStore::new());
        let auth = controller_at(&format!("http://127.0.0.1:{port}"), store.clone());

        let failure = auth.login("a@b.com", "secret").await.unwrap_err();
        assert_eq!(failure.message, "Login failed");
        assert!(matches!(failure.source, Some(AppError::Network(_))));
        assert_eq!(auth.state(), SessionState::Anonymous);
        assert!(store.get().is_none());
    }

    #[tokio::test]
    async fn login_stores_the_issued_token_verbatim() {
        if !can_bind_localhost() {
            eprintln!("Skipping test: cannot bind localhost");
            return;
        }
        let server = MockServer::start().await;
        mount_login(&server, " tok1 ").await;
        Mock::given(method("GET"))
            .and(path("/api/profile/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(profile("student")))
            .mount(&server)
            .await;
        let store = Arc::new(MemoryCredentialStore::new());
        let auth = controller_for(&server, store.clone());

        auth.login("a@b.com", "secret").await.unwrap();
        assert_eq!(store.get(), Some(Credential::new(" tok1 ")));
    }

    #[tokio::test]
    async fn login_rejects_a_blank_token() {
        if !can_bind_localhost() {
            eprintln!("Skipping test: cannot bind localhost");
            return;
        }
        let server = MockServer::start().await;
        mount_login(&server, "   ").await;
        let store = Arc::new(MemoryCredentialStore::new());
        let auth = controller_for(&server, store.clone());

        let failure = auth.login("a@b.com", "secret").await.unwrap_err();
        assert_eq!(failure.message, "Login failed");
        assert!(matches!(failure.source, Some(AppError::Parse(_))));
        assert!(store.get().is_none());
        assert!(!auth.api().authenticator().is_attached());
    }

    #[tokio::test]
    async fn change_password_waits_for_a_running_login() {
        if !can_bind_localhost() {
            eprintln!("Skipping test: cannot bind localhost");
            return;
        }
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/auth/login"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"access_token": "tok1"}))
                    .set_delay(Duration::from_millis(100)),
            )
            .mount(&server)
            .await;
        mount_profile(&server, "tok1", "student").await;
        Mock::given(method("POST"))
            .and(path("/api/profile/change-password"))
            .and(header("Authorization", "Bearer tok1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"message": "ok"})))
            .expect(1)
            .mount(&server)
            .await;
        let auth = controller_for(&server, Arc::new(MemoryCredentialStore::new()));
        auth.initialize().await;

        let (login, change) = tokio::join!(auth.login("a@b.com", "secret"), async {
            tokio::time::sleep(Duration::from_millis(20)).await;
            auth.change_password("old", "new").await
        });
        login.unwrap();
        change.unwrap();
    }
}
