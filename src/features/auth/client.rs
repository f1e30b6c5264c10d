//! Client wrappers for the portal auth and profile endpoints. These helpers
//! centralize paths and payload shapes, keeping the controller free of
//! request plumbing. None of them touch session state.

use crate::{
    app_lib::{ApiClient, AppError},
    features::auth::types::{
        ChangePasswordRequest, Identity, LoginRequest, LoginResponse, MessageResponse,
        ProfilePatch, ProfileUpdateResponse, RegisterRequest,
    },
};
use reqwest::header::HeaderValue;

pub const LOGIN_PATH: &str = "/api/auth/login";
pub const REGISTER_PATH: &str = "/api/auth/register";
pub const LOGOUT_PATH: &str = "/api/auth/logout";
pub const PROFILE_PATH: &str = "/api/profile/";
pub const CHANGE_PASSWORD_PATH: &str = "/api/profile/change-password";
pub const VERIFY_EMAIL_PATH: &str = "/api/auth/verify-email";

/// Exchanges email and password for a bearer token.
/// The request carries the password and must never be logged.
pub async fn login(api: &ApiClient, request: &LoginRequest) -> Result<LoginResponse, AppError> {
    api.post_json(LOGIN_PATH, request).await
}

/// Creates an account. Does not sign the user in.
pub async fn register(api: &ApiClient, request: &RegisterRequest) -> Result<(), AppError> {
    api.post_json_empty(REGISTER_PATH, request).await
}

/// Tells the backend the session is over, using the default header.
pub async fn logout(api: &ApiClient) -> Result<(), AppError> {
    api.post_empty(LOGOUT_PATH).await
}

/// Fetches the profile for the currently attached credential.
pub async fn fetch_profile(api: &ApiClient) -> Result<Identity, AppError> {
    api.get_json(PROFILE_PATH).await
}

/// Fetches the profile for an explicit bearer value that is not attached yet.
pub async fn fetch_profile_with(
    api: &ApiClient,
    bearer: &HeaderValue,
) -> Result<Identity, AppError> {
    api.get_json_with_bearer(PROFILE_PATH, bearer).await
}

/// Sends a profile patch and returns the backend's view of the profile.
pub async fn update_profile(api: &ApiClient, patch: &ProfilePatch) -> Result<Identity, AppError> {
    let response: ProfileUpdateResponse = api.put_json(PROFILE_PATH, patch).await?;
    Ok(response.into_identity())
}

/// Changes the password of the signed-in user.
pub async fn change_password(
    api: &ApiClient,
    request: &ChangePasswordRequest,
) -> Result<(), AppError> {
    api.post_json_empty(CHANGE_PASSWORD_PATH, request).await
}

/// Consumes an email verification token and returns the backend's message.
/// Stateless: verifying an address never signs anyone in.
pub async fn verify_email(api: &ApiClient, token: &str) -> Result<String, AppError> {
    let token = token.trim();
    if token.is_empty() || token.contains('/') {
        return Err(AppError::Serialization(
            "Verification token is malformed.".to_string(),
        ));
    }
    let path = format!("{VERIFY_EMAIL_PATH}/{token}");
    let response: MessageResponse = api.get_json(&path).await?;
    Ok(response
        .message
        .unwrap_or_else(|| "Email verified.".to_string()))
}
