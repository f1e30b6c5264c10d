//! HTTP helpers for the portal's JSON API with a shared timeout policy and
//! consistent error classification. Every request picks up the default
//! `Authorization` header from the [`RequestAuthenticator`]; callers never set
//! it by hand. Bodies of failed responses are reduced to the backend's
//! `{"error": ...}` message so raw server output never reaches the UI.

use super::{authenticator::RequestAuthenticator, config::ClientConfig, errors::AppError};
use reqwest::{
    Method, Response,
    header::{AUTHORIZATION, HeaderValue},
};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use tracing::{Instrument, debug, info_span};

/// Maximum number of error message characters surfaced to the UI.
const MAX_ERROR_CHARS: usize = 200;
const VERIFY_EMAIL_SEGMENT: &str = "/verify-email/";

#[derive(Deserialize)]
struct ErrorBody {
    error: Option<String>,
}

/// Shared client for the portal API. Cheap to clone; clones share the
/// connection pool and the default authorization header.
#[derive(Clone, Debug)]
pub struct ApiClient {
    client: reqwest::Client,
    base_url: String,
    authenticator: RequestAuthenticator,
}

impl ApiClient {
    /// Builds a client from the configuration and the process-wide authenticator.
    ///
    /// # Errors
    /// Returns `AppError::Config` if the base URL is invalid or the HTTP client cannot be built.
    pub fn new(config: &ClientConfig, authenticator: RequestAuthenticator) -> Result<Self, AppError> {
        config.validate()?;
        let client = reqwest::Client::builder()
            .user_agent(crate::APP_USER_AGENT)
            .timeout(config.timeout)
            .build()
            .map_err(|err| AppError::Config(format!("Failed to build HTTP client: {err}")))?;

        Ok(Self {
            client,
            base_url: config.api_base_url.clone(),
            authenticator,
        })
    }

    #[must_use]
    pub fn authenticator(&self) -> &RequestAuthenticator {
        &self.authenticator
    }

    /// Joins the configured base URL and `path`.
    #[must_use]
    pub fn endpoint_url(&self, path: &str) -> String {
        build_url_with_base(&self.base_url, path)
    }

    /// Fetches JSON with the default authorization header.
    ///
    /// # Errors
    /// Returns a classified `AppError` for transport, HTTP or decoding failures.
    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, AppError> {
        let response = self.send(Method::GET, path, None, None).await?;
        handle_json_response(response).await
    }

    /// Fetches JSON with an explicit bearer value instead of the default header.
    /// Used to probe a freshly issued token before it becomes the default.
    ///
    /// # Errors
    /// Returns a classified `AppError` for transport, HTTP or decoding failures.
    pub async fn get_json_with_bearer<T: DeserializeOwned>(
        &self,
        path: &str,
        bearer: &HeaderValue,
    ) -> Result<T, AppError> {
        let response = self
            .send(Method::GET, path, None, Some(bearer.clone()))
            .await?;
        handle_json_response(response).await
    }

    /// Posts JSON and parses a JSON response.
    ///
    /// # Errors
    /// Returns a classified `AppError` for encoding, transport, HTTP or decoding failures.
    pub async fn post_json<B: Serialize, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, AppError> {
        self.send_json(Method::POST, path, Some(body)).await
    }

    /// Posts JSON and ignores the response body on success.
    ///
    /// # Errors
    /// Returns a classified `AppError` for encoding, transport or HTTP failures.
    pub async fn post_json_empty<B: Serialize>(&self, path: &str, body: &B) -> Result<(), AppError> {
        let payload = encode(body)?;
        let response = self.send(Method::POST, path, Some(payload), None).await?;
        handle_empty_response(response).await
    }

    /// Posts an empty body, used to end a session.
    ///
    /// # Errors
    /// Returns a classified `AppError` for transport or HTTP failures.
    pub async fn post_empty(&self, path: &str) -> Result<(), AppError> {
        let response = self.send(Method::POST, path, None, None).await?;
        handle_empty_response(response).await
    }

    /// Sends JSON with `PUT` and parses a JSON response.
    ///
    /// # Errors
    /// Returns a classified `AppError` for encoding, transport, HTTP or decoding failures.
    pub async fn put_json<B: Serialize, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, AppError> {
        self.send_json(Method::PUT, path, Some(body)).await
    }

    /// Generic JSON call for the listing, application and admin endpoints.
    ///
    /// # Errors
    /// Returns a classified `AppError` for encoding, transport, HTTP or decoding failures.
    pub async fn send_json<B: Serialize, T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
    ) -> Result<T, AppError> {
        let payload = body.map(encode).transpose()?;
        let response = self.send(method, path, payload, None).await?;
        handle_json_response(response).await
    }

    async fn send(
        &self,
        method: Method,
        path: &str,
        payload: Option<String>,
        bearer: Option<HeaderValue>,
    ) -> Result<Response, AppError> {
        let url = self.endpoint_url(path);
        let span = info_span!(
            "api.request",
            http.method = %method.as_str(),
            url = %loggable_url(&url)
        );

        let mut builder = self.client.request(method, &url);
        if let Some(value) = bearer.or_else(|| self.authenticator.current()) {
            builder = builder.header(AUTHORIZATION, value);
        }
        if let Some(payload) = payload {
            builder = builder
                .header("Content-Type", "application/json")
                .body(payload);
        }

        let response = builder
            .send()
            .instrument(span)
            .await
            .map_err(map_request_error)?;
        debug!(status = response.status().as_u16(), "api response");
        Ok(response)
    }
}

fn encode<B: Serialize>(body: &B) -> Result<String, AppError> {
    serde_json::to_string(body)
        .map_err(|err| AppError::Serialization(format!("Failed to encode request: {err}")))
}

/// Builds a URL from an explicit base URL and the provided path.
fn build_url_with_base(base_url: &str, path: &str) -> String {
    let base = base_url.trim().trim_end_matches('/');
    let path = path.trim();

    if base.is_empty() {
        path.to_string()
    } else {
        format!("{}/{}", base, path.trim_start_matches('/'))
    }
}

/// Drops one-shot tokens carried in the path (email verification links).
fn loggable_url(url: &str) -> &str {
    url.find(VERIFY_EMAIL_SEGMENT)
        .map_or(url, |index| &url[..index + VERIFY_EMAIL_SEGMENT.len()])
}

/// Maps transport errors into `AppError` variants with timeout detection.
fn map_request_error(err: reqwest::Error) -> AppError {
    if err.is_timeout() {
        AppError::Timeout("Request timed out. Please try again.".to_string())
    } else if err.is_builder() {
        AppError::Serialization(format!("Failed to build request: {err}"))
    } else {
        AppError::Network(format!("Unable to reach the server: {err}"))
    }
}

/// Parses JSON responses and surfaces HTTP errors with the backend message.
async fn handle_json_response<T: DeserializeOwned>(response: Response) -> Result<T, AppError> {
    if response.status().is_success() {
        let bytes = response
            .bytes()
            .await
            .map_err(|err| AppError::Network(format!("Failed to read response: {err}")))?;
        serde_json::from_slice::<T>(&bytes)
            .map_err(|err| AppError::Parse(format!("Failed to decode response: {err}")))
    } else {
        Err(http_error(response).await)
    }
}

/// Handles empty responses and returns HTTP errors when needed.
async fn handle_empty_response(response: Response) -> Result<(), AppError> {
    if response.status().is_success() {
        Ok(())
    } else {
        Err(http_error(response).await)
    }
}

async fn http_error(response: Response) -> AppError {
    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    AppError::Http {
        status,
        message: error_message(&body),
    }
}

/// Extracts the backend's `error` field, trimmed and truncated.
fn error_message(body: &str) -> Option<String> {
    let parsed: ErrorBody = serde_json::from_str(body).ok()?;
    let message = parsed.error?;
    let trimmed = message.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.chars().take(MAX_ERROR_CHARS).collect())
    }
}
