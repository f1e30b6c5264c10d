//! Client configuration for the API base address, the durable credential
//! location and the request timeout. Values come from build-time environment
//! variables, then runtime environment variables, then explicit overrides
//! (CLI flags). Configuration values are public; do not store secrets here.

use super::errors::AppError;
use std::{env, path::PathBuf, time::Duration};
use url::Url;

pub const DEFAULT_API_BASE_URL: &str = "http://127.0.0.1:5002";
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

pub const ENV_API_URL: &str = "SCHOLARSHIP_API_URL";
pub const ENV_CREDENTIAL_PATH: &str = "SCHOLARSHIP_CREDENTIAL_PATH";
pub const ENV_TIMEOUT_SECS: &str = "SCHOLARSHIP_TIMEOUT_SECS";

const CREDENTIAL_DIR: &str = "scholarship-client";
const CREDENTIAL_FILE: &str = "session.json";

/// Client configuration shared by the API client and the credential store.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClientConfig {
    pub api_base_url: String,
    pub credential_path: PathBuf,
    pub timeout: Duration,
}

/// Optional values that replace loaded configuration when present.
#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub api_base_url: Option<String>,
    pub credential_path: Option<String>,
    pub timeout_secs: Option<u64>,
}

impl ClientConfig {
    /// Loads config from build-time environment variables and applies runtime overrides.
    #[must_use]
    pub fn load() -> Self {
        let api_base_url = option_env!("SCHOLARSHIP_API_URL").unwrap_or(DEFAULT_API_BASE_URL);

        let mut config = Self {
            api_base_url: api_base_url.to_string(),
            credential_path: default_credential_path(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        };

        config.apply(runtime_overrides());
        config
    }

    /// Applies explicit overrides on top of the current values.
    pub fn apply(&mut self, overrides: ConfigOverrides) {
        if let Some(value) = overrides.api_base_url.as_deref().and_then(normalize_value) {
            self.api_base_url = value;
        }
        if let Some(value) = overrides.credential_path.as_deref().and_then(normalize_value) {
            self.credential_path = PathBuf::from(value);
        }
        if let Some(value) = overrides.timeout_secs.filter(|secs| *secs > 0) {
            self.timeout = Duration::from_secs(value);
        }
    }

    /// Checks that the base address is an absolute http(s) URL.
    ///
    /// # Errors
    /// Returns `AppError::Config` if the URL cannot be parsed or uses another scheme.
    pub fn validate(&self) -> Result<(), AppError> {
        let url = Url::parse(self.api_base_url.trim())
            .map_err(|err| AppError::Config(format!("Invalid API base URL: {err}")))?;
        match url.scheme() {
            "http" | "https" => Ok(()),
            scheme => Err(AppError::Config(format!(
                "Unsupported API base URL scheme: {scheme}"
            ))),
        }
    }
}

fn runtime_overrides() -> ConfigOverrides {
    ConfigOverrides {
        api_base_url: env::var(ENV_API_URL).ok(),
        credential_path: env::var(ENV_CREDENTIAL_PATH).ok(),
        timeout_secs: env::var(ENV_TIMEOUT_SECS)
            .ok()
            .and_then(|value| value.trim().parse().ok()),
    }
}

fn default_credential_path() -> PathBuf {
    let base = env::var("XDG_CONFIG_HOME")
        .ok()
        .and_then(|value| normalize_value(&value))
        .map(PathBuf::from)
        .or_else(|| {
            env::var("HOME")
                .ok()
                .and_then(|value| normalize_value(&value))
                .map(|home| PathBuf::from(home).join(".config"))
        })
        .unwrap_or_else(|| PathBuf::from("."));

    base.join(CREDENTIAL_DIR).join(CREDENTIAL_FILE)
}

fn normalize_value(value: &str) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}
