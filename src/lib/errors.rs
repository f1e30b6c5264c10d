use thiserror::Error;

/// Classified failure of a call to the portal API.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum AppError {
    #[error("Config error: {0}")]
    Config(String),
    #[error("Network error: {0}")]
    Network(String),
    #[error("Timeout: {0}")]
    Timeout(String),
    /// Non-2xx response. `message` is the backend's `{"error": ...}` payload when it sent one.
    #[error("Request failed ({status}): {}", message.as_deref().unwrap_or("no details"))]
    Http { status: u16, message: Option<String> },
    #[error("Response error: {0}")]
    Parse(String),
    #[error("Request error: {0}")]
    Serialization(String),
}

impl AppError {
    /// Message the backend attached to an HTTP failure, if any.
    #[must_use]
    pub fn backend_message(&self) -> Option<&str> {
        match self {
            Self::Http {
                message: Some(message),
                ..
            } => Some(message.as_str()),
            _ => None,
        }
    }

    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Http { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// True for failures that never reached a well-formed backend answer.
    #[must_use]
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            Self::Network(_) | Self::Timeout(_) | Self::Parse(_) | Self::Serialization(_)
        )
    }
}
