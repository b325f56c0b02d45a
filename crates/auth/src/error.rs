use foodnova_storage::StorageError;
use thiserror::Error;

/// Error type
#[derive(Error, Debug)]
pub enum AuthError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Unauthorized: {message}")]
    Unauthorized { message: String },

    #[error("Token refresh timed out")]
    RefreshTimeout,

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("JSON serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("URL parse error: {0}")]
    Url(#[from] url::ParseError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Session ended before sign-in completed")]
    MissingSession,
}

impl AuthError {
    /// Builds an error from a failed response, preferring the server's
    /// `detail` message over the raw body.
    pub(crate) fn from_response(status: u16, body: &[u8]) -> Self {
        let message = server_message(body);
        if status == 401 {
            Self::Unauthorized { message }
        } else {
            Self::Api { status, message }
        }
    }

    /// HTTP status behind this error, if it came from a response.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Api { status, .. } => Some(*status),
            Self::Unauthorized { .. } => Some(401),
            Self::Network(err) => err.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// The message a form would show for this error, when the server or a
    /// client-side check supplied one.
    pub fn display_message(&self) -> Option<&str> {
        match self {
            Self::Api { message, .. } | Self::Unauthorized { message } => Some(message.as_str()),
            Self::Forbidden(message) | Self::Validation(message) => Some(message.as_str()),
            _ => None,
        }
    }
}

pub(crate) fn server_message(body: &[u8]) -> String {
    match serde_json::from_slice::<serde_json::Value>(body) {
        Ok(value) => match value.get("detail") {
            Some(serde_json::Value::String(detail)) => detail.clone(),
            Some(detail) => detail.to_string(),
            None => value.to_string(),
        },
        Err(_) => String::from_utf8_lossy(body).into_owned(),
    }
}
