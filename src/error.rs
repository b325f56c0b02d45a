//! Error handling for the FoodNova client

use std::fmt;

use foodnova_auth::AuthError;
use foodnova_storage::StorageError;
use thiserror::Error;

/// Shown when an order fails and the server gave no message
pub const ORDER_FAILED_MESSAGE: &str = "Failed to place order. Please try again.";

/// Result type
pub type Result<T> = std::result::Result<T, Error>;

/// Unified error type for the FoodNova client
#[derive(Error, Debug)]
pub enum Error {
    /// Session, gateway or API errors
    #[error("{0}")]
    Auth(#[from] AuthError),

    /// Persistence errors
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// HTTP client construction errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization or deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// URL parsing errors
    #[error("URL error: {0}")]
    Url(#[from] url::ParseError),

    /// Missing or invalid configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// Checkout was attempted with nothing in the cart
    #[error("Your cart is empty")]
    EmptyCart,
}

impl Error {
    /// Create a new configuration error
    pub fn config<T: fmt::Display>(msg: T) -> Self {
        Error::Config(msg.to_string())
    }

    /// The server's own message for this failure, if it sent a non-blank one.
    pub fn server_message(&self) -> Option<&str> {
        match self {
            Error::Auth(err) => err.display_message().filter(|m| !m.trim().is_empty()),
            _ => None,
        }
    }

    /// The server's message, or `fallback` when there is none.
    pub fn message_or<'a>(&'a self, fallback: &'a str) -> &'a str {
        self.server_message().unwrap_or(fallback)
    }

    /// HTTP status of the failed call, if there was one
    pub fn status(&self) -> Option<u16> {
        match self {
            Error::Auth(err) => err.status(),
            _ => None,
        }
    }
}
