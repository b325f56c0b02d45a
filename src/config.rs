//! Configuration options for the FoodNova client

use std::env;
use std::time::Duration;

use url::Url;

use crate::error::{Error, Result};

/// Environment variable holding the backend base URL
pub const BACKEND_URL_ENV: &str = "FOODNOVA_BACKEND_URL";

/// Optional environment variable overriding the storage namespace
pub const STORAGE_NAMESPACE_ENV: &str = "FOODNOVA_STORAGE_NAMESPACE";

/// Configuration options for the FoodNova client
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Backend origin, e.g. `https://shop.example.com`
    pub base_url: Url,

    /// Prefix every API route lives under
    pub api_prefix: String,

    /// Namespace for persisted keys
    pub storage_namespace: String,

    /// Where an expired session sends the user
    pub login_path: String,

    /// Timeout for each HTTP request
    pub request_timeout: Option<Duration>,

    /// Upper bound on a token refresh call
    pub refresh_timeout: Duration,

    /// Role that unlocks the admin area
    pub admin_role: String,
}

impl ClientConfig {
    /// Creates a configuration with defaults for everything but the URL.
    pub fn new(base_url: &str) -> Result<Self> {
        Ok(Self {
            base_url: Url::parse(base_url)?,
            api_prefix: "/api".to_string(),
            storage_namespace: "foodnova".to_string(),
            login_path: "/login".to_string(),
            request_timeout: Some(Duration::from_secs(30)),
            refresh_timeout: Duration::from_secs(10),
            admin_role: foodnova_auth::ADMIN_ROLE.to_string(),
        })
    }

    /// Reads `FOODNOVA_BACKEND_URL` and, if set, `FOODNOVA_STORAGE_NAMESPACE`.
    pub fn from_env() -> Result<Self> {
        let url = env::var(BACKEND_URL_ENV)
            .map_err(|_| Error::config(format!("{} is not set", BACKEND_URL_ENV)))?;
        let config = Self::new(&url)?;
        match env::var(STORAGE_NAMESPACE_ENV) {
            Ok(namespace) if !namespace.is_empty() => Ok(config.with_storage_namespace(&namespace)),
            _ => Ok(config),
        }
    }

    /// `{base_url}{api_prefix}` without a trailing slash
    pub fn api_base(&self) -> String {
        format!(
            "{}{}",
            self.base_url.as_str().trim_end_matches('/'),
            self.api_prefix.trim_end_matches('/')
        )
    }

    /// Set the API prefix
    pub fn with_api_prefix(mut self, value: &str) -> Self {
        self.api_prefix = value.to_string();
        self
    }

    /// Set the storage namespace
    pub fn with_storage_namespace(mut self, value: &str) -> Self {
        self.storage_namespace = value.to_string();
        self
    }

    /// Set the login path used when a session expires
    pub fn with_login_path(mut self, value: &str) -> Self {
        self.login_path = value.to_string();
        self
    }

    /// Set the request timeout
    pub fn with_request_timeout(mut self, value: Option<Duration>) -> Self {
        self.request_timeout = value;
        self
    }

    /// Set the refresh timeout
    pub fn with_refresh_timeout(mut self, value: Duration) -> Self {
        self.refresh_timeout = value;
        self
    }

    /// Set the admin role name
    pub fn with_admin_role(mut self, value: &str) -> Self {
        self.admin_role = value.to_string();
        self
    }
}
