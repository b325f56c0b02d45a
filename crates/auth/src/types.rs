//! Types exchanged with the `/auth` endpoints

use serde::{Deserialize, Serialize};

use crate::error::AuthError;

/// The access/refresh token pair returned by login and refresh.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialPair {
    pub access_token: String,
    pub refresh_token: String,
}

impl CredentialPair {
    pub fn new(access_token: impl Into<String>, refresh_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            refresh_token: refresh_token.into(),
        }
    }
}

// Tokens stay out of logs.
impl std::fmt::Debug for CredentialPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialPair")
            .field("access_token", &"<redacted>")
            .field("refresh_token", &"<redacted>")
            .finish()
    }
}

/// The authenticated user's profile (`GET /auth/me`)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub id: i64,
    pub email: String,
    #[serde(default)]
    pub full_name: String,
    pub role: String,
    #[serde(default = "default_active")]
    pub is_active: bool,
}

fn default_active() -> bool {
    true
}

/// Login request body
#[derive(Debug, Serialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Refresh request body
#[derive(Serialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

/// Registration request body
#[derive(Debug, Clone, Serialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub full_name: String,
}

/// Minimum password length accepted by the registration form
pub const MIN_PASSWORD_LEN: usize = 6;

/// What the user typed into the registration form, before it is sent.
#[derive(Debug, Clone, Default)]
pub struct RegistrationForm {
    pub full_name: String,
    pub email: String,
    pub password: String,
    pub confirm_password: String,
}

impl RegistrationForm {
    /// Client-side checks run before anything is sent.
    pub fn validate(&self) -> Result<(), AuthError> {
        if self.password != self.confirm_password {
            return Err(AuthError::Validation("Passwords do not match".to_string()));
        }
        if self.password.chars().count() < MIN_PASSWORD_LEN {
            return Err(AuthError::Validation(format!(
                "Password must be at least {} characters",
                MIN_PASSWORD_LEN
            )));
        }
        Ok(())
    }

    pub fn to_request(&self) -> RegisterRequest {
        RegisterRequest {
            email: self.email.clone(),
            password: self.password.clone(),
            full_name: self.full_name.clone(),
        }
    }
}

/// Claims read (without verification) from the access token's payload.
///
/// Each claim is read on its own; a claim with an unexpected type is `None`
/// and does not hide the others.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TokenClaims {
    pub sub: Option<String>,
    pub email: Option<String>,
    pub role: Option<String>,
    pub exp: Option<i64>,
    pub token_type: Option<String>,
}

impl TokenClaims {
    /// Picks the known claims out of a decoded payload. `None` unless the
    /// payload is a JSON object.
    pub fn from_payload(payload: &serde_json::Value) -> Option<Self> {
        let claims = payload.as_object()?;
        let text = |name: &str| claims.get(name)?.as_str().map(str::to_string);
        Some(Self {
            // numeric subjects are common
            sub: claims.get("sub").and_then(|sub| match sub {
                serde_json::Value::String(s) => Some(s.clone()),
                serde_json::Value::Number(n) => Some(n.to_string()),
                _ => None,
            }),
            email: text("email"),
            role: text("role"),
            exp: claims
                .get("exp")
                .and_then(|exp| exp.as_i64().or_else(|| exp.as_f64().map(|f| f as i64))),
            token_type: text("type"),
        })
    }
}
