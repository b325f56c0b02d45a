//! FoodNova auth client for Rust
//!
//! This crate owns everything session related: the persisted credential
//! pair ([`TokenStore`]), the gateway every API call goes through
//! ([`HttpGateway`]), and the session lifecycle ([`SessionManager`]).

mod error;
mod gateway;
mod request;
mod session;
mod tokens;
mod types;

pub use error::AuthError;
pub use gateway::{AuthEvent, GatewayOptions, HttpGateway};
pub use request::{ApiRequest, ApiResponse, RequestBody, RequestContext};
pub use session::{SessionManager, SessionState, ADMIN_ROLE};
pub use tokens::{decode_claims, StoredTokens, TokenStore};
pub use types::{
    CredentialPair, LoginRequest, Profile, RefreshRequest, RegisterRequest, RegistrationForm,
    TokenClaims, MIN_PASSWORD_LEN,
};

pub type Result<T> = std::result::Result<T, AuthError>;
