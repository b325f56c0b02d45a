//! The single chokepoint for API traffic
//!
//! Every call goes through [`HttpGateway::send`], which attaches the stored
//! access token and, on a first `401`, runs one refresh-and-retry cycle:
//!
//! 1. status other than 401: returned unchanged
//! 2. 401 on a request already marked retried: terminal
//! 3. 401 otherwise: mark retried, refresh (shared with any other request
//!    that hit 401 at the same time), replay once with the new token
//!
//! A failed refresh clears the stored credentials and broadcasts
//! [`AuthEvent::SessionExpired`] so the application can send the user to the
//! login entry point.

use std::time::Duration;

use log::{debug, info, warn};
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use tokio::sync::{broadcast, Mutex};
use url::Url;

use crate::error::AuthError;
use crate::request::{ApiRequest, ApiResponse};
use crate::tokens::TokenStore;
use crate::types::{CredentialPair, RefreshRequest};

/// Session lifecycle notifications
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthEvent {
    /// A profile was committed to the session.
    SignedIn,
    /// The user logged out.
    SignedOut,
    /// The credential pair was replaced by a refresh.
    TokenRefreshed,
    /// Credentials could not be recovered and were cleared. The user should be
    /// sent to `redirect_to`.
    SessionExpired { redirect_to: String },
}

/// Gateway options
#[derive(Debug, Clone)]
pub struct GatewayOptions {
    /// Upper bound on a single refresh call
    pub refresh_timeout: Duration,
    /// Login entry point announced in [`AuthEvent::SessionExpired`]
    pub login_path: String,
    /// Refresh endpoint, relative to the API base
    pub refresh_path: String,
}

impl Default for GatewayOptions {
    fn default() -> Self {
        Self {
            refresh_timeout: Duration::from_secs(10),
            login_path: "/login".to_string(),
            refresh_path: "/auth/refresh".to_string(),
        }
    }
}

impl GatewayOptions {
    pub fn with_refresh_timeout(mut self, value: Duration) -> Self {
        self.refresh_timeout = value;
        self
    }

    pub fn with_login_path(mut self, value: &str) -> Self {
        self.login_path = value.to_string();
        self
    }
}

enum Recovery {
    /// Fresh credentials are stored; replay the request.
    Retry,
    /// No usable credentials; surface the original 401.
    GiveUp,
}

/// Authenticated HTTP dispatch with one-shot recovery from token expiry.
pub struct HttpGateway {
    api_base: String,
    http_client: Client,
    tokens: TokenStore,
    options: GatewayOptions,
    // held for the whole of a refresh so concurrent 401s share it
    refresh_lock: Mutex<()>,
    events: broadcast::Sender<AuthEvent>,
}

impl HttpGateway {
    /// Create a new gateway. `api_base` is the URL every request path is
    /// appended to, e.g. `https://shop.example.com/api`.
    pub fn new(
        api_base: &str,
        http_client: Client,
        tokens: TokenStore,
        options: GatewayOptions,
    ) -> Result<Self, AuthError> {
        Url::parse(api_base)?;
        let (events, _) = broadcast::channel(16);

        Ok(Self {
            api_base: api_base.trim_end_matches('/').to_string(),
            http_client,
            tokens,
            options,
            refresh_lock: Mutex::new(()),
            events,
        })
    }

    pub fn api_base(&self) -> &str {
        &self.api_base
    }

    pub fn tokens(&self) -> &TokenStore {
        &self.tokens
    }

    pub fn options(&self) -> &GatewayOptions {
        &self.options
    }

    /// Receiver for session lifecycle notifications
    pub fn on_auth_event(&self) -> broadcast::Receiver<AuthEvent> {
        self.events.subscribe()
    }

    pub(crate) fn emit(&self, event: AuthEvent) {
        if self.events.send(event).is_err() {
            debug!("No auth event subscribers");
        }
    }

    /// Sends `request` through the refresh-and-retry pipeline.
    ///
    /// Any status other than 401 is returned as-is, including error statuses.
    /// An unrecovered 401 becomes [`AuthError::Unauthorized`].
    pub async fn send(&self, mut request: ApiRequest) -> Result<ApiResponse, AuthError> {
        loop {
            let access_token = self.tokens.access_token()?;
            let response = self.dispatch(&request, access_token.as_deref()).await?;

            if response.status() != StatusCode::UNAUTHORIZED {
                return Ok(response);
            }
            if request.context().retried {
                debug!("{} {} rejected after retry", request.method(), request.path());
                return Err(response.into_error());
            }

            request.mark_retried();
            match self.recover(access_token.as_deref()).await? {
                Recovery::Retry => continue,
                Recovery::GiveUp => return Err(response.into_error()),
            }
        }
    }

    /// Sends `request` once with the current token attached, without any
    /// recovery. Used for the credential endpoints themselves.
    pub async fn send_once(&self, request: ApiRequest) -> Result<ApiResponse, AuthError> {
        let access_token = self.tokens.access_token()?;
        self.dispatch(&request, access_token.as_deref()).await
    }

    /// Sends `request` and decodes a successful JSON response.
    pub async fn execute<T: DeserializeOwned>(&self, request: ApiRequest) -> Result<T, AuthError> {
        self.send(request).await?.json()
    }

    /// Sends `request`, requiring a successful status and ignoring the body.
    pub async fn execute_empty(&self, request: ApiRequest) -> Result<(), AuthError> {
        self.send(request).await?.error_for_status()?;
        Ok(())
    }

    async fn dispatch(
        &self,
        request: &ApiRequest,
        access_token: Option<&str>,
    ) -> Result<ApiResponse, AuthError> {
        let url = self.url(request.path());
        debug!("{} {}", request.method(), url);

        let mut req = self.http_client.request(request.method().clone(), &url);
        if let Some(token) = access_token {
            req = req.bearer_auth(token);
        }
        let response = request.apply(req)?.send().await?;
        ApiResponse::read(response).await
    }

    fn url(&self, path: &str) -> String {
        if path.starts_with('/') {
            format!("{}{}", self.api_base, path)
        } else {
            format!("{}/{}", self.api_base, path)
        }
    }

    /// Obtains usable credentials after a 401 on a request sent with
    /// `used_token`. At most one refresh call is in flight at a time; callers
    /// that queued behind it reuse its outcome.
    async fn recover(&self, used_token: Option<&str>) -> Result<Recovery, AuthError> {
        let _guard = self.refresh_lock.lock().await;

        let current = self.tokens.access_token()?;
        if current.as_deref() != used_token {
            // settled by whoever held the lock before us
            return Ok(match current {
                Some(_) => Recovery::Retry,
                None => Recovery::GiveUp,
            });
        }

        let Some(refresh_token) = self.tokens.refresh_token()? else {
            debug!("No refresh token stored, not attempting refresh");
            return Ok(Recovery::GiveUp);
        };

        info!("Access token rejected, refreshing");
        let outcome = tokio::time::timeout(
            self.options.refresh_timeout,
            self.refresh(&refresh_token),
        )
        .await;

        match outcome {
            Ok(Ok(pair)) => {
                if self.tokens.replace_if_current(&refresh_token, &pair)? {
                    info!("Token refresh succeeded");
                    self.emit(AuthEvent::TokenRefreshed);
                    Ok(Recovery::Retry)
                } else {
                    info!("Session ended during refresh, discarding new credentials");
                    Ok(Recovery::GiveUp)
                }
            }
            Ok(Err(err)) => {
                warn!("Token refresh failed: {}", err);
                self.expire_session();
                match err {
                    AuthError::Network(_) => Err(err),
                    _ => Ok(Recovery::GiveUp),
                }
            }
            Err(_) => {
                warn!(
                    "Token refresh did not complete within {:?}",
                    self.options.refresh_timeout
                );
                self.expire_session();
                Err(AuthError::RefreshTimeout)
            }
        }
    }

    async fn refresh(&self, refresh_token: &str) -> Result<CredentialPair, AuthError> {
        let request = ApiRequest::post(self.options.refresh_path.as_str()).json(&RefreshRequest {
            refresh_token: refresh_token.to_string(),
        })?;
        self.dispatch(&request, None).await?.json()
    }

    fn expire_session(&self) {
        if let Err(err) = self.tokens.clear() {
            warn!("Failed to clear stored credentials: {}", err);
        }
        self.emit(AuthEvent::SessionExpired {
            redirect_to: self.options.login_path.clone(),
        });
    }
}

impl std::fmt::Debug for HttpGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpGateway")
            .field("api_base", &self.api_base)
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}
