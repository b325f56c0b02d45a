//! Session lifecycle: `Loading`, then `Anonymous` or `Authenticated`

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, PoisonError, RwLock, RwLockWriteGuard, Weak};

use log::{debug, error, info, warn};
use tokio::sync::broadcast;

use crate::error::AuthError;
use crate::gateway::{AuthEvent, HttpGateway};
use crate::request::ApiRequest;
use crate::tokens::TokenStore;
use crate::types::{CredentialPair, LoginRequest, Profile, RegisterRequest, RegistrationForm};

/// Role name that grants access to the admin area
pub const ADMIN_ROLE: &str = "admin";

/// Current session
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    /// Startup profile fetch has not settled yet
    Loading,
    Anonymous,
    Authenticated(Profile),
}

impl SessionState {
    pub fn user(&self) -> Option<&Profile> {
        match self {
            Self::Authenticated(profile) => Some(profile),
            _ => None,
        }
    }

    pub fn is_loading(&self) -> bool {
        matches!(self, Self::Loading)
    }
}

/// The state plus an epoch that every logout, expiry and explicit sign-in
/// advances. Work that started in an older epoch must not commit.
#[derive(Debug)]
struct SessionCell {
    state: SessionState,
    epoch: u64,
}

/// Tracks who is signed in and drives login, registration and logout.
pub struct SessionManager {
    gateway: Arc<HttpGateway>,
    state: Arc<RwLock<SessionCell>>,
    admin_role: String,
    watching: AtomicBool,
}

impl SessionManager {
    pub fn new(gateway: Arc<HttpGateway>) -> Self {
        Self {
            gateway,
            state: Arc::new(RwLock::new(SessionCell {
                state: SessionState::Loading,
                epoch: 0,
            })),
            admin_role: ADMIN_ROLE.to_string(),
            watching: AtomicBool::new(false),
        }
    }

    /// Overrides the role checked by [`is_admin`](Self::is_admin) and
    /// [`sign_in_admin`](Self::sign_in_admin).
    pub fn with_admin_role(mut self, role: &str) -> Self {
        self.admin_role = role.to_string();
        self
    }

    /// Resolves the startup `Loading` state.
    ///
    /// With a stored access token the profile is fetched (through the gateway,
    /// so an expired token is refreshed first). A failed fetch clears the
    /// credentials. Also starts following gateway events so that an expired
    /// session drops back to `Anonymous`.
    ///
    /// If the session is ended or replaced while the profile is loading, the
    /// late result is dropped and the newer state is returned.
    pub async fn start(&self) -> SessionState {
        self.watch_expiry();
        let epoch = self.epoch();

        if !self.tokens().has_access_token() {
            self.commit(epoch, SessionState::Anonymous);
            return self.state();
        }

        match self.fetch_profile().await {
            Ok(profile) => {
                let id = profile.id;
                if self.commit(epoch, SessionState::Authenticated(profile)) {
                    info!("Restored session for user {}", id);
                }
            }
            Err(err) => {
                error!("Failed to load user: {}", err);
                let mut cell = self.write();
                if cell.epoch == epoch {
                    self.clear_tokens();
                    cell.state = SessionState::Anonymous;
                }
            }
        }
        self.state()
    }

    /// Exchanges email and password for a credential pair and stores it.
    ///
    /// The session is left as it is: callers fetch the profile and commit it
    /// with [`set_user`](Self::set_user) once any role check has passed.
    pub async fn login(&self, email: &str, password: &str) -> Result<CredentialPair, AuthError> {
        let request = ApiRequest::post("/auth/login").json(&LoginRequest {
            email: email.to_string(),
            password: password.to_string(),
        })?;
        let pair: CredentialPair = self.gateway.send_once(request).await?.json()?;
        self.tokens().save(&pair)?;
        info!("Stored credentials for {}", email);
        Ok(pair)
    }

    /// Creates an account. Does not touch the session.
    pub async fn register(&self, data: &RegisterRequest) -> Result<Profile, AuthError> {
        let request = ApiRequest::post("/auth/register").json(data)?;
        self.gateway.send_once(request).await?.json()
    }

    /// `GET /auth/me`
    pub async fn fetch_profile(&self) -> Result<Profile, AuthError> {
        self.gateway.execute(ApiRequest::get("/auth/me")).await
    }

    /// Commits `profile` as the authenticated user, superseding any profile
    /// fetch still in flight.
    pub fn set_user(&self, profile: Profile) {
        info!("Signed in as user {} ({})", profile.id, profile.role);
        {
            let mut cell = self.write();
            cell.epoch += 1;
            cell.state = SessionState::Authenticated(profile);
        }
        self.gateway.emit(AuthEvent::SignedIn);
    }

    /// Clears credentials and resets to `Anonymous`. Safe in any state,
    /// including while a token refresh or profile fetch is in flight: their
    /// results are discarded.
    pub fn logout(&self) {
        {
            let mut cell = self.write();
            cell.epoch += 1;
            self.clear_tokens();
            cell.state = SessionState::Anonymous;
        }
        self.gateway.emit(AuthEvent::SignedOut);
        info!("Signed out");
    }

    /// Re-fetches the profile if a token is present. Failures are logged and
    /// do not end the session.
    pub async fn refresh_user(&self) {
        if !self.tokens().has_access_token() {
            return;
        }
        let epoch = self.epoch();
        match self.fetch_profile().await {
            Ok(profile) => {
                if !self.commit(epoch, SessionState::Authenticated(profile)) {
                    debug!("Session changed during profile refresh, discarding result");
                }
            }
            Err(err) => warn!("Failed to refresh user: {}", err),
        }
    }

    /// Login, fetch the profile, commit it.
    ///
    /// Fails with [`AuthError::MissingSession`] if a logout or expiry lands
    /// before the profile arrives.
    pub async fn sign_in(&self, email: &str, password: &str) -> Result<Profile, AuthError> {
        let epoch = self.epoch();
        self.login(email, password).await?;
        let profile = self.fetch_profile().await?;
        self.commit_user(epoch, profile)
    }

    /// Like [`sign_in`](Self::sign_in), but only commits the session when the
    /// profile carries the admin role.
    pub async fn sign_in_admin(&self, email: &str, password: &str) -> Result<Profile, AuthError> {
        let epoch = self.epoch();
        self.login(email, password).await?;
        let profile = self.fetch_profile().await?;
        if profile.role != self.admin_role {
            warn!("User {} is not an admin", profile.id);
            return Err(AuthError::Forbidden("Admin access required".to_string()));
        }
        self.commit_user(epoch, profile)
    }

    /// Validate the form, create the account, then sign in with it.
    pub async fn register_and_sign_in(&self, form: &RegistrationForm) -> Result<Profile, AuthError> {
        form.validate()?;
        self.register(&form.to_request()).await?;
        self.sign_in(&form.email, &form.password).await
    }

    pub fn state(&self) -> SessionState {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .state
            .clone()
    }

    pub fn user(&self) -> Option<Profile> {
        self.state().user().cloned()
    }

    pub fn is_loading(&self) -> bool {
        self.state().is_loading()
    }

    /// Whether an access token is stored, regardless of the session state.
    pub fn is_authenticated(&self) -> bool {
        self.tokens().has_access_token()
    }

    /// Whether the committed profile has the admin role.
    pub fn is_admin(&self) -> bool {
        self.state()
            .user()
            .map_or(false, |profile| profile.role == self.admin_role)
    }

    /// Role hint decoded from the stored access token. See
    /// [`TokenStore::current_role`].
    pub fn current_role(&self) -> Option<String> {
        self.tokens().current_role()
    }

    pub fn on_auth_event(&self) -> broadcast::Receiver<AuthEvent> {
        self.gateway.on_auth_event()
    }

    pub fn gateway(&self) -> &Arc<HttpGateway> {
        &self.gateway
    }

    fn tokens(&self) -> &TokenStore {
        self.gateway.tokens()
    }

    fn clear_tokens(&self) {
        if let Err(err) = self.tokens().clear() {
            warn!("Failed to clear stored credentials: {}", err);
        }
    }

    fn write(&self) -> RwLockWriteGuard<'_, SessionCell> {
        write_cell(&self.state)
    }

    fn epoch(&self) -> u64 {
        self.state.read().unwrap_or_else(PoisonError::into_inner).epoch
    }

    /// Sets `next` unless the epoch moved on since `epoch` was read.
    fn commit(&self, epoch: u64, next: SessionState) -> bool {
        let mut cell = self.write();
        if cell.epoch != epoch {
            return false;
        }
        cell.state = next;
        true
    }

    fn commit_user(&self, epoch: u64, profile: Profile) -> Result<Profile, AuthError> {
        {
            let mut cell = self.write();
            if cell.epoch != epoch {
                warn!("Session ended while signing in user {}", profile.id);
                // credentials saved by our login outlived the logout
                if cell.state.user().is_none() {
                    self.clear_tokens();
                }
                return Err(AuthError::MissingSession);
            }
            cell.epoch += 1;
            cell.state = SessionState::Authenticated(profile.clone());
        }
        info!("Signed in as user {} ({})", profile.id, profile.role);
        self.gateway.emit(AuthEvent::SignedIn);
        Ok(profile)
    }

    fn watch_expiry(&self) {
        if self.watching.swap(true, Ordering::SeqCst) {
            return;
        }
        let mut events = self.gateway.on_auth_event();
        let tokens = self.tokens().clone();
        let state: Weak<RwLock<SessionCell>> = Arc::downgrade(&self.state);

        tokio::spawn(async move {
            loop {
                match events.recv().await {
                    Ok(AuthEvent::SessionExpired { .. }) => {
                        let Some(state) = state.upgrade() else { break };
                        expire(&state, &tokens);
                    }
                    Ok(_) => {
                        if state.strong_count() == 0 {
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!("Missed {} auth events", skipped);
                        // an expiry may have been among them
                        let Some(state) = state.upgrade() else { break };
                        expire(&state, &tokens);
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        });
    }
}

fn write_cell(lock: &RwLock<SessionCell>) -> RwLockWriteGuard<'_, SessionCell> {
    lock.write().unwrap_or_else(PoisonError::into_inner)
}

/// Drops to `Anonymous` after the gateway cleared the credentials. Credentials
/// present again mean a newer sign-in, which is left alone.
fn expire(lock: &RwLock<SessionCell>, tokens: &TokenStore) {
    let mut cell = write_cell(lock);
    if tokens.has_access_token() {
        debug!("Ignoring expiry, a newer session holds credentials");
        return;
    }
    info!("Session expired, resetting to anonymous");
    cell.epoch += 1;
    cell.state = SessionState::Anonymous;
}

impl std::fmt::Debug for SessionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionManager")
            .field("state", &self.state())
            .field("admin_role", &self.admin_role)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use foodnova_storage::Storage;
    use serde_json::json;

    use super::*;
    use crate::gateway::GatewayOptions;

    fn manager() -> SessionManager {
        let gateway = HttpGateway::new(
            "http://localhost:8000/api",
            reqwest::Client::new(),
            TokenStore::new(Storage::in_memory()),
            GatewayOptions::default(),
        )
        .unwrap();
        SessionManager::new(Arc::new(gateway))
    }

    fn profile() -> Profile {
        serde_json::from_value(json!({
            "id": 7,
            "email": "ada@example.com",
            "full_name": "Ada Obi",
            "role": "admin",
            "is_active": true
        }))
        .unwrap()
    }

    #[test]
    fn test_poisoned_lock_keeps_committed_state() {
        let session = manager();
        session.set_user(profile());

        let poisoned = std::thread::scope(|s| {
            s.spawn(|| {
                let _cell = session.state.write().unwrap();
                panic!("poison the session lock");
            })
            .join()
        });
        assert!(poisoned.is_err());
        assert!(session.state.is_poisoned());

        assert_eq!(session.user(), Some(profile()));
        assert!(session.is_admin());

        session.logout();
        assert_eq!(session.state(), SessionState::Anonymous);
    }

    #[test]
    fn test_stale_commit_is_dropped() {
        let session = manager();
        let epoch = session.epoch();
        session.logout();

        assert!(!session.commit(epoch, SessionState::Authenticated(profile())));
        assert_eq!(session.state(), SessionState::Anonymous);
        assert!(matches!(
            session.commit_user(epoch, profile()),
            Err(AuthError::MissingSession)
        ));
        assert_eq!(session.user(), None);
    }
}
