//! Persistent credential storage

use std::sync::{Arc, Mutex};

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use foodnova_storage::{Result, Storage, StorageError};
use log::debug;

use crate::types::{CredentialPair, TokenClaims};

const ACCESS_TOKEN_KEY: &str = "access_token";
const REFRESH_TOKEN_KEY: &str = "refresh_token";

/// Whatever is currently persisted. Either field may be absent.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct StoredTokens {
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
}

impl std::fmt::Debug for StoredTokens {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoredTokens")
            .field("access_token", &self.access_token.is_some())
            .field("refresh_token", &self.refresh_token.is_some())
            .finish()
    }
}

/// Sole owner of the persisted credential pair.
///
/// Clones share the same storage and the same write lock.
#[derive(Debug, Clone)]
pub struct TokenStore {
    storage: Storage,
    write_lock: Arc<Mutex<()>>,
}

impl TokenStore {
    pub fn new(storage: Storage) -> Self {
        Self {
            storage,
            write_lock: Arc::new(Mutex::new(())),
        }
    }

    /// Persists both tokens, replacing any existing pair.
    pub fn save(&self, pair: &CredentialPair) -> Result<()> {
        let _guard = self.write_lock.lock().map_err(|_| StorageError::Poisoned)?;
        self.write_pair(pair)
    }

    /// Saves `pair` only if the stored refresh token is still `expected`.
    ///
    /// Returns `false` without writing when the credentials were cleared or
    /// replaced in the meantime, e.g. a logout while a refresh was in flight.
    pub fn replace_if_current(&self, expected: &str, pair: &CredentialPair) -> Result<bool> {
        let _guard = self.write_lock.lock().map_err(|_| StorageError::Poisoned)?;
        if self.storage.get(REFRESH_TOKEN_KEY)?.as_deref() != Some(expected) {
            debug!("Stored refresh token changed, discarding refreshed credentials");
            return Ok(false);
        }
        self.write_pair(pair)?;
        Ok(true)
    }

    pub fn read(&self) -> Result<StoredTokens> {
        Ok(StoredTokens {
            access_token: self.access_token()?,
            refresh_token: self.refresh_token()?,
        })
    }

    pub fn access_token(&self) -> Result<Option<String>> {
        self.storage.get(ACCESS_TOKEN_KEY)
    }

    pub fn refresh_token(&self) -> Result<Option<String>> {
        self.storage.get(REFRESH_TOKEN_KEY)
    }

    /// Removes both tokens. Idempotent.
    pub fn clear(&self) -> Result<()> {
        let _guard = self.write_lock.lock().map_err(|_| StorageError::Poisoned)?;
        self.storage.remove(ACCESS_TOKEN_KEY)?;
        self.storage.remove(REFRESH_TOKEN_KEY)
    }

    pub fn has_access_token(&self) -> bool {
        matches!(self.access_token(), Ok(Some(_)))
    }

    /// Unverified claims of the current access token.
    pub fn claims(&self) -> Option<TokenClaims> {
        let token = self.access_token().ok()??;
        decode_claims(&token)
    }

    /// The `role` claim of the current access token, or `None` if there is
    /// no token or it cannot be decoded.
    ///
    /// The signature is not checked. Use this for UI affordances only; the
    /// server re-checks authorization on every privileged call.
    pub fn current_role(&self) -> Option<String> {
        self.claims()?.role
    }

    fn write_pair(&self, pair: &CredentialPair) -> Result<()> {
        self.storage.set(ACCESS_TOKEN_KEY, &pair.access_token)?;
        self.storage.set(REFRESH_TOKEN_KEY, &pair.refresh_token)
    }
}

/// Decodes the middle segment of a `header.payload.signature` token.
pub fn decode_claims(token: &str) -> Option<TokenClaims> {
    let mut segments = token.split('.');
    let (_header, payload, _signature) = (segments.next()?, segments.next()?, segments.next()?);
    if segments.next().is_some() {
        return None;
    }
    let bytes = URL_SAFE_NO_PAD.decode(payload.trim_end_matches('=')).ok()?;
    let payload: serde_json::Value = serde_json::from_slice(&bytes).ok()?;
    TokenClaims::from_payload(&payload)
}
