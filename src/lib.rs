//! FoodNova Rust Client Library
//!
//! A Rust client for the FoodNova storefront API: session handling with
//! automatic token refresh, a persistent cart, and the catalog, order and
//! admin endpoints.

pub mod checkout;
pub mod config;
pub mod error;
pub mod store;

use std::sync::Arc;

use foodnova_auth::{GatewayOptions, HttpGateway, SessionManager, SessionState, TokenStore};
use foodnova_cart::CartStore;
use foodnova_storage::{MemoryStorage, Namespace, Storage, StorageBackend};
use reqwest::Client;

use crate::error::Result;
use crate::store::{AdminClient, StoreClient};

pub use crate::checkout::CheckoutDetails;
pub use crate::config::ClientConfig;
pub use crate::error::Error;
pub use foodnova_auth as auth;
pub use foodnova_cart as cart;
pub use foodnova_storage as storage;

/// The main entry point for the FoodNova client
///
/// Construction hydrates the cart from storage before anything else can
/// touch it. Call [`start`](Self::start) once to resolve the stored session.
pub struct Foodnova {
    config: ClientConfig,
    storage: Storage,
    gateway: Arc<HttpGateway>,
    session: SessionManager,
    cart: CartStore,
}

impl Foodnova {
    /// Create a client that keeps its state in memory
    ///
    /// # Example
    ///
    /// ```
    /// use foodnova::{ClientConfig, Foodnova};
    ///
    /// let config = ClientConfig::new("https://shop.example.com").unwrap();
    /// let client = Foodnova::new(config).unwrap();
    /// assert!(client.cart().is_empty());
    /// ```
    pub fn new(config: ClientConfig) -> Result<Self> {
        Self::with_backend(config, Arc::new(MemoryStorage::new()))
    }

    /// Create a client persisting credentials and cart in `backend`
    pub fn with_backend(config: ClientConfig, backend: Arc<dyn StorageBackend>) -> Result<Self> {
        let storage = Storage::new(backend, Namespace::new(&config.storage_namespace));
        let cart = CartStore::load(storage.clone());

        let mut builder = Client::builder();
        if let Some(timeout) = config.request_timeout {
            builder = builder.timeout(timeout);
        }
        let http_client = builder.build()?;

        let options = GatewayOptions::default()
            .with_refresh_timeout(config.refresh_timeout)
            .with_login_path(&config.login_path);
        let gateway = Arc::new(HttpGateway::new(
            &config.api_base(),
            http_client,
            TokenStore::new(storage.clone()),
            options,
        )?);
        let session = SessionManager::new(gateway.clone()).with_admin_role(&config.admin_role);

        Ok(Self {
            config,
            storage,
            gateway,
            session,
            cart,
        })
    }

    /// Resolves the stored session. See [`SessionManager::start`].
    pub async fn start(&self) -> SessionState {
        self.session.start().await
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn storage(&self) -> &Storage {
        &self.storage
    }

    pub fn gateway(&self) -> &Arc<HttpGateway> {
        &self.gateway
    }

    pub fn session(&self) -> &SessionManager {
        &self.session
    }

    pub fn cart(&self) -> &CartStore {
        &self.cart
    }

    /// Catalog and order endpoints
    pub fn store(&self) -> StoreClient {
        StoreClient::new(self.gateway.clone())
    }

    /// Admin endpoints
    pub fn admin(&self) -> AdminClient {
        AdminClient::new(self.gateway.clone())
    }
}

impl std::fmt::Debug for Foodnova {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Foodnova")
            .field("api_base", &self.gateway.api_base())
            .field("session", &self.session)
            .field("cart_items", &self.cart.len())
            .finish()
    }
}

/// A convenience module for common imports
pub mod prelude {
    pub use crate::checkout::CheckoutDetails;
    pub use crate::config::ClientConfig;
    pub use crate::error::Error;
    pub use crate::store::format_price;
    pub use crate::Foodnova;
    pub use foodnova_auth::{AuthEvent, Profile, SessionState};
    pub use foodnova_cart::CartItem;
}
