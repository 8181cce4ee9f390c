//! # gymdesk-client
//!
//! Typed API client for the gymdesk gym-management backend.
//!
//! The backend owns all records and business rules; this crate provides the
//! authenticated plumbing:
//! - A bearer-token transport that recovers once from an expired access
//!   token (refresh, then a single retry) and signs the user out when the
//!   session is beyond saving
//! - A session manager mirroring the active session to durable storage
//! - Typed endpoint surfaces for members, reference data, and accounts
//!
//! ## Example
//!
//! ```no_run
//! use gymdesk_client::{ClientConfig, GymClient};
//! use gymdesk_common::{Credentials, PageQuery};
//!
//! # async fn example() -> gymdesk_client::Result<()> {
//! let gym = GymClient::new(ClientConfig::new("http://localhost:3000"))?;
//!
//! gym.auth()
//!     .login(&Credentials::new("admin@example.com", "secret"))
//!     .await?;
//!
//! let page = gym.clients().list(&PageQuery::new().with_page(1)).await?;
//! for client in &page.data {
//!     println!("{} {}", client.name, client.last_name);
//! }
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;

use url::Url;

pub mod auth;
pub mod catalog;
pub mod clients;
pub mod error;
pub mod http;
pub mod routes;
pub mod session;
pub mod token;

pub use crate::auth::AuthApi;
pub use crate::catalog::CatalogApi;
pub use crate::clients::{ClientsApi, OperationStatus};
pub use crate::error::{ApiError, ErrorBody, Result};
pub use crate::http::{BearerAuth, ClientConfig, LogSessionExpired, SessionExpiredHandler};
pub use crate::session::{FileSessionStore, MemorySessionStore, SessionStore, StoredSession};

use crate::http::{Http, build_transport};

/// Entry point bundling the endpoint surfaces over one shared transport.
///
/// All surfaces share the session store and the authenticated middleware
/// stack, so a token refreshed while serving one surface is immediately
/// visible to the others.
pub struct GymClient {
    auth: AuthApi,
    clients: ClientsApi,
    catalog: CatalogApi,
}

impl GymClient {
    /// Create a client with the default on-disk session store.
    ///
    /// # Errors
    ///
    /// Configuration errors (unparsable base URL) and storage errors
    /// (session directory cannot be created).
    pub fn new(config: ClientConfig) -> Result<Self> {
        Self::with_store(
            config,
            Arc::new(FileSessionStore::new()?),
            Arc::new(LogSessionExpired),
        )
    }

    /// Create a client over an explicit session store and expiry handler.
    ///
    /// The front end passes its own handler so a dead session can steer the
    /// user back to the login entry point.
    ///
    /// # Errors
    ///
    /// Configuration errors, such as an unparsable base URL.
    pub fn with_store(
        config: ClientConfig,
        store: Arc<dyn SessionStore>,
        on_expired: Arc<dyn SessionExpiredHandler>,
    ) -> Result<Self> {
        let transport = build_transport(&config, Arc::clone(&store), on_expired)?;
        let shared = Http::new(transport, config.base_url.clone());

        let refresh_url = Url::parse(&format!(
            "{}/{}",
            config.base_url.trim_end_matches('/'),
            routes::REFRESH
        ))
        .map_err(|e| ApiError::Configuration(format!("cannot derive refresh URL: {e}")))?;
        let refresh_client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_seconds))
            .build()?;

        Ok(Self {
            auth: AuthApi::new(shared.clone(), store, refresh_client, refresh_url),
            clients: ClientsApi::new(shared.clone()),
            catalog: CatalogApi::new(shared),
        })
    }

    /// Accounts and session state.
    #[must_use]
    pub const fn auth(&self) -> &AuthApi {
        &self.auth
    }

    /// Member records.
    #[must_use]
    pub const fn clients(&self) -> &ClientsApi {
        &self.clients
    }

    /// Reference data.
    #[must_use]
    pub const fn catalog(&self) -> &CatalogApi {
        &self.catalog
    }
}
