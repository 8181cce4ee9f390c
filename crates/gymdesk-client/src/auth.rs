//! Session management.
//!
//! [`AuthApi`] owns the in-memory session state and mirrors it to the
//! durable store: login, register, and a successful manual refresh persist
//! all of the session in one write; logout and an unrecoverable token clear
//! all of it in one step. Construction restores whatever the store holds,
//! signing out if the stored token no longer parses or has expired.

use std::sync::{Arc, RwLock};

use log::{debug, warn};
use reqwest::header::AUTHORIZATION;
use url::Url;

use gymdesk_common::{AuthSession, Credentials, Profile, RegisterRequest, User};

use crate::error::{ApiError, Result};
use crate::http::{Http, map_failure};
use crate::routes;
use crate::session::{SessionStore, StoredSession};
use crate::token;

/// Session manager and `/users` endpoint surface.
pub struct AuthApi {
    http: Http,
    store: Arc<dyn SessionStore>,
    refresh_client: reqwest::Client,
    refresh_url: Url,
    current_user: RwLock<Option<User>>,
}

impl AuthApi {
    pub(crate) fn new(
        http: Http,
        store: Arc<dyn SessionStore>,
        refresh_client: reqwest::Client,
        refresh_url: Url,
    ) -> Self {
        let api = Self {
            http,
            store,
            refresh_client,
            refresh_url,
            current_user: RwLock::new(None),
        };
        api.restore();
        api
    }

    /// Authenticate with email and password.
    ///
    /// On success the session (tokens plus user) is persisted and mirrored
    /// in memory.
    ///
    /// # Errors
    ///
    /// [`ApiError::Authentication`] on invalid credentials; transport and
    /// storage errors pass through.
    pub async fn login(&self, credentials: &Credentials) -> Result<AuthSession> {
        let session: AuthSession = self.http.post(routes::LOGIN, credentials).await?;
        self.persist(&session)?;
        Ok(session)
    }

    /// Create an account; the backend signs the new account in directly.
    ///
    /// # Errors
    ///
    /// [`ApiError::Api`] on conflicts or backend-side validation rejects.
    pub async fn register(&self, request: &RegisterRequest) -> Result<AuthSession> {
        let session: AuthSession = self.http.post(routes::REGISTER, request).await?;
        self.persist(&session)?;
        Ok(session)
    }

    /// Drop the session, in memory and on disk.
    ///
    /// Always succeeds from the caller's view; a storage failure is logged.
    pub fn logout(&self) {
        if let Ok(mut guard) = self.current_user.write() {
            *guard = None;
        }
        if let Err(e) = self.store.clear() {
            warn!("failed to clear stored session on logout: {e}");
        }
    }

    /// Whether a stored access token exists and has not expired.
    ///
    /// Absent, malformed, and expired tokens all read as "not
    /// authenticated"; this never fails.
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        match self.store.access_token() {
            Ok(Some(access_token)) => token::is_live(&access_token),
            Ok(None) => false,
            Err(e) => {
                warn!("cannot read session store: {e}");
                false
            }
        }
    }

    /// The user from the active session, if any.
    #[must_use]
    pub fn current_user(&self) -> Option<User> {
        self.current_user.read().ok().and_then(|guard| guard.clone())
    }

    /// Fetch the authenticated profile from the backend.
    pub async fn me(&self) -> Result<Profile> {
        self.http.get(routes::ME).await
    }

    /// Ask the backend whether the current user holds a permission.
    pub async fn can_do(&self, permission: &str) -> Result<bool> {
        self.http
            .get(&format!("{}/{permission}", routes::CAN_DO))
            .await
    }

    /// Exchange the stored refresh token for a new token pair.
    ///
    /// The transport does this on its own when a request meets a 401; this
    /// method is for callers that want to refresh ahead of time.
    ///
    /// # Errors
    ///
    /// [`ApiError::Authentication`] when no refresh token is stored or the
    /// backend rejects it.
    pub async fn refresh(&self) -> Result<AuthSession> {
        let refresh_token = self
            .store
            .refresh_token()?
            .ok_or_else(|| ApiError::Authentication("no refresh token stored".to_string()))?;

        let response = self
            .refresh_client
            .get(self.refresh_url.clone())
            .header(AUTHORIZATION, format!("Bearer {refresh_token}"))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await?;
            return Err(map_failure(status, &text));
        }

        let session: AuthSession = response.json().await?;
        self.persist(&session)?;
        Ok(session)
    }

    /// Persist an auth response as the active session.
    ///
    /// Fields the response omits (rotated refresh token, user) are carried
    /// over from the previous session, so the stored document stays whole.
    fn persist(&self, session: &AuthSession) -> Result<()> {
        let previous = self.store.load()?;
        let user = session
            .user
            .clone()
            .or_else(|| previous.as_ref().and_then(|s| s.current_user.clone()));
        let refresh_token = session
            .refresh_token
            .clone()
            .or_else(|| previous.and_then(|s| s.refresh_token));

        self.store.save(&StoredSession {
            access_token: session.access_token.clone(),
            refresh_token,
            current_user: user.clone(),
        })?;

        if let Ok(mut guard) = self.current_user.write() {
            *guard = user;
        }
        Ok(())
    }

    /// Restore the session from storage at construction time.
    ///
    /// An expired or unreadable token signs the profile out, mirroring the
    /// stored state to memory only when it is actually usable.
    fn restore(&self) {
        match self.store.load() {
            Ok(Some(session)) if token::is_live(&session.access_token) => {
                debug!("restored session from storage");
                if let Ok(mut guard) = self.current_user.write() {
                    *guard = session.current_user;
                }
            }
            Ok(Some(_)) => {
                debug!("stored session expired; signing out");
                self.logout();
            }
            Ok(None) => {}
            Err(e) => warn!("cannot restore session: {e}"),
        }
    }
}
