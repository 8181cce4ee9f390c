//! Authenticated HTTP transport.
//!
//! [`BearerAuth`] is the crate's interceptor pair: every outgoing request
//! gets the stored access token attached, and a 401 answer triggers exactly
//! one refresh-and-retry cycle before the failure is surfaced to the caller.
//! The refresh call runs on a bare [`reqwest::Client`], outside the
//! middleware stack, so it can never re-enter the interception path.
//!
//! [`Http`] layers the typed request helpers on top: URL building, JSON
//! bodies, and mapping of non-success statuses onto [`ApiError`].

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use http::Extensions;
use log::{debug, error, warn};
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderValue};
use reqwest::{Request, Response, StatusCode};
use reqwest_middleware::{ClientWithMiddleware, Middleware, Next};
use serde::Serialize;
use serde::de::DeserializeOwned;
use url::Url;

use gymdesk_common::AuthSession;

use crate::error::{ApiError, ErrorBody, Result};
use crate::session::SessionStore;

/// Invoked when a session cannot be recovered by a token refresh.
///
/// The front end decides what "go back to the login entry point" means: the
/// CLI prints a sign-in hint, a GUI would navigate to its login view. The
/// store has already been cleared by the time this fires.
pub trait SessionExpiredHandler: Send + Sync {
    /// The session is gone; the user has to authenticate again.
    fn session_expired(&self);
}

/// Default handler: logs the forced sign-out and nothing else.
pub struct LogSessionExpired;

impl SessionExpiredHandler for LogSessionExpired {
    fn session_expired(&self) {
        warn!("session expired and could not be refreshed; sign in again");
    }
}

/// Marker stored in request extensions once a request has been replayed
/// after a token refresh. A second 401 on the same request is surfaced
/// untouched instead of triggering another refresh.
#[derive(Clone, Copy)]
struct Reauthenticated;

/// Middleware that signs requests and recovers once from an expired token.
pub struct BearerAuth {
    store: Arc<dyn SessionStore>,
    refresh_url: Url,
    refresh_client: reqwest::Client,
    on_expired: Arc<dyn SessionExpiredHandler>,
}

impl BearerAuth {
    /// Create the middleware.
    ///
    /// `refresh_client` must be a bare client; the refresh call is the one
    /// request that may not be intercepted.
    pub fn new(
        store: Arc<dyn SessionStore>,
        refresh_url: Url,
        refresh_client: reqwest::Client,
        on_expired: Arc<dyn SessionExpiredHandler>,
    ) -> Self {
        Self {
            store,
            refresh_url,
            refresh_client,
            on_expired,
        }
    }

    /// Obtain a usable access token after a 401, or `None` if the session
    /// is beyond recovery.
    ///
    /// `attached` is the token the failed request carried. If the store
    /// already holds a different one, another process rotated the tokens
    /// concurrently and that token is used as-is; otherwise the refresh
    /// endpoint is called once.
    async fn recover_token(&self, attached: Option<&str>) -> Option<String> {
        let session = match self.store.load() {
            Ok(session) => session,
            Err(e) => {
                warn!("cannot read session store during token recovery: {e}");
                return None;
            }
        };

        if let Some(session) = &session
            && Some(session.access_token.as_str()) != attached
        {
            debug!("access token was rotated concurrently; replaying with the stored token");
            return Some(session.access_token.clone());
        }

        let refresh_token = session.and_then(|s| s.refresh_token)?;

        let bearer = format!("Bearer {refresh_token}");
        let response = match self
            .refresh_client
            .get(self.refresh_url.clone())
            .header(AUTHORIZATION, bearer)
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => {
                // A network failure on the refresh call counts as a refresh
                // failure; it is not retried further.
                warn!("token refresh failed to reach the backend: {e}");
                return None;
            }
        };

        if !response.status().is_success() {
            warn!("token refresh rejected with status {}", response.status().as_u16());
            return None;
        }

        let auth: AuthSession = match response.json().await {
            Ok(auth) => auth,
            Err(e) => {
                warn!("token refresh answered with an unreadable body: {e}");
                return None;
            }
        };

        if let Err(e) = self
            .store
            .update_tokens(&auth.access_token, auth.refresh_token.as_deref())
        {
            warn!("failed to persist refreshed tokens: {e}");
            return None;
        }

        debug!("access token refreshed");
        Some(auth.access_token)
    }

    /// Refresh failed or was impossible: drop the session and tell the UI.
    fn force_sign_out(&self) {
        if let Err(e) = self.store.clear() {
            warn!("failed to clear session after refresh failure: {e}");
        }
        self.on_expired.session_expired();
    }
}

fn bearer_header(token: &str) -> Option<HeaderValue> {
    HeaderValue::from_str(&format!("Bearer {token}")).ok()
}

#[async_trait]
impl Middleware for BearerAuth {
    async fn handle(
        &self,
        mut req: Request,
        extensions: &mut Extensions,
        next: Next<'_>,
    ) -> reqwest_middleware::Result<Response> {
        let attached = match self.store.access_token() {
            Ok(token) => token,
            Err(e) => {
                warn!("cannot read session store, sending request unsigned: {e}");
                None
            }
        };

        if let Some(value) = attached.as_deref().and_then(bearer_header) {
            req.headers_mut().insert(AUTHORIZATION, value);
        }

        // Kept only for the duration of one refresh-and-retry cycle.
        let replay = req.try_clone();

        debug!("{} {}", req.method(), req.url());
        let response = next.clone().run(req, extensions).await?;

        if response.status() != StatusCode::UNAUTHORIZED {
            return Ok(response);
        }
        if extensions.get::<Reauthenticated>().is_some() {
            debug!("401 on an already-replayed request; surfacing");
            return Ok(response);
        }
        let Some(mut replay) = replay else {
            debug!("401 on a request without a replayable body; surfacing");
            return Ok(response);
        };

        match self.recover_token(attached.as_deref()).await {
            Some(access_token) => {
                let Some(value) = bearer_header(&access_token) else {
                    return Ok(response);
                };
                extensions.insert(Reauthenticated);
                replay.headers_mut().insert(AUTHORIZATION, value);
                debug!("replaying {} {}", replay.method(), replay.url());
                next.run(replay, extensions).await
            }
            None => {
                self.force_sign_out();
                // The caller sees the original failure.
                Ok(response)
            }
        }
    }
}

/// Shared transport settings.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Backend base URL.
    pub base_url: String,
    /// Uniform per-request timeout in seconds.
    pub timeout_seconds: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:3000".to_string(),
            timeout_seconds: 10,
        }
    }
}

impl ClientConfig {
    /// Create a configuration for a backend base URL.
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Self::default()
        }
    }

    /// Override the per-request timeout.
    #[must_use]
    pub const fn with_timeout_seconds(mut self, timeout_seconds: u64) -> Self {
        self.timeout_seconds = timeout_seconds;
        self
    }
}

/// Typed request helpers over the middleware stack.
#[derive(Clone)]
pub(crate) struct Http {
    client: ClientWithMiddleware,
    base_url: String,
}

impl Http {
    pub(crate) fn new(client: ClientWithMiddleware, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }

    fn url(&self, path: &str) -> Result<Url> {
        let joined = format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        );
        Url::parse(&joined)
            .map_err(|e| ApiError::Configuration(format!("invalid URL '{joined}': {e}")))
    }

    pub(crate) async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = self.url(path)?;
        self.execute(self.client.get(url)).await
    }

    pub(crate) async fn get_with_query<T, Q>(&self, path: &str, query: &Q) -> Result<T>
    where
        T: DeserializeOwned,
        Q: Serialize + Sync,
    {
        let url = self.url(path)?;
        self.execute(self.client.get(url).query(query)).await
    }

    pub(crate) async fn post<T, B>(&self, path: &str, body: &B) -> Result<T>
    where
        T: DeserializeOwned,
        B: Serialize + Sync,
    {
        let url = self.url(path)?;
        let request = self
            .client
            .post(url)
            .header(CONTENT_TYPE, "application/json")
            .body(serde_json::to_string(body)?);
        self.execute(request).await
    }

    pub(crate) async fn put<T, B>(&self, path: &str, body: &B) -> Result<T>
    where
        T: DeserializeOwned,
        B: Serialize + Sync,
    {
        let url = self.url(path)?;
        let request = self
            .client
            .put(url)
            .header(CONTENT_TYPE, "application/json")
            .body(serde_json::to_string(body)?);
        self.execute(request).await
    }

    pub(crate) async fn delete<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = self.url(path)?;
        self.execute(self.client.delete(url)).await
    }

    /// Like [`Http::delete`], for endpoints that answer with an empty body.
    pub(crate) async fn delete_discarding(&self, path: &str) -> Result<()> {
        let url = self.url(path)?;
        let response = self.client.delete(url).send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        let text = response.text().await?;
        Err(map_failure(status, &text))
    }

    async fn execute<T: DeserializeOwned>(
        &self,
        request: reqwest_middleware::RequestBuilder,
    ) -> Result<T> {
        let response = request.send().await?;
        let status = response.status();

        if !status.is_success() {
            let text = response.text().await?;
            return Err(map_failure(status, &text));
        }

        let text = response.text().await?;
        serde_json::from_str(&text).map_err(Into::into)
    }
}

/// Map a non-success response onto the error taxonomy.
pub(crate) fn map_failure(status: StatusCode, body: &str) -> ApiError {
    let message = match serde_json::from_str::<ErrorBody>(body) {
        Ok(parsed) => parsed.message,
        Err(parse_err) => {
            debug!("error body is not the backend envelope: {parse_err}");
            if body.is_empty() {
                status.to_string()
            } else {
                body.to_string()
            }
        }
    };

    error!("API request failed with status {}: {message}", status.as_u16());

    if status == StatusCode::UNAUTHORIZED {
        ApiError::Authentication(message)
    } else {
        ApiError::Api {
            status: status.as_u16(),
            message,
        }
    }
}

/// Build the shared middleware stack for a configuration.
///
/// The same bare client (and therefore the same timeout) serves both the
/// intercepted requests and the refresh call.
pub(crate) fn build_transport(
    config: &ClientConfig,
    store: Arc<dyn SessionStore>,
    on_expired: Arc<dyn SessionExpiredHandler>,
) -> Result<ClientWithMiddleware> {
    Url::parse(&config.base_url)
        .map_err(|e| ApiError::Configuration(format!("invalid base URL '{}': {e}", config.base_url)))?;
    let refresh_url = format!(
        "{}/{}",
        config.base_url.trim_end_matches('/'),
        crate::routes::REFRESH
    );
    let refresh_url = Url::parse(&refresh_url)
        .map_err(|e| ApiError::Configuration(format!("cannot derive refresh URL: {e}")))?;

    let bare = reqwest::Client::builder()
        .timeout(Duration::from_secs(config.timeout_seconds))
        .build()?;

    let auth = BearerAuth::new(store, refresh_url, bare.clone(), on_expired);
    Ok(reqwest_middleware::ClientBuilder::new(bare).with(auth).build())
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::panic)]

    use std::sync::atomic::{AtomicBool, Ordering};

    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use gymdesk_common::{Page, User};

    use super::*;
    use crate::session::{MemorySessionStore, StoredSession};

    /// Records whether the forced sign-out fired.
    #[derive(Default)]
    struct RecordingHandler {
        fired: AtomicBool,
    }

    impl SessionExpiredHandler for RecordingHandler {
        fn session_expired(&self) {
            self.fired.store(true, Ordering::SeqCst);
        }
    }

    fn session(access: &str, refresh: Option<&str>) -> StoredSession {
        StoredSession {
            access_token: access.to_string(),
            refresh_token: refresh.map(String::from),
            current_user: Some(User {
                id: 7,
                email: "a@b.com".to_string(),
                role: None,
            }),
        }
    }

    fn transport(
        base_url: &str,
        store: Arc<dyn SessionStore>,
        handler: Arc<dyn SessionExpiredHandler>,
    ) -> Http {
        let config = ClientConfig::new(base_url);
        let client = build_transport(&config, store, handler).unwrap();
        Http::new(client, base_url)
    }

    fn empty_page() -> serde_json::Value {
        serde_json::json!({ "data": [], "hasMore": false })
    }

    #[tokio::test]
    async fn test_requests_carry_stored_bearer_token() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/client"))
            .and(header("authorization", "Bearer live-token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(empty_page()))
            .expect(1)
            .mount(&server)
            .await;

        let store: Arc<dyn SessionStore> = Arc::new(MemorySessionStore::with_session(session(
            "live-token",
            Some("refresh-1"),
        )));
        let http = transport(&server.uri(), store, Arc::new(LogSessionExpired));

        let _page: Page<serde_json::Value> = http.get("client").await.unwrap();
    }

    #[tokio::test]
    async fn test_unauthenticated_requests_are_sent_unsigned() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/gender"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([])))
            .expect(1)
            .mount(&server)
            .await;

        let store: Arc<dyn SessionStore> = Arc::new(MemorySessionStore::new());
        let http = transport(&server.uri(), store, Arc::new(LogSessionExpired));

        let _genders: Vec<serde_json::Value> = http.get("gender").await.unwrap();
        let received = server.received_requests().await.unwrap();
        assert!(received[0].headers.get("authorization").is_none());
    }

    #[tokio::test]
    async fn test_401_triggers_one_refresh_then_one_retry() {
        let server = MockServer::start().await;

        // The stale token meets a 401 exactly once.
        Mock::given(method("GET"))
            .and(path("/client"))
            .and(header("authorization", "Bearer stale"))
            .respond_with(ResponseTemplate::new(401).set_body_json(serde_json::json!({
                "message": "token expired", "statusCode": 401
            })))
            .expect(1)
            .mount(&server)
            .await;

        // One refresh, presenting the refresh token.
        Mock::given(method("GET"))
            .and(path("/users/refresh-token"))
            .and(header("authorization", "Bearer refresh-1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "accessToken": "fresh",
                "refreshToken": "refresh-2"
            })))
            .expect(1)
            .mount(&server)
            .await;

        // The replay carries the fresh token, which only exists after the
        // refresh resolved; matching here proves the ordering.
        Mock::given(method("GET"))
            .and(path("/client"))
            .and(header("authorization", "Bearer fresh"))
            .respond_with(ResponseTemplate::new(200).set_body_json(empty_page()))
            .expect(1)
            .mount(&server)
            .await;

        let store: Arc<dyn SessionStore> = Arc::new(MemorySessionStore::with_session(session(
            "stale",
            Some("refresh-1"),
        )));
        let http = transport(&server.uri(), Arc::clone(&store), Arc::new(LogSessionExpired));

        let page: Page<serde_json::Value> = http.get("client").await.unwrap();
        assert!(!page.has_more);

        // Both rotated values were persisted in one write.
        let saved = store.load().unwrap().unwrap();
        assert_eq!(saved.access_token, "fresh");
        assert_eq!(saved.refresh_token.as_deref(), Some("refresh-2"));
        assert_eq!(saved.current_user.unwrap().id, 7);
    }

    #[tokio::test]
    async fn test_second_401_is_surfaced_without_another_refresh() {
        let server = MockServer::start().await;

        // Refresh succeeds, once and only once.
        Mock::given(method("GET"))
            .and(path("/users/refresh-token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "accessToken": "fresh"
            })))
            .expect(1)
            .mount(&server)
            .await;

        // The endpoint rejects both the original and the replay.
        Mock::given(method("GET"))
            .and(path("/client"))
            .respond_with(ResponseTemplate::new(401).set_body_json(serde_json::json!({
                "message": "still unauthorized", "statusCode": 401
            })))
            .expect(2)
            .mount(&server)
            .await;

        let store: Arc<dyn SessionStore> = Arc::new(MemorySessionStore::with_session(session(
            "stale",
            Some("refresh-1"),
        )));
        let http = transport(&server.uri(), store, Arc::new(LogSessionExpired));

        let err = http.get::<Page<serde_json::Value>>("client").await.unwrap_err();
        assert!(err.is_authentication_error());
    }

    #[tokio::test]
    async fn test_refresh_failure_clears_session_and_fires_handler() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/client"))
            .respond_with(ResponseTemplate::new(401).set_body_json(serde_json::json!({
                "message": "token expired", "statusCode": 401
            })))
            .expect(1)
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/users/refresh-token"))
            .respond_with(ResponseTemplate::new(401).set_body_json(serde_json::json!({
                "message": "refresh token expired", "statusCode": 401
            })))
            .expect(1)
            .mount(&server)
            .await;

        let store: Arc<dyn SessionStore> = Arc::new(MemorySessionStore::with_session(session(
            "stale",
            Some("refresh-1"),
        )));
        let handler = Arc::new(RecordingHandler::default());
        let http = transport(
            &server.uri(),
            Arc::clone(&store),
            Arc::clone(&handler) as Arc<dyn SessionExpiredHandler>,
        );

        let err = http.get::<Page<serde_json::Value>>("client").await.unwrap_err();

        // The original failure reaches the caller...
        assert!(err.is_authentication_error());
        assert!(err.to_string().contains("token expired"));
        // ...the whole session is gone...
        assert!(store.load().unwrap().is_none());
        // ...and the front end was told to go back to login.
        assert!(handler.fired.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_401_without_refresh_token_skips_the_refresh_call() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/client"))
            .respond_with(ResponseTemplate::new(401).set_body_json(serde_json::json!({
                "message": "unauthorized", "statusCode": 401
            })))
            .expect(1)
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/users/refresh-token"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let store: Arc<dyn SessionStore> =
            Arc::new(MemorySessionStore::with_session(session("stale", None)));
        let handler = Arc::new(RecordingHandler::default());
        let http = transport(
            &server.uri(),
            Arc::clone(&store),
            Arc::clone(&handler) as Arc<dyn SessionExpiredHandler>,
        );

        let err = http.get::<Page<serde_json::Value>>("client").await.unwrap_err();
        assert!(err.is_authentication_error());
        assert!(store.load().unwrap().is_none());
        assert!(handler.fired.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_non_401_failures_pass_through_untouched() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/client"))
            .respond_with(ResponseTemplate::new(500).set_body_json(serde_json::json!({
                "message": "boom", "statusCode": 500
            })))
            .expect(1)
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/users/refresh-token"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let store: Arc<dyn SessionStore> = Arc::new(MemorySessionStore::with_session(session(
            "live-token",
            Some("refresh-1"),
        )));
        let http = transport(&server.uri(), Arc::clone(&store), Arc::new(LogSessionExpired));

        let err = http.get::<Page<serde_json::Value>>("client").await.unwrap_err();
        match err {
            ApiError::Api { status, message } => {
                assert_eq!(status, 500);
                assert_eq!(message, "boom");
            }
            other => panic!("unexpected error: {other:?}"),
        }
        // The session survives a server error.
        assert!(store.load().unwrap().is_some());
    }

    /// Store whose signed token is already stale relative to what it holds,
    /// simulating a concurrent process that rotated the tokens between the
    /// signing and the 401.
    struct RotatedElsewhereStore;

    impl SessionStore for RotatedElsewhereStore {
        fn load(&self) -> crate::error::Result<Option<StoredSession>> {
            Ok(Some(session("rotated", Some("refresh-1"))))
        }

        fn save(&self, _session: &StoredSession) -> crate::error::Result<()> {
            Ok(())
        }

        fn update_tokens(
            &self,
            _access_token: &str,
            _refresh_token: Option<&str>,
        ) -> crate::error::Result<()> {
            Ok(())
        }

        fn clear(&self) -> crate::error::Result<()> {
            Ok(())
        }

        fn access_token(&self) -> crate::error::Result<Option<String>> {
            Ok(Some("stale".to_string()))
        }
    }

    #[tokio::test]
    async fn test_concurrent_rotation_replays_without_refreshing() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/client"))
            .and(header("authorization", "Bearer stale"))
            .respond_with(ResponseTemplate::new(401).set_body_json(serde_json::json!({
                "message": "token expired", "statusCode": 401
            })))
            .expect(1)
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/client"))
            .and(header("authorization", "Bearer rotated"))
            .respond_with(ResponseTemplate::new(200).set_body_json(empty_page()))
            .expect(1)
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/users/refresh-token"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let http = transport(
            &server.uri(),
            Arc::new(RotatedElsewhereStore),
            Arc::new(LogSessionExpired),
        );

        let page: Page<serde_json::Value> = http.get("client").await.unwrap();
        assert!(!page.has_more);
    }
}
