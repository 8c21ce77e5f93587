//! Request pipeline shared by every feature caller.
//!
//! Each request takes a snapshot of the stored token into a
//! `RequestContext`, sends it with `Authorization: Bearer <token>` when a
//! token exists, and maps non-2xx responses to `ApiError`. A 401 clears the
//! credential store and publishes `AuthEvent::SessionExpired`, at most once
//! per request; the 401 itself is still returned to the caller.

use std::sync::Arc;
use std::time::Duration;

use reqwest::{header, multipart, Client, Method, RequestBuilder, Response};
use serde::{de::DeserializeOwned, Serialize};
use tokio::sync::broadcast;
use tracing::{debug, warn};

use crate::auth::CredentialStore;
use crate::events::AuthEvent;

use super::ApiError;

// ============================================================================
// Constants
// ============================================================================

/// Backend used when nothing else is configured
pub const DEFAULT_API_URL: &str = "http://127.0.0.1:5000";

/// HTTP request timeout in seconds.
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Buffered auth events per subscriber before the oldest are dropped.
const EVENT_CHANNEL_CAPACITY: usize = 16;

/// Per-request state: the token as it was when the request was built, and
/// whether this request has already triggered 401 handling.
#[derive(Debug, Clone)]
pub struct RequestContext {
    token: Option<String>,
    retried: bool,
    intercept_unauthorized: bool,
}

impl RequestContext {
    pub fn new(token: Option<String>) -> Self {
        Self {
            token,
            retried: false,
            intercept_unauthorized: true,
        }
    }

    /// Context for login/register, where a 401 means bad credentials rather
    /// than an expired session.
    pub fn credentials_exchange(token: Option<String>) -> Self {
        Self {
            intercept_unauthorized: false,
            ..Self::new(token)
        }
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    pub fn is_retried(&self) -> bool {
        self.retried
    }
}

/// API client for the docchat backend.
/// Clone is cheap - the connection pool, store, and event channel are shared.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
    credentials: Arc<CredentialStore>,
    events: broadcast::Sender<AuthEvent>,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>, credentials: Arc<CredentialStore>) -> Result<Self, ApiError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            credentials,
            events,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn credentials(&self) -> &Arc<CredentialStore> {
        &self.credentials
    }

    /// Receive auth events published by this client and its clones.
    pub fn subscribe(&self) -> broadcast::Receiver<AuthEvent> {
        self.events.subscribe()
    }

    pub(crate) fn publish(&self, event: AuthEvent) {
        // No subscribers is fine; nobody is displaying anything.
        if self.events.send(event).is_err() {
            debug!("Auth event dropped, no subscribers");
        }
    }

    /// Snapshot the stored token for a new request.
    pub fn request_context(&self) -> RequestContext {
        RequestContext::new(self.credentials.token())
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    fn auth_headers(ctx: &RequestContext) -> Result<header::HeaderMap, ApiError> {
        let mut headers = header::HeaderMap::new();
        if let Some(token) = ctx.token() {
            let mut value = header::HeaderValue::from_str(&format!("Bearer {}", token))
                .map_err(|_| ApiError::Validation("Stored token is not a valid header value".to_string()))?;
            value.set_sensitive(true);
            headers.insert(header::AUTHORIZATION, value);
        }
        Ok(headers)
    }

    /// Clear the stored session and announce it, unless this request already
    /// did so. Returns true if the handling ran.
    pub fn handle_unauthorized(&self, ctx: &mut RequestContext) -> bool {
        if !ctx.intercept_unauthorized || ctx.retried {
            debug!(retried = ctx.retried, "Skipping 401 handling");
            return false;
        }
        ctx.retried = true;

        if let Err(e) = self.credentials.clear() {
            warn!(error = %e, "Failed to clear credentials after 401");
        }
        self.publish(AuthEvent::session_expired(ctx.token.clone()));
        true
    }

    /// Check if response is successful, returning an error with body if not.
    async fn check_response(&self, response: Response, ctx: &mut RequestContext) -> Result<Response, ApiError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        if status == reqwest::StatusCode::UNAUTHORIZED {
            warn!("Request unauthorized, session discarded");
            self.handle_unauthorized(ctx);
        }
        Err(ApiError::from_status(status, &body))
    }

    /// Send a prepared request through the token/401 pipeline.
    pub async fn execute(&self, request: RequestBuilder, ctx: &mut RequestContext) -> Result<Response, ApiError> {
        let response = request.headers(Self::auth_headers(ctx)?).send().await?;
        self.check_response(response, ctx).await
    }

    pub(crate) fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.client.request(method, self.url(path))
    }

    async fn parse_json<T: DeserializeOwned>(response: Response, path: &str) -> Result<T, ApiError> {
        let text = response.text().await?;
        serde_json::from_str(&text)
            .map_err(|e| ApiError::InvalidResponse(format!("Failed to parse JSON response from {}: {}", path, e)))
    }

    pub(crate) async fn send_json<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        mut ctx: RequestContext,
        path: &str,
    ) -> Result<T, ApiError> {
        let response = self.execute(request, &mut ctx).await?;
        Self::parse_json(response, path).await
    }

    pub(crate) async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        debug!(path, "GET");
        self.send_json(self.request(Method::GET, path), self.request_context(), path)
            .await
    }

    pub(crate) async fn post<T: DeserializeOwned, B: Serialize + ?Sized>(&self, path: &str, body: &B) -> Result<T, ApiError> {
        debug!(path, "POST");
        self.send_json(self.request(Method::POST, path).json(body), self.request_context(), path)
            .await
    }

    pub(crate) async fn put<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        debug!(path, "PUT");
        let request = self
            .request(Method::PUT, path)
            .json(&serde_json::json!({}));
        self.send_json(request, self.request_context(), path).await
    }

    pub(crate) async fn delete<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        debug!(path, "DELETE");
        self.send_json(self.request(Method::DELETE, path), self.request_context(), path)
            .await
    }

    pub(crate) async fn post_multipart<T: DeserializeOwned>(&self, path: &str, form: multipart::Form) -> Result<T, ApiError> {
        debug!(path, "POST multipart");
        self.send_json(self.request(Method::POST, path).multipart(form), self.request_context(), path)
            .await
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::auth::store::{KeyValueStore, MemoryStore};
    use crate::auth::{Session, User};
    use serde_json::Value;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    /// Memory store that counts how often the token is removed.
    #[derive(Default)]
    pub(crate) struct CountingStore {
        inner: MemoryStore,
        token_removals: Arc<AtomicUsize>,
    }

    impl CountingStore {
        pub(crate) fn counter(&self) -> Arc<AtomicUsize> {
            self.token_removals.clone()
        }
    }

    impl KeyValueStore for CountingStore {
        fn get(&self, key: &str) -> anyhow::Result<Option<String>> {
            self.inner.get(key)
        }

        fn set(&self, key: &str, value: &str) -> anyhow::Result<()> {
            self.inner.set(key, value)
        }

        fn remove(&self, key: &str) -> anyhow::Result<()> {
            if key == "token" {
                self.token_removals.fetch_add(1, Ordering::SeqCst);
            }
            self.inner.remove(key)
        }
    }

    pub(crate) fn alice() -> User {
        User {
            id: "u1".to_string(),
            email: "alice@example.com".to_string(),
            username: "alice".to_string(),
        }
    }

    pub(crate) fn logged_in_store(token: &str) -> Arc<CredentialStore> {
        let store = CredentialStore::in_memory();
        store.save(&Session::new(token, alice())).unwrap();
        Arc::new(store)
    }

    #[tokio::test]
    async fn test_request_with_token_sends_bearer_header() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/documents"))
            .and(header("Authorization", "Bearer T"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"documents": []})))
            .expect(1)
            .mount(&server)
            .await;

        let client = ApiClient::new(server.uri(), logged_in_store("T")).unwrap();
        let body: Value = client.get("/api/documents").await.unwrap();
        assert_eq!(body["documents"], serde_json::json!([]));
    }

    #[tokio::test]
    async fn test_request_without_token_has_no_auth_header() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/providers"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"providers": []})))
            .mount(&server)
            .await;

        let client = ApiClient::new(server.uri(), Arc::new(CredentialStore::in_memory())).unwrap();
        let _: Value = client.get("/api/providers").await.unwrap();

        let requests = server.received_requests().await.unwrap();
        assert_eq!(requests.len(), 1);
        assert!(!requests[0].headers.contains_key("authorization"));
    }

    #[tokio::test]
    async fn test_unauthorized_clears_store_and_publishes_event() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/api-keys"))
            .respond_with(
                ResponseTemplate::new(401).set_body_json(serde_json::json!({"message": "Token has expired"})),
            )
            .mount(&server)
            .await;

        let store = logged_in_store("stale");
        let client = ApiClient::new(server.uri(), store.clone()).unwrap();
        let mut events = client.subscribe();

        let err = client.get::<Value>("/api/api-keys").await.unwrap_err();
        assert!(err.is_unauthorized());
        assert_eq!(err.user_message("fallback"), "Token has expired");
        assert_eq!(store.load(), None);
        assert_eq!(
            events.try_recv().unwrap(),
            AuthEvent::session_expired(Some("stale".to_string()))
        );
        assert!(events.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_unauthorized_handling_runs_once_per_request() {
        let backend = CountingStore::default();
        let removals = backend.counter();
        let store = CredentialStore::new(backend);
        store.save(&Session::new("T", alice())).unwrap();

        let client = ApiClient::new(DEFAULT_API_URL, Arc::new(store)).unwrap();
        let mut events = client.subscribe();
        let mut ctx = client.request_context();
        assert_eq!(ctx.token(), Some("T"));

        assert!(client.handle_unauthorized(&mut ctx));
        assert!(ctx.is_retried());
        assert!(!client.handle_unauthorized(&mut ctx));

        assert_eq!(removals.load(Ordering::SeqCst), 1);
        assert_eq!(events.try_recv().unwrap(), AuthEvent::session_expired(Some("T".to_string())));
        assert!(events.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_independent_requests_each_get_handling() {
        let client = ApiClient::new(DEFAULT_API_URL, logged_in_store("T")).unwrap();
        let mut first = client.request_context();
        let mut second = client.request_context();
        assert!(client.handle_unauthorized(&mut first));
        assert!(client.handle_unauthorized(&mut second));
        // Second context was built before the clear, so it still holds the old token.
        assert_eq!(second.token(), Some("T"));
        assert_eq!(client.request_context().token(), None);
    }

    #[tokio::test]
    async fn test_credentials_exchange_skips_handling() {
        let store = logged_in_store("T");
        let client = ApiClient::new(DEFAULT_API_URL, store.clone()).unwrap();
        let mut ctx = RequestContext::credentials_exchange(store.token());
        assert!(!client.handle_unauthorized(&mut ctx));
        assert!(store.load().is_some());
    }

    #[tokio::test]
    async fn test_server_error_maps_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/documents"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let store = logged_in_store("T");
        let client = ApiClient::new(server.uri(), store.clone()).unwrap();
        let err = client.get::<Value>("/api/documents").await.unwrap_err();
        assert!(matches!(err, ApiError::ServerError { status: 503, .. }));
        // Only 401 touches the session.
        assert!(store.load().is_some());
    }

    #[tokio::test]
    async fn test_network_failure_is_network_error() {
        // Nothing listens on port 9 in the test environment.
        let client = ApiClient::new("http://127.0.0.1:9", logged_in_store("T")).unwrap();
        let err = client.get::<Value>("/api/documents").await.unwrap_err();
        assert!(matches!(err, ApiError::NetworkError(_)));
        assert_eq!(err.user_message("Something went wrong"), "Something went wrong");
    }

    #[test]
    fn test_url_joining() {
        let client = ApiClient::new("http://localhost:5000/", Arc::new(CredentialStore::in_memory())).unwrap();
        assert_eq!(client.base_url(), "http://localhost:5000");
        assert_eq!(client.url("/api/chat"), "http://localhost:5000/api/chat");
        assert_eq!(client.url("api/chat"), "http://localhost:5000/api/chat");
    }
}
