//! REST client for the Avenue backend.
//!
//! # Architecture
//!
//! - `reqwest` for HTTP, one shared connection pool per [`ApiClient`]
//! - The backend is the source of truth; nothing is synced locally except the
//!   auth token and cart held in [`LocalStore`]
//! - Static resources (store location, UGC packages) are cached via `moka`
//!   (5 minute TTL); everything mutable is fetched fresh
//!
//! # Request handling
//!
//! Every request carries an `X-Request-Id` and, when logged in, a bearer
//! token read from the store at send time. Response bodies are read as text
//! first and then parsed, so a non-JSON error page still yields a useful
//! error instead of a second read of the body.
//!
//! Endpoint groups live in submodules as `impl ApiClient` blocks next to
//! their wire types.

pub mod auth;
mod cache;
pub mod media;
pub mod notifications;
pub mod reservations;
pub mod shop;
pub mod ugc;

use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;
use reqwest::{Method, RequestBuilder, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, error, warn};
use url::Url;
use uuid::Uuid;

use crate::config::ClientConfig;
use crate::error::ClientError;
use crate::store::LocalStore;

use cache::CacheValue;

/// Header carrying the per-request correlation ID.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

const CACHE_TTL: Duration = Duration::from_secs(300);
const CACHE_CAPACITY: u64 = 100;
const LOG_BODY_CHARS: usize = 500;

/// Client for the Avenue REST API.
///
/// Cheaply cloneable; clones share the HTTP pool, cache and store.
#[derive(Clone)]
pub struct ApiClient {
    inner: Arc<ApiClientInner>,
}

struct ApiClientInner {
    client: reqwest::Client,
    base_url: String,
    store: LocalStore,
    cache: Cache<String, CacheValue>,
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.inner.base_url)
            .finish_non_exhaustive()
    }
}

impl ApiClient {
    /// Create a client from configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: &ClientConfig, store: LocalStore) -> Result<Self, ClientError> {
        let client = reqwest::Client::builder()
            .timeout(config.http_timeout)
            .user_agent(concat!("avenue-client/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self::with_http_client(&config.api_url, client, store))
    }

    /// Create a client around an existing `reqwest::Client`.
    #[must_use]
    pub fn with_http_client(base_url: &Url, client: reqwest::Client, store: LocalStore) -> Self {
        let cache = Cache::builder()
            .max_capacity(CACHE_CAPACITY)
            .time_to_live(CACHE_TTL)
            .build();

        Self {
            inner: Arc::new(ApiClientInner {
                client,
                base_url: base_url.as_str().trim_end_matches('/').to_string(),
                store,
                cache,
            }),
        }
    }

    /// The store this client reads its token from.
    #[must_use]
    pub fn store(&self) -> &LocalStore {
        &self.inner.store
    }

    /// Backend base URL without trailing slash.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.inner.base_url
    }

    /// Drop all cached responses.
    pub async fn invalidate_cache(&self) {
        self.inner.cache.invalidate_all();
        self.inner.cache.run_pending_tasks().await;
    }

    // =========================================================================
    // Request plumbing
    // =========================================================================

    /// Absolute URL for an API path such as `/api/auth/me`.
    pub(crate) fn url(&self, path: &str) -> Result<Url, ClientError> {
        Ok(Url::parse(&format!("{}{path}", self.inner.base_url))?)
    }

    fn request(&self, method: Method, path: &str) -> Result<RequestBuilder, ClientError> {
        self.request_url(method, self.url(path)?)
    }

    fn request_url(&self, method: Method, url: Url) -> Result<RequestBuilder, ClientError> {
        let token = self.inner.store.auth_token()?;
        Ok(self.build(method, url, token.as_ref()))
    }

    fn build(&self, method: Method, url: Url, token: Option<&SecretString>) -> RequestBuilder {
        let builder = self
            .inner
            .client
            .request(method, url)
            .header(REQUEST_ID_HEADER, Uuid::new_v4().to_string());

        match token {
            Some(token) => builder.bearer_auth(token.expose_secret()),
            None => builder,
        }
    }

    pub(crate) async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ClientError> {
        self.send(self.request(Method::GET, path)?).await
    }

    /// GET with query parameters; `None` values are left out.
    pub(crate) async fn get_query<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, Option<&str>)],
    ) -> Result<T, ClientError> {
        let mut url = self.url(path)?;
        {
            let mut pairs = url.query_pairs_mut();
            for (key, value) in query {
                if let Some(value) = value {
                    pairs.append_pair(key, value);
                }
            }
        }
        if url.query() == Some("") {
            url.set_query(None);
        }
        self.send(self.request_url(Method::GET, url)?).await
    }

    pub(crate) async fn post<B, T>(&self, path: &str, body: &B) -> Result<T, ClientError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.send(self.request(Method::POST, path)?.json(body)).await
    }

    pub(crate) async fn post_with_timeout<B, T>(
        &self,
        path: &str,
        body: &B,
        timeout: Duration,
    ) -> Result<T, ClientError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.send(self.request(Method::POST, path)?.json(body).timeout(timeout))
            .await
    }

    /// POST authorized with `token` instead of the stored one.
    pub(crate) async fn post_as<B, T>(
        &self,
        path: &str,
        body: &B,
        token: &SecretString,
    ) -> Result<T, ClientError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let builder = self.build(Method::POST, self.url(path)?, Some(token));
        self.send(builder.json(body)).await
    }

    pub(crate) async fn post_empty<T: DeserializeOwned>(
        &self,
        path: &str,
    ) -> Result<T, ClientError> {
        self.send(self.request(Method::POST, path)?).await
    }

    pub(crate) async fn put<B, T>(&self, path: &str, body: &B) -> Result<T, ClientError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.send(self.request(Method::PUT, path)?.json(body)).await
    }

    /// Send a request and decode the JSON body.
    async fn send<T: DeserializeOwned>(&self, builder: RequestBuilder) -> Result<T, ClientError> {
        let response = builder.send().await.map_err(|e| {
            warn!(error = %e, "Avenue API request failed to complete");
            ClientError::from(e)
        })?;

        let status = response.status();
        let url = response.url().path().to_string();

        // Read as text first; parsing happens on the owned string
        let body = response.text().await?;

        if !status.is_success() {
            return Err(error_for_status(status, &url, &body));
        }

        debug!(status = %status, path = %url, "Avenue API response");
        decode_body(&url, &body)
    }
}

/// Decode a success body. An empty body decodes as JSON `null`.
fn decode_body<T: DeserializeOwned>(path: &str, body: &str) -> Result<T, ClientError> {
    let text = if body.trim().is_empty() { "null" } else { body };
    serde_json::from_str(text).map_err(|e| {
        error!(
            error = %e,
            path = %path,
            body = %body.chars().take(LOG_BODY_CHARS).collect::<String>(),
            "Failed to parse Avenue API response"
        );
        ClientError::Parse(e.to_string())
    })
}

/// Map a non-success response to a `ClientError`, keeping the backend message.
fn error_for_status(status: StatusCode, path: &str, body: &str) -> ClientError {
    let message = extract_message(body);

    if status.is_server_error() {
        error!(
            status = %status,
            path = %path,
            body = %body.chars().take(LOG_BODY_CHARS).collect::<String>(),
            "Avenue API returned server error"
        );
    } else {
        debug!(status = %status, path = %path, message = ?message, "Avenue API rejected request");
    }

    if status == StatusCode::UNAUTHORIZED {
        ClientError::Unauthorized { message }
    } else {
        ClientError::Rejected {
            status: status.as_u16(),
            message,
        }
    }
}

/// Pull a human-readable message out of an error body.
///
/// Understands `{"detail": "..."}`, validation lists
/// (`{"detail": [{"msg": "..."}]}`), `{"message": "..."}` and `{"error": "..."}`.
fn extract_message(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;

    let from_detail = match value.get("detail") {
        Some(serde_json::Value::String(s)) => Some(s.clone()),
        Some(serde_json::Value::Array(items)) => {
            let messages: Vec<&str> = items
                .iter()
                .filter_map(|item| item.get("msg").and_then(serde_json::Value::as_str))
                .collect();
            (!messages.is_empty()).then(|| messages.join("; "))
        }
        _ => None,
    };

    from_detail
        .or_else(|| {
            ["message", "error"].iter().find_map(|key| {
                value
                    .get(*key)
                    .and_then(serde_json::Value::as_str)
                    .map(String::from)
            })
        })
        .filter(|message| !message.trim().is_empty())
}

/// Generic acknowledgement body (`{"message": "..."}` or `{"success": true}`).
#[derive(Debug, Clone, Default, serde::Deserialize)]
pub struct Ack {
    /// Backend message.
    #[serde(default)]
    pub message: Option<String>,
    /// Success flag, when the endpoint sends one.
    #[serde(default)]
    pub success: Option<bool>,
}
