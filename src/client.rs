// ABOUTME: Authenticated HTTP request execution with one-shot token-refresh-and-retry
// ABOUTME: Transport is a trait seam; production uses a pooled reqwest client
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.

use crate::config::SyncConfig;
use crate::constants::{endpoints, token_keys};
use crate::debounce::DebounceGate;
use crate::errors::{SyncError, SyncResult};
use crate::models::AuthTokenPair;
use crate::storage::{self, CredentialStore};
use async_trait::async_trait;
use reqwest::{Client, ClientBuilder};
use serde::de::DeserializeOwned;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use url::Url;

/// HTTP method subset used by the training backend
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Delete,
}

impl HttpMethod {
    fn as_reqwest(self) -> reqwest::Method {
        match self {
            Self::Get => reqwest::Method::GET,
            Self::Post => reqwest::Method::POST,
            Self::Put => reqwest::Method::PUT,
            Self::Delete => reqwest::Method::DELETE,
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Get => f.write_str("GET"),
            Self::Post => f.write_str("POST"),
            Self::Put => f.write_str("PUT"),
            Self::Delete => f.write_str("DELETE"),
        }
    }
}

/// One fully resolved outgoing request, as handed to the transport
#[derive(Debug, Clone)]
pub struct TransportRequest {
    pub method: HttpMethod,
    pub url: Url,
    /// Header name/value pairs; bearer auth is already applied here
    pub headers: Vec<(String, String)>,
    pub body: Option<Vec<u8>>,
}

/// Status code and raw body of a completed request
#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

impl ApiResponse {
    /// Whether the status is 2xx
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.status >= 200 && self.status < 300
    }

    /// Decode the body as JSON, mapping non-2xx statuses to `BadResponse`
    ///
    /// # Errors
    ///
    /// Returns `BadResponse` for non-2xx statuses and `Serialization` for
    /// malformed bodies.
    pub fn json<T: DeserializeOwned>(&self) -> SyncResult<T> {
        if !self.is_success() {
            return Err(SyncError::bad_response(
                self.status,
                &String::from_utf8_lossy(&self.body),
            ));
        }
        Ok(serde_json::from_slice(&self.body)?)
    }

    /// Map non-2xx statuses to `BadResponse`, discarding the body
    ///
    /// # Errors
    ///
    /// Returns `BadResponse` for non-2xx statuses.
    pub fn require_success(&self) -> SyncResult<()> {
        if self.is_success() {
            Ok(())
        } else {
            Err(SyncError::bad_response(
                self.status,
                &String::from_utf8_lossy(&self.body),
            ))
        }
    }
}

/// Transport seam between the client and the network.
///
/// Production hosts use [`ReqwestTransport`]; tests inject scripted doubles.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    /// Execute one request, returning the status and body for any HTTP
    /// response the server produced
    ///
    /// # Errors
    ///
    /// Returns `SyncError::Network` only for transport-level failures;
    /// non-2xx statuses are not errors at this layer.
    async fn execute(&self, request: TransportRequest) -> SyncResult<ApiResponse>;
}

/// reqwest-backed transport with connection pooling and configured timeouts
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    /// Build a pooled client with the config's timeouts
    #[must_use]
    pub fn new(config: &SyncConfig) -> Self {
        let client = ClientBuilder::new()
            .timeout(config.request_timeout)
            .connect_timeout(config.connect_timeout)
            .build()
            .unwrap_or_else(|_| Client::new());
        Self { client }
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn execute(&self, request: TransportRequest) -> SyncResult<ApiResponse> {
        let mut builder = self
            .client
            .request(request.method.as_reqwest(), request.url);
        for (name, value) in &request.headers {
            builder = builder.header(name, value);
        }
        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        let response = builder.send().await?;
        let status = response.status().as_u16();
        let body = response.bytes().await?.to_vec();
        Ok(ApiResponse { status, body })
    }
}

/// One authenticated request, before token attachment.
///
/// Built with the struct-update idiom:
/// `RequestSpec { debounce_key: Some("login_request".into()), ..RequestSpec::post(...) }`.
#[derive(Debug, Clone)]
pub struct RequestSpec {
    /// Endpoint path relative to the configured base URL
    pub endpoint: String,
    pub method: HttpMethod,
    /// JSON body, serialized as-is
    pub body: Option<serde_json::Value>,
    /// Whether a 401 may trigger a transparent refresh-and-retry
    pub retry_on_401: bool,
    /// Optional debounce key; rejected requests fail with `Debounced`
    pub debounce_key: Option<String>,
    /// Debounce window override for this request
    pub debounce_interval: Option<Duration>,
}

impl RequestSpec {
    /// GET request with retry-on-401 enabled
    #[must_use]
    pub fn get(endpoint: &str) -> Self {
        Self::new(endpoint, HttpMethod::Get, None)
    }

    /// POST request with a JSON body
    #[must_use]
    pub fn post(endpoint: &str, body: serde_json::Value) -> Self {
        Self::new(endpoint, HttpMethod::Post, Some(body))
    }

    /// PUT request with a JSON body
    #[must_use]
    pub fn put(endpoint: &str, body: serde_json::Value) -> Self {
        Self::new(endpoint, HttpMethod::Put, Some(body))
    }

    /// DELETE request
    #[must_use]
    pub fn delete(endpoint: &str) -> Self {
        Self::new(endpoint, HttpMethod::Delete, None)
    }

    fn new(endpoint: &str, method: HttpMethod, body: Option<serde_json::Value>) -> Self {
        Self {
            endpoint: endpoint.to_owned(),
            method,
            body,
            retry_on_401: true,
            debounce_key: None,
            debounce_interval: None,
        }
    }

    /// Attach a debounce key to this request
    #[must_use]
    pub fn debounced(mut self, key: &str, interval: Option<Duration>) -> Self {
        self.debounce_key = Some(key.to_owned());
        self.debounce_interval = interval;
        self
    }
}

/// Authenticated request executor with at-most-one transparent
/// re-authentication retry per request.
///
/// The refresh path is single-flight: a refresh in progress blocks further
/// refresh attempts, and a waiter that finds the tokens already rotated by
/// the time it holds the lock reuses them instead of refreshing again.
pub struct ApiClient {
    config: SyncConfig,
    transport: Arc<dyn HttpTransport>,
    credentials: Arc<dyn CredentialStore>,
    debounce: Arc<DebounceGate>,
    refresh_lock: Mutex<()>,
}

impl ApiClient {
    /// Create a client over an explicit transport (tests inject doubles here)
    #[must_use]
    pub fn new(
        config: SyncConfig,
        transport: Arc<dyn HttpTransport>,
        credentials: Arc<dyn CredentialStore>,
        debounce: Arc<DebounceGate>,
    ) -> Self {
        Self {
            config,
            transport,
            credentials,
            debounce,
            refresh_lock: Mutex::new(()),
        }
    }

    /// Create a client with the production reqwest transport
    #[must_use]
    pub fn with_reqwest(
        config: SyncConfig,
        credentials: Arc<dyn CredentialStore>,
        debounce: Arc<DebounceGate>,
    ) -> Self {
        let transport = Arc::new(ReqwestTransport::new(&config));
        Self::new(config, transport, credentials, debounce)
    }

    /// The configured base URL
    #[must_use]
    pub const fn base_url(&self) -> &Url {
        &self.config.base_url
    }

    /// Execute one authenticated request.
    ///
    /// Debounce rejection happens before any network work. A 401 with
    /// `retry_on_401` triggers one refresh and one retry; the retry itself
    /// can no longer refresh.
    ///
    /// # Errors
    ///
    /// `Debounced` when the debounce gate rejects the key, `AuthRequired`
    /// when a needed refresh fails or no refresh token exists, `Network` for
    /// transport failures. All other statuses are returned in the response
    /// for caller interpretation.
    pub async fn request(&self, spec: RequestSpec) -> SyncResult<ApiResponse> {
        if let Some(key) = &spec.debounce_key {
            let interval = spec
                .debounce_interval
                .or(Some(self.config.debounce_interval));
            if !self.debounce.should_proceed(key, interval) {
                return Err(SyncError::Debounced { key: key.clone() });
            }
        }

        let (access, _) = storage::load_tokens(&self.credentials).await?;
        let response = self.execute(&spec, access.as_deref()).await?;

        if response.status == 401 && spec.retry_on_401 {
            debug!(endpoint = %spec.endpoint, "401 received, attempting token refresh");
            let pair = self.refresh_tokens(access.as_deref()).await?;
            // Exactly one retry, with refresh disabled
            return self.execute(&spec, Some(&pair.access_token)).await;
        }

        Ok(response)
    }

    /// Persist a freshly issued token pair (login flow)
    ///
    /// # Errors
    ///
    /// Returns an error if the credential store rejects the write.
    pub async fn store_token_pair(&self, pair: &AuthTokenPair) -> SyncResult<()> {
        storage::store_tokens(&self.credentials, pair).await
    }

    /// Drop both tokens (logout flow)
    ///
    /// # Errors
    ///
    /// Returns an error if the credential store is unavailable.
    pub async fn clear_token_pair(&self) -> SyncResult<()> {
        storage::clear_tokens(&self.credentials).await
    }

    async fn execute(&self, spec: &RequestSpec, access: Option<&str>) -> SyncResult<ApiResponse> {
        let url = self
            .config
            .base_url
            .join(spec.endpoint.trim_start_matches('/'))
            .map_err(|e| SyncError::Config(format!("bad endpoint '{}': {e}", spec.endpoint)))?;

        let mut headers = Vec::new();
        if let Some(token) = access {
            headers.push(("Authorization".to_owned(), format!("Bearer {token}")));
        }

        let body = match &spec.body {
            Some(json) => {
                headers.push(("Content-Type".to_owned(), "application/json".to_owned()));
                Some(serde_json::to_vec(json)?)
            }
            None => None,
        };

        self.transport
            .execute(TransportRequest {
                method: spec.method,
                url,
                headers,
                body,
            })
            .await
    }

    /// Single-flight refresh of the token pair. `stale_access` is the token
    /// the 401'd request carried; if the stored token differs once the lock
    /// is held, a concurrent flight already rotated the pair and it is
    /// reused instead of refreshing again.
    ///
    /// # Errors
    ///
    /// Any failure (missing refresh token, non-200, decode failure,
    /// transport error) surfaces as `AuthRequired`: the session cannot be
    /// repaired without a fresh login.
    async fn refresh_tokens(&self, stale_access: Option<&str>) -> SyncResult<AuthTokenPair> {
        let _guard = self.refresh_lock.lock().await;

        // Another flight may have rotated the tokens while we waited
        let (access, refresh) = storage::load_tokens(&self.credentials).await?;
        if let (Some(access), Some(refresh)) = (&access, &refresh) {
            if stale_access != Some(access.as_str()) {
                debug!("tokens already rotated by a concurrent refresh");
                return Ok(AuthTokenPair {
                    access_token: access.clone(),
                    refresh_token: refresh.clone(),
                });
            }
        }

        let Some(refresh) = refresh else {
            return Err(SyncError::AuthRequired(format!(
                "no {} in credential store",
                token_keys::REFRESH_TOKEN
            )));
        };

        let url = self
            .config
            .base_url
            .join(endpoints::REFRESH.trim_start_matches('/'))
            .map_err(|e| SyncError::Config(format!("bad refresh endpoint: {e}")))?;
        let body = serde_json::to_vec(&serde_json::json!({ "refresh_token": refresh }))?;

        let response = self
            .transport
            .execute(TransportRequest {
                method: HttpMethod::Post,
                url,
                headers: vec![("Content-Type".to_owned(), "application/json".to_owned())],
                body: Some(body),
            })
            .await
            .map_err(|e| SyncError::AuthRequired(format!("refresh call failed: {e}")))?;

        if response.status != 200 {
            warn!(status = response.status, "token refresh rejected");
            return Err(SyncError::AuthRequired(format!(
                "refresh endpoint returned {}",
                response.status
            )));
        }

        let pair: AuthTokenPair = serde_json::from_slice(&response.body)
            .map_err(|e| SyncError::AuthRequired(format!("malformed refresh response: {e}")))?;

        storage::store_tokens(&self.credentials, &pair).await?;
        info!("access token refreshed");
        Ok(pair)
    }
}

impl fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.config.base_url.as_str())
            .finish_non_exhaustive()
    }
}
