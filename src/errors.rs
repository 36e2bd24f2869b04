// ABOUTME: Unified error type for the sync core with recoverable/fatal classification
// ABOUTME: Distinguishes debounce rejections from transport failures and auth expiry
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.

use thiserror::Error;

/// Result alias used throughout the crate
pub type SyncResult<T> = Result<T, SyncError>;

/// Error taxonomy for the sync core.
///
/// `Debounced` and `AuthRequired` are recoverable signals rather than hard
/// failures: a debounced call should simply be skipped this cycle, and an
/// auth-required error tells a higher-level session manager to force a
/// logout. `BadResponse` and `Network` are per-push failures the coordinator
/// absorbs by leaving the domain dirty for the next pass.
#[derive(Debug, Error)]
pub enum SyncError {
    /// Operation rejected by the debounce gate; not a failure of the
    /// operation itself. Callers must not treat this as a hard error.
    #[error("request '{key}' debounced (too soon since last attempt)")]
    Debounced {
        /// Debounce key that was rejected
        key: String,
    },

    /// 401 with no refresh token, or a failed token refresh. Signals that a
    /// forced logout is needed.
    #[error("authentication required: {0}")]
    AuthRequired(String),

    /// Non-2xx status other than a handled 401
    #[error("unexpected response status {status}: {body}")]
    BadResponse {
        /// HTTP status code returned by the server
        status: u16,
        /// Response body, truncated for logging
        body: String,
    },

    /// Transport-level failure (timeout, DNS, no connection)
    #[error("network error: {0}")]
    Network(String),

    /// Malformed JSON in a response or cache entry
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Local cache read/write failure
    #[error("cache error: {0}")]
    Cache(String),

    /// Invalid configuration (bad base URL, zero interval)
    #[error("configuration error: {0}")]
    Config(String),
}

impl SyncError {
    /// Whether this error is a debounce rejection rather than a failure
    #[must_use]
    pub const fn is_debounced(&self) -> bool {
        matches!(self, Self::Debounced { .. })
    }

    /// Whether this error requires a forced logout to recover
    #[must_use]
    pub const fn is_auth_required(&self) -> bool {
        matches!(self, Self::AuthRequired(_))
    }

    /// Build a `BadResponse` from a status and body, truncating the body so
    /// large error pages do not flood logs
    #[must_use]
    pub fn bad_response(status: u16, body: &str) -> Self {
        const MAX_BODY: usize = 512;
        let body = if body.len() > MAX_BODY {
            let truncated: String = body.chars().take(MAX_BODY).collect();
            format!("{truncated}...")
        } else {
            body.to_owned()
        };
        Self::BadResponse { status, body }
    }

    /// Wrap an arbitrary cache backend failure
    #[must_use]
    pub fn cache<E: std::fmt::Display>(err: E) -> Self {
        Self::Cache(err.to_string())
    }
}

impl From<reqwest::Error> for SyncError {
    fn from(err: reqwest::Error) -> Self {
        Self::Network(err.to_string())
    }
}
