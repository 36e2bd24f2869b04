// ABOUTME: Environment-based runtime configuration for the sync core
// ABOUTME: Parses base URL, timeouts, and cadence settings with sane fallbacks
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.

use crate::constants::{
    DEFAULT_CONNECT_TIMEOUT_SECS, DEFAULT_DEBOUNCE_MS, DEFAULT_SYNC_INTERVAL_SECS,
    DEFAULT_TIMEOUT_SECS,
};
use crate::errors::{SyncError, SyncResult};
use std::env;
use std::time::Duration;
use tracing::warn;
use url::Url;

/// Runtime configuration for the sync core
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Base URL of the training backend
    pub base_url: Url,
    /// Full-request timeout for remote calls
    pub request_timeout: Duration,
    /// Connection-establishment timeout for remote calls
    pub connect_timeout: Duration,
    /// Interval between periodic sync passes
    pub sync_interval: Duration,
    /// Default debounce window when callers do not supply one
    pub debounce_interval: Duration,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            // Static default URL, parse cannot fail
            base_url: Url::parse("http://localhost:8000").unwrap_or_else(|_| unreachable!()),
            request_timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            connect_timeout: Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS),
            sync_interval: Duration::from_secs(DEFAULT_SYNC_INTERVAL_SECS),
            debounce_interval: Duration::from_millis(DEFAULT_DEBOUNCE_MS),
        }
    }
}

impl SyncConfig {
    /// Build configuration from environment variables, falling back to
    /// defaults for anything unset or unparseable.
    ///
    /// Recognized variables: `DRILLSYNC_BASE_URL`, `DRILLSYNC_TIMEOUT_SECS`,
    /// `DRILLSYNC_CONNECT_TIMEOUT_SECS`, `DRILLSYNC_SYNC_INTERVAL_SECS`,
    /// `DRILLSYNC_DEBOUNCE_MS`.
    ///
    /// # Errors
    ///
    /// Returns `SyncError::Config` if `DRILLSYNC_BASE_URL` is set but not a
    /// valid URL.
    pub fn from_env() -> SyncResult<Self> {
        let mut config = Self::default();

        if let Ok(raw) = env::var("DRILLSYNC_BASE_URL") {
            config.base_url = Url::parse(&raw)
                .map_err(|e| SyncError::Config(format!("invalid DRILLSYNC_BASE_URL '{raw}': {e}")))?;
        }

        config.request_timeout =
            Duration::from_secs(env_u64("DRILLSYNC_TIMEOUT_SECS", DEFAULT_TIMEOUT_SECS));
        config.connect_timeout = Duration::from_secs(env_u64(
            "DRILLSYNC_CONNECT_TIMEOUT_SECS",
            DEFAULT_CONNECT_TIMEOUT_SECS,
        ));
        config.sync_interval = Duration::from_secs(env_u64(
            "DRILLSYNC_SYNC_INTERVAL_SECS",
            DEFAULT_SYNC_INTERVAL_SECS,
        ));
        config.debounce_interval =
            Duration::from_millis(env_u64("DRILLSYNC_DEBOUNCE_MS", DEFAULT_DEBOUNCE_MS));

        Ok(config)
    }

    /// Build configuration with an explicit base URL and defaults elsewhere
    ///
    /// # Errors
    ///
    /// Returns `SyncError::Config` if `base_url` is not a valid URL.
    pub fn with_base_url(base_url: &str) -> SyncResult<Self> {
        let base_url = Url::parse(base_url)
            .map_err(|e| SyncError::Config(format!("invalid base URL '{base_url}': {e}")))?;
        Ok(Self {
            base_url,
            ..Self::default()
        })
    }
}

/// Parse an env var as u64, warning and falling back on bad input
fn env_u64(name: &str, default: u64) -> u64 {
    match env::var(name) {
        Ok(raw) => raw.parse().unwrap_or_else(|_| {
            warn!("ignoring unparseable {name}='{raw}', using default {default}");
            default
        }),
        Err(_) => default,
    }
}
