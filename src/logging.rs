// ABOUTME: Structured logging setup for hosts embedding the sync core
// ABOUTME: Configures tracing-subscriber with env-filter and format selection
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.

use anyhow::{Context, Result};
use std::env;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Log output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// JSON-ish single-line output for production log collection
    Compact,
    /// Pretty multi-line output for development
    Pretty,
}

/// Logging configuration for hosts that let this crate own subscriber setup
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// Env-filter directive, e.g. `info` or `drillsync=debug`
    pub filter: String,
    /// Output format
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
            format: LogFormat::Compact,
        }
    }
}

/// Install a global tracing subscriber.
///
/// Embedding apps that already manage their own subscriber should skip this;
/// a second call is a no-op (the error from `try_init` is discarded).
///
/// # Errors
///
/// Returns an error when the filter directive cannot be parsed.
pub fn init(config: &LoggingConfig) -> Result<()> {
    let filter = EnvFilter::try_new(&config.filter)
        .with_context(|| format!("invalid log filter '{}'", config.filter))?;

    let result = match config.format {
        LogFormat::Pretty => tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .with_target(true)
                    .with_file(true)
                    .with_line_number(true),
            )
            .try_init(),
        LogFormat::Compact => tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .compact()
                    .with_target(false)
                    .with_file(false)
                    .with_line_number(false),
            )
            .try_init(),
    };

    if result.is_err() {
        tracing::debug!("global subscriber already installed, keeping existing one");
    }
    Ok(())
}
