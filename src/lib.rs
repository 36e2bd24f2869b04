// ABOUTME: Client-side sync core for a soccer training app
// ABOUTME: Change tracking, debounced requests, and authenticated remote sync
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.

//! # drillsync
//!
//! The sync core of a soccer-training client: in-memory domain stores for
//! session drills, filters, drill groups, and progress; a change tracker
//! recording which domains carry unsynced local mutations; a per-key
//! debounce gate; a sync coordinator that pushes dirty domains with
//! per-domain failure isolation; and an authenticated remote client with
//! one-shot token-refresh-and-retry.
//!
//! Rendering, navigation, the platform's secure storage, and the backend's
//! session-generation algorithm live outside this crate; they plug in
//! through the [`storage::CredentialStore`], [`cache::CacheStore`], and
//! [`client::HttpTransport`] seams.
//!
//! ## Wiring
//!
//! ```rust,no_run
//! use drillsync::api::TrainingApi;
//! use drillsync::cache::InMemoryCache;
//! use drillsync::client::ApiClient;
//! use drillsync::config::SyncConfig;
//! use drillsync::coordinator::SyncCoordinator;
//! use drillsync::debounce::DebounceGate;
//! use drillsync::storage::InMemoryCredentialStore;
//! use drillsync::stores::{change_channel, FilterStore, GroupStore, ProgressStore, SessionStore};
//! use drillsync::tracker::ChangeTracker;
//! use std::sync::Arc;
//!
//! # fn main() -> Result<(), drillsync::errors::SyncError> {
//! let config = SyncConfig::with_base_url("https://api.example.com")?;
//! let sync_interval = config.sync_interval;
//! let credentials = Arc::new(InMemoryCredentialStore::new());
//! let debounce = Arc::new(DebounceGate::new());
//! let client = Arc::new(ApiClient::with_reqwest(config, credentials, debounce));
//!
//! let (events, receiver) = change_channel();
//! let session = Arc::new(SessionStore::new(events.clone()));
//! let filters = Arc::new(FilterStore::new(events.clone()));
//! let groups = Arc::new(GroupStore::new(events.clone()));
//! let progress = Arc::new(ProgressStore::new(events));
//!
//! let coordinator = Arc::new(SyncCoordinator::new(
//!     Arc::new(ChangeTracker::new()),
//!     TrainingApi::new(client),
//!     Arc::new(InMemoryCache::new()),
//!     session,
//!     filters,
//!     groups,
//!     progress,
//!     "player@example.com",
//! ));
//! let _events_task = coordinator.spawn_event_loop(receiver);
//! let _sync_task = coordinator.spawn_periodic(sync_interval);
//! # Ok(())
//! # }
//! ```

/// Typed endpoint wrappers for the training backend
pub mod api;
/// Local snapshot cache abstraction and in-memory implementation
pub mod cache;
/// Authenticated HTTP execution with refresh-and-retry
pub mod client;
/// Environment-based runtime configuration
pub mod config;
/// Crate-wide defaults and endpoint paths
pub mod constants;
/// Dirty-domain orchestration and periodic sync
pub mod coordinator;
/// Per-key debounce gate
pub mod debounce;
/// Error taxonomy
pub mod errors;
/// Structured logging setup
pub mod logging;
/// Wire and in-memory data model
pub mod models;
/// Secure credential storage seam
pub mod storage;
/// In-memory domain stores emitting change events
pub mod stores;
/// Per-domain dirty-flag tracking
pub mod tracker;

pub use coordinator::{DomainOutcome, PassSummary, SyncCoordinator};
pub use errors::{SyncError, SyncResult};
pub use tracker::{ChangeTracker, SyncDomain};
