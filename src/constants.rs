// ABOUTME: Crate-wide defaults for timeouts, sync cadence, and wire fallback values
// ABOUTME: Centralized so config and models stay in agreement
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.

/// Default HTTP request timeout in seconds
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Default HTTP connection timeout in seconds
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;

/// Default debounce window in milliseconds
pub const DEFAULT_DEBOUNCE_MS: u64 = 1000;

/// Default interval between periodic sync passes, in seconds
pub const DEFAULT_SYNC_INTERVAL_SECS: u64 = 30;

/// Fallback drill duration in minutes when the backend sends null
pub const DEFAULT_DRILL_DURATION_MINUTES: u32 = 10;

/// Fallback sets/reps count when the backend sends null
pub const DEFAULT_SETS_REPS: u32 = 0;

/// Credential-store keys for the auth token pair
pub mod token_keys {
    /// Access token key in the credential store
    pub const ACCESS_TOKEN: &str = "access_token";
    /// Refresh token key in the credential store
    pub const REFRESH_TOKEN: &str = "refresh_token";
}

/// Debounce keys for well-known operations
pub mod debounce_keys {
    /// Login form submission
    pub const LOGIN_REQUEST: &str = "login_request";
    /// Session generation request
    pub const GENERATE_SESSION: &str = "generate_session";
}

/// Remote endpoint paths consumed by the sync core
pub mod endpoints {
    /// Password login
    pub const LOGIN: &str = "/login/";
    /// Token refresh
    pub const REFRESH: &str = "/refresh/";
    /// Session generation preferences
    pub const SESSION_PREFERENCES: &str = "/api/session/preferences";
    /// Backend session generation
    pub const SESSION_GENERATE: &str = "/api/session/generate";
    /// Ordered session drills
    pub const ORDERED_DRILLS: &str = "/api/sessions/ordered_drills/";
    /// Completed session log
    pub const COMPLETED_SESSIONS: &str = "/api/sessions/completed/";
    /// Streak and completion counters
    pub const PROGRESS_HISTORY: &str = "/api/progress_history/";
    /// Saved filter groups
    pub const SAVED_FILTERS: &str = "/api/filters/";
    /// Combined liked/saved drill-group sync
    pub const DRILL_GROUPS_SYNC: &str = "/api/drill-groups/sync";
    /// Drill catalog search
    pub const DRILL_SEARCH: &str = "/api/drills/search";
}
