// ABOUTME: Per-key debounce gate deciding whether a triggered action may run now
// ABOUTME: Pure rate limit over a concurrent timestamp map; rejected calls are dropped
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.

use crate::constants::DEFAULT_DEBOUNCE_MS;
use dashmap::DashMap;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, warn};

/// Per-key rate limiter.
///
/// `should_proceed` is a gate, not a queue: a rejected call is simply
/// dropped. Callers that want "run later instead" semantics schedule their
/// own single-shot retry, overwriting any previously scheduled one for the
/// same logical operation.
///
/// Records are never pruned implicitly; long-lived hosts with many distinct
/// keys call [`DebounceGate::prune`] on their own cadence.
#[derive(Debug, Default)]
pub struct DebounceGate {
    last_attempt: DashMap<String, Instant>,
}

impl DebounceGate {
    /// Create an empty gate
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Decide whether the action identified by `key` may run now.
    ///
    /// Returns true and records the attempt time when no prior attempt
    /// exists for `key` or the prior attempt is at least `interval` old
    /// (default 1s when `None`). Returns false otherwise, leaving the prior
    /// timestamp untouched.
    ///
    /// An empty key is a caller contract violation; the gate logs a warning
    /// and lets the call proceed rather than silently rate-limiting every
    /// anonymous caller against the same record.
    pub fn should_proceed(&self, key: &str, interval: Option<Duration>) -> bool {
        if key.is_empty() {
            warn!("debounce called with empty key, allowing");
            return true;
        }
        let interval = interval.unwrap_or(Duration::from_millis(DEFAULT_DEBOUNCE_MS));
        let now = Instant::now();

        // Entry API holds the per-key shard lock across the read-modify-write
        match self.last_attempt.entry(key.to_owned()) {
            dashmap::mapref::entry::Entry::Vacant(slot) => {
                slot.insert(now);
                true
            }
            dashmap::mapref::entry::Entry::Occupied(mut slot) => {
                let elapsed = now.saturating_duration_since(*slot.get());
                if elapsed >= interval {
                    slot.insert(now);
                    true
                } else {
                    debug!(key, ?elapsed, ?interval, "debounced");
                    false
                }
            }
        }
    }

    /// Forget a single key so its next attempt always proceeds
    pub fn remove(&self, key: &str) {
        self.last_attempt.remove(key);
    }

    /// Forget every key
    pub fn clear(&self) {
        self.last_attempt.clear();
    }

    /// Drop records older than `max_age`, returning how many were removed.
    /// Bounds map growth for hosts that run long enough to accumulate many
    /// distinct keys.
    pub fn prune(&self, max_age: Duration) -> usize {
        let now = Instant::now();
        let before = self.last_attempt.len();
        self.last_attempt
            .retain(|_, last| now.saturating_duration_since(*last) < max_age);
        before - self.last_attempt.len()
    }

    /// Number of tracked keys
    #[must_use]
    pub fn len(&self) -> usize {
        self.last_attempt.len()
    }

    /// Whether no keys are tracked
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.last_attempt.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn first_attempt_proceeds() {
        let gate = DebounceGate::new();
        assert!(gate.should_proceed("login_request", None));
    }

    #[tokio::test(start_paused = true)]
    async fn rapid_second_attempt_is_rejected() {
        let gate = DebounceGate::new();
        assert!(gate.should_proceed("login_request", None));
        tokio::time::advance(Duration::from_millis(300)).await;
        assert!(!gate.should_proceed("login_request", None));
    }

    #[tokio::test(start_paused = true)]
    async fn attempt_after_interval_proceeds() {
        let gate = DebounceGate::new();
        assert!(gate.should_proceed("k", Some(Duration::from_secs(1))));
        tokio::time::advance(Duration::from_millis(300)).await;
        assert!(!gate.should_proceed("k", Some(Duration::from_secs(1))));
        tokio::time::advance(Duration::from_secs(1)).await;
        assert!(gate.should_proceed("k", Some(Duration::from_secs(1))));
    }

    #[tokio::test(start_paused = true)]
    async fn rejection_does_not_extend_the_window() {
        let gate = DebounceGate::new();
        assert!(gate.should_proceed("k", Some(Duration::from_secs(1))));
        tokio::time::advance(Duration::from_millis(900)).await;
        assert!(!gate.should_proceed("k", Some(Duration::from_secs(1))));
        tokio::time::advance(Duration::from_millis(100)).await;
        // 1s since the allowed attempt, not since the rejection
        assert!(gate.should_proceed("k", Some(Duration::from_secs(1))));
    }

    #[tokio::test(start_paused = true)]
    async fn keys_are_independent() {
        let gate = DebounceGate::new();
        assert!(gate.should_proceed("a", None));
        assert!(gate.should_proceed("b", None));
        assert!(!gate.should_proceed("a", None));
    }

    #[tokio::test(start_paused = true)]
    async fn empty_key_always_proceeds() {
        let gate = DebounceGate::new();
        assert!(gate.should_proceed("", None));
        assert!(gate.should_proceed("", None));
        assert!(gate.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn prune_drops_stale_records() {
        let gate = DebounceGate::new();
        assert!(gate.should_proceed("old", None));
        tokio::time::advance(Duration::from_secs(600)).await;
        assert!(gate.should_proceed("fresh", None));
        let removed = gate.prune(Duration::from_secs(300));
        assert_eq!(removed, 1);
        assert_eq!(gate.len(), 1);
    }
}
