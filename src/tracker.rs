// ABOUTME: Dirty-flag tracking for data domains with unsynced local mutations
// ABOUTME: Flags clear only on confirmed remote acknowledgment; logout suppresses marking
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use tracing::debug;

/// A logical category of user data tracked independently for sync state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncDomain {
    /// The ordered drill list of the current session
    OrderedDrills,
    /// Saved session-generation filter groups
    SavedFilters,
    /// The liked-drills group
    LikedDrills,
    /// User-created saved drill groups
    SavedDrills,
    /// Completed-session log
    CompletedSessions,
    /// Streak counters and lifetime completion count
    ProgressHistory,
}

impl SyncDomain {
    /// All domains, in the order the coordinator visits them
    pub const ALL: [Self; 6] = [
        Self::OrderedDrills,
        Self::SavedFilters,
        Self::LikedDrills,
        Self::SavedDrills,
        Self::CompletedSessions,
        Self::ProgressHistory,
    ];

    /// Stable wire/logging name
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::OrderedDrills => "ordered_drills",
            Self::SavedFilters => "saved_filters",
            Self::LikedDrills => "liked_drills",
            Self::SavedDrills => "saved_drills",
            Self::CompletedSessions => "completed_sessions",
            Self::ProgressHistory => "progress_history",
        }
    }
}

impl fmt::Display for SyncDomain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Default)]
struct DomainFlags {
    dirty: HashSet<SyncDomain>,
    /// Mutation counter per domain, bumped on every accepted mark
    generations: HashMap<SyncDomain, u64>,
}

/// Records which domains have local mutations not yet confirmed remotely.
///
/// A flag is true iff a mutation happened since the last acknowledged push
/// for that domain. Flags clear individually, only after a successful push
/// whose payload was not superseded by a newer mutation; there is no
/// blanket clear during a sync pass.
#[derive(Debug, Default)]
pub struct ChangeTracker {
    flags: Mutex<DomainFlags>,
    logging_out: AtomicBool,
}

impl ChangeTracker {
    /// Create a tracker with every domain clean
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark a domain dirty. Returns true if the flag transitioned to dirty,
    /// false if it was already dirty or marking is suppressed by an active
    /// logout.
    pub fn mark_dirty(&self, domain: SyncDomain) -> bool {
        if self.logging_out.load(Ordering::Acquire) {
            debug!(%domain, "mutation ignored, logout in progress");
            return false;
        }
        let mut flags = self.lock_flags();
        *flags.generations.entry(domain).or_insert(0) += 1;
        let inserted = flags.dirty.insert(domain);
        if inserted {
            debug!(%domain, "marked dirty");
        }
        inserted
    }

    /// Whether a specific domain has unsynced mutations
    pub fn is_dirty(&self, domain: SyncDomain) -> bool {
        self.lock_flags().dirty.contains(&domain)
    }

    /// Whether any domain has unsynced mutations
    pub fn has_any_dirty(&self) -> bool {
        !self.lock_flags().dirty.is_empty()
    }

    /// Snapshot of the currently dirty domains, in coordinator visit order
    pub fn dirty_domains(&self) -> Vec<SyncDomain> {
        let flags = self.lock_flags();
        SyncDomain::ALL
            .into_iter()
            .filter(|d| flags.dirty.contains(d))
            .collect()
    }

    /// Current mutation counter for a domain. Captured before a push payload
    /// is read, so [`Self::clear_if_unchanged`] can detect mutations that
    /// landed while the push was in flight.
    #[must_use]
    pub fn generation(&self, domain: SyncDomain) -> u64 {
        self.lock_flags()
            .generations
            .get(&domain)
            .copied()
            .unwrap_or(0)
    }

    /// Clear one domain after its push was acknowledged, but only when no
    /// mutation landed since `generation` was captured. Returns whether the
    /// flag cleared; a false return with the flag still set means the pushed
    /// payload was superseded mid-flight and the domain must sync again.
    pub fn clear_if_unchanged(&self, domain: SyncDomain, generation: u64) -> bool {
        let mut flags = self.lock_flags();
        let current = flags.generations.get(&domain).copied().unwrap_or(0);
        if current != generation {
            debug!(%domain, "mutation landed during push, flag stays dirty");
            return false;
        }
        let removed = flags.dirty.remove(&domain);
        if removed {
            debug!(%domain, "cleared after acknowledged push");
        }
        removed
    }

    /// Clear every flag. Only valid once each attempted push in a pass has
    /// been individually accounted for, or when abandoning state on logout.
    pub fn reset(&self) {
        self.lock_flags().dirty.clear();
    }

    /// Enable or disable logout suppression of dirty-marking
    pub fn set_logging_out(&self, logging_out: bool) {
        self.logging_out.store(logging_out, Ordering::Release);
    }

    /// Whether logout suppression is active
    pub fn is_logging_out(&self) -> bool {
        self.logging_out.load(Ordering::Acquire)
    }

    fn lock_flags(&self) -> std::sync::MutexGuard<'_, DomainFlags> {
        // Flag mutation never panics while the lock is held
        self.flags.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}
