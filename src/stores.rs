// ABOUTME: In-memory domain stores for session drills, filters, groups, and progress
// ABOUTME: Every mutation emits its SyncDomain on an event channel the coordinator consumes
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.

use crate::models::{CompletedSession, Drill, DrillGroup, ProgressHistory, SavedFilters, SessionDrillEntry};
use crate::tracker::SyncDomain;
use chrono::Utc;
use std::sync::{Mutex, MutexGuard, PoisonError};
use tokio::sync::mpsc;
use tracing::debug;
use uuid::Uuid;

/// Sender half of the store change channel
pub type ChangeSender = mpsc::UnboundedSender<SyncDomain>;

/// Receiver half of the store change channel
pub type ChangeReceiver = mpsc::UnboundedReceiver<SyncDomain>;

/// Create the channel stores publish mutations on
#[must_use]
pub fn change_channel() -> (ChangeSender, ChangeReceiver) {
    mpsc::unbounded_channel()
}

fn emit(events: &ChangeSender, domain: SyncDomain) {
    // A closed receiver means the coordinator is gone; mutations still apply
    if events.send(domain).is_err() {
        debug!(%domain, "change event dropped, no coordinator attached");
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// The ordered drill list of the current session.
///
/// Synced as a whole list; per-entry progress mutations dirty the whole
/// `OrderedDrills` domain.
pub struct SessionStore {
    drills: Mutex<Vec<SessionDrillEntry>>,
    events: ChangeSender,
}

impl SessionStore {
    /// Create an empty store publishing on `events`
    #[must_use]
    pub fn new(events: ChangeSender) -> Self {
        Self {
            drills: Mutex::new(Vec::new()),
            events,
        }
    }

    /// Replace the whole ordered list (new generated session)
    pub fn set_drills(&self, drills: Vec<SessionDrillEntry>) {
        *lock(&self.drills) = drills;
        emit(&self.events, SyncDomain::OrderedDrills);
    }

    /// Hydrate from a cached/fetched list without marking anything dirty
    pub fn load_drills(&self, drills: Vec<SessionDrillEntry>) {
        *lock(&self.drills) = drills;
    }

    /// Append a drill to the end of the session
    pub fn add_drill(&self, drill: Drill) {
        lock(&self.drills).push(SessionDrillEntry::new(drill));
        emit(&self.events, SyncDomain::OrderedDrills);
    }

    /// Remove a drill by its template uuid; absent uuids are a no-op
    pub fn remove_drill(&self, drill_uuid: Uuid) {
        let mut drills = lock(&self.drills);
        let before = drills.len();
        drills.retain(|entry| entry.drill.uuid != drill_uuid);
        let removed = drills.len() != before;
        drop(drills);
        if removed {
            emit(&self.events, SyncDomain::OrderedDrills);
        }
    }

    /// Move the entry at `from` to position `to`; out-of-range indices are a
    /// no-op
    pub fn reorder(&self, from: usize, to: usize) {
        let mut drills = lock(&self.drills);
        if from >= drills.len() || to >= drills.len() || from == to {
            return;
        }
        let entry = drills.remove(from);
        drills.insert(to, entry);
        drop(drills);
        emit(&self.events, SyncDomain::OrderedDrills);
    }

    /// Record one completed set for a drill, flipping its completion flag
    /// when all sets are done
    pub fn record_set_done(&self, drill_uuid: Uuid) {
        let mut drills = lock(&self.drills);
        let mut changed = false;
        if let Some(entry) = drills.iter_mut().find(|e| e.drill.uuid == drill_uuid) {
            entry.sets_done = entry.sets_done.saturating_add(1);
            if entry.drill.sets > 0 && entry.sets_done >= entry.drill.sets {
                entry.is_completed = true;
            }
            changed = true;
        }
        drop(drills);
        if changed {
            emit(&self.events, SyncDomain::OrderedDrills);
        }
    }

    /// Snapshot of the ordered list
    #[must_use]
    pub fn drills(&self) -> Vec<SessionDrillEntry> {
        lock(&self.drills).clone()
    }

    /// Whether every drill in the session is completed (empty sessions are
    /// not complete)
    #[must_use]
    pub fn is_session_complete(&self) -> bool {
        let drills = lock(&self.drills);
        !drills.is_empty() && drills.iter().all(|e| e.is_completed)
    }
}

/// Saved session-generation filter groups
pub struct FilterStore {
    filters: Mutex<Vec<SavedFilters>>,
    events: ChangeSender,
}

impl FilterStore {
    /// Create an empty store publishing on `events`
    #[must_use]
    pub fn new(events: ChangeSender) -> Self {
        Self {
            filters: Mutex::new(Vec::new()),
            events,
        }
    }

    /// Hydrate from a cached/fetched list without marking anything dirty
    pub fn load(&self, filters: Vec<SavedFilters>) {
        *lock(&self.filters) = filters;
    }

    /// Save a filter group, replacing an existing one with the same id
    pub fn save(&self, filters: SavedFilters) {
        let mut all = lock(&self.filters);
        if let Some(existing) = all.iter_mut().find(|f| f.id == filters.id) {
            *existing = filters;
        } else {
            all.push(filters);
        }
        drop(all);
        emit(&self.events, SyncDomain::SavedFilters);
    }

    /// Delete a filter group by id; absent ids are a no-op
    pub fn delete(&self, id: Uuid) {
        let mut all = lock(&self.filters);
        let before = all.len();
        all.retain(|f| f.id != id);
        let removed = all.len() != before;
        drop(all);
        if removed {
            emit(&self.events, SyncDomain::SavedFilters);
        }
    }

    /// Snapshot of all saved filter groups
    #[must_use]
    pub fn all(&self) -> Vec<SavedFilters> {
        lock(&self.filters).clone()
    }
}

/// The liked-drills group plus user-created saved groups.
///
/// The remote couples both under one drill-group resource, so likes dirty
/// `LikedDrills` and group edits dirty `SavedDrills`, and the coordinator
/// pushes them together.
pub struct GroupStore {
    liked: Mutex<DrillGroup>,
    saved: Mutex<Vec<DrillGroup>>,
    events: ChangeSender,
}

impl GroupStore {
    /// Create a store with an empty liked group and no saved groups
    #[must_use]
    pub fn new(events: ChangeSender) -> Self {
        Self {
            liked: Mutex::new(DrillGroup::liked()),
            saved: Mutex::new(Vec::new()),
            events,
        }
    }

    /// Hydrate both collections without marking anything dirty
    pub fn load(&self, liked: DrillGroup, saved: Vec<DrillGroup>) {
        *lock(&self.liked) = liked;
        *lock(&self.saved) = saved;
    }

    /// Toggle a drill in the liked group; returns the new liked state
    pub fn toggle_like(&self, drill: Drill) -> bool {
        let mut liked = lock(&self.liked);
        let now_liked = if liked.contains(drill.uuid) {
            liked.drills.retain(|d| d.uuid != drill.uuid);
            false
        } else {
            liked.drills.push(drill);
            true
        };
        drop(liked);
        emit(&self.events, SyncDomain::LikedDrills);
        now_liked
    }

    /// Whether a drill is currently liked
    #[must_use]
    pub fn is_liked(&self, drill_uuid: Uuid) -> bool {
        lock(&self.liked).contains(drill_uuid)
    }

    /// Create a saved group, returning its id
    pub fn create_group(&self, name: &str, description: &str) -> Uuid {
        let group = DrillGroup::new(name, description);
        let id = group.id;
        lock(&self.saved).push(group);
        emit(&self.events, SyncDomain::SavedDrills);
        id
    }

    /// Delete a saved group; absent ids are a no-op
    pub fn delete_group(&self, id: Uuid) {
        let mut saved = lock(&self.saved);
        let before = saved.len();
        saved.retain(|g| g.id != id);
        let removed = saved.len() != before;
        drop(saved);
        if removed {
            emit(&self.events, SyncDomain::SavedDrills);
        }
    }

    /// Add a drill to a saved group, ignoring duplicates; unknown group ids
    /// are a no-op
    pub fn add_to_group(&self, group_id: Uuid, drill: Drill) {
        let mut saved = lock(&self.saved);
        let mut changed = false;
        if let Some(group) = saved.iter_mut().find(|g| g.id == group_id) {
            if !group.contains(drill.uuid) {
                group.drills.push(drill);
                changed = true;
            }
        }
        drop(saved);
        if changed {
            emit(&self.events, SyncDomain::SavedDrills);
        }
    }

    /// Remove a drill from a saved group
    pub fn remove_from_group(&self, group_id: Uuid, drill_uuid: Uuid) {
        let mut saved = lock(&self.saved);
        let mut changed = false;
        if let Some(group) = saved.iter_mut().find(|g| g.id == group_id) {
            let before = group.drills.len();
            group.drills.retain(|d| d.uuid != drill_uuid);
            changed = group.drills.len() != before;
        }
        drop(saved);
        if changed {
            emit(&self.events, SyncDomain::SavedDrills);
        }
    }

    /// Snapshot of the liked group
    #[must_use]
    pub fn liked(&self) -> DrillGroup {
        lock(&self.liked).clone()
    }

    /// Snapshot of the saved groups
    #[must_use]
    pub fn saved(&self) -> Vec<DrillGroup> {
        lock(&self.saved).clone()
    }
}

/// Streak counters and the completed-session log
pub struct ProgressStore {
    history: Mutex<ProgressHistory>,
    completed: Mutex<Vec<CompletedSession>>,
    events: ChangeSender,
}

impl ProgressStore {
    /// Create an empty store publishing on `events`
    #[must_use]
    pub fn new(events: ChangeSender) -> Self {
        Self {
            history: Mutex::new(ProgressHistory::default()),
            completed: Mutex::new(Vec::new()),
            events,
        }
    }

    /// Hydrate from cached/fetched state without marking anything dirty
    pub fn load(&self, history: ProgressHistory, completed: Vec<CompletedSession>) {
        *lock(&self.history) = history;
        *lock(&self.completed) = completed;
    }

    /// Log a finished session, extending the streak and emitting both the
    /// completed-sessions and progress-history change events
    pub fn record_completed_session(&self, drills: Vec<SessionDrillEntry>) {
        let total = u32::try_from(drills.len()).unwrap_or(u32::MAX);
        let done = u32::try_from(drills.iter().filter(|d| d.is_completed).count())
            .unwrap_or(u32::MAX);
        lock(&self.completed).push(CompletedSession {
            date: Utc::now(),
            drills,
            total_completed_drills: done,
            total_drills: total,
        });

        let mut history = lock(&self.history);
        history.current_streak = history.current_streak.saturating_add(1);
        history.highest_streak = history.highest_streak.max(history.current_streak);
        history.completed_sessions_count = history.completed_sessions_count.saturating_add(1);
        drop(history);

        emit(&self.events, SyncDomain::CompletedSessions);
        emit(&self.events, SyncDomain::ProgressHistory);
    }

    /// Reset the current streak (missed day), keeping the highest streak
    pub fn reset_streak(&self) {
        lock(&self.history).current_streak = 0;
        emit(&self.events, SyncDomain::ProgressHistory);
    }

    /// Snapshot of the streak counters
    #[must_use]
    pub fn history(&self) -> ProgressHistory {
        *lock(&self.history)
    }

    /// Snapshot of the completed-session log
    #[must_use]
    pub fn completed_sessions(&self) -> Vec<CompletedSession> {
        lock(&self.completed).clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn drill(title: &str, sets: u32) -> Drill {
        Drill {
            uuid: Uuid::new_v4(),
            title: title.to_owned(),
            skill: "passing".to_owned(),
            sub_skills: vec![],
            equipment: vec![],
            training_styles: vec![],
            instructions: vec![],
            tips: vec![],
            sets,
            reps: 10,
            duration: 10,
        }
    }

    #[test]
    fn session_mutations_emit_ordered_drills_events() {
        let (tx, mut rx) = change_channel();
        let store = SessionStore::new(tx);

        let d = drill("Wall passes", 2);
        let uuid = d.uuid;
        store.add_drill(d);
        store.record_set_done(uuid);
        store.record_set_done(uuid);

        assert!(store.is_session_complete());
        for _ in 0..3 {
            assert_eq!(rx.try_recv().unwrap(), SyncDomain::OrderedDrills);
        }
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn load_does_not_emit() {
        let (tx, mut rx) = change_channel();
        let store = SessionStore::new(tx);
        store.load_drills(vec![SessionDrillEntry::new(drill("Cone weave", 3))]);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn toggle_like_flips_membership() {
        let (tx, mut rx) = change_channel();
        let store = GroupStore::new(tx);
        let d = drill("Toe taps", 1);
        let uuid = d.uuid;

        assert!(store.toggle_like(d.clone()));
        assert!(store.is_liked(uuid));
        assert!(!store.toggle_like(d));
        assert!(!store.is_liked(uuid));

        assert_eq!(rx.try_recv().unwrap(), SyncDomain::LikedDrills);
        assert_eq!(rx.try_recv().unwrap(), SyncDomain::LikedDrills);
    }

    #[test]
    fn completed_session_emits_both_progress_domains() {
        let (tx, mut rx) = change_channel();
        let store = ProgressStore::new(tx);

        let mut entry = SessionDrillEntry::new(drill("Sprints", 3));
        entry.is_completed = true;
        store.record_completed_session(vec![entry]);

        let history = store.history();
        assert_eq!(history.current_streak, 1);
        assert_eq!(history.completed_sessions_count, 1);
        assert_eq!(rx.try_recv().unwrap(), SyncDomain::CompletedSessions);
        assert_eq!(rx.try_recv().unwrap(), SyncDomain::ProgressHistory);
    }

    #[test]
    fn reorder_out_of_range_is_a_no_op() {
        let (tx, mut rx) = change_channel();
        let store = SessionStore::new(tx);
        store.load_drills(vec![
            SessionDrillEntry::new(drill("A", 1)),
            SessionDrillEntry::new(drill("B", 1)),
        ]);

        store.reorder(0, 5);
        assert!(rx.try_recv().is_err());

        store.reorder(0, 1);
        assert_eq!(rx.try_recv().unwrap(), SyncDomain::OrderedDrills);
        assert_eq!(store.drills()[0].drill.title, "B");
    }
}
