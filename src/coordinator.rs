// ABOUTME: Orchestrates dirty-domain pushes with per-domain failure isolation
// ABOUTME: Periodic/background/explicit triggers; flags clear only on acknowledged pushes
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.

use crate::api::TrainingApi;
use crate::cache::{CacheKey, CacheStore, TypedCache};
use crate::errors::SyncResult;
use crate::stores::{ChangeReceiver, FilterStore, GroupStore, ProgressStore, SessionStore};
use crate::tracker::{ChangeTracker, SyncDomain};
use std::collections::HashSet;
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Result of one domain's push attempt within a pass
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DomainOutcome {
    /// Push acknowledged and snapshot cached; the flag cleared unless a
    /// newer mutation landed mid-flight
    Synced,
    /// Push failed; flag stays dirty for the next pass
    Failed(String),
    /// Push skipped because one for this domain is already in flight
    Skipped,
}

/// Per-domain outcomes of one sync pass.
///
/// Each domain resolves individually; a failure in one never rolls back or
/// blocks another. The liked/saved drill-group pair shares one outcome.
#[derive(Debug, Default)]
pub struct PassSummary {
    outcomes: Vec<(SyncDomain, DomainOutcome)>,
}

impl PassSummary {
    fn record(&mut self, domain: SyncDomain, outcome: DomainOutcome) {
        self.outcomes.push((domain, outcome));
    }

    /// All recorded outcomes in visit order
    #[must_use]
    pub fn outcomes(&self) -> &[(SyncDomain, DomainOutcome)] {
        &self.outcomes
    }

    /// Domains whose push was acknowledged this pass
    #[must_use]
    pub fn synced(&self) -> Vec<SyncDomain> {
        self.outcomes
            .iter()
            .filter(|(_, o)| *o == DomainOutcome::Synced)
            .map(|(d, _)| *d)
            .collect()
    }

    /// Domains whose push failed this pass
    #[must_use]
    pub fn failed(&self) -> Vec<SyncDomain> {
        self.outcomes
            .iter()
            .filter(|(_, o)| matches!(o, DomainOutcome::Failed(_)))
            .map(|(d, _)| *d)
            .collect()
    }

    /// Whether the pass attempted nothing (nothing dirty)
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }
}

impl fmt::Display for PassSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "pass: {} synced, {} failed, {} total",
            self.synced().len(),
            self.failed().len(),
            self.outcomes.len()
        )
    }
}

/// Handle to a spawned coordinator task; dropping it or calling `stop`
/// shuts the task down
pub struct TaskHandle {
    shutdown_tx: mpsc::Sender<()>,
    task: Option<JoinHandle<()>>,
}

impl TaskHandle {
    /// Signal the task to stop and wait for it to finish
    pub async fn stop(mut self) {
        let _ = self.shutdown_tx.send(()).await;
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
    }
}

impl Drop for TaskHandle {
    fn drop(&mut self) {
        // Best-effort shutdown so the loop does not outlive its owner
        let _ = self.shutdown_tx.try_send(());
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

/// Translates dirty flags into remote pushes.
///
/// Collaborators are injected, never reached for as ambient singletons, so
/// every seam takes a test double.
pub struct SyncCoordinator {
    tracker: Arc<ChangeTracker>,
    api: TrainingApi,
    cache: Arc<dyn CacheStore>,
    session: Arc<SessionStore>,
    filters: Arc<FilterStore>,
    groups: Arc<GroupStore>,
    progress: Arc<ProgressStore>,
    /// Cache scope for the signed-in account
    user: String,
    in_flight: Mutex<HashSet<SyncDomain>>,
}

impl SyncCoordinator {
    /// Wire a coordinator over its collaborators
    #[allow(clippy::too_many_arguments)]
    #[must_use]
    pub fn new(
        tracker: Arc<ChangeTracker>,
        api: TrainingApi,
        cache: Arc<dyn CacheStore>,
        session: Arc<SessionStore>,
        filters: Arc<FilterStore>,
        groups: Arc<GroupStore>,
        progress: Arc<ProgressStore>,
        user: &str,
    ) -> Self {
        Self {
            tracker,
            api,
            cache,
            session,
            filters,
            groups,
            progress,
            user: user.to_owned(),
            in_flight: Mutex::new(HashSet::new()),
        }
    }

    /// The change tracker this coordinator drives
    #[must_use]
    pub fn tracker(&self) -> Arc<ChangeTracker> {
        Arc::clone(&self.tracker)
    }

    /// Record a local mutation: mark the domain dirty and immediately write
    /// its local snapshot. The cache write is cheap and must never wait on
    /// network state; a cache failure is logged and does not undo the flag.
    pub async fn note_mutation(&self, domain: SyncDomain) {
        if !self.tracker.mark_dirty(domain) && self.tracker.is_logging_out() {
            return;
        }
        if let Err(e) = self.write_snapshot(domain).await {
            warn!(%domain, error = %e, "local snapshot write failed");
        }
    }

    /// Consume store change events until the channel closes or shutdown is
    /// signalled. Spawn via [`Self::spawn_event_loop`].
    async fn run_event_loop(self: Arc<Self>, mut events: ChangeReceiver, mut shutdown: mpsc::Receiver<()>) {
        loop {
            tokio::select! {
                maybe_domain = events.recv() => {
                    match maybe_domain {
                        Some(domain) => self.note_mutation(domain).await,
                        None => {
                            debug!("change channel closed, event loop exiting");
                            break;
                        }
                    }
                }
                _ = shutdown.recv() => {
                    debug!("event loop received shutdown signal");
                    break;
                }
            }
        }
    }

    /// Spawn the store-event consumer task
    #[must_use]
    pub fn spawn_event_loop(self: &Arc<Self>, events: ChangeReceiver) -> TaskHandle {
        let (shutdown_tx, shutdown_rx) = mpsc::channel(1);
        let coordinator = Arc::clone(self);
        let task = tokio::spawn(coordinator.run_event_loop(events, shutdown_rx));
        TaskHandle {
            shutdown_tx,
            task: Some(task),
        }
    }

    /// Spawn the periodic sync timer. The task stops when the handle is
    /// dropped or stopped, so a destroyed coordinator never leaks a timer.
    #[must_use]
    pub fn spawn_periodic(self: &Arc<Self>, interval: Duration) -> TaskHandle {
        let (shutdown_tx, mut shutdown_rx) = mpsc::channel(1);
        let coordinator = Arc::clone(self);
        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            // First tick fires immediately; skip it so the cadence starts
            // one interval after spawn
            ticker.tick().await;
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        let summary = coordinator.sync_pass().await;
                        if !summary.is_empty() {
                            info!(%summary, "periodic sync pass finished");
                        }
                    }
                    _ = shutdown_rx.recv() => {
                        debug!("periodic sync task received shutdown signal");
                        break;
                    }
                }
            }
        });
        TaskHandle {
            shutdown_tx,
            task: Some(task),
        }
    }

    /// App moved to background: push whatever is dirty now
    pub async fn on_background(&self) -> PassSummary {
        self.sync_pass().await
    }

    /// One sync pass: independently push every dirty domain.
    ///
    /// Returns immediately with an empty summary when nothing is dirty (no
    /// network call). Each domain's flag clears only on its own acknowledged
    /// push; failures leave their flags dirty for the next pass. The
    /// liked/saved pair goes out as one combined request with one shared
    /// outcome.
    pub async fn sync_pass(&self) -> PassSummary {
        let mut summary = PassSummary::default();
        if !self.tracker.has_any_dirty() {
            return summary;
        }

        let dirty = self.tracker.dirty_domains();
        debug!(?dirty, "sync pass starting");

        let mut groups_handled = false;
        for domain in dirty {
            match domain {
                SyncDomain::LikedDrills | SyncDomain::SavedDrills => {
                    if !groups_handled {
                        self.push_drill_groups(&mut summary).await;
                        groups_handled = true;
                    }
                }
                _ => self.push_domain(domain, &mut summary).await,
            }
        }

        summary
    }

    /// Suppress further dirty-marking, drop pending flags, and drop this
    /// account's snapshots so no sync races the logout. Other accounts'
    /// snapshots in a shared cache are left alone.
    ///
    /// # Errors
    ///
    /// Returns an error if clearing the cache or credential store fails;
    /// suppression is active either way.
    pub async fn begin_logout(&self) -> SyncResult<()> {
        self.tracker.set_logging_out(true);
        self.tracker.reset();
        for domain in SyncDomain::ALL {
            self.cache
                .invalidate(&CacheKey::new(&self.user, domain))
                .await?;
        }
        self.api.client().clear_token_pair().await?;
        info!("logout: sync suppressed, local state cleared");
        Ok(())
    }

    /// Re-enable dirty-marking after a fresh login
    pub fn resume_after_login(&self) {
        self.tracker.set_logging_out(false);
    }

    /// Load every domain's snapshot from the local cache into the stores,
    /// without marking anything dirty. Used at launch before the network is
    /// touched.
    pub async fn hydrate_from_cache(&self) {
        if let Ok(Some(drills)) = self.read_snapshot(SyncDomain::OrderedDrills).await {
            self.session.load_drills(drills);
        }
        if let Ok(Some(filters)) = self.read_snapshot(SyncDomain::SavedFilters).await {
            self.filters.load(filters);
        }
        let liked = self.read_snapshot(SyncDomain::LikedDrills).await;
        let saved = self.read_snapshot(SyncDomain::SavedDrills).await;
        if let (Ok(Some(liked)), Ok(Some(saved))) = (liked, saved) {
            self.groups.load(liked, saved);
        }
        let history = self.read_snapshot(SyncDomain::ProgressHistory).await;
        let completed = self.read_snapshot(SyncDomain::CompletedSessions).await;
        if let (Ok(Some(history)), Ok(Some(completed))) = (history, completed) {
            self.progress.load(history, completed);
        }
        debug!("stores hydrated from local cache");
    }

    /// Pull remote state into the stores and refresh snapshots, without
    /// marking anything dirty. Individual fetch failures are logged and
    /// skipped; local state wins for any domain still dirty.
    pub async fn pull_remote(&self) {
        if !self.tracker.is_dirty(SyncDomain::OrderedDrills) {
            match self.api.get_ordered_drills().await {
                Ok(drills) => {
                    self.session.load_drills(drills);
                    self.refresh_snapshot(SyncDomain::OrderedDrills).await;
                }
                Err(e) => warn!(error = %e, "ordered drills fetch failed"),
            }
        }
        if !self.tracker.is_dirty(SyncDomain::SavedFilters) {
            match self.api.get_saved_filters().await {
                Ok(filters) => {
                    self.filters.load(filters);
                    self.refresh_snapshot(SyncDomain::SavedFilters).await;
                }
                Err(e) => warn!(error = %e, "saved filters fetch failed"),
            }
        }
        if !self.tracker.is_dirty(SyncDomain::LikedDrills)
            && !self.tracker.is_dirty(SyncDomain::SavedDrills)
        {
            match self.api.get_drill_groups().await {
                Ok((liked, saved)) => {
                    self.groups.load(liked, saved);
                    self.refresh_snapshot(SyncDomain::LikedDrills).await;
                    self.refresh_snapshot(SyncDomain::SavedDrills).await;
                }
                Err(e) => warn!(error = %e, "drill groups fetch failed"),
            }
        }
        if !self.tracker.is_dirty(SyncDomain::CompletedSessions) {
            match self.api.get_completed_sessions().await {
                Ok(sessions) => {
                    self.progress.load(self.progress.history(), sessions);
                    self.refresh_snapshot(SyncDomain::CompletedSessions).await;
                }
                Err(e) => warn!(error = %e, "completed sessions fetch failed"),
            }
        }
        if !self.tracker.is_dirty(SyncDomain::ProgressHistory) {
            match self.api.get_progress_history().await {
                Ok(history) => {
                    self.progress.load(history, self.progress.completed_sessions());
                    self.refresh_snapshot(SyncDomain::ProgressHistory).await;
                }
                Err(e) => warn!(error = %e, "progress history fetch failed"),
            }
        }
    }

    async fn push_domain(&self, domain: SyncDomain, summary: &mut PassSummary) {
        if !self.begin_flight(&[domain]) {
            debug!(%domain, "push already in flight, skipping");
            summary.record(domain, DomainOutcome::Skipped);
            return;
        }

        // Captured before the payload is read; a mismatch at settle time
        // means a mutation landed mid-flight and the flag must stay dirty
        let generation = self.tracker.generation(domain);
        let result = match domain {
            SyncDomain::OrderedDrills => {
                self.api.put_ordered_drills(&self.session.drills()).await
            }
            SyncDomain::SavedFilters => {
                self.api.post_saved_filters(&self.filters.all()).await
            }
            SyncDomain::CompletedSessions => self.push_latest_completed_session().await,
            SyncDomain::ProgressHistory => {
                self.api.put_progress_history(&self.progress.history()).await
            }
            // Handled by push_drill_groups
            SyncDomain::LikedDrills | SyncDomain::SavedDrills => Ok(()),
        };

        // The reservation must outlive the flag-clear decision, or an
        // overlapping pass could start a second push for this domain first
        self.settle(domain, generation, result, summary).await;
        self.end_flight(&[domain]);
    }

    /// Combined liked/saved push: one request, one flag-clear decision for
    /// both domains
    async fn push_drill_groups(&self, summary: &mut PassSummary) {
        let pair = [SyncDomain::LikedDrills, SyncDomain::SavedDrills];
        if !self.begin_flight(&pair) {
            debug!("drill group push already in flight, skipping");
            for domain in pair {
                if self.tracker.is_dirty(domain) {
                    summary.record(domain, DomainOutcome::Skipped);
                }
            }
            return;
        }

        let generations = pair.map(|domain| self.tracker.generation(domain));
        let liked = self.groups.liked();
        let saved = self.groups.saved();
        let result = self.api.put_drill_groups(&liked, &saved).await;

        match result {
            Ok(()) => {
                for (domain, generation) in pair.into_iter().zip(generations) {
                    if self.tracker.is_dirty(domain) {
                        summary.record(domain, DomainOutcome::Synced);
                    }
                    self.tracker.clear_if_unchanged(domain, generation);
                    self.refresh_snapshot(domain).await;
                }
            }
            Err(e) => {
                warn!(error = %e, "combined drill group push failed, both domains stay dirty");
                for domain in pair {
                    if self.tracker.is_dirty(domain) {
                        summary.record(domain, DomainOutcome::Failed(e.to_string()));
                    }
                }
            }
        }
        self.end_flight(&pair);
    }

    async fn push_latest_completed_session(&self) -> SyncResult<()> {
        let sessions = self.progress.completed_sessions();
        let Some(latest) = sessions.last() else {
            // Dirty with nothing to push happens after a logout race; treat
            // as settled
            return Ok(());
        };
        self.api.post_completed_session(latest).await
    }

    async fn settle(
        &self,
        domain: SyncDomain,
        generation: u64,
        result: SyncResult<()>,
        summary: &mut PassSummary,
    ) {
        match result {
            Ok(()) => {
                if !self.tracker.clear_if_unchanged(domain, generation)
                    && self.tracker.is_dirty(domain)
                {
                    debug!(%domain, "pushed payload superseded mid-flight, syncing again next pass");
                }
                self.refresh_snapshot(domain).await;
                summary.record(domain, DomainOutcome::Synced);
            }
            Err(e) => {
                warn!(%domain, error = %e, "push failed, domain stays dirty");
                summary.record(domain, DomainOutcome::Failed(e.to_string()));
            }
        }
    }

    /// Reserve domains for an in-flight push; false when any is already
    /// flying
    fn begin_flight(&self, domains: &[SyncDomain]) -> bool {
        let mut in_flight = self.lock_in_flight();
        if domains.iter().any(|d| in_flight.contains(d)) {
            return false;
        }
        in_flight.extend(domains.iter().copied());
        true
    }

    fn end_flight(&self, domains: &[SyncDomain]) {
        let mut in_flight = self.lock_in_flight();
        for domain in domains {
            in_flight.remove(domain);
        }
    }

    async fn write_snapshot(&self, domain: SyncDomain) -> SyncResult<()> {
        let key = CacheKey::new(&self.user, domain);
        match domain {
            SyncDomain::OrderedDrills => {
                TypedCache::set(&self.cache, &key, &self.session.drills()).await
            }
            SyncDomain::SavedFilters => {
                TypedCache::set(&self.cache, &key, &self.filters.all()).await
            }
            SyncDomain::LikedDrills => TypedCache::set(&self.cache, &key, &self.groups.liked()).await,
            SyncDomain::SavedDrills => TypedCache::set(&self.cache, &key, &self.groups.saved()).await,
            SyncDomain::CompletedSessions => {
                TypedCache::set(&self.cache, &key, &self.progress.completed_sessions()).await
            }
            SyncDomain::ProgressHistory => {
                TypedCache::set(&self.cache, &key, &self.progress.history()).await
            }
        }
    }

    async fn refresh_snapshot(&self, domain: SyncDomain) {
        if let Err(e) = self.write_snapshot(domain).await {
            warn!(%domain, error = %e, "snapshot refresh failed");
        }
    }

    async fn read_snapshot<T: serde::de::DeserializeOwned>(
        &self,
        domain: SyncDomain,
    ) -> SyncResult<Option<T>> {
        TypedCache::get(&self.cache, &CacheKey::new(&self.user, domain)).await
    }

    fn lock_in_flight(&self) -> std::sync::MutexGuard<'_, HashSet<SyncDomain>> {
        self.in_flight.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl fmt::Debug for SyncCoordinator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SyncCoordinator")
            .field("user", &self.user)
            .finish_non_exhaustive()
    }
}
