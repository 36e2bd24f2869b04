// ABOUTME: Shared test doubles and wiring helpers for integration tests
// ABOUTME: Scripted HTTP transport plus a fully assembled coordinator harness
#![allow(
    dead_code,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::missing_panics_doc,
    clippy::must_use_candidate
)]

use async_trait::async_trait;
use drillsync::api::TrainingApi;
use drillsync::cache::InMemoryCache;
use drillsync::client::{ApiClient, ApiResponse, HttpTransport, TransportRequest};
use drillsync::config::SyncConfig;
use drillsync::coordinator::SyncCoordinator;
use drillsync::debounce::DebounceGate;
use drillsync::errors::{SyncError, SyncResult};
use drillsync::models::{Drill, SessionDrillEntry};
use drillsync::storage::InMemoryCredentialStore;
use drillsync::stores::{
    change_channel, ChangeReceiver, FilterStore, GroupStore, ProgressStore, SessionStore,
};
use drillsync::tracker::ChangeTracker;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use tokio::sync::Semaphore;
use uuid::Uuid;

/// One scripted reply
#[derive(Clone)]
pub enum MockReply {
    Http(u16, String),
    NetworkError,
}

struct Rule {
    path: String,
    replies: VecDeque<MockReply>,
    /// Whether the sole remaining reply has already been served; a later
    /// `push` supersedes it instead of queueing behind it
    sticky_served: bool,
}

/// Scripted transport double.
///
/// Rules match by URL path prefix; replies for a path are consumed in
/// order, with the last reply repeating once the queue is down to one.
/// Unmatched requests get `200 {}`. Every request is recorded for
/// assertions.
#[derive(Default)]
pub struct MockTransport {
    rules: Mutex<Vec<Rule>>,
    requests: Mutex<Vec<TransportRequest>>,
    gates: Mutex<Vec<(String, Arc<Semaphore>)>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a reply for requests whose path starts with `path`
    pub fn respond(&self, path: &str, status: u16, body: &str) {
        self.push(path, MockReply::Http(status, body.to_owned()));
    }

    /// Queue a transport failure for requests whose path starts with `path`
    pub fn respond_network_error(&self, path: &str) {
        self.push(path, MockReply::NetworkError);
    }

    /// Hold requests whose path starts with `path` until the returned gate
    /// gets a permit (`add_permits(1)` releases one request)
    pub fn hold(&self, path: &str) -> Arc<Semaphore> {
        let gate = Arc::new(Semaphore::new(0));
        self.gates
            .lock()
            .unwrap()
            .push((path.to_owned(), Arc::clone(&gate)));
        gate
    }

    fn push(&self, path: &str, reply: MockReply) {
        let mut rules = self.rules.lock().unwrap();
        if let Some(rule) = rules.iter_mut().find(|r| r.path == path) {
            if rule.sticky_served {
                rule.replies.pop_front();
                rule.sticky_served = false;
            }
            rule.replies.push_back(reply);
        } else {
            rules.push(Rule {
                path: path.to_owned(),
                replies: VecDeque::from([reply]),
                sticky_served: false,
            });
        }
    }

    /// All recorded requests
    pub fn requests(&self) -> Vec<TransportRequest> {
        self.requests.lock().unwrap().clone()
    }

    /// Number of recorded requests whose path starts with `path`
    pub fn count(&self, path: &str) -> usize {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.url.path().starts_with(path))
            .count()
    }

    /// Total number of recorded requests
    pub fn total(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    /// Bearer tokens carried by each recorded request to `path`
    pub fn bearer_tokens(&self, path: &str) -> Vec<Option<String>> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.url.path().starts_with(path))
            .map(|r| {
                r.headers.iter().find_map(|(name, value)| {
                    (name == "Authorization").then(|| {
                        value.trim_start_matches("Bearer ").to_owned()
                    })
                })
            })
            .collect()
    }
}

#[async_trait]
impl HttpTransport for MockTransport {
    async fn execute(&self, request: TransportRequest) -> SyncResult<ApiResponse> {
        // Yield once so concurrent callers interleave like real network I/O
        tokio::task::yield_now().await;

        let path = request.url.path().to_owned();
        self.requests.lock().unwrap().push(request);

        let gate = {
            let gates = self.gates.lock().unwrap();
            gates
                .iter()
                .find(|(prefix, _)| path.starts_with(prefix))
                .map(|(_, gate)| Arc::clone(gate))
        };
        if let Some(gate) = gate {
            gate.acquire().await.unwrap().forget();
        }

        let reply = {
            let mut rules = self.rules.lock().unwrap();
            match rules.iter_mut().find(|r| path.starts_with(&r.path)) {
                Some(rule) => {
                    if rule.replies.len() > 1 {
                        rule.replies.pop_front().unwrap()
                    } else {
                        rule.sticky_served = true;
                        rule.replies.front().cloned().unwrap()
                    }
                }
                None => MockReply::Http(200, "{}".to_owned()),
            }
        };

        match reply {
            MockReply::Http(status, body) => Ok(ApiResponse {
                status,
                body: body.into_bytes(),
            }),
            MockReply::NetworkError => Err(SyncError::Network("connection refused".into())),
        }
    }
}

/// Fully wired coordinator over test doubles
pub struct Harness {
    pub transport: Arc<MockTransport>,
    pub credentials: Arc<InMemoryCredentialStore>,
    pub cache: Arc<InMemoryCache>,
    pub tracker: Arc<ChangeTracker>,
    pub session: Arc<SessionStore>,
    pub filters: Arc<FilterStore>,
    pub groups: Arc<GroupStore>,
    pub progress: Arc<ProgressStore>,
    pub coordinator: Arc<SyncCoordinator>,
    pub receiver: Option<ChangeReceiver>,
}

impl Harness {
    /// Build a harness with a seeded token pair
    pub fn new() -> Self {
        Self::with_credentials(InMemoryCredentialStore::with_tokens("a1", "r1"))
    }

    /// Build a harness over an explicit credential store
    pub fn with_credentials(credentials: InMemoryCredentialStore) -> Self {
        let config = SyncConfig::with_base_url("https://api.test").unwrap();
        let transport = Arc::new(MockTransport::new());
        let credentials = Arc::new(credentials);
        let debounce = Arc::new(DebounceGate::new());
        let client = Arc::new(ApiClient::new(
            config,
            transport.clone(),
            credentials.clone(),
            debounce,
        ));

        let (events, receiver) = change_channel();
        let session = Arc::new(SessionStore::new(events.clone()));
        let filters = Arc::new(FilterStore::new(events.clone()));
        let groups = Arc::new(GroupStore::new(events.clone()));
        let progress = Arc::new(ProgressStore::new(events));

        let tracker = Arc::new(ChangeTracker::new());
        let cache = Arc::new(InMemoryCache::new());
        let coordinator = Arc::new(SyncCoordinator::new(
            tracker.clone(),
            TrainingApi::new(client),
            cache.clone(),
            session.clone(),
            filters.clone(),
            groups.clone(),
            progress.clone(),
            "player@test",
        ));

        Self {
            transport,
            credentials,
            cache,
            tracker,
            session,
            filters,
            groups,
            progress,
            coordinator,
            receiver: Some(receiver),
        }
    }

}

/// Build a standalone client over fresh doubles for request-level tests
pub fn client_fixture() -> (Arc<ApiClient>, Arc<MockTransport>, Arc<InMemoryCredentialStore>) {
    client_fixture_with(InMemoryCredentialStore::with_tokens("a1", "r1"))
}

/// Build a standalone client over an explicit credential store
pub fn client_fixture_with(
    credentials: InMemoryCredentialStore,
) -> (Arc<ApiClient>, Arc<MockTransport>, Arc<InMemoryCredentialStore>) {
    let config = SyncConfig::with_base_url("https://api.test").unwrap();
    let transport = Arc::new(MockTransport::new());
    let credentials = Arc::new(credentials);
    let client = Arc::new(ApiClient::new(
        config,
        transport.clone(),
        credentials.clone(),
        Arc::new(DebounceGate::new()),
    ));
    (client, transport, credentials)
}

/// A drill fixture with a fresh uuid
pub fn drill(title: &str) -> Drill {
    Drill {
        uuid: Uuid::new_v4(),
        title: title.to_owned(),
        skill: "passing".to_owned(),
        sub_skills: vec!["short_passing".to_owned()],
        equipment: vec!["ball".to_owned()],
        training_styles: vec![],
        instructions: vec![],
        tips: vec![],
        sets: 3,
        reps: 10,
        duration: 10,
    }
}

/// A session entry fixture
pub fn entry(title: &str) -> SessionDrillEntry {
    SessionDrillEntry::new(drill(title))
}
