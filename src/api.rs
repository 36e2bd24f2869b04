// ABOUTME: Typed wrappers over ApiClient for the training backend's endpoints
// ABOUTME: Maps non-2xx statuses to BadResponse and decodes snake_case JSON bodies
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.

use crate::client::{ApiClient, RequestSpec};
use crate::constants::{debounce_keys, endpoints};
use crate::errors::SyncResult;
use crate::models::{
    AuthTokenPair, CompletedSession, Drill, DrillGroup, DrillSearchPage, LoginResponse,
    ProgressHistory, SavedFilters, SessionDrillEntry, SessionPreferences,
};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tracing::info;

#[derive(Deserialize)]
struct OrderedDrillsResponse {
    #[serde(default)]
    ordered_drills: Vec<SessionDrillEntry>,
}

#[derive(Deserialize)]
struct GeneratedSessionResponse {
    #[serde(default)]
    drills: Vec<Drill>,
}

#[derive(Deserialize)]
struct CompletedSessionsResponse {
    #[serde(default)]
    sessions: Vec<CompletedSession>,
}

#[derive(Deserialize)]
struct SavedFiltersResponse {
    #[serde(default)]
    filters: Vec<SavedFilters>,
}

#[derive(Deserialize)]
struct DrillGroupsResponse {
    liked_group: DrillGroup,
    #[serde(default)]
    saved_groups: Vec<DrillGroup>,
}

/// Typed view of the training backend consumed by the sync core
pub struct TrainingApi {
    client: Arc<ApiClient>,
}

impl TrainingApi {
    /// Wrap an authenticated client
    #[must_use]
    pub const fn new(client: Arc<ApiClient>) -> Self {
        Self { client }
    }

    /// The underlying request executor
    #[must_use]
    pub fn client(&self) -> Arc<ApiClient> {
        Arc::clone(&self.client)
    }

    /// Password login, debounced under `login_request`.
    ///
    /// The returned token pair is persisted to the credential store before
    /// this returns.
    ///
    /// # Errors
    ///
    /// `Debounced` when a login attempt is already in the debounce window,
    /// `BadResponse` for rejected credentials, `Network` for transport
    /// failures.
    pub async fn login(&self, email: &str, password: &str) -> SyncResult<LoginResponse> {
        let spec = RequestSpec {
            retry_on_401: false,
            ..RequestSpec::post(
                endpoints::LOGIN,
                json!({ "email": email, "password": password }),
            )
        }
        .debounced(debounce_keys::LOGIN_REQUEST, None);

        let response = self.client.request(spec).await?;
        let login: LoginResponse = response.json()?;
        self.client
            .store_token_pair(&AuthTokenPair {
                access_token: login.access_token.clone(),
                refresh_token: login.refresh_token.clone(),
            })
            .await?;
        info!("login succeeded, token pair stored");
        Ok(login)
    }

    /// Update session-generation preferences
    ///
    /// # Errors
    ///
    /// `BadResponse` for non-2xx statuses, `AuthRequired` when refresh
    /// fails, `Network` for transport failures.
    pub async fn put_preferences(&self, preferences: &SessionPreferences) -> SyncResult<()> {
        let spec = RequestSpec::put(
            endpoints::SESSION_PREFERENCES,
            serde_json::to_value(preferences)?,
        );
        self.client.request(spec).await?.require_success()
    }

    /// Ask the backend to generate a fresh session, debounced so a
    /// double-tap cannot fire two generations
    ///
    /// # Errors
    ///
    /// `Debounced` inside the window; otherwise as [`Self::put_preferences`].
    pub async fn generate_session(
        &self,
        preferences: &SessionPreferences,
    ) -> SyncResult<Vec<Drill>> {
        let spec = RequestSpec::post(
            endpoints::SESSION_GENERATE,
            serde_json::to_value(preferences)?,
        )
        .debounced(debounce_keys::GENERATE_SESSION, None);

        let response = self.client.request(spec).await?;
        let generated: GeneratedSessionResponse = response.json()?;
        Ok(generated.drills)
    }

    /// Fetch the remote ordered drill list
    ///
    /// # Errors
    ///
    /// `BadResponse`, `AuthRequired`, or `Network` per the client contract.
    pub async fn get_ordered_drills(&self) -> SyncResult<Vec<SessionDrillEntry>> {
        let response = self
            .client
            .request(RequestSpec::get(endpoints::ORDERED_DRILLS))
            .await?;
        let body: OrderedDrillsResponse = response.json()?;
        Ok(body.ordered_drills)
    }

    /// Push the whole ordered drill list
    ///
    /// # Errors
    ///
    /// `BadResponse`, `AuthRequired`, or `Network` per the client contract.
    pub async fn put_ordered_drills(&self, drills: &[SessionDrillEntry]) -> SyncResult<()> {
        let spec = RequestSpec::put(
            endpoints::ORDERED_DRILLS,
            json!({ "ordered_drills": drills }),
        );
        self.client.request(spec).await?.require_success()
    }

    /// Fetch the completed-session log
    ///
    /// # Errors
    ///
    /// `BadResponse`, `AuthRequired`, or `Network` per the client contract.
    pub async fn get_completed_sessions(&self) -> SyncResult<Vec<CompletedSession>> {
        let response = self
            .client
            .request(RequestSpec::get(endpoints::COMPLETED_SESSIONS))
            .await?;
        let body: CompletedSessionsResponse = response.json()?;
        Ok(body.sessions)
    }

    /// Log one completed session
    ///
    /// # Errors
    ///
    /// `BadResponse`, `AuthRequired`, or `Network` per the client contract.
    pub async fn post_completed_session(&self, session: &CompletedSession) -> SyncResult<()> {
        let spec = RequestSpec::post(
            endpoints::COMPLETED_SESSIONS,
            serde_json::to_value(session)?,
        );
        self.client.request(spec).await?.require_success()
    }

    /// Fetch streak counters
    ///
    /// # Errors
    ///
    /// `BadResponse`, `AuthRequired`, or `Network` per the client contract.
    pub async fn get_progress_history(&self) -> SyncResult<ProgressHistory> {
        let response = self
            .client
            .request(RequestSpec::get(endpoints::PROGRESS_HISTORY))
            .await?;
        response.json()
    }

    /// Push streak counters
    ///
    /// # Errors
    ///
    /// `BadResponse`, `AuthRequired`, or `Network` per the client contract.
    pub async fn put_progress_history(&self, history: &ProgressHistory) -> SyncResult<()> {
        let spec = RequestSpec::put(
            endpoints::PROGRESS_HISTORY,
            serde_json::to_value(history)?,
        );
        self.client.request(spec).await?.require_success()
    }

    /// Fetch saved filter groups
    ///
    /// # Errors
    ///
    /// `BadResponse`, `AuthRequired`, or `Network` per the client contract.
    pub async fn get_saved_filters(&self) -> SyncResult<Vec<SavedFilters>> {
        let response = self
            .client
            .request(RequestSpec::get(endpoints::SAVED_FILTERS))
            .await?;
        let body: SavedFiltersResponse = response.json()?;
        Ok(body.filters)
    }

    /// Push all saved filter groups
    ///
    /// # Errors
    ///
    /// `BadResponse`, `AuthRequired`, or `Network` per the client contract.
    pub async fn post_saved_filters(&self, filters: &[SavedFilters]) -> SyncResult<()> {
        let spec = RequestSpec::post(endpoints::SAVED_FILTERS, json!({ "filters": filters }));
        self.client.request(spec).await?.require_success()
    }

    /// Combined push of the liked group and saved groups.
    ///
    /// The remote couples both under one drill-group resource; one request
    /// settles both domains.
    ///
    /// # Errors
    ///
    /// `BadResponse`, `AuthRequired`, or `Network` per the client contract.
    pub async fn put_drill_groups(
        &self,
        liked: &DrillGroup,
        saved: &[DrillGroup],
    ) -> SyncResult<()> {
        let spec = RequestSpec::put(
            endpoints::DRILL_GROUPS_SYNC,
            json!({ "liked_group": liked, "saved_groups": saved }),
        );
        self.client.request(spec).await?.require_success()
    }

    /// Fetch the liked group and saved groups
    ///
    /// # Errors
    ///
    /// `BadResponse`, `AuthRequired`, or `Network` per the client contract.
    pub async fn get_drill_groups(&self) -> SyncResult<(DrillGroup, Vec<DrillGroup>)> {
        let response = self
            .client
            .request(RequestSpec::get(endpoints::DRILL_GROUPS_SYNC))
            .await?;
        let body: DrillGroupsResponse = response.json()?;
        Ok((body.liked_group, body.saved_groups))
    }

    /// Search the drill catalog
    ///
    /// # Errors
    ///
    /// `BadResponse`, `AuthRequired`, or `Network` per the client contract.
    pub async fn search_drills(
        &self,
        query: &str,
        page: u32,
        per_page: u32,
    ) -> SyncResult<DrillSearchPage> {
        let endpoint = format!(
            "{}?query={}&page={page}&per_page={per_page}",
            endpoints::DRILL_SEARCH,
            urlencoding::encode(query)
        );
        let response = self.client.request(RequestSpec::get(&endpoint)).await?;
        response.json()
    }
}
