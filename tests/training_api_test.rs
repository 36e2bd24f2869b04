// ABOUTME: Tests for the typed backend wrappers: login, generation, and fetch decoding
// ABOUTME: Exercises debounced login, token persistence, and null-tolerant decoding
#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![allow(missing_docs)]

mod common;

use common::client_fixture_with;
use drillsync::api::TrainingApi;
use drillsync::constants::token_keys;
use drillsync::models::SessionPreferences;
use drillsync::storage::{CredentialStore, InMemoryCredentialStore};
use std::time::Duration;

#[tokio::test(start_paused = true)]
async fn login_persists_token_pair_and_debounces_rapid_retries() {
    let (client, transport, credentials) =
        client_fixture_with(InMemoryCredentialStore::new());
    transport.respond(
        "/login/",
        200,
        r#"{"access_token":"a1","refresh_token":"r1","email":"p@t"}"#,
    );
    let api = TrainingApi::new(client);

    let login = api.login("p@t", "secret").await.unwrap();
    assert_eq!(login.access_token, "a1");
    assert_eq!(
        credentials.get(token_keys::ACCESS_TOKEN).await.unwrap(),
        Some("a1".to_owned())
    );

    // Second attempt 300ms later is rejected before any HTTP call
    tokio::time::advance(Duration::from_millis(300)).await;
    let err = api.login("p@t", "secret").await.unwrap_err();
    assert!(err.is_debounced(), "unexpected error: {err}");
    assert_eq!(transport.count("/login/"), 1);
}

#[tokio::test]
async fn rejected_login_maps_to_bad_response() {
    let (client, transport, _) = client_fixture_with(InMemoryCredentialStore::new());
    transport.respond("/login/", 401, r#"{"detail":"bad credentials"}"#);
    let api = TrainingApi::new(client);

    let err = api.login("p@t", "wrong").await.unwrap_err();
    assert!(matches!(
        err,
        drillsync::SyncError::BadResponse { status: 401, .. }
    ));
}

#[tokio::test(start_paused = true)]
async fn session_generation_is_debounced() {
    let (client, transport, _) = client_fixture_with(InMemoryCredentialStore::with_tokens("a1", "r1"));
    transport.respond(
        "/api/session/generate",
        200,
        r#"{"drills":[{"uuid":"8f1b4d0a-58f8-4f2b-9d2a-6a9c54d9a001","title":"Wall passes","skill":"passing","duration":null,"sets":null,"reps":null}]}"#,
    );
    let api = TrainingApi::new(client);
    let preferences = SessionPreferences::default();

    let drills = api.generate_session(&preferences).await.unwrap();
    assert_eq!(drills.len(), 1);
    // Nulls collapse to defaults on decode
    assert_eq!(drills[0].duration, 10);
    assert_eq!(drills[0].sets, 0);

    tokio::time::advance(Duration::from_millis(200)).await;
    let err = api.generate_session(&preferences).await.unwrap_err();
    assert!(err.is_debounced(), "unexpected error: {err}");
    assert_eq!(transport.count("/api/session/generate"), 1);
}

#[tokio::test]
async fn ordered_drills_fetch_decodes_the_wrapped_list() {
    let (client, transport, _) = client_fixture_with(InMemoryCredentialStore::with_tokens("a1", "r1"));
    transport.respond(
        "/api/sessions/ordered_drills/",
        200,
        r#"{"ordered_drills":[{"drill":{"uuid":"8f1b4d0a-58f8-4f2b-9d2a-6a9c54d9a001","title":"Cone weave","skill":"dribbling"},"sets_done":1,"is_completed":false}]}"#,
    );
    let api = TrainingApi::new(client);

    let drills = api.get_ordered_drills().await.unwrap();
    assert_eq!(drills.len(), 1);
    assert_eq!(drills[0].drill.title, "Cone weave");
    assert_eq!(drills[0].sets_done, 1);
}

#[tokio::test]
async fn drill_search_encodes_the_query() {
    let (client, transport, _) = client_fixture_with(InMemoryCredentialStore::with_tokens("a1", "r1"));
    transport.respond(
        "/api/drills/search",
        200,
        r#"{"items":[],"total":0,"page":1}"#,
    );
    let api = TrainingApi::new(client);

    let page = api.search_drills("wall passes", 1, 20).await.unwrap();
    assert_eq!(page.total, 0);

    let recorded = transport.requests();
    let search = recorded
        .iter()
        .find(|r| r.url.path().starts_with("/api/drills/search"))
        .unwrap();
    let query = search.url.query().unwrap();
    assert!(query.contains("query=wall%20passes"), "query was: {query}");
    assert!(query.contains("page=1"));
}

#[tokio::test]
async fn preferences_update_requires_success_status() {
    let (client, transport, _) = client_fixture_with(InMemoryCredentialStore::with_tokens("a1", "r1"));
    transport.respond("/api/session/preferences", 422, r#"{"detail":"bad"}"#);
    let api = TrainingApi::new(client);

    let err = api
        .put_preferences(&SessionPreferences::default())
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        drillsync::SyncError::BadResponse { status: 422, .. }
    ));
}
