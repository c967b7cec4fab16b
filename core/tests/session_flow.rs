mod common;

use chrono::{Duration, Utc};
use common::{query, Harness, REDIRECT_URI};
use discover_core::storage::{KEY_ACCESS_TOKEN, KEY_STATE, KEY_VERIFIER};
use discover_core::{AuthConfig, AuthError, SessionState, SessionStore};
use serde_json::json;
use std::collections::HashMap;
use url::Url;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn token_response() -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({
        "access_token": "BQDtoken",
        "token_type": "Bearer",
        "scope": "user-read-private user-read-email",
        "expires_in": 3600,
        "refresh_token": "AQAignored"
    }))
}

#[tokio::test]
async fn login_round_trip_stores_token_and_clears_secrets() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/token"))
        .and(header("content-type", "application/x-www-form-urlencoded"))
        .respond_with(token_response())
        .expect(1)
        .mount(&server)
        .await;

    let harness = Harness::new(&server);
    let authorize_url = harness.manager.begin_login().unwrap();
    assert_eq!(harness.navigator.visited(), vec![authorize_url.clone()]);
    assert_eq!(harness.manager.state(), SessionState::AwaitingCallback);

    let state = query(&authorize_url, "state").unwrap();
    let verifier = harness.store.get(KEY_VERIFIER).unwrap().unwrap();

    let before = Utc::now();
    let redirected = format!("{}?code=AQBcode&state={}", REDIRECT_URI, state);
    let token = harness
        .manager
        .complete_from_redirect(&redirected)
        .await
        .unwrap();
    let after = Utc::now();

    assert_eq!(token, "BQDtoken");
    assert_eq!(harness.manager.current_token().as_deref(), Some("BQDtoken"));
    assert!(harness.store.get(KEY_VERIFIER).unwrap().is_none());
    assert!(harness.store.get(KEY_STATE).unwrap().is_none());
    assert!(!harness.manager.is_expired());
    assert_eq!(harness.manager.state(), SessionState::Authenticated);

    let session = harness.manager.session().unwrap().unwrap();
    assert!(session.expires_at >= before + Duration::seconds(3600) - Duration::milliseconds(1));
    assert!(session.expires_at <= after + Duration::seconds(3600));

    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 1);
    let form: HashMap<String, String> = url::form_urlencoded::parse(&requests[0].body)
        .into_owned()
        .collect();
    assert_eq!(form["client_id"], "test-client");
    assert_eq!(form["grant_type"], "authorization_code");
    assert_eq!(form["code"], "AQBcode");
    assert_eq!(form["redirect_uri"], REDIRECT_URI);
    assert_eq!(form["code_verifier"], verifier);
}

#[tokio::test]
async fn state_mismatch_aborts_without_token_request() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/token"))
        .respond_with(token_response())
        .expect(0)
        .mount(&server)
        .await;

    let harness = Harness::new(&server);
    harness.store.set(KEY_STATE, "abc123").unwrap();
    harness.store.set(KEY_VERIFIER, "v".repeat(64).as_str()).unwrap();

    let err = harness
        .manager
        .complete_login(Some("AQBcode"), Some("wrong"))
        .await
        .unwrap_err();

    assert!(matches!(err, AuthError::StateMismatch));
    assert!(harness.store.get(KEY_ACCESS_TOKEN).unwrap().is_none());
    assert!(harness.manager.is_expired());
    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn callback_without_code_is_rejected() {
    let server = MockServer::start().await;
    let harness = Harness::new(&server);
    let authorize_url = harness.manager.begin_login().unwrap();
    let state = query(&authorize_url, "state").unwrap();

    let err = harness
        .manager
        .complete_from_redirect(&format!("{}?state={}", REDIRECT_URI, state))
        .await
        .unwrap_err();

    assert!(matches!(err, AuthError::MissingCode));
    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn token_endpoint_error_leaves_session_unset() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/token"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": "invalid_grant",
            "error_description": "Invalid authorization code"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let harness = Harness::new(&server);
    let authorize_url = harness.manager.begin_login().unwrap();
    let state = query(&authorize_url, "state").unwrap();

    let err = harness
        .manager
        .complete_login(Some("expired-code"), Some(&state))
        .await
        .unwrap_err();

    match err {
        AuthError::TokenExchange { status, body } => {
            assert_eq!(status, 400);
            assert!(body.contains("invalid_grant"));
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert!(harness.store.get(KEY_ACCESS_TOKEN).unwrap().is_none());
    // Only a successful exchange consumes the verifier and state.
    assert!(harness.store.get(KEY_VERIFIER).unwrap().is_some());
    assert_eq!(harness.manager.state(), SessionState::AwaitingCallback);
}

#[tokio::test]
async fn malformed_token_response_is_not_persisted() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/token"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
        .mount(&server)
        .await;

    let harness = Harness::new(&server);
    let authorize_url = harness.manager.begin_login().unwrap();
    let state = query(&authorize_url, "state").unwrap();

    let err = harness
        .manager
        .complete_login(Some("code"), Some(&state))
        .await
        .unwrap_err();

    assert!(matches!(err, AuthError::InvalidResponse(_)));
    assert!(harness.manager.current_token().is_none());
}

#[tokio::test]
async fn unreachable_token_endpoint_surfaces_transport_error() {
    let config = AuthConfig::new("test-client", Url::parse(REDIRECT_URI).unwrap())
        .with_token_url(Url::parse("http://127.0.0.1:1/api/token").unwrap());
    let harness = Harness::with_config(config);
    let authorize_url = harness.manager.begin_login().unwrap();
    let state = query(&authorize_url, "state").unwrap();

    let err = harness
        .manager
        .complete_login(Some("code"), Some(&state))
        .await
        .unwrap_err();

    assert!(matches!(err, AuthError::Http(_)));
    assert!(!err.is_protocol_error());
    assert!(harness.manager.current_token().is_none());
}

#[tokio::test]
async fn new_login_overwrites_previous_session() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/token"))
        .respond_with(token_response())
        .mount(&server)
        .await;

    let harness = Harness::new(&server);
    harness.seed_session("old-token", 60_000);
    assert_eq!(harness.manager.state(), SessionState::Authenticated);

    let authorize_url = harness.manager.begin_login().unwrap();
    let state = query(&authorize_url, "state").unwrap();
    harness
        .manager
        .complete_login(Some("code"), Some(&state))
        .await
        .unwrap();

    assert_eq!(harness.manager.current_token().as_deref(), Some("BQDtoken"));
}
