//! Consent, dispatch and mailbox HTTP handler tests

use super::mock_nylas::MockNylasServer;
use super::{
    build_test_router, create_test_config, get_json, get_json_as, get_raw, post_json,
    post_json_with_headers, post_raw, TestAppState,
};
use axum::http::{header, StatusCode};
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use url::Url;

fn location(headers: &axum::http::HeaderMap) -> Url {
    let value = headers.get(header::LOCATION).unwrap().to_str().unwrap();
    Url::parse(value).unwrap()
}

fn query_value(url: &Url, key: &str) -> Option<String> {
    url.query_pairs()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.into_owned())
}

// ============================================================================
// GET /nylas/auth
// ============================================================================

#[tokio::test]
async fn test_auth_redirects_to_hosted_consent() {
    let mock = MockNylasServer::new().await;
    let app = build_test_router(TestAppState::with_mock_nylas(&mock));

    let (status, headers) = get_raw(&app, "/nylas/auth?userId=u1").await;

    assert_eq!(status, StatusCode::FOUND);
    let url = location(&headers);
    assert_eq!(url.path(), "/v3/connect/auth");
    assert!(url.as_str().starts_with(&mock.uri()));
    assert_eq!(query_value(&url, "state").as_deref(), Some("u1"));
    assert_eq!(query_value(&url, "client_id").as_deref(), Some("client-123"));
    assert_eq!(query_value(&url, "response_type").as_deref(), Some("code"));
    assert_eq!(
        query_value(&url, "redirect_uri").as_deref(),
        Some("http://localhost:3001/oauth/exchange")
    );
}

#[tokio::test]
async fn test_auth_without_user_uses_fallback_identity() {
    let mock = MockNylasServer::new().await;
    let app = build_test_router(TestAppState::with_mock_nylas(&mock));

    let (status, headers) = get_raw(&app, "/nylas/auth").await;

    assert_eq!(status, StatusCode::FOUND);
    assert_eq!(
        query_value(&location(&headers), "state").as_deref(),
        Some("default-user")
    );
}

#[tokio::test]
async fn test_auth_state_round_trips_encoded_user_id() {
    let mock = MockNylasServer::new().await;
    let app = build_test_router(TestAppState::with_mock_nylas(&mock));

    let (_, headers) = get_raw(&app, "/nylas/auth?userId=alice%2Btest%40example.com").await;

    assert_eq!(
        query_value(&location(&headers), "state").as_deref(),
        Some("alice+test@example.com")
    );
}

// ============================================================================
// GET /oauth/exchange
// ============================================================================

#[tokio::test]
async fn test_exchange_stores_grant_for_state_user() {
    let mock = MockNylasServer::new().await;
    mock.mock_token_exchange_success("code-1", "g1", "u1@example.com")
        .await;
    let state = TestAppState::with_mock_nylas(&mock);
    let app = build_test_router(state.clone());

    let (status, body): (_, Option<Value>) =
        get_json(&app, "/oauth/exchange?code=code-1&state=u1").await;

    assert_eq!(status, StatusCode::OK);
    let body = body.unwrap();
    assert_eq!(body["grantId"], "g1");
    assert!(body["message"].as_str().unwrap().contains("g1"));

    let grant = state.grant_repo.grant_for("u1").await.unwrap();
    assert_eq!(grant.grant_id, "g1");
    assert_eq!(grant.email.as_deref(), Some("u1@example.com"));
    assert_eq!(grant.provider.as_deref(), Some("google"));
}

#[tokio::test]
async fn test_exchange_sends_configured_credentials() {
    let mock = MockNylasServer::new().await;
    mock.mock_token_exchange_success("code-1", "g1", "u1@example.com")
        .await;
    let app = build_test_router(TestAppState::with_mock_nylas(&mock));

    let (status, _): (_, Option<Value>) =
        get_json(&app, "/oauth/exchange?code=code-1&state=u1").await;
    assert_eq!(status, StatusCode::OK);

    let requests = mock.requests_to("/v3/connect/token").await;
    assert_eq!(requests.len(), 1);
    let sent: Value = serde_json::from_slice(&requests[0].body).unwrap();
    assert_eq!(
        sent,
        json!({
            "client_id": "client-123",
            "client_secret": "nyk_test",
            "code": "code-1",
            "redirect_uri": "http://localhost:3001/oauth/exchange",
            "grant_type": "authorization_code"
        })
    );
}

#[tokio::test]
async fn test_exchange_without_state_uses_fallback_identity() {
    let mock = MockNylasServer::new().await;
    mock.mock_token_exchange_success("code-1", "g1", "owner@example.com")
        .await;
    let state = TestAppState::with_mock_nylas(&mock);
    let app = build_test_router(state.clone());

    let (status, _): (_, Option<Value>) = get_json(&app, "/oauth/exchange?code=code-1").await;

    assert_eq!(status, StatusCode::OK);
    assert!(state.grant_repo.grant_for("default-user").await.is_some());
}

#[tokio::test]
async fn test_exchange_without_code_is_bad_request() {
    let mock = MockNylasServer::new().await;
    let state = TestAppState::with_mock_nylas(&mock);
    let app = build_test_router(state.clone());

    let (status, _): (_, Option<Value>) = get_json(&app, "/oauth/exchange?state=u1").await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(mock.requests_to("/v3/connect/token").await.is_empty());
    assert_eq!(state.grant_repo.len().await, 0);
}

#[tokio::test]
async fn test_exchange_failure_stores_nothing() {
    let mock = MockNylasServer::new().await;
    mock.mock_token_exchange_failure().await;
    let state = TestAppState::with_mock_nylas(&mock);
    let app = build_test_router(state.clone());

    let (status, body): (_, Option<Value>) =
        get_json(&app, "/oauth/exchange?code=expired&state=u1").await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body.unwrap()["error"], "exchange_failed");
    assert_eq!(state.grant_repo.len().await, 0);
}

#[tokio::test]
async fn test_exchange_replaces_existing_grant() {
    let mock = MockNylasServer::new().await;
    mock.mock_token_exchange_success("code-2", "g2", "u1@example.com")
        .await;
    let state = TestAppState::with_mock_nylas(&mock);
    state.grant_repo.add_grant("u1", "g1").await;
    let app = build_test_router(state.clone());

    let (status, _): (_, Option<Value>) =
        get_json(&app, "/oauth/exchange?code=code-2&state=u1").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(state.grant_repo.len().await, 1);
    assert_eq!(state.grant_repo.grant_for("u1").await.unwrap().grant_id, "g2");
}

// ============================================================================
// POST /nylas/send-email
// ============================================================================

#[tokio::test]
async fn test_send_email_without_grant_returns_auth_url() {
    let mock = MockNylasServer::new().await;
    let app = build_test_router(TestAppState::with_mock_nylas(&mock));

    let (status, body): (_, Option<Value>) = post_json(
        &app,
        "/nylas/send-email",
        &json!({"userId": "u1", "to": "to@example.com", "subject": "Hi", "body": "Test"}),
    )
    .await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    let body = body.unwrap();
    assert_eq!(body["error"], "auth_required");
    assert_eq!(body["authUrl"], "/nylas/auth?userId=u1");
    assert!(mock.requests_to("/messages/send").await.is_empty());
}

#[tokio::test]
async fn test_send_email_uses_latest_grant() {
    let mock = MockNylasServer::new().await;
    mock.mock_send_success("g1", "msg-1").await;
    mock.mock_send_success("g2", "msg-2").await;
    let state = TestAppState::with_mock_nylas(&mock);
    let app = build_test_router(state.clone());
    let request = json!({"userId": "u1", "to": "to@example.com", "subject": "Hi", "body": "Test"});

    state.grant_repo.add_grant("u1", "g1").await;
    let (status, body): (_, Option<Value>) =
        post_json(&app, "/nylas/send-email", &request).await;
    assert_eq!(status, StatusCode::OK);
    let body = body.unwrap();
    assert_eq!(body["message"], "Email sent successfully");
    assert_eq!(body["messageId"], "msg-1");
    assert_eq!(body["attachments"], 0);

    state
        .grant_service
        .store_grant("u1", "g2", None, None)
        .await
        .unwrap();
    let (status, body): (_, Option<Value>) =
        post_json(&app, "/nylas/send-email", &request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.unwrap()["messageId"], "msg-2");

    let first = mock.requests_to("/v3/grants/g1/messages/send").await;
    assert_eq!(first.len(), 1);
    let payload: Value = serde_json::from_slice(&first[0].body).unwrap();
    assert_eq!(
        payload,
        json!({"to": [{"email": "to@example.com"}], "subject": "Hi", "body": "Test"})
    );
    assert_eq!(mock.requests_to("/v3/grants/g2/messages/send").await.len(), 1);
}

#[tokio::test]
async fn test_send_email_with_attachment() {
    let mock = MockNylasServer::new().await;
    mock.mock_send_success("g1", "msg-1").await;
    let state = TestAppState::with_mock_nylas(&mock);
    state.grant_repo.add_grant("u1", "g1").await;
    let app = build_test_router(state);

    let (status, body): (_, Option<Value>) = post_json(
        &app,
        "/nylas/send-email",
        &json!({
            "userId": "u1",
            "to": [{"email": "to@example.com", "name": "To"}],
            "subject": "Report",
            "body": "<p>See attached</p>",
            "attachments": [{
                "filename": "a.txt",
                "content": "aGVsbG8=",
                "contentType": "text/plain",
                "size": 5
            }]
        }),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let body = body.unwrap();
    assert_eq!(body["attachments"], 1);
    assert_eq!(body["sentMessage"]["id"], "msg-1");

    let requests = mock.requests_to("/v3/grants/g1/messages/send").await;
    let payload: Value = serde_json::from_slice(&requests[0].body).unwrap();
    assert_eq!(
        payload["attachments"],
        json!([{
            "filename": "a.txt",
            "content": "aGVsbG8=",
            "content_type": "text/plain",
            "size": 5
        }])
    );
}

#[tokio::test]
async fn test_send_email_empty_subject_is_rejected_without_provider_call() {
    let mock = MockNylasServer::new().await;
    let state = TestAppState::with_mock_nylas(&mock);
    state.grant_repo.add_grant("u1", "g1").await;
    let app = build_test_router(state);

    let (status, body): (_, Option<Value>) = post_json(
        &app,
        "/nylas/send-email",
        &json!({"userId": "u1", "to": "to@example.com", "subject": "", "body": "Test"}),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body.unwrap()["error"], "invalid_message");
    assert!(mock.requests_to("/messages/send").await.is_empty());
}

#[tokio::test]
async fn test_send_email_size_mismatch_is_rejected() {
    let mock = MockNylasServer::new().await;
    let state = TestAppState::with_mock_nylas(&mock);
    state.grant_repo.add_grant("u1", "g1").await;
    let app = build_test_router(state);

    let (status, _): (_, Option<Value>) = post_json(
        &app,
        "/nylas/send-email",
        &json!({
            "userId": "u1",
            "to": "to@example.com",
            "subject": "Hi",
            "body": "Test",
            "attachments": [{"filename": "a.txt", "content": "aGVsbG8=", "size": 99}]
        }),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(mock.requests_to("/messages/send").await.is_empty());
}

#[tokio::test]
async fn test_send_email_identity_from_query_then_header() {
    let mock = MockNylasServer::new().await;
    mock.mock_send_success("g-query", "msg-q").await;
    mock.mock_send_success("g-header", "msg-h").await;
    let state = TestAppState::with_mock_nylas(&mock);
    state.grant_repo.add_grant("query-user", "g-query").await;
    state.grant_repo.add_grant("header-user", "g-header").await;
    let app = build_test_router(state);
    let request = json!({"userId": "  ", "to": "to@example.com", "subject": "Hi", "body": "Test"});

    let (status, body): (_, Option<Value>) = post_json_with_headers(
        &app,
        "/nylas/send-email?userId=query-user",
        &request,
        &[("x-user-id", "header-user")],
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.unwrap()["messageId"], "msg-q");

    let (status, body): (_, Option<Value>) = post_json_with_headers(
        &app,
        "/nylas/send-email",
        &request,
        &[("x-user-id", "header-user")],
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.unwrap()["messageId"], "msg-h");
}

#[tokio::test]
async fn test_send_email_provider_failure_is_not_retried() {
    let mock = MockNylasServer::new().await;
    mock.mock_send_failure("g1", 503).await;
    let state = TestAppState::with_mock_nylas(&mock);
    state.grant_repo.add_grant("u1", "g1").await;
    let app = build_test_router(state);

    let (status, body): (_, Option<Value>) = post_json(
        &app,
        "/nylas/send-email",
        &json!({"userId": "u1", "to": "to@example.com", "subject": "Hi", "body": "Test"}),
    )
    .await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body.unwrap()["error"], "dispatch_failed");
    assert_eq!(mock.requests_to("/v3/grants/g1/messages/send").await.len(), 1);
}

#[tokio::test]
async fn test_send_email_uses_default_recipient() {
    let mock = MockNylasServer::new().await;
    mock.mock_send_success("g1", "msg-1").await;
    let mut config = create_test_config(&mock.uri());
    config.dispatch.default_recipient = Some("owner@example.com".to_string());
    let state = TestAppState::with_config(config);
    state.grant_repo.add_grant("u1", "g1").await;
    let app = build_test_router(state);

    let (status, _): (_, Option<Value>) = post_json(
        &app,
        "/nylas/send-email",
        &json!({"userId": "u1", "subject": "Hi", "body": "Test"}),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let requests = mock.requests_to("/v3/grants/g1/messages/send").await;
    let payload: Value = serde_json::from_slice(&requests[0].body).unwrap();
    assert_eq!(payload["to"], json!([{"email": "owner@example.com"}]));
}

#[tokio::test]
async fn test_auth_url_uses_public_base_url() {
    let mock = MockNylasServer::new().await;
    let mut config = create_test_config(&mock.uri());
    config.public_base_url = Some("https://mail.example.com".to_string());
    let app = build_test_router(TestAppState::with_config(config));

    let (status, body): (_, Option<Value>) = post_json(
        &app,
        "/nylas/send-email",
        &json!({"userId": "u 1", "to": "to@example.com", "subject": "Hi", "body": "Test"}),
    )
    .await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(
        body.unwrap()["authUrl"],
        "https://mail.example.com/nylas/auth?userId=u+1"
    );
}

#[tokio::test]
async fn test_send_email_null_subject_is_invalid_message() {
    let mock = MockNylasServer::new().await;
    let state = TestAppState::with_mock_nylas(&mock);
    state.grant_repo.add_grant("u1", "g1").await;
    let app = build_test_router(state);

    let (status, body): (_, Option<Value>) = post_json(
        &app,
        "/nylas/send-email",
        &json!({"userId": "u1", "to": "to@example.com", "subject": null, "body": "Test"}),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body.unwrap()["error"], "invalid_message");
    assert!(mock.requests_to("/messages/send").await.is_empty());
}

#[tokio::test]
async fn test_send_email_null_subject_without_grant_still_gets_auth_url() {
    let mock = MockNylasServer::new().await;
    let app = build_test_router(TestAppState::with_mock_nylas(&mock));

    let (status, body): (_, Option<Value>) = post_json(
        &app,
        "/nylas/send-email",
        &json!({"userId": "nobody", "subject": null, "body": "Test"}),
    )
    .await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body.unwrap()["authUrl"], "/nylas/auth?userId=nobody");
}

#[tokio::test]
async fn test_send_email_mistyped_fields() {
    let mock = MockNylasServer::new().await;
    let state = TestAppState::with_mock_nylas(&mock);
    state.grant_repo.add_grant("u1", "g1").await;
    let app = build_test_router(state);

    for body in [
        json!({"userId": "u1", "to": "to@example.com", "subject": 5, "body": "Test"}),
        json!({"userId": "u1", "to": 42, "subject": "Hi", "body": "Test"}),
        json!({"userId": "u1", "to": "to@example.com", "subject": "Hi", "body": "Test", "attachments": "a.txt"}),
    ] {
        let (status, response): (_, Option<Value>) =
            post_json(&app, "/nylas/send-email", &body).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{}", body);
        assert_eq!(response.unwrap()["error"], "invalid_message");
    }

    // Ungated callers with a mistyped body are sent to consent first
    let (status, response): (_, Option<Value>) = post_json(
        &app,
        "/nylas/send-email",
        &json!({"userId": "nobody", "subject": 5, "body": "Test"}),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(response.unwrap()["authUrl"], "/nylas/auth?userId=nobody");

    assert!(mock.requests_to("/messages/send").await.is_empty());
}

#[tokio::test]
async fn test_send_email_non_json_body() {
    let mock = MockNylasServer::new().await;
    let state = TestAppState::with_mock_nylas(&mock);
    state.grant_repo.add_grant("u1", "g1").await;
    let app = build_test_router(state);

    let (status, body) = post_raw(&app, "/nylas/send-email?userId=u1", "{not json").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body.unwrap()["error"], "bad_request");

    let (status, body) = post_raw(&app, "/nylas/send-email?userId=nobody", "{not json").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body.unwrap()["authUrl"], "/nylas/auth?userId=nobody");

    assert!(mock.requests_to("/messages/send").await.is_empty());
}

#[tokio::test]
async fn test_send_email_user_ids_differing_in_case_use_own_grants() {
    let mock = MockNylasServer::new().await;
    mock.mock_send_success("g-upper", "msg-upper").await;
    let state = TestAppState::with_mock_nylas(&mock);
    state.grant_repo.add_grant("Alice", "g-upper").await;
    let app = build_test_router(state);

    let (status, body): (_, Option<Value>) = post_json(
        &app,
        "/nylas/send-email",
        &json!({"userId": "alice", "to": "to@example.com", "subject": "Hi", "body": "Test"}),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body.unwrap()["authUrl"], "/nylas/auth?userId=alice");
    assert!(mock.requests_to("/messages/send").await.is_empty());

    let (status, body): (_, Option<Value>) = post_json(
        &app,
        "/nylas/send-email",
        &json!({"userId": "Alice", "to": "to@example.com", "subject": "Hi", "body": "Test"}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.unwrap()["messageId"], "msg-upper");
}

// ============================================================================
// Gated reads
// ============================================================================

#[tokio::test]
async fn test_sent_emails_requires_grant() {
    let mock = MockNylasServer::new().await;
    let app = build_test_router(TestAppState::with_mock_nylas(&mock));

    let (status, body): (_, Option<Value>) = get_json(&app, "/nylas/sent-emails?userId=u1").await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body.unwrap()["authUrl"], "/nylas/auth?userId=u1");
}

#[tokio::test]
async fn test_sent_emails_lists_sent_folder() {
    let mock = MockNylasServer::new().await;
    mock.mock_list_messages("g1", Some("SENT"), &["m1", "m2"]).await;
    let state = TestAppState::with_mock_nylas(&mock);
    state.grant_repo.add_grant("u1", "g1").await;
    let app = build_test_router(state);

    let (status, body): (_, Option<Value>) = get_json(&app, "/nylas/sent-emails?userId=u1").await;

    assert_eq!(status, StatusCode::OK);
    let body = body.unwrap();
    assert_eq!(body["userId"], "u1");
    assert_eq!(body["messages"].as_array().unwrap().len(), 2);
    assert_eq!(body["messages"][0]["id"], "m1");
}

#[tokio::test]
async fn test_recent_emails_via_header_identity() {
    let mock = MockNylasServer::new().await;
    mock.mock_list_messages("g1", None, &["m1"]).await;
    let state = TestAppState::with_mock_nylas(&mock);
    state.grant_repo.add_grant("u1", "g1").await;
    let app = build_test_router(state);

    let (status, body): (_, Option<Value>) = get_json_as(&app, "/api/emails", "u1").await;

    assert_eq!(status, StatusCode::OK);
    let body = body.unwrap();
    assert_eq!(body["userId"], "u1");
    assert_eq!(body["messages"][0]["id"], "m1");
}

#[tokio::test]
async fn test_gate_store_outage_is_server_error() {
    let mock = MockNylasServer::new().await;
    let state = TestAppState::with_mock_nylas(&mock);
    state.grant_repo.set_unavailable(true);
    let app = build_test_router(state);

    let (status, body): (_, Option<Value>) = get_json(&app, "/api/emails?userId=u1").await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    let body = body.unwrap();
    assert_eq!(body["error"], "grant_operation_failed");
    assert!(body.get("authUrl").is_none());
}
