//! End-to-end download session lifecycle tests.

mod common;

use axum::http::StatusCode;
use common::TestServer;
use common::fixtures::json_request;
use serde_json::json;

/// Open a session and return its token.
async fn init_session(server: &TestServer, credential: &str, version: Option<&str>) -> String {
    let body = version.map(|v| json!({ "version": v }));
    let (status, response) = json_request(
        &server.router,
        "POST",
        "/v1/downloads",
        body,
        Some(credential),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "init failed: {response}");
    response
        .get("token")
        .and_then(|v| v.as_str())
        .expect("token in response")
        .to_string()
}

#[tokio::test]
async fn test_full_happy_path() {
    let server = TestServer::new().await;
    let (user_id, credential) = server.create_identity(true, false).await;
    let release_id = server.seed_release("1.0.0", 1_000_000, true).await;

    // Init returns the catalog snapshot.
    let (status, response) = json_request(
        &server.router,
        "POST",
        "/v1/downloads",
        None,
        Some(&credential),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(
        response.get("version").and_then(|v| v.as_str()),
        Some("1.0.0")
    );
    assert_eq!(
        response.get("filename").and_then(|v| v.as_str()),
        Some("app-1.0.0.apk")
    );
    assert_eq!(
        response.get("expected_size").and_then(|v| v.as_u64()),
        Some(1_000_000)
    );
    let token = response.get("token").unwrap().as_str().unwrap().to_string();
    assert_eq!(token.len(), 64);

    // Progress is advisory.
    let (status, _) = json_request(
        &server.router,
        "POST",
        &format!("/v1/downloads/{token}/progress"),
        Some(json!({ "observed_bytes": 500_000 })),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    // Complete with the full size.
    let (status, response) = json_request(
        &server.router,
        "POST",
        &format!("/v1/downloads/{token}/complete"),
        Some(json!({ "observed_bytes": 1_000_000 })),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        response.get("total_completions").and_then(|v| v.as_u64()),
        Some(1)
    );

    // All three entities moved together.
    let session = server.metadata().get_session(&token).await.unwrap().unwrap();
    assert_eq!(session.status, "completed");
    assert_eq!(session.observed_bytes, 1_000_000);
    assert!(session.completed_at.is_some());

    let release = server
        .metadata()
        .get_release(release_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(release.download_count, 1);

    let profile = server.metadata().get_profile(user_id).await.unwrap().unwrap();
    assert_eq!(profile.total_completions, 1);
    assert!(profile.last_completed_at.is_some());

    // The lifecycle left an audit trail for the token.
    let audit = server
        .metadata()
        .list_audit_for_subject(&token, 10)
        .await
        .unwrap();
    let actions: Vec<&str> = audit.iter().map(|r| r.action.as_str()).collect();
    assert!(actions.contains(&"download.init"));
    assert!(actions.contains(&"download.complete"));
}

#[tokio::test]
async fn test_init_requires_auth_and_verification() {
    let server = TestServer::new().await;
    server.seed_release("1.0.0", 1_000_000, true).await;

    let (status, body) =
        json_request(&server.router, "POST", "/v1/downloads", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(
        body.get("code").and_then(|v| v.as_str()),
        Some("unauthenticated")
    );

    let (_, unverified) = server.create_identity(false, false).await;
    let (status, body) = json_request(
        &server.router,
        "POST",
        "/v1/downloads",
        None,
        Some(&unverified),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(
        body.get("code").and_then(|v| v.as_str()),
        Some("unverified")
    );
}

#[tokio::test]
async fn test_init_unknown_version_creates_no_session() {
    let server = TestServer::new().await;
    let (user_id, credential) = server.create_identity(true, false).await;
    server.seed_release("1.0.0", 1_000_000, true).await;

    let (status, body) = json_request(
        &server.router,
        "POST",
        "/v1/downloads",
        Some(json!({ "version": "9.9.9" })),
        Some(&credential),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(
        body.get("code").and_then(|v| v.as_str()),
        Some("not_found")
    );
    assert_eq!(
        server
            .metadata()
            .count_sessions_for_owner(user_id)
            .await
            .unwrap(),
        0
    );
}

#[tokio::test]
async fn test_init_with_explicit_version() {
    let server = TestServer::new().await;
    let (_, credential) = server.create_identity(true, false).await;
    server.seed_release("1.0.0", 1_000_000, false).await;
    server.seed_release("2.0.0", 2_000_000, true).await;

    let (status, response) = json_request(
        &server.router,
        "POST",
        "/v1/downloads",
        Some(json!({ "version": "1.0.0" })),
        Some(&credential),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(
        response.get("version").and_then(|v| v.as_str()),
        Some("1.0.0")
    );
    assert_eq!(
        response.get("expected_size").and_then(|v| v.as_u64()),
        Some(1_000_000)
    );
}

#[tokio::test]
async fn test_init_without_catalog_is_not_found() {
    let server = TestServer::new().await;
    let (_, credential) = server.create_identity(true, false).await;

    let (status, _) = json_request(
        &server.router,
        "POST",
        "/v1/downloads",
        None,
        Some(&credential),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_size_tolerance_boundary() {
    let server = TestServer::with_config(|config| {
        config.downloads.cooldown_secs = 0;
    })
    .await;
    let (_, credential) = server.create_identity(true, false).await;
    server.seed_release("1.0.0", 1_000_000, true).await;

    // Exactly 98.0% is accepted.
    let token = init_session(&server, &credential, None).await;
    let (status, _) = json_request(
        &server.router,
        "POST",
        &format!("/v1/downloads/{token}/complete"),
        Some(json!({ "observed_bytes": 980_000 })),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    // 97.5% is a size mismatch and fails the session.
    let token = init_session(&server, &credential, None).await;
    let (status, body) = json_request(
        &server.router,
        "POST",
        &format!("/v1/downloads/{token}/complete"),
        Some(json!({ "observed_bytes": 975_000 })),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        body.get("code").and_then(|v| v.as_str()),
        Some("size_mismatch")
    );
    assert_eq!(body.get("observed").and_then(|v| v.as_u64()), Some(975_000));
    assert_eq!(
        body.get("expected").and_then(|v| v.as_u64()),
        Some(1_000_000)
    );

    let session = server.metadata().get_session(&token).await.unwrap().unwrap();
    assert_eq!(session.status, "failed");
    assert_eq!(session.observed_bytes, 975_000);

    // A failed session cannot be retried into a completion.
    let (status, body) = json_request(
        &server.router,
        "POST",
        &format!("/v1/downloads/{token}/complete"),
        Some(json!({ "observed_bytes": 1_000_000 })),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(
        body.get("code").and_then(|v| v.as_str()),
        Some("invalid_token")
    );
}

#[tokio::test]
async fn test_second_complete_is_rejected_and_counts_once() {
    let server = TestServer::new().await;
    let (user_id, credential) = server.create_identity(true, false).await;
    let release_id = server.seed_release("1.0.0", 1_000_000, true).await;
    let token = init_session(&server, &credential, None).await;

    let complete = json!({ "observed_bytes": 1_000_000 });
    let (status, _) = json_request(
        &server.router,
        "POST",
        &format!("/v1/downloads/{token}/complete"),
        Some(complete.clone()),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = json_request(
        &server.router,
        "POST",
        &format!("/v1/downloads/{token}/complete"),
        Some(complete),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(
        body.get("code").and_then(|v| v.as_str()),
        Some("invalid_token")
    );

    let release = server
        .metadata()
        .get_release(release_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(release.download_count, 1);
    let profile = server.metadata().get_profile(user_id).await.unwrap().unwrap();
    assert_eq!(profile.total_completions, 1);
}

#[tokio::test]
async fn test_client_asserted_completion_defaults_observed_bytes() {
    let server = TestServer::new().await;
    let (_, credential) = server.create_identity(true, false).await;
    server.seed_release("1.0.0", 1_000_000, true).await;
    let token = init_session(&server, &credential, None).await;

    // External-host retrieval: the client cannot measure, but vouches.
    let (status, _) = json_request(
        &server.router,
        "POST",
        &format!("/v1/downloads/{token}/complete"),
        Some(json!({ "observed_bytes": 0, "verified": true })),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let session = server.metadata().get_session(&token).await.unwrap().unwrap();
    assert_eq!(session.status, "completed");
    // Zero reports are stamped with the catalog size.
    assert_eq!(session.observed_bytes, 1_000_000);
}

#[tokio::test]
async fn test_unknown_expected_size_accepts_any_report() {
    let server = TestServer::new().await;
    let (_, credential) = server.create_identity(true, false).await;
    server.seed_release("1.0.0", 0, true).await;
    let token = init_session(&server, &credential, None).await;

    let (status, _) = json_request(
        &server.router,
        "POST",
        &format!("/v1/downloads/{token}/complete"),
        Some(json!({ "observed_bytes": 123_456 })),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let session = server.metadata().get_session(&token).await.unwrap().unwrap();
    assert_eq!(session.observed_bytes, 123_456);
}

#[tokio::test]
async fn test_cancel_reasons_map_to_terminal_states() {
    let server = TestServer::with_config(|config| {
        config.downloads.cooldown_secs = 0;
    })
    .await;
    let (user_id, credential) = server.create_identity(true, false).await;
    let release_id = server.seed_release("1.0.0", 1_000_000, true).await;

    let token = init_session(&server, &credential, None).await;
    let (status, _) = json_request(
        &server.router,
        "POST",
        &format!("/v1/downloads/{token}/cancel"),
        Some(json!({ "reason": "user-abort" })),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let session = server.metadata().get_session(&token).await.unwrap().unwrap();
    assert_eq!(session.status, "cancelled");

    let token = init_session(&server, &credential, None).await;
    let (status, _) = json_request(
        &server.router,
        "POST",
        &format!("/v1/downloads/{token}/cancel"),
        Some(json!({ "reason": "error" })),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let session = server.metadata().get_session(&token).await.unwrap().unwrap();
    assert_eq!(session.status, "failed");

    // Neither path touched a counter, so the cooldown was not consumed.
    let release = server
        .metadata()
        .get_release(release_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(release.download_count, 0);
    assert!(server.metadata().get_profile(user_id).await.unwrap().is_none());
}

#[tokio::test]
async fn test_cancel_is_idempotent_ack() {
    let server = TestServer::new().await;
    let (_, credential) = server.create_identity(true, false).await;
    server.seed_release("1.0.0", 1_000_000, true).await;
    let token = init_session(&server, &credential, None).await;

    let cancel = json!({ "reason": "user-abort" });
    for _ in 0..2 {
        let (status, _) = json_request(
            &server.router,
            "POST",
            &format!("/v1/downloads/{token}/cancel"),
            Some(cancel.clone()),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::NO_CONTENT);
    }

    // The first resolution stands.
    let session = server.metadata().get_session(&token).await.unwrap().unwrap();
    assert_eq!(session.status, "cancelled");

    // Unknown and malformed tokens are acked too.
    let (status, _) = json_request(
        &server.router,
        "POST",
        &format!("/v1/downloads/{}/cancel", "0".repeat(64)),
        Some(cancel.clone()),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = json_request(
        &server.router,
        "POST",
        "/v1/downloads/not-a-token/cancel",
        Some(cancel),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn test_complete_after_cancel_is_invalid_token() {
    let server = TestServer::new().await;
    let (_, credential) = server.create_identity(true, false).await;
    server.seed_release("1.0.0", 1_000_000, true).await;
    let token = init_session(&server, &credential, None).await;

    json_request(
        &server.router,
        "POST",
        &format!("/v1/downloads/{token}/cancel"),
        Some(json!({ "reason": "user-abort" })),
        None,
    )
    .await;

    let (status, _) = json_request(
        &server.router,
        "POST",
        &format!("/v1/downloads/{token}/complete"),
        Some(json!({ "observed_bytes": 1_000_000 })),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_progress_never_fails_and_never_changes_status() {
    let server = TestServer::new().await;
    let (_, credential) = server.create_identity(true, false).await;
    server.seed_release("1.0.0", 1_000_000, true).await;
    let token = init_session(&server, &credential, None).await;

    // Repeated, non-monotonic reports are all accepted.
    for bytes in [100_000u64, 50_000, 900_000] {
        let (status, _) = json_request(
            &server.router,
            "POST",
            &format!("/v1/downloads/{token}/progress"),
            Some(json!({ "observed_bytes": bytes })),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::NO_CONTENT);
    }
    let session = server.metadata().get_session(&token).await.unwrap().unwrap();
    assert_eq!(session.status, "started");
    assert_eq!(session.observed_bytes, 900_000);

    // Progress after the session is terminal is a no-op, not an error.
    json_request(
        &server.router,
        "POST",
        &format!("/v1/downloads/{token}/cancel"),
        Some(json!({ "reason": "user-abort" })),
        None,
    )
    .await;
    let (status, _) = json_request(
        &server.router,
        "POST",
        &format!("/v1/downloads/{token}/progress"),
        Some(json!({ "observed_bytes": 1_000_000 })),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let session = server.metadata().get_session(&token).await.unwrap().unwrap();
    assert_eq!(session.status, "cancelled");
    assert_eq!(session.observed_bytes, 900_000);

    // Unknown tokens, malformed tokens, and malformed bodies all ack.
    let (status, _) = json_request(
        &server.router,
        "POST",
        &format!("/v1/downloads/{}/progress", "0".repeat(64)),
        Some(json!({ "observed_bytes": 1 })),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = json_request(
        &server.router,
        "POST",
        "/v1/downloads/not-a-token/progress",
        Some(json!({ "observed_bytes": 1 })),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = json_request(
        &server.router,
        "POST",
        &format!("/v1/downloads/{token}/progress"),
        Some(json!({ "wrong_field": true })),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn test_complete_with_malformed_token_is_invalid_token() {
    let server = TestServer::new().await;

    let (status, body) = json_request(
        &server.router,
        "POST",
        "/v1/downloads/not-a-token/complete",
        Some(json!({ "observed_bytes": 1 })),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(
        body.get("code").and_then(|v| v.as_str()),
        Some("invalid_token")
    );
}

#[tokio::test]
async fn test_size_mismatch_leaves_audit_trail() {
    let server = TestServer::new().await;
    let (_, credential) = server.create_identity(true, false).await;
    server.seed_release("1.0.0", 1_000_000, true).await;
    let token = init_session(&server, &credential, None).await;

    json_request(
        &server.router,
        "POST",
        &format!("/v1/downloads/{token}/complete"),
        Some(json!({ "observed_bytes": 100 })),
        None,
    )
    .await;

    let audit = server
        .metadata()
        .list_audit_for_subject(&token, 10)
        .await
        .unwrap();
    assert!(audit.iter().any(|r| r.action == "download.reject"));
}
