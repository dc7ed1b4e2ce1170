//! Remote-mode verification against a mock introspection endpoint

mod common;

use common::*;
use pretty_assertions::assert_eq;
use secrecy::SecretString;
use serde_json::json;
use std::time::Duration;
use tokengate::{
    ErrorKind, IntrospectionClient, RemoteVerifier, TokenVerifier, VerificationPolicy,
    VerificationSource, VerifyError,
};
use wiremock::{
    Mock, ResponseTemplate,
    matchers::{basic_auth, body_string_contains, header, method, path},
};

fn remote(mock: &MockAuthServer, audience: Option<&str>) -> RemoteVerifier {
    let client = IntrospectionClient::new(
        mock.introspection_endpoint.clone(),
        "service-b".to_string(),
        Some(SecretString::new("service-b-secret".to_string())),
    )
    .with_timeout(Duration::from_millis(500));
    let mut policy = VerificationPolicy::new();
    if let Some(audience) = audience {
        policy = policy.with_audience(audience);
    }
    RemoteVerifier::new(client, policy)
}

/// Test: endpoint answers {"active": false}
#[tokio::test]
async fn test_inactive_token() {
    let mock = MockAuthServer::start().await;
    mock.mock_introspection(200, json!({"active": false})).await;

    let err = remote(&mock, None).verify("opaque-token").await.unwrap_err();
    assert_eq!(err, VerifyError::TokenInactive);
}

#[tokio::test]
async fn test_absent_or_non_boolean_active_is_inactive() {
    for body in [json!({"sub": "alice"}), json!({"active": "true"})] {
        let mock = MockAuthServer::start().await;
        mock.mock_introspection(200, body.clone()).await;
        assert_eq!(
            remote(&mock, None).verify("t").await.unwrap_err(),
            VerifyError::TokenInactive,
            "{body}"
        );
    }
}

#[tokio::test]
async fn test_request_carries_token_and_client_credentials() {
    // GIVEN: an endpoint that only answers properly authenticated form posts
    let mock = MockAuthServer::start().await;
    Mock::given(method("POST"))
        .and(path("/introspect"))
        .and(basic_auth("service-b", "service-b-secret"))
        .and(header("content-type", "application/x-www-form-urlencoded"))
        .and(body_string_contains("token=opaque-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "active": true,
            "sub": "alice",
        })))
        .expect(1)
        .mount(&mock.server)
        .await;

    // WHEN / THEN
    let verified = remote(&mock, None).verify("opaque-token").await.unwrap();
    assert_eq!(verified.claims.sub(), Some("alice"));
}

#[tokio::test]
async fn test_active_response_passes_through_fields() {
    let mock = MockAuthServer::start().await;
    mock.mock_introspection(
        200,
        json!({
            "active": true,
            "iss": "https://auth.example.com",
            "sub": "alice",
            "aud": "service-b",
            "scope": "read:data write:data",
            "tenant": {"id": 42},
        }),
    )
    .await;

    let verified = remote(&mock, Some("service-b")).verify("t").await.unwrap();
    assert_eq!(verified.source, VerificationSource::Introspection);
    assert_eq!(verified.key_id, None);
    assert_eq!(verified.claims.iss(), Some("https://auth.example.com"));
    assert_eq!(verified.claims.scope(), Some("read:data write:data"));
    assert_eq!(verified.claims.get("tenant"), Some(&json!({"id": 42})));
    assert_eq!(verified.claims.get("active"), Some(&json!(true)));
}

#[tokio::test]
async fn test_audience_string_or_array() {
    let mock = MockAuthServer::start().await;
    mock.mock_introspection(200, json!({"active": true, "aud": ["service-a", "service-b"]}))
        .await;
    assert!(remote(&mock, Some("service-b")).verify("t").await.is_ok());
    assert_eq!(
        remote(&mock, Some("service-c"))
            .verify("t")
            .await
            .unwrap_err(),
        VerifyError::AudienceMismatch {
            expected: "service-c".to_string()
        }
    );

    let mock = MockAuthServer::start().await;
    mock.mock_introspection(200, json!({"active": true})).await;
    assert_eq!(
        remote(&mock, Some("service-b"))
            .verify("t")
            .await
            .unwrap_err()
            .kind(),
        ErrorKind::AudienceMismatch
    );
    // No pinned audience: nothing to check
    assert!(remote(&mock, None).verify("t").await.is_ok());
}

#[tokio::test]
async fn test_no_local_expiry_check() {
    // Liveness belongs to the authority, even for a long-past exp
    let mock = MockAuthServer::start().await;
    mock.mock_introspection(200, json!({"active": true, "exp": 1_000})).await;
    assert!(remote(&mock, None).verify("t").await.is_ok());
}

#[tokio::test]
async fn test_error_status_is_unavailable() {
    for status in [400, 401, 500, 503] {
        let mock = MockAuthServer::start().await;
        mock.mock_introspection(status, json!({"active": true})).await;
        let err = remote(&mock, None).verify("t").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::IntrospectionUnavailable, "status {status}");
        assert_eq!(err.status_code().as_u16(), 502);
    }
}

#[tokio::test]
async fn test_non_json_body_is_unavailable() {
    let mock = MockAuthServer::start().await;
    Mock::given(method("POST"))
        .and(path("/introspect"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
        .mount(&mock.server)
        .await;
    let err = remote(&mock, None).verify("t").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::IntrospectionUnavailable);

    let mock = MockAuthServer::start().await;
    mock.mock_introspection(200, json!([true])).await;
    let err = remote(&mock, None).verify("t").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::IntrospectionUnavailable);
}

/// Test: a slow endpoint is cut off by the client timeout
#[tokio::test]
async fn test_timeout_is_unavailable_not_inactive() {
    let mock = MockAuthServer::start().await;
    mock.mock_introspection_delayed(Duration::from_secs(3), json!({"active": true}))
        .await;

    let started = std::time::Instant::now();
    let err = remote(&mock, None).verify("t").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::IntrospectionUnavailable);
    assert!(started.elapsed() < Duration::from_secs(2));
}

#[tokio::test]
async fn test_bearer_extraction_precedes_introspection() {
    let mock = MockAuthServer::start().await;
    Mock::given(method("POST"))
        .and(path("/introspect"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"active": true})))
        .expect(0)
        .mount(&mock.server)
        .await;

    let verifier = remote(&mock, None);
    for authorization in [None, Some("Basic abc"), Some("Bearer ")] {
        assert_eq!(
            verifier.verify_bearer(authorization).await.unwrap_err(),
            VerifyError::MissingCredential
        );
    }
}
