mod auth_support;

use lazyteams::auth::{AuthError, PendingReason, TokenPoll};
use lazyteams::credentials::{CredentialStore, ACCESS_TOKEN, REFRESH_TOKEN};
use lazyteams::error::ErrorKind;
use serde_json::json;
use wiremock::matchers::{body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use auth_support::{
    access_token, client, device_code_payload, mount_profile, token_error, token_success,
    ALL_SCOPES, DEVICE_CODE_PATH, PROFILE_PATH, TOKEN_PATH, UPN,
};

async fn mount_token_response(server: &MockServer, status: u16, body: serde_json::Value) {
    Mock::given(method("POST"))
        .and(path(TOKEN_PATH))
        .respond_with(ResponseTemplate::new(status).set_body_json(body))
        .expect(1)
        .mount(server)
        .await;
}

#[tokio::test]
async fn request_device_code_posts_client_id_and_scopes() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(DEVICE_CODE_PATH))
        .and(header("content-type", "application/x-www-form-urlencoded"))
        .and(body_string_contains("client_id=74201357-4b0e-4667-b9a6-c1cf7de422a3"))
        .and(body_string_contains("offline_access"))
        .and(body_string_contains("Chat.ReadWrite"))
        .respond_with(ResponseTemplate::new(200).set_body_json(auth_support::device_code_body(900)))
        .expect(1)
        .mount(&server)
        .await;

    let (_store, client) = client(&server);
    let payload = client.request_device_code().await.expect("device code");

    assert_eq!(payload.device_code, "device-123");
    assert_eq!(payload.user_code, "ABCD-1234");
    assert_eq!(payload.verification_uri, "https://microsoft.com/devicelogin");
    assert_eq!(payload.expires_in, 900);
    assert_eq!(payload.interval, 5);
}

#[tokio::test]
async fn request_device_code_rejection_preserves_body() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(DEVICE_CODE_PATH))
        .respond_with(ResponseTemplate::new(400).set_body_string(r#"{"error":"invalid_scope"}"#))
        .expect(1)
        .mount(&server)
        .await;

    let (_store, client) = client(&server);
    let err = client.request_device_code().await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Authentication);
    match err.find_cause::<AuthError>() {
        Some(AuthError::DeviceCodeRejected { status, body }) => {
            assert_eq!(*status, 400);
            assert_eq!(body, r#"{"error":"invalid_scope"}"#);
        }
        other => panic!("expected DeviceCodeRejected, got {other:?}"),
    }
}

#[tokio::test]
async fn poll_authorization_pending_is_pending() {
    let server = MockServer::start().await;
    mount_token_response(&server, 400, token_error("authorization_pending")).await;

    let (store, client) = client(&server);
    let poll = client
        .poll_for_token(&device_code_payload(900))
        .await
        .expect("pending");

    assert_eq!(poll, TokenPoll::Pending(PendingReason::AuthorizationPending));
    assert!(client.active_account().is_none());
    assert!(store.get_service_credentials().unwrap().is_empty());
}

#[tokio::test]
async fn poll_invalid_client_is_reported_as_pending() {
    let server = MockServer::start().await;
    mount_token_response(&server, 401, token_error("invalid_client")).await;

    let (_store, client) = client(&server);
    let poll = client
        .poll_for_token(&device_code_payload(900))
        .await
        .expect("pending");

    assert_eq!(poll, TokenPoll::Pending(PendingReason::InvalidClient));
}

#[tokio::test]
async fn poll_terminal_errors_map_to_distinct_causes() {
    let cases: [(&str, fn(&AuthError) -> bool); 3] = [
        ("authorization_declined", |e| {
            matches!(e, AuthError::AuthorizationDeclined)
        }),
        ("bad_verification_code", |e| {
            matches!(e, AuthError::BadVerificationCode)
        }),
        ("expired_token", |e| matches!(e, AuthError::ExpiredToken)),
    ];

    for (code, is_expected) in cases {
        let server = MockServer::start().await;
        mount_token_response(&server, 400, token_error(code)).await;

        let (_store, client) = client(&server);
        let err = client
            .poll_for_token(&device_code_payload(900))
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Authentication, "{code}");
        let cause = err.find_cause::<AuthError>().expect("auth cause");
        assert!(is_expected(cause), "{code}: unexpected cause {cause:?}");
    }
}

#[tokio::test]
async fn poll_unexpected_response_keeps_status_and_body() {
    let server = MockServer::start().await;
    mount_token_response(&server, 500, json!({ "error": "server_error" })).await;

    let (_store, client) = client(&server);
    let err = client
        .poll_for_token(&device_code_payload(900))
        .await
        .unwrap_err();

    match err.find_cause::<AuthError>() {
        Some(AuthError::UnexpectedTokenResponse { status, body }) => {
            assert_eq!(*status, 500);
            assert!(body.contains("server_error"));
        }
        other => panic!("expected UnexpectedTokenResponse, got {other:?}"),
    }
}

#[tokio::test]
async fn poll_success_resolves_account_and_stores_both_tokens() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(TOKEN_PATH))
        .and(body_string_contains("device_code=device-123"))
        .and(body_string_contains("grant_type=urn%3Aietf%3Aparams%3Aoauth%3Agrant-type%3Adevice_code"))
        .respond_with(ResponseTemplate::new(200).set_body_json(token_success("T", "R")))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(PROFILE_PATH))
        .and(header("authorization", "Bearer T"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "userPrincipalName": UPN,
            "displayName": "Alice Example",
        })))
        .expect(1)
        .mount(&server)
        .await;

    let (store, client) = client(&server);
    let poll = client
        .poll_for_token(&device_code_payload(900))
        .await
        .expect("authorized");

    match poll {
        TokenPoll::Authorized(tokens) => assert_eq!(tokens.access_token, "T"),
        other => panic!("expected authorized, got {other:?}"),
    }
    assert_eq!(client.active_account().as_deref(), Some(UPN));
    assert_eq!(
        store.get_credential(UPN, ACCESS_TOKEN).unwrap().unwrap().value,
        "T"
    );
    assert_eq!(
        store.get_credential(UPN, REFRESH_TOKEN).unwrap().unwrap().value,
        "R"
    );
}

#[tokio::test]
async fn poll_success_without_principal_fails() {
    let server = MockServer::start().await;
    mount_token_response(&server, 200, token_success("T", "R")).await;
    Mock::given(method("GET"))
        .and(path(PROFILE_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "displayName": "Nobody" })))
        .mount(&server)
        .await;

    let (store, client) = client(&server);
    let err = client
        .poll_for_token(&device_code_payload(900))
        .await
        .unwrap_err();

    assert!(matches!(
        err.find_cause::<AuthError>(),
        Some(AuthError::MissingPrincipal)
    ));
    assert!(client.active_account().is_none());
    assert!(store.get_service_credentials().unwrap().is_empty());
}

#[tokio::test]
async fn check_signed_in_after_successful_poll() {
    let server = MockServer::start().await;
    let token = access_token(3600, ALL_SCOPES);
    mount_token_response(&server, 200, token_success(&token, "R")).await;
    mount_profile(&server, UPN).await;

    let (_store, client) = client(&server);
    assert!(!client.check_signed_in().unwrap());
    client
        .poll_for_token(&device_code_payload(900))
        .await
        .expect("authorized");
    assert!(client.check_signed_in().unwrap());
}

#[tokio::test]
async fn check_signed_in_is_false_for_expired_token() {
    let server = MockServer::start().await;
    let (store, client) = client(&server);
    client.set_active_account(UPN);
    store.set_credential(UPN, ACCESS_TOKEN, &access_token(-60, ALL_SCOPES));
    store.set_credential(UPN, REFRESH_TOKEN, "R");

    assert!(!client.check_signed_in().unwrap());
}

#[tokio::test]
async fn check_signed_in_rejects_insufficient_scope() {
    let server = MockServer::start().await;
    let (store, client) = client(&server);
    client.set_active_account(UPN);
    store.set_credential(UPN, ACCESS_TOKEN, &access_token(3600, "User.Read"));
    store.set_credential(UPN, REFRESH_TOKEN, "R");

    let err = client.check_signed_in().unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Signin);
    assert!(matches!(
        err.find_cause::<AuthError>(),
        Some(AuthError::MissingScope { missing }) if missing.len() == 3
    ));
}

#[tokio::test]
async fn fetch_my_profile_uses_stored_access_token() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(PROFILE_PATH))
        .and(header("authorization", "Bearer stored-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "userPrincipalName": UPN,
            "displayName": "Alice Example",
            "mail": UPN,
        })))
        .expect(1)
        .mount(&server)
        .await;

    let (store, client) = client(&server);
    client.set_active_account(UPN);
    store.set_credential(UPN, ACCESS_TOKEN, "stored-token");

    let profile = client.fetch_my_profile().await.expect("profile");
    assert_eq!(profile.display_name.as_deref(), Some("Alice Example"));
    assert_eq!(profile.user_principal_name.as_deref(), Some(UPN));
}

#[tokio::test]
async fn fetch_my_profile_requires_sign_in() {
    let server = MockServer::start().await;
    let (_store, client) = client(&server);
    let err = client.fetch_my_profile().await.unwrap_err();
    assert!(matches!(
        err.find_cause::<AuthError>(),
        Some(AuthError::NotSignedIn)
    ));
}
