#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::Utc;
use lazyteams::auth::{ActiveAccount, DeviceCodeClient, DeviceCodePayload};
use lazyteams::credentials::MemoryCredentialStore;
use lazyteams::signin::Clipboard;
use serde_json::{json, Value};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const DEVICE_CODE_PATH: &str = "/organizations/oauth2/v2.0/devicecode";
pub const TOKEN_PATH: &str = "/organizations/oauth2/v2.0/token";
pub const PROFILE_PATH: &str = "/v1.0/me";
pub const ALL_SCOPES: &str = "Team.ReadBasic.All Chat.ReadWrite User.ReadBasic.All User.Read";
pub const UPN: &str = "alice@contoso.com";

/// Unsigned JWT carrying `claims`.
pub fn jwt(claims: Value) -> String {
    let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"none","typ":"JWT"}"#);
    let payload = URL_SAFE_NO_PAD.encode(claims.to_string());
    format!("{header}.{payload}.signature")
}

/// Access token expiring `expires_in_secs` from now.
pub fn access_token(expires_in_secs: i64, scopes: &str) -> String {
    jwt(json!({
        "exp": Utc::now().timestamp() + expires_in_secs,
        "scp": scopes,
        "upn": UPN,
    }))
}

pub fn device_code_body(expires_in: u64) -> Value {
    json!({
        "device_code": "device-123",
        "user_code": "ABCD-1234",
        "verification_uri": "https://microsoft.com/devicelogin",
        "expires_in": expires_in,
        "interval": 5,
        "message": "To sign in, use a web browser to open the page https://microsoft.com/devicelogin and enter the code ABCD-1234 to authenticate."
    })
}

pub fn device_code_payload(expires_in: u64) -> DeviceCodePayload {
    serde_json::from_value(device_code_body(expires_in)).expect("payload")
}

pub fn token_error(error: &str) -> Value {
    json!({
        "error": error,
        "error_description": format!("AADSTS: {error}"),
    })
}

pub fn token_success(access_token: &str, refresh_token: &str) -> Value {
    json!({
        "token_type": "Bearer",
        "scope": ALL_SCOPES,
        "expires_in": 3600,
        "access_token": access_token,
        "refresh_token": refresh_token,
        "id_token": "id",
    })
}

/// Client pointed at `server` with a fresh in-memory store and no active account.
pub fn client(server: &MockServer) -> (Arc<MemoryCredentialStore>, DeviceCodeClient) {
    let store = Arc::new(MemoryCredentialStore::new("lazyteams"));
    let client = DeviceCodeClient::new(store.clone(), ActiveAccount::default())
        .with_identity_host(server.uri())
        .with_profile_url(format!("{}{PROFILE_PATH}", server.uri()));
    (store, client)
}

pub async fn mount_device_code(server: &MockServer, expires_in: u64) {
    Mock::given(method("POST"))
        .and(path(DEVICE_CODE_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(device_code_body(expires_in)))
        .mount(server)
        .await;
}

pub async fn mount_profile(server: &MockServer, upn: &str) {
    Mock::given(method("GET"))
        .and(path(PROFILE_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "0001",
            "userPrincipalName": upn,
            "displayName": "Alice Example",
            "mail": upn,
        })))
        .mount(server)
        .await;
}

#[derive(Default)]
pub struct RecordingClipboard {
    written: Mutex<Vec<String>>,
}

impl RecordingClipboard {
    pub fn written(&self) -> Vec<String> {
        self.written.lock().expect("clipboard lock poisoned").clone()
    }
}

impl Clipboard for RecordingClipboard {
    fn write_text(&self, text: &str) -> std::io::Result<()> {
        self.written
            .lock()
            .expect("clipboard lock poisoned")
            .push(text.to_string());
        Ok(())
    }
}
