use serde::{Deserialize, Serialize};

/// Device authorization response from the identity platform.
///
/// Lives for `expires_in` seconds after issuance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceCodePayload {
    /// Secret the client polls with.
    pub device_code: String,
    /// Short code the user types on the verification page.
    pub user_code: String,
    pub verification_uri: String,
    pub expires_in: u64,
    /// Server-advised polling interval in seconds.
    #[serde(default)]
    pub interval: u64,
    /// Human-readable instructions.
    #[serde(default)]
    pub message: String,
}

/// Successful token response. Converted into stored credentials right away.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthenticationPayload {
    #[serde(default)]
    pub token_type: String,
    #[serde(default)]
    pub scope: String,
    #[serde(default)]
    pub expires_in: u64,
    pub access_token: String,
    #[serde(default)]
    pub id_token: Option<String>,
    #[serde(default)]
    pub refresh_token: Option<String>,
}

/// Why a poll is still pending.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PendingReason {
    /// The user has not finished signing in yet.
    AuthorizationPending,
    /// The token endpoint answered 401 `invalid_client`; treated as pending.
    InvalidClient,
}

/// Outcome of one token poll.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenPoll {
    Pending(PendingReason),
    Authorized(AuthenticationPayload),
}

impl TokenPoll {
    pub fn is_pending(&self) -> bool {
        matches!(self, Self::Pending(_))
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct TokenErrorBody {
    pub error: Option<String>,
}
