use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::Utc;
use reqwest::StatusCode;
use serde::Deserialize;
use tracing::{debug, info, warn};

use super::account::ActiveAccount;
use super::device_code::{
    AuthenticationPayload, DeviceCodePayload, PendingReason, TokenErrorBody, TokenPoll,
};
use super::error::AuthError;
use super::token::AccessTokenClaims;
use crate::credentials::{CredentialStore, ACCESS_TOKEN, REFRESH_TOKEN};
use crate::error::{Error, Result};

pub const DEFAULT_IDENTITY_HOST: &str = "https://login.microsoftonline.com";
pub const DEFAULT_CLIENT_ID: &str = "74201357-4b0e-4667-b9a6-c1cf7de422a3";
pub const DEFAULT_PROFILE_URL: &str = "https://graph.microsoft.com/v1.0/me";

/// Identity scopes requested on every sign-in.
pub const OPENID_SCOPE: &[&str] = &["openid", "profile", "offline_access", "email", "user.read"];
/// Resource scopes a stored access token must carry to count as signed in.
pub const GRAPH_SCOPE: &[&str] = &["Team.ReadBasic.All", "Chat.ReadWrite", "User.ReadBasic.All"];

const DEVICE_CODE_GRANT: &str = "urn:ietf:params:oauth:grant-type:device_code";

/// Profile returned by the profile endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: Option<String>,
    pub user_principal_name: Option<String>,
    pub display_name: Option<String>,
    pub mail: Option<String>,
}

/// Tokens stored for one account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountCredentials {
    pub account: String,
    /// Whether this is the configured default account.
    pub is_default: bool,
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
}

/// Device authorization grant client.
///
/// Cheap to clone; clones share the HTTP connection pool, the credential
/// store and the active-account slot.
///
/// # Example
/// ```no_run
/// use std::sync::Arc;
/// use lazyteams::auth::{ActiveAccount, DeviceCodeClient};
/// use lazyteams::credentials::MemoryCredentialStore;
///
/// # async fn example() -> lazyteams::error::Result<()> {
/// let client = DeviceCodeClient::new(
///     Arc::new(MemoryCredentialStore::new("lazyteams")),
///     ActiveAccount::default(),
/// );
/// let payload = client.request_device_code().await?;
/// println!("{}", payload.message);
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct DeviceCodeClient {
    http: reqwest::Client,
    client_id: String,
    identity_host: String,
    profile_url: String,
    store: Arc<dyn CredentialStore>,
    account: ActiveAccount,
    default_account: Option<String>,
}

impl std::fmt::Debug for DeviceCodeClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeviceCodeClient")
            .field("client_id", &self.client_id)
            .field("identity_host", &self.identity_host)
            .field("profile_url", &self.profile_url)
            .field("store", &self.store.service())
            .field("account", &self.account.get())
            .finish()
    }
}

impl DeviceCodeClient {
    pub fn new(store: Arc<dyn CredentialStore>, account: ActiveAccount) -> Self {
        Self {
            http: reqwest::Client::new(),
            client_id: DEFAULT_CLIENT_ID.to_string(),
            identity_host: DEFAULT_IDENTITY_HOST.to_string(),
            profile_url: DEFAULT_PROFILE_URL.to_string(),
            store,
            account,
            default_account: None,
        }
    }

    pub fn with_identity_host(mut self, host: impl Into<String>) -> Self {
        self.identity_host = host.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_profile_url(mut self, url: impl Into<String>) -> Self {
        self.profile_url = url.into();
        self
    }

    pub fn with_client_id(mut self, client_id: impl Into<String>) -> Self {
        self.client_id = client_id.into();
        self
    }

    pub fn with_default_account(mut self, account: Option<String>) -> Self {
        self.default_account = account;
        self
    }

    pub fn store(&self) -> &Arc<dyn CredentialStore> {
        &self.store
    }

    pub fn active_account(&self) -> Option<String> {
        self.account.get()
    }

    pub fn set_active_account(&self, account: impl Into<String>) {
        self.account.set(account);
    }

    /// Space-separated identity + resource scopes.
    pub fn requested_scope() -> String {
        OPENID_SCOPE
            .iter()
            .chain(GRAPH_SCOPE.iter())
            .copied()
            .collect::<Vec<_>>()
            .join(" ")
    }

    fn device_code_url(&self) -> String {
        format!(
            "{}/organizations/oauth2/v2.0/devicecode",
            self.identity_host
        )
    }

    fn token_url(&self) -> String {
        format!("{}/organizations/oauth2/v2.0/token", self.identity_host)
    }

    /// Ask the identity platform for a device code and user code.
    pub async fn request_device_code(&self) -> Result<DeviceCodePayload> {
        const CONTEXT: &str = "Error while trying to acquire a device code";
        let scope = Self::requested_scope();
        let resp = self
            .http
            .post(self.device_code_url())
            .header("Accept", "application/json")
            .form(&[("client_id", self.client_id.as_str()), ("scope", scope.as_str())])
            .send()
            .await
            .map_err(|err| Error::authentication(CONTEXT).with_source(err))?;
        let status = resp.status();
        let body = resp
            .text()
            .await
            .map_err(|err| Error::authentication(CONTEXT).with_source(err))?;
        if status != StatusCode::OK {
            return Err(AuthError::DeviceCodeRejected {
                status: status.as_u16(),
                body,
            }
            .into_authentication(CONTEXT));
        }
        let payload: DeviceCodePayload = serde_json::from_str(&body)
            .map_err(|err| Error::authentication(CONTEXT).with_source(err))?;
        debug!(
            expires_in = payload.expires_in,
            interval = payload.interval,
            "device code acquired"
        );
        Ok(payload)
    }

    /// Poll the token endpoint once.
    ///
    /// On success the caller's profile is fetched, its principal name becomes
    /// the active account, and both tokens are persisted before returning.
    pub async fn poll_for_token(&self, payload: &DeviceCodePayload) -> Result<TokenPoll> {
        const CONTEXT: &str = "Error while trying to acquire an access token";
        let resp = self
            .http
            .post(self.token_url())
            .header("Accept", "application/json")
            .form(&[
                ("grant_type", DEVICE_CODE_GRANT),
                ("client_id", self.client_id.as_str()),
                ("device_code", payload.device_code.as_str()),
            ])
            .send()
            .await
            .map_err(|err| Error::authentication(CONTEXT).with_source(err))?;
        let status = resp.status();
        let body = resp
            .text()
            .await
            .map_err(|err| Error::authentication(CONTEXT).with_source(err))?;
        let error_code = serde_json::from_str::<TokenErrorBody>(&body)
            .ok()
            .and_then(|b| b.error);

        match (status.as_u16(), error_code.as_deref()) {
            (200, _) => {}
            (400, Some("authorization_pending")) => {
                debug!("authorization pending");
                return Ok(TokenPoll::Pending(PendingReason::AuthorizationPending));
            }
            (400, Some("authorization_declined")) => {
                return Err(AuthError::AuthorizationDeclined.into_authentication(CONTEXT))
            }
            (400, Some("bad_verification_code")) => {
                return Err(AuthError::BadVerificationCode.into_authentication(CONTEXT))
            }
            (400, Some("expired_token")) => {
                return Err(AuthError::ExpiredToken.into_authentication(CONTEXT))
            }
            (401, Some("invalid_client")) => {
                warn!("token endpoint answered invalid_client, treating as pending");
                return Ok(TokenPoll::Pending(PendingReason::InvalidClient));
            }
            (status, _) => {
                return Err(
                    AuthError::UnexpectedTokenResponse { status, body }.into_authentication(CONTEXT)
                )
            }
        }

        let tokens: AuthenticationPayload = serde_json::from_str(&body)
            .map_err(|err| Error::authentication(CONTEXT).with_source(err))?;
        debug!("authentication successful");

        let profile = self.fetch_profile_with(&tokens.access_token).await?;
        let account = profile
            .user_principal_name
            .filter(|upn| !upn.is_empty())
            .ok_or_else(|| AuthError::MissingPrincipal.into_authentication(CONTEXT))?;
        self.account.set(account.clone());
        info!(account = %account, "signed in");

        self.persist(&account, ACCESS_TOKEN, &tokens.access_token);
        match tokens.refresh_token.as_deref() {
            Some(refresh) => self.persist(&account, REFRESH_TOKEN, refresh),
            None => warn!(account = %account, "token response carried no refresh token"),
        }
        Ok(TokenPoll::Authorized(tokens))
    }

    fn persist(&self, account: &str, key: &str, value: &str) {
        if !self.store.set_credential(account, key, value) {
            warn!(account = %account, key, "failed to persist credential");
        }
    }

    async fn fetch_profile_with(&self, access_token: &str) -> Result<UserProfile> {
        const CONTEXT: &str = "Error getting user profile";
        let resp = self
            .http
            .get(&self.profile_url)
            .header("Accept", "application/json")
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|err| Error::authentication(CONTEXT).with_source(err))?;
        let status = resp.status();
        let body = resp
            .text()
            .await
            .map_err(|err| Error::authentication(CONTEXT).with_source(err))?;
        if !status.is_success() {
            return Err(AuthError::ProfileRejected {
                status: status.as_u16(),
                body,
            }
            .into_authentication(CONTEXT));
        }
        let profile: UserProfile = serde_json::from_str(&body)
            .map_err(|err| Error::authentication(CONTEXT).with_source(err))?;
        debug!(upn = ?profile.user_principal_name, "user profile fetched");
        Ok(profile)
    }

    /// Fetch the active account's profile with its stored access token.
    pub async fn fetch_my_profile(&self) -> Result<UserProfile> {
        let account = self
            .active_account()
            .ok_or_else(|| AuthError::NotSignedIn.into_authentication("Error getting user profile"))?;
        let access = self
            .store
            .get_credential(&account, ACCESS_TOKEN)?
            .ok_or_else(|| AuthError::NotSignedIn.into_authentication("Error getting user profile"))?;
        self.fetch_profile_with(&access.value).await
    }

    /// Whether the active account holds usable tokens.
    ///
    /// Absent account, absent tokens, or an expired access token yield
    /// `false`. A token whose scopes do not cover [`GRAPH_SCOPE`] (or that
    /// cannot be decoded) is an error.
    pub fn check_signed_in(&self) -> Result<bool> {
        self.check_signed_in_at(Utc::now().timestamp())
    }

    pub(crate) fn check_signed_in_at(&self, now: i64) -> Result<bool> {
        const CONTEXT: &str = "Error checking if signed in";
        let Some(account) = self.active_account() else {
            return Ok(false);
        };
        let wrap = |err: Error| Error::signin(CONTEXT).with_source(err);
        let access = self.store.get_credential(&account, ACCESS_TOKEN).map_err(wrap)?;
        let refresh = self.store.get_credential(&account, REFRESH_TOKEN).map_err(wrap)?;
        let (Some(access), Some(_refresh)) = (access, refresh) else {
            return Ok(false);
        };

        let claims =
            AccessTokenClaims::decode(&access.value).map_err(|err| err.into_signin(CONTEXT))?;
        let missing = claims
            .missing_scopes(GRAPH_SCOPE)
            .map_err(|err| err.into_signin(CONTEXT))?;
        if !missing.is_empty() {
            return Err(AuthError::MissingScope { missing }.into_signin(CONTEXT));
        }
        if claims.is_expired_at(now) {
            debug!(account = %account, "access token is expired");
            return Ok(false);
        }
        Ok(true)
    }

    /// Stored tokens for every account of this service.
    pub fn user_credentials(&self) -> Result<BTreeMap<String, AccountCredentials>> {
        let mut accounts: BTreeMap<String, AccountCredentials> = BTreeMap::new();
        for credential in self.store.get_service_credentials()? {
            let Some(account) = credential.account() else {
                continue;
            };
            let entry = accounts
                .entry(account.to_string())
                .or_insert_with(|| AccountCredentials {
                    account: account.to_string(),
                    is_default: self.default_account.as_deref() == Some(account),
                    access_token: None,
                    refresh_token: None,
                });
            match credential.purpose() {
                Some(ACCESS_TOKEN) => entry.access_token = Some(credential.value.clone()),
                Some(REFRESH_TOKEN) => entry.refresh_token = Some(credential.value.clone()),
                _ => {}
            }
        }
        Ok(accounts)
    }

    /// Stored tokens for the active account, if any.
    pub fn active_credentials(&self) -> Result<Option<AccountCredentials>> {
        let Some(account) = self.active_account() else {
            return Ok(None);
        };
        Ok(self.user_credentials()?.remove(&account))
    }

    /// Delete the active account's tokens and clear the active account.
    ///
    /// Returns whether anything was removed.
    pub fn sign_out(&self) -> Result<bool> {
        let Some(account) = self.active_account() else {
            return Ok(false);
        };
        let access = self.store.delete_credential(&account, ACCESS_TOKEN)?;
        let refresh = self.store.delete_credential(&account, REFRESH_TOKEN)?;
        self.account.clear();
        info!(account = %account, "signed out");
        Ok(access || refresh)
    }
}
