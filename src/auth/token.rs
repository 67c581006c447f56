//! Unverified access-token claim decoding.
//!
//! Only the payload segment is read; the signature is never checked. The
//! claims are used to decide whether a stored token is still usable, not to
//! trust its issuer.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use serde::Deserialize;

use super::error::AuthError;

/// Claims of interest from a Microsoft identity access token.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AccessTokenClaims {
    /// Expiry, seconds since the epoch.
    pub exp: Option<i64>,
    /// Space-separated delegated scopes.
    pub scp: Option<String>,
    pub upn: Option<String>,
    pub preferred_username: Option<String>,
    pub name: Option<String>,
    pub tid: Option<String>,
}

impl AccessTokenClaims {
    pub fn decode(token: &str) -> Result<Self, AuthError> {
        let mut parts = token.split('.');
        let _header = parts
            .next()
            .ok_or_else(|| AuthError::InvalidToken("missing JWT header".into()))?;
        let payload = parts
            .next()
            .ok_or_else(|| AuthError::InvalidToken("missing JWT payload".into()))?;
        let decoded = URL_SAFE_NO_PAD
            .decode(payload.trim_end_matches('='))
            .map_err(|_| AuthError::InvalidToken("payload is not base64url".into()))?;
        serde_json::from_slice(&decoded)
            .map_err(|_| AuthError::InvalidToken("payload is not a JSON object".into()))
    }

    /// Granted scopes. Fails when the token carries no `scp` claim.
    pub fn scopes(&self) -> Result<Vec<&str>, AuthError> {
        let scp = self
            .scp
            .as_deref()
            .ok_or_else(|| AuthError::InvalidToken("no scope found in the access token".into()))?;
        Ok(scp.split(' ').filter(|s| !s.is_empty()).collect())
    }

    /// Required scopes absent from the token, in `required` order.
    pub fn missing_scopes(&self, required: &[&str]) -> Result<Vec<String>, AuthError> {
        let granted = self.scopes()?;
        Ok(required
            .iter()
            .filter(|scope| !granted.contains(*scope))
            .map(|scope| scope.to_string())
            .collect())
    }

    /// True unless `exp` is strictly after `now` (whole seconds).
    pub fn is_expired_at(&self, now: i64) -> bool {
        match self.exp {
            Some(exp) => exp <= now,
            None => true,
        }
    }
}
