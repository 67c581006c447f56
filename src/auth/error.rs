use thiserror::Error;

use crate::error::Error as AppError;

/// Protocol-level reasons an authentication step failed.
///
/// Attached as the `source` of [`crate::error::Error::Authentication`] and
/// [`crate::error::Error::Signin`]; raw response bodies are kept verbatim.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Error {status} while trying to acquire a device code: {body}")]
    DeviceCodeRejected { status: u16, body: String },
    #[error("Authorization declined by the user")]
    AuthorizationDeclined,
    #[error("The user code is invalid")]
    BadVerificationCode,
    #[error("The device code has expired")]
    ExpiredToken,
    #[error("Error {status} while trying to acquire an access token: {body}")]
    UnexpectedTokenResponse { status: u16, body: String },
    #[error("Error {status} while fetching the user profile: {body}")]
    ProfileRejected { status: u16, body: String },
    #[error("User profile has no principal name")]
    MissingPrincipal,
    #[error("Invalid access token: {0}")]
    InvalidToken(String),
    #[error("Access token is missing required scope: {}", missing.join(", "))]
    MissingScope { missing: Vec<String> },
    #[error("Not signed in")]
    NotSignedIn,
}

impl AuthError {
    /// Wrap into an authentication error with `message` as context.
    pub fn into_authentication(self, message: impl Into<String>) -> AppError {
        AppError::authentication(message).with_source(self)
    }

    /// Wrap into a sign-in error with `message` as context.
    pub fn into_signin(self, message: impl Into<String>) -> AppError {
        AppError::signin(message).with_source(self)
    }

    /// Raw response body, for variants that carry one.
    pub fn response_body(&self) -> Option<&str> {
        match self {
            Self::DeviceCodeRejected { body, .. }
            | Self::UnexpectedTokenResponse { body, .. }
            | Self::ProfileRejected { body, .. } => Some(body),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn wrapping_preserves_body_in_cause_chain() {
        let err = AuthError::DeviceCodeRejected {
            status: 400,
            body: r#"{"error":"invalid_scope"}"#.to_string(),
        }
        .into_authentication("Error while trying to acquire a device code");

        assert_eq!(err.kind(), ErrorKind::Authentication);
        let cause = err.find_cause::<AuthError>().expect("auth cause");
        assert_eq!(cause.response_body(), Some(r#"{"error":"invalid_scope"}"#));
        assert!(cause.to_string().contains("Error 400"));
    }

    #[test]
    fn missing_scope_lists_every_scope() {
        let err = AuthError::MissingScope {
            missing: vec!["Chat.ReadWrite".into(), "Team.ReadBasic.All".into()],
        };
        assert_eq!(
            err.to_string(),
            "Access token is missing required scope: Chat.ReadWrite, Team.ReadBasic.All"
        );
        assert!(err.response_body().is_none());
    }
}
