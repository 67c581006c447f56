//! Error types for LazyTeams.

use strum::Display;
use thiserror::Error;

/// Boxed cause attached to an [`Error`].
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Primary error type for all LazyTeams operations.
///
/// Every failure carries a kind, a human-readable message, and optionally the
/// lower-level error it wraps. Callers match on the variant (or on
/// [`Error::kind`]) rather than on the wrapped cause.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Configuration error: {message}")]
    Configuration {
        message: String,
        #[source]
        source: Option<BoxError>,
    },

    #[error("Credential store error: {message}")]
    Store {
        message: String,
        #[source]
        source: Option<BoxError>,
    },

    #[error("Authentication error: {message}")]
    Authentication {
        message: String,
        #[source]
        source: Option<BoxError>,
    },

    #[error("Sign-in error: {message}")]
    Signin {
        message: String,
        #[source]
        source: Option<BoxError>,
    },
}

/// Discriminant of [`Error`], convenient for logging and exit-code mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "snake_case")]
pub enum ErrorKind {
    Configuration,
    Store,
    Authentication,
    Signin,
}

/// Suggested recovery action shown to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecoverySuggestion {
    /// Fix the environment or `.env` file and start again.
    CheckConfiguration,
    /// The credentials file is unreadable or corrupt.
    CheckCredentialStore,
    /// Start the device-code flow again from scratch.
    RestartSignin,
}

impl Error {
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
            source: None,
        }
    }

    pub fn store(message: impl Into<String>) -> Self {
        Self::Store {
            message: message.into(),
            source: None,
        }
    }

    pub fn authentication(message: impl Into<String>) -> Self {
        Self::Authentication {
            message: message.into(),
            source: None,
        }
    }

    pub fn signin(message: impl Into<String>) -> Self {
        Self::Signin {
            message: message.into(),
            source: None,
        }
    }

    /// Attach (or replace) the wrapped cause.
    pub fn with_source(mut self, cause: impl Into<BoxError>) -> Self {
        let cause = Some(cause.into());
        match &mut self {
            Self::Configuration { source, .. }
            | Self::Store { source, .. }
            | Self::Authentication { source, .. }
            | Self::Signin { source, .. } => *source = cause,
        }
        self
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Configuration { .. } => ErrorKind::Configuration,
            Self::Store { .. } => ErrorKind::Store,
            Self::Authentication { .. } => ErrorKind::Authentication,
            Self::Signin { .. } => ErrorKind::Signin,
        }
    }

    pub fn message(&self) -> &str {
        match self {
            Self::Configuration { message, .. }
            | Self::Store { message, .. }
            | Self::Authentication { message, .. }
            | Self::Signin { message, .. } => message,
        }
    }

    pub fn recovery_suggestion(&self) -> RecoverySuggestion {
        match self.kind() {
            ErrorKind::Configuration => RecoverySuggestion::CheckConfiguration,
            ErrorKind::Store => RecoverySuggestion::CheckCredentialStore,
            ErrorKind::Authentication | ErrorKind::Signin => RecoverySuggestion::RestartSignin,
        }
    }

    /// Walk the cause chain looking for an error of type `E`.
    pub fn find_cause<E: std::error::Error + 'static>(&self) -> Option<&E> {
        let mut current: Option<&(dyn std::error::Error + 'static)> =
            std::error::Error::source(self);
        while let Some(err) = current {
            if let Some(found) = err.downcast_ref::<E>() {
                return Some(found);
            }
            current = err.source();
        }
        None
    }
}

impl From<std::io::Error> for Error {
    fn from(error: std::io::Error) -> Self {
        Self::store("I/O failure").with_source(error)
    }
}

impl From<serde_json::Error> for Error {
    fn from(error: serde_json::Error) -> Self {
        Self::store("Malformed JSON document").with_source(error)
    }
}

impl From<reqwest::Error> for Error {
    fn from(error: reqwest::Error) -> Self {
        Self::authentication("Network failure").with_source(error)
    }
}

/// Convenience alias.
pub type Result<T> = std::result::Result<T, Error>;
