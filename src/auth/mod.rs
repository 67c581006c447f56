//! Device-code sign-in against the Microsoft identity platform.
//!
//! [`DeviceCodeClient`] talks to the identity and profile endpoints and
//! persists tokens through a [`crate::credentials::CredentialStore`]. It holds
//! no flow state of its own; sequencing lives in [`crate::signin`].

pub mod account;
pub mod client;
pub mod device_code;
pub mod error;
pub mod token;

pub use account::ActiveAccount;
pub use client::{AccountCredentials, DeviceCodeClient, UserProfile, GRAPH_SCOPE, OPENID_SCOPE};
pub use device_code::{AuthenticationPayload, DeviceCodePayload, PendingReason, TokenPoll};
pub use error::AuthError;
pub use token::AccessTokenClaims;
