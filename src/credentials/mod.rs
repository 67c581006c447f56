//! Per-account secret storage keyed by `service:account:key`.
//!
//! Two interchangeable backends implement [`CredentialStore`]: an in-memory
//! store that forgets everything on exit, and a file store that rewrites a
//! single JSON document on every mutation. The backend is chosen once at
//! startup by [`open_store`] and threaded through the program as an
//! `Arc<dyn CredentialStore>`.

mod file;
mod memory;

pub use file::{FileCredentialStore, CREDENTIALS_FILE_NAME};
pub use memory::MemoryCredentialStore;

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::config::Settings;
use crate::error::Result;
use crate::PRODUCT_CODE;

/// Purpose suffix for access tokens.
pub const ACCESS_TOKEN: &str = "AccessToken";
/// Purpose suffix for refresh tokens.
pub const REFRESH_TOKEN: &str = "RefreshToken";

/// A stored secret. `key` is `service:account:purpose`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credential {
    pub key: String,
    pub value: String,
}

impl Credential {
    /// Account segment of the key, if the key is well formed.
    pub fn account(&self) -> Option<&str> {
        let mut parts = self.key.splitn(3, ':');
        let _service = parts.next()?;
        let account = parts.next()?;
        parts.next()?;
        Some(account)
    }

    /// Purpose segment of the key (`AccessToken`, `RefreshToken`, ...).
    pub fn purpose(&self) -> Option<&str> {
        self.key.splitn(3, ':').nth(2)
    }
}

/// Which backend holds credentials for this process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum StoreProvider {
    /// JSON file under the configured credentials directory.
    Fs,
    /// Process memory only.
    Memory,
}

/// Storage abstraction for per-account credentials.
///
/// Every operation except [`set_credential`](CredentialStore::set_credential)
/// reports backend failures as `Err`. `set_credential` degrades to a logged
/// `false` instead, so callers must check its return value.
pub trait CredentialStore: Send + Sync {
    /// Service namespace prefixed to every key.
    fn service(&self) -> &str;

    /// All credentials whose key starts with `"{service}:"`.
    fn get_service_credentials(&self) -> Result<Vec<Credential>>;

    /// All credentials belonging to `account`.
    fn get_account_credentials(&self, account: &str) -> Result<Vec<Credential>>;

    /// Exact lookup of `"{service}:{account}:{key}"`.
    fn get_credential(&self, account: &str, key: &str) -> Result<Option<Credential>>;

    /// Insert or replace a credential. Returns `false` on failure.
    fn set_credential(&self, account: &str, key: &str, value: &str) -> bool;

    /// Remove a credential. `Ok(true)` when an entry was removed.
    fn delete_credential(&self, account: &str, key: &str) -> Result<bool>;
}

/// Build the backend selected by `settings`.
pub fn open_store(settings: &Settings) -> Arc<dyn CredentialStore> {
    tracing::debug!(provider = %settings.credentials_store_provider, "opening credential store");
    match settings.credentials_store_provider {
        StoreProvider::Memory => Arc::new(MemoryCredentialStore::new(PRODUCT_CODE)),
        StoreProvider::Fs => Arc::new(FileCredentialStore::new(
            PRODUCT_CODE,
            &settings.credentials_dir,
        )),
    }
}

pub(crate) fn credential_key(service: &str, account: &str, key: &str) -> String {
    format!("{service}:{account}:{key}")
}

pub(crate) fn service_prefix(service: &str) -> String {
    format!("{service}:")
}

/// Trailing separator included so `bob` never matches `bob2`.
pub(crate) fn account_prefix(service: &str, account: &str) -> String {
    format!("{service}:{account}:")
}

pub(crate) fn upsert(credentials: &mut Vec<Credential>, key: String, value: &str) {
    match credentials.iter_mut().find(|c| c.key == key) {
        Some(existing) => existing.value = value.to_string(),
        None => credentials.push(Credential {
            key,
            value: value.to_string(),
        }),
    }
}
