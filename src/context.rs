//! Process-wide context threaded through the program.

use std::sync::Arc;

use crate::auth::{ActiveAccount, DeviceCodeClient};
use crate::config::Settings;
use crate::credentials::{self, CredentialStore};
use crate::error::Result;
use crate::signin::{Clipboard, SigninMachine};

/// Settings, the credential store and the active account for one process.
///
/// Built once at startup. The store is opened from the settings and the
/// active account starts at `DEFAULT_ACCOUNT` when one is configured.
#[derive(Clone)]
pub struct AppContext {
    settings: Arc<Settings>,
    store: Arc<dyn CredentialStore>,
    account: ActiveAccount,
    client: DeviceCodeClient,
}

impl AppContext {
    pub fn new(settings: Settings) -> Self {
        let store = credentials::open_store(&settings);
        Self::with_store(settings, store)
    }

    pub fn with_store(settings: Settings, store: Arc<dyn CredentialStore>) -> Self {
        let account = ActiveAccount::new(settings.default_account.clone());
        let client = DeviceCodeClient::new(store.clone(), account.clone())
            .with_default_account(settings.default_account.clone());
        Self {
            settings: Arc::new(settings),
            store,
            account,
            client,
        }
    }

    /// Resolve settings from the environment, create directories, open the store.
    pub fn from_env() -> Result<Self> {
        let settings = Settings::from_env()?;
        settings.ensure_directories()?;
        Ok(Self::new(settings))
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn store(&self) -> &Arc<dyn CredentialStore> {
        &self.store
    }

    pub fn account(&self) -> &ActiveAccount {
        &self.account
    }

    pub fn client(&self) -> &DeviceCodeClient {
        &self.client
    }

    pub fn signin_machine(&self, clipboard: Arc<dyn Clipboard>) -> SigninMachine {
        SigninMachine::new(self.client.clone(), clipboard)
    }
}

impl std::fmt::Debug for AppContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppContext")
            .field("settings", &self.settings)
            .field("store", &self.store.service())
            .field("account", &self.account.get())
            .finish()
    }
}
