use std::sync::RwLock;

use super::{account_prefix, credential_key, service_prefix, upsert, Credential, CredentialStore};
use crate::error::{Error, Result};

/// Credential store that lives only as long as the process.
#[derive(Debug)]
pub struct MemoryCredentialStore {
    service: String,
    credentials: RwLock<Vec<Credential>>,
}

impl MemoryCredentialStore {
    pub fn new(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
            credentials: RwLock::new(Vec::new()),
        }
    }

    fn filtered(&self, prefix: &str) -> Result<Vec<Credential>> {
        let credentials = self
            .credentials
            .read()
            .map_err(|_| Error::store("Credential store lock poisoned"))?;
        Ok(credentials
            .iter()
            .filter(|c| c.key.starts_with(prefix))
            .cloned()
            .collect())
    }
}

impl CredentialStore for MemoryCredentialStore {
    fn service(&self) -> &str {
        &self.service
    }

    fn get_service_credentials(&self) -> Result<Vec<Credential>> {
        self.filtered(&service_prefix(&self.service))
    }

    fn get_account_credentials(&self, account: &str) -> Result<Vec<Credential>> {
        self.filtered(&account_prefix(&self.service, account))
    }

    fn get_credential(&self, account: &str, key: &str) -> Result<Option<Credential>> {
        let wanted = credential_key(&self.service, account, key);
        let credentials = self
            .credentials
            .read()
            .map_err(|_| Error::store("Credential store lock poisoned"))?;
        Ok(credentials.iter().find(|c| c.key == wanted).cloned())
    }

    fn set_credential(&self, account: &str, key: &str, value: &str) -> bool {
        let Ok(mut credentials) = self.credentials.write() else {
            tracing::error!("credential store lock poisoned");
            return false;
        };
        let mut next = credentials.clone();
        upsert(&mut next, credential_key(&self.service, account, key), value);
        *credentials = next;
        true
    }

    fn delete_credential(&self, account: &str, key: &str) -> Result<bool> {
        let wanted = credential_key(&self.service, account, key);
        let mut credentials = self
            .credentials
            .write()
            .map_err(|_| Error::store("Credential store lock poisoned"))?;
        let next: Vec<Credential> = credentials
            .iter()
            .filter(|c| c.key != wanted)
            .cloned()
            .collect();
        let removed = next.len() != credentials.len();
        *credentials = next;
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_then_get_round_trips() {
        let store = MemoryCredentialStore::new("lazyteams");
        assert!(store.set_credential("alice", "AccessToken", "T"));
        let credential = store.get_credential("alice", "AccessToken").unwrap().unwrap();
        assert_eq!(credential.key, "lazyteams:alice:AccessToken");
        assert_eq!(credential.value, "T");
    }

    #[test]
    fn delete_then_get_is_not_found() {
        let store = MemoryCredentialStore::new("lazyteams");
        store.set_credential("alice", "AccessToken", "T");
        assert!(store.delete_credential("alice", "AccessToken").unwrap());
        assert!(store.get_credential("alice", "AccessToken").unwrap().is_none());
        assert!(!store.delete_credential("alice", "AccessToken").unwrap());
    }

    #[test]
    fn account_filter_does_not_cross_match_shared_prefixes() {
        let store = MemoryCredentialStore::new("lazyteams");
        store.set_credential("bob", "AccessToken", "bob-token");
        store.set_credential("bob2", "AccessToken", "bob2-token");

        let bob = store.get_account_credentials("bob").unwrap();
        assert_eq!(bob.len(), 1);
        assert_eq!(bob[0].value, "bob-token");
    }

    #[test]
    fn service_filter_is_scoped_to_own_service() {
        let store = MemoryCredentialStore::new("lazyteams");
        store.set_credential("alice", "AccessToken", "T");
        store.set_credential("alice", "RefreshToken", "R");
        assert_eq!(store.get_service_credentials().unwrap().len(), 2);
        assert_eq!(store.service(), "lazyteams");
    }
}
