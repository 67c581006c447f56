use std::sync::{Arc, RwLock};

/// Shared handle to the account the process currently operates as.
///
/// Cloning yields another handle to the same slot. There is exactly one
/// active account (or none) at any time.
#[derive(Debug, Clone, Default)]
pub struct ActiveAccount {
    inner: Arc<RwLock<Option<String>>>,
}

impl ActiveAccount {
    pub fn new(initial: Option<String>) -> Self {
        Self {
            inner: Arc::new(RwLock::new(initial)),
        }
    }

    pub fn get(&self) -> Option<String> {
        match self.inner.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn set(&self, account: impl Into<String>) {
        self.replace(Some(account.into()));
    }

    pub fn clear(&self) {
        self.replace(None);
    }

    fn replace(&self, value: Option<String>) {
        match self.inner.write() {
            Ok(mut guard) => *guard = value,
            Err(poisoned) => *poisoned.into_inner() = value,
        }
    }
}
