use std::fs;
use std::io::Write;
#[cfg(unix)]
use std::os::unix::fs::{OpenOptionsExt, PermissionsExt};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::{SystemTime, UNIX_EPOCH};

use super::{account_prefix, credential_key, service_prefix, upsert, Credential, CredentialStore};
use crate::error::{Error, Result};

/// Name of the JSON document inside the credentials directory.
pub const CREDENTIALS_FILE_NAME: &str = "credentials.json";

/// File-backed credential store.
///
/// The whole collection lives in a single JSON array of `{key, value}`
/// objects and is rewritten atomically (temp file + rename) on every
/// mutation. A missing file reads as an empty collection.
///
/// # Example
/// ```no_run
/// use lazyteams::credentials::{CredentialStore, FileCredentialStore};
///
/// let store = FileCredentialStore::new("lazyteams", std::path::Path::new("/tmp/lazyteams"));
/// if !store.set_credential("alice@contoso.com", "AccessToken", "eyJ...") {
///     eprintln!("could not persist credential");
/// }
/// ```
#[derive(Debug)]
pub struct FileCredentialStore {
    service: String,
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl FileCredentialStore {
    pub fn new(service: impl Into<String>, dir: &Path) -> Self {
        Self {
            service: service.into(),
            path: dir.join(CREDENTIALS_FILE_NAME),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_all(&self) -> Result<Vec<Credential>> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(data) => data,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => {
                return Err(Error::store(format!(
                    "Error reading credentials from {}",
                    self.path.display()
                ))
                .with_source(err))
            }
        };
        serde_json::from_str(&raw).map_err(|err| {
            Error::store(format!(
                "Error parsing credentials file {}",
                self.path.display()
            ))
            .with_source(err)
        })
    }

    fn write_all(&self, credentials: &[Credential]) -> Result<()> {
        let serialized = serde_json::to_vec_pretty(credentials)?;
        atomic_write(&self.path, &serialized).map_err(|err| {
            Error::store(format!(
                "Error writing credentials to {}",
                self.path.display()
            ))
            .with_source(err)
        })
    }

    fn filtered(&self, prefix: &str) -> Result<Vec<Credential>> {
        Ok(self
            .read_all()?
            .into_iter()
            .filter(|c| c.key.starts_with(prefix))
            .collect())
    }

    fn try_set(&self, account: &str, key: &str, value: &str) -> Result<()> {
        let _guard = self
            .write_lock
            .lock()
            .map_err(|_| Error::store("Credential store lock poisoned"))?;
        let mut credentials = self.read_all()?;
        upsert(&mut credentials, credential_key(&self.service, account, key), value);
        self.write_all(&credentials)
    }
}

impl CredentialStore for FileCredentialStore {
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
        Ok(self.read_all()?.into_iter().find(|c| c.key == wanted))
    }

    fn set_credential(&self, account: &str, key: &str, value: &str) -> bool {
        match self.try_set(account, key, value) {
            Ok(()) => true,
            Err(err) => {
                tracing::error!(error = %err, path = %self.path.display(), "error setting credential in file");
                false
            }
        }
    }

    fn delete_credential(&self, account: &str, key: &str) -> Result<bool> {
        let _guard = self
            .write_lock
            .lock()
            .map_err(|_| Error::store("Credential store lock poisoned"))?;
        let wanted = credential_key(&self.service, account, key);
        let credentials = self.read_all()?;
        let before = credentials.len();
        let remaining: Vec<Credential> = credentials.into_iter().filter(|c| c.key != wanted).collect();
        self.write_all(&remaining)?;
        Ok(remaining.len() != before)
    }
}

fn atomic_write(path: &Path, data: &[u8]) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }

    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| CREDENTIALS_FILE_NAME.to_string());
    let nonce = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();
    let temp_path = path.with_file_name(format!(
        ".{file_name}.tmp-{}-{nonce}",
        std::process::id()
    ));

    let mut options = fs::OpenOptions::new();
    options.write(true).create_new(true);
    #[cfg(unix)]
    options.mode(0o600);

    let write_result = (|| -> std::io::Result<()> {
        let mut temp_file = options.open(&temp_path)?;
        temp_file.write_all(data)?;
        temp_file.sync_all()?;
        Ok(())
    })();

    if let Err(err) = write_result {
        let _ = fs::remove_file(&temp_path);
        return Err(err);
    }

    if let Err(err) = fs::rename(&temp_path, path) {
        let _ = fs::remove_file(&temp_path);
        return Err(err);
    }

    #[cfg(unix)]
    fs::set_permissions(path, fs::Permissions::from_mode(0o600))?;

    Ok(())
}
