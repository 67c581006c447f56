//! Settings provider (layered: process env > `.env` file > defaults).

pub mod keys;

pub use keys::{DefaultDirs, SettingKey, SettingType, SettingValue, SettingsCategory};

use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;

use crate::credentials::StoreProvider;
use crate::error::{Error, Result};

/// Placeholder written in place of sensitive values when settings are logged.
pub const REDACTED: &str = "REDACTED:SENSITIVE";

/// A resolved key, kept for startup logging.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedSetting {
    pub key: &'static str,
    pub value: SettingValue,
    pub sensitive: bool,
}

impl ResolvedSetting {
    /// Value safe to print: sensitive values are redacted.
    pub fn display_value(&self) -> String {
        if self.sensitive {
            REDACTED.to_string()
        } else {
            self.value.to_string()
        }
    }
}

/// Typed configuration, resolved once at startup.
#[derive(Debug, Clone)]
pub struct Settings {
    pub log_level: String,
    pub log_dir: PathBuf,
    pub cache_dir: PathBuf,
    pub log_on_startup: bool,
    pub strict_mode: bool,
    pub settings_dir: PathBuf,
    pub credentials_store_provider: StoreProvider,
    pub credentials_dir: PathBuf,
    pub default_account: Option<String>,
    resolved: Vec<ResolvedSetting>,
}

impl Settings {
    /// Load `.env` (if present) and resolve from the process environment.
    pub fn from_env() -> Result<Self> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(&DefaultDirs::detect(), |key| std::env::var(key).ok())
    }

    /// Resolve every declared key through `lookup`.
    ///
    /// Fails with a configuration error when a mandatory key is empty in
    /// strict mode, when a value cannot be converted to its declared type, or
    /// when the credential store provider is not recognized.
    pub fn from_lookup<F>(dirs: &DefaultDirs, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let specs = keys::specifications(dirs);
        Self::resolve(&specs, lookup)
    }

    pub(crate) fn resolve<F>(specs: &[SettingsCategory], lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let strict_mode = match keys::format_value(
            keys::SETTINGS_STRICT_MODE,
            lookup(keys::SETTINGS_STRICT_MODE).as_deref(),
            SettingType::Boolean,
            &SettingValue::Flag(true),
        )? {
            SettingValue::Flag(flag) => flag,
            _ => true,
        };

        let mut resolved = Vec::new();
        for key in specs.iter().flat_map(|category| category.keys()) {
            let raw = lookup(key.key);
            let value = keys::format_value(key.key, raw.as_deref(), key.kind, &key.default)?;
            if key.mandatory && value.is_empty() {
                if strict_mode {
                    return Err(Error::configuration(format!(
                        "{} mandatory option is not defined. Please refer to the option description: \"{}\"",
                        key.key, key.description
                    )));
                }
                tracing::warn!(key = key.key, "mandatory setting is not defined");
            }
            resolved.push(ResolvedSetting {
                key: key.key,
                value,
                sensitive: key.sensitive,
            });
        }

        let values: HashMap<&str, &SettingValue> =
            resolved.iter().map(|s| (s.key, &s.value)).collect();
        let text = |key: &str| -> String {
            values
                .get(key)
                .map(|value| value.to_string())
                .unwrap_or_default()
        };
        let flag = |key: &str| -> bool {
            matches!(values.get(key), Some(SettingValue::Flag(true)))
        };

        let provider_raw = text(keys::CREDENTIALS_STORE_PROVIDER);
        let provider_raw = if provider_raw.is_empty() {
            "memory".to_string()
        } else {
            provider_raw
        };
        let credentials_store_provider: StoreProvider =
            provider_raw.parse().map_err(|_| {
                Error::configuration(format!(
                    "Invalid credentials store provider: {provider_raw} (supported: fs, memory)"
                ))
            })?;

        let default_account = Some(text(keys::DEFAULT_ACCOUNT)).filter(|a| !a.is_empty());
        let log_level = text(keys::LOG_LEVEL);
        let log_dir = PathBuf::from(text(keys::LOG_DIR));
        let cache_dir = PathBuf::from(text(keys::CACHE_DIR));
        let log_on_startup = flag(keys::SETTINGS_LOG_ON_STARTUP);
        let settings_dir = PathBuf::from(text(keys::SETTINGS_DIR));
        let credentials_dir = PathBuf::from(text(keys::CREDENTIALS_DIR));

        Ok(Self {
            log_level,
            log_dir,
            cache_dir,
            log_on_startup,
            strict_mode,
            settings_dir,
            credentials_store_provider,
            credentials_dir,
            default_account,
            resolved,
        })
    }

    /// Every resolved key, in declaration order.
    pub fn resolved(&self) -> &[ResolvedSetting] {
        &self.resolved
    }

    /// Emit each resolved key at debug level (sensitive values redacted).
    pub fn log_resolved(&self) {
        for setting in &self.resolved {
            tracing::debug!(key = setting.key, value = %setting.display_value(), "setting");
        }
    }

    /// Create the log, cache, settings and credentials directories.
    pub fn ensure_directories(&self) -> Result<()> {
        for dir in [
            &self.log_dir,
            &self.cache_dir,
            &self.settings_dir,
            &self.credentials_dir,
        ] {
            if dir.as_os_str().is_empty() {
                continue;
            }
            fs::create_dir_all(dir).map_err(|err| {
                Error::configuration(format!("Cannot create directory {}", dir.display()))
                    .with_source(err)
            })?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use std::path::Path;
    use tempfile::TempDir;

    fn dirs() -> DefaultDirs {
        DefaultDirs::rooted(Path::new("/tmp/lt"))
    }

    fn settings_with(pairs: &[(&str, &str)]) -> Result<Settings> {
        let env: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Settings::from_lookup(&dirs(), |key| env.get(key).cloned())
    }

    #[test]
    fn defaults_apply_when_environment_is_empty() {
        let settings = settings_with(&[]).unwrap();
        assert_eq!(settings.log_level, "info");
        assert_eq!(settings.log_dir, PathBuf::from("/tmp/lt/cache/logs"));
        assert_eq!(settings.cache_dir, PathBuf::from("/tmp/lt/cache"));
        assert_eq!(settings.settings_dir, PathBuf::from("/tmp/lt/config"));
        assert_eq!(
            settings.credentials_dir,
            PathBuf::from("/tmp/lt/config/credentials")
        );
        assert_eq!(settings.credentials_store_provider, StoreProvider::Memory);
        assert!(settings.strict_mode);
        assert!(!settings.log_on_startup);
        assert!(settings.default_account.is_none());
    }

    #[test]
    fn environment_overrides_defaults() {
        let settings = settings_with(&[
            ("LOG_LEVEL", "debug"),
            ("CREDENTIALS_STORE_PROVIDER", "fs"),
            ("CREDENTIALS_DIR", "/srv/creds"),
            ("DEFAULT_ACCOUNT", "alice@contoso.com"),
            ("SETTINGS_LOG_ON_STARTUP", "true"),
        ])
        .unwrap();
        assert_eq!(settings.log_level, "debug");
        assert_eq!(settings.credentials_store_provider, StoreProvider::Fs);
        assert_eq!(settings.credentials_dir, PathBuf::from("/srv/creds"));
        assert_eq!(settings.default_account.as_deref(), Some("alice@contoso.com"));
        assert!(settings.log_on_startup);
    }

    #[test]
    fn unknown_store_provider_is_a_configuration_error() {
        let err = settings_with(&[("CREDENTIALS_STORE_PROVIDER", "keychain")]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Configuration);
        assert!(err.to_string().contains("keychain"));
    }

    #[test]
    fn null_store_provider_falls_back_to_memory() {
        let settings = settings_with(&[("CREDENTIALS_STORE_PROVIDER", "null")]).unwrap();
        assert_eq!(settings.credentials_store_provider, StoreProvider::Memory);
    }

    #[test]
    fn missing_mandatory_key_fails_in_strict_mode() {
        let mut specs = keys::specifications(&dirs());
        specs[0].domains[3].keys[2].mandatory = true;
        let err = Settings::resolve(&specs, |_| None).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Configuration);
        assert!(err.to_string().contains("DEFAULT_ACCOUNT mandatory option"));
    }

    #[test]
    fn missing_mandatory_key_is_tolerated_without_strict_mode() {
        let mut specs = keys::specifications(&dirs());
        specs[0].domains[3].keys[2].mandatory = true;
        let settings = Settings::resolve(&specs, |key| {
            (key == keys::SETTINGS_STRICT_MODE).then(|| "false".to_string())
        })
        .unwrap();
        assert!(!settings.strict_mode);
        assert!(settings.default_account.is_none());
    }

    #[test]
    fn sensitive_values_are_redacted_for_display() {
        let setting = ResolvedSetting {
            key: "SECRET",
            value: SettingValue::text("hunter2"),
            sensitive: true,
        };
        assert_eq!(setting.display_value(), REDACTED);
        let plain = ResolvedSetting {
            sensitive: false,
            ..setting
        };
        assert_eq!(plain.display_value(), "hunter2");
    }

    #[test]
    fn ensure_directories_creates_all_paths() {
        let root = TempDir::new().unwrap();
        let base = root.path().display().to_string();
        let settings = settings_with(&[
            ("LOG_DIR", format!("{base}/logs").as_str()),
            ("CACHE_DIR", format!("{base}/cache").as_str()),
            ("SETTINGS_DIR", format!("{base}/settings").as_str()),
            ("CREDENTIALS_DIR", format!("{base}/settings/credentials").as_str()),
        ])
        .unwrap();
        settings.ensure_directories().unwrap();
        for dir in ["logs", "cache", "settings", "settings/credentials"] {
            assert!(root.path().join(dir).is_dir(), "{dir} missing");
        }
    }
}
