//! Declarative table of every setting LazyTeams understands.
//!
//! The table drives resolution ([`super::Settings`]), the `.env` sample, and
//! the Markdown configuration reference, so the three never drift apart.

use std::fmt;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use strum::Display;

use crate::error::{Error, Result};
use crate::{PRODUCT_CODE, PRODUCT_NAME};

pub const LOG_LEVEL: &str = "LOG_LEVEL";
pub const LOG_DIR: &str = "LOG_DIR";
pub const CACHE_DIR: &str = "CACHE_DIR";
pub const SETTINGS_LOG_ON_STARTUP: &str = "SETTINGS_LOG_ON_STARTUP";
pub const SETTINGS_STRICT_MODE: &str = "SETTINGS_STRICT_MODE";
pub const SETTINGS_DIR: &str = "SETTINGS_DIR";
pub const CREDENTIALS_STORE_PROVIDER: &str = "CREDENTIALS_STORE_PROVIDER";
pub const CREDENTIALS_DIR: &str = "CREDENTIALS_DIR";
pub const DEFAULT_ACCOUNT: &str = "DEFAULT_ACCOUNT";

const KEY_PLACEHOLDER: &str = "{REPLACE_ME}";

/// Runtime type a raw environment string is converted to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "lowercase")]
pub enum SettingType {
    String,
    Boolean,
    Integer,
}

/// A typed setting value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SettingValue {
    Text(String),
    Flag(bool),
    Number(i64),
    Empty,
}

impl SettingValue {
    pub fn text(value: impl Into<String>) -> Self {
        Self::Text(value.into())
    }

    fn path(value: &Path) -> Self {
        Self::Text(value.to_string_lossy().into_owned())
    }

    pub fn is_empty(&self) -> bool {
        match self {
            Self::Empty => true,
            Self::Text(text) => text.is_empty(),
            Self::Flag(_) | Self::Number(_) => false,
        }
    }
}

impl fmt::Display for SettingValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(text) => f.write_str(text),
            Self::Flag(flag) => write!(f, "{flag}"),
            Self::Number(number) => write!(f, "{number}"),
            Self::Empty => Ok(()),
        }
    }
}

/// One configurable key.
#[derive(Debug, Clone)]
pub struct SettingKey {
    pub key: &'static str,
    pub description: &'static str,
    pub mandatory: bool,
    pub default: SettingValue,
    /// Replaces the literal default in generated docs (machine-specific paths).
    pub default_description: Option<&'static str>,
    pub kind: SettingType,
    /// Sensitive values are never logged.
    pub sensitive: bool,
}

#[derive(Debug, Clone)]
pub struct SettingsDomain {
    pub domain: &'static str,
    pub description: &'static str,
    pub keys: Vec<SettingKey>,
}

#[derive(Debug, Clone)]
pub struct SettingsCategory {
    pub category: &'static str,
    pub description: &'static str,
    pub domains: Vec<SettingsDomain>,
}

impl SettingsCategory {
    pub fn keys(&self) -> impl Iterator<Item = &SettingKey> {
        self.domains.iter().flat_map(|domain| domain.keys.iter())
    }
}

/// Platform directories used to compute path defaults.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DefaultDirs {
    pub cache: PathBuf,
    pub config: PathBuf,
}

impl DefaultDirs {
    /// Resolve XDG / platform directories for the product.
    pub fn detect() -> Self {
        match directories::ProjectDirs::from("", "", PRODUCT_CODE) {
            Some(dirs) => Self {
                cache: dirs.cache_dir().to_path_buf(),
                config: dirs.config_dir().to_path_buf(),
            },
            None => Self::rooted(Path::new(".").join(format!(".{PRODUCT_CODE}")).as_path()),
        }
    }

    /// Place every default under `base`.
    pub fn rooted(base: &Path) -> Self {
        Self {
            cache: base.join("cache"),
            config: base.join("config"),
        }
    }
}

/// Full settings table with defaults computed from `dirs`.
pub fn specifications(dirs: &DefaultDirs) -> Vec<SettingsCategory> {
    vec![SettingsCategory {
        category: "User Settings",
        description: "Settings that are specific to the user",
        domains: vec![
            SettingsDomain {
                domain: "Logs",
                description: "Logging settings",
                keys: vec![
                    SettingKey {
                        key: LOG_LEVEL,
                        description: "Logging level. Uses levels `error` / `warn` / `info` / `debug` (highest to lowest).",
                        mandatory: false,
                        default: SettingValue::text("info"),
                        default_description: None,
                        kind: SettingType::String,
                        sensitive: false,
                    },
                    SettingKey {
                        key: LOG_DIR,
                        description: "Defines logs directory location.",
                        mandatory: false,
                        default: SettingValue::path(&dirs.cache.join("logs")),
                        default_description: Some("`<user cache dir>/logs`"),
                        kind: SettingType::String,
                        sensitive: false,
                    },
                ],
            },
            SettingsDomain {
                domain: "Cache",
                description: "Cache settings",
                keys: vec![SettingKey {
                    key: CACHE_DIR,
                    description: "Defines cache directory location.",
                    mandatory: false,
                    default: SettingValue::path(&dirs.cache),
                    default_description: Some("`<user cache dir>`"),
                    kind: SettingType::String,
                    sensitive: false,
                }],
            },
            SettingsDomain {
                domain: "Settings",
                description: "Application settings",
                keys: vec![
                    SettingKey {
                        key: SETTINGS_LOG_ON_STARTUP,
                        description: "Log settings on startup.",
                        mandatory: false,
                        default: SettingValue::Flag(false),
                        default_description: None,
                        kind: SettingType::Boolean,
                        sensitive: false,
                    },
                    SettingKey {
                        key: SETTINGS_STRICT_MODE,
                        description: "Enable strict mode.",
                        mandatory: false,
                        default: SettingValue::Flag(true),
                        default_description: None,
                        kind: SettingType::Boolean,
                        sensitive: false,
                    },
                    SettingKey {
                        key: SETTINGS_DIR,
                        description: "Defines settings directory location.",
                        mandatory: false,
                        default: SettingValue::path(&dirs.config),
                        default_description: Some("`<user config dir>`"),
                        kind: SettingType::String,
                        sensitive: false,
                    },
                ],
            },
            SettingsDomain {
                domain: "Credentials",
                description: "Credentials settings",
                keys: vec![
                    SettingKey {
                        key: CREDENTIALS_STORE_PROVIDER,
                        description: "Credentials store provider (fs|memory).",
                        mandatory: false,
                        default: SettingValue::text("memory"),
                        default_description: None,
                        kind: SettingType::String,
                        sensitive: false,
                    },
                    SettingKey {
                        key: CREDENTIALS_DIR,
                        description: "Defines credentials directory location.",
                        mandatory: false,
                        default: SettingValue::path(&dirs.config.join("credentials")),
                        default_description: Some("`<user config dir>/credentials`"),
                        kind: SettingType::String,
                        sensitive: false,
                    },
                    SettingKey {
                        key: DEFAULT_ACCOUNT,
                        description: "Default account to use for authentication.",
                        mandatory: false,
                        default: SettingValue::Empty,
                        default_description: None,
                        kind: SettingType::String,
                        sensitive: false,
                    },
                ],
            },
        ],
    }]
}

/// Convert a raw environment string into the declared type.
///
/// Absent or empty input yields `fallback`; the literal `null` forces an
/// empty value even when a default exists.
pub fn format_value(
    key: &str,
    input: Option<&str>,
    kind: SettingType,
    fallback: &SettingValue,
) -> Result<SettingValue> {
    let input = match input {
        None | Some("") => return Ok(fallback.clone()),
        Some("null") => return Ok(SettingValue::Empty),
        Some(input) => input,
    };
    match kind {
        SettingType::String => Ok(SettingValue::text(input)),
        SettingType::Boolean => Ok(SettingValue::Flag(input == "true")),
        SettingType::Integer => input
            .trim()
            .parse::<i64>()
            .map(SettingValue::Number)
            .map_err(|err| {
                Error::configuration(format!("{key} expects an integer, got {input:?}"))
                    .with_source(err)
            }),
    }
}

/// Commented `.env` sample covering every key.
pub fn dotenv_sample(specs: &[SettingsCategory]) -> String {
    let mut content = String::new();
    for category in specs {
        let _ = writeln!(content, "# ---");
        let _ = writeln!(content, "# {}", category.category);
        let _ = writeln!(content, "# {}", category.description);
        let _ = writeln!(content, "# ---");
        for domain in &category.domains {
            let _ = writeln!(content);
            let _ = writeln!(content, "# {}", domain.domain);
            let _ = writeln!(content, "# {}", domain.description);
            let _ = writeln!(content);
            for key in &domain.keys {
                let value = if key.mandatory {
                    KEY_PLACEHOLDER.to_string()
                } else {
                    key.default.to_string()
                };
                let _ = writeln!(content, "# {} ({})", key.description, key.kind);
                if key.sensitive {
                    let _ = writeln!(content, "# N.B: This key is flagged as sensitive.");
                }
                let _ = writeln!(content, "{}={value}", key.key);
            }
        }
    }
    content
}

/// Markdown reference of every option, grouped by category and domain.
pub fn configuration_reference(specs: &[SettingsCategory]) -> String {
    let mut content = String::new();
    let _ = writeln!(content, "# Configuration Reference");
    let _ = writeln!(
        content,
        "*Updated: {}*",
        chrono::Utc::now().format("%a, %d %b %Y %H:%M:%S GMT")
    );
    let _ = writeln!(content);
    let _ = writeln!(
        content,
        "This document lists all the configuration options supported by {PRODUCT_NAME}."
    );
    let _ = writeln!(content);
    let _ = writeln!(
        content,
        "Options are grouped by category, then by domain, and each option is specified with:"
    );
    let _ = writeln!(content, "- **Environment Variable**: The corresponding environment variable to be set.");
    let _ = writeln!(content, "- **Description**: Description of the option.");
    let _ = writeln!(content, "- **Type**: The type the environment variable is converted to.");
    let _ = writeln!(content, "- **Default**: Default value if omitted.");
    let _ = writeln!(content, "- **Sensitive**: Sensitive values are never logged.");
    let _ = writeln!(content, "- **Mandatory**: Whether the option is required.");

    for category in specs {
        let _ = writeln!(content);
        let _ = writeln!(content, "## {}", category.category);
        let _ = writeln!(content, "*{}*", category.description);
        for domain in &category.domains {
            let _ = writeln!(content);
            let _ = writeln!(content, "### {}", domain.domain);
            let _ = writeln!(content, "*{}*", domain.description);
            let _ = writeln!(content);
            let _ = writeln!(
                content,
                "| Environment Variable | Description | Type | Default | Sensitive | Mandatory |"
            );
            let _ = writeln!(
                content,
                "|:---------------------|:------------|:-----|:--------|:----------|:----------|"
            );
            for key in &domain.keys {
                let default = match key.default_description {
                    Some(description) => description.to_string(),
                    None => key.default.to_string(),
                };
                let _ = writeln!(
                    content,
                    "| `{}` | {} | {} | {} | {} | {} |",
                    key.key,
                    key.description,
                    key.kind,
                    default,
                    if key.sensitive { "TRUE" } else { "false" },
                    if key.mandatory { "Required" } else { "Optional" },
                );
            }
        }
    }
    content
}
