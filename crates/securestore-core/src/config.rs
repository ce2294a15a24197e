//! Storage configuration.
//!
//! Reads the `[storage]` section of a TOML file (by convention
//! `config/default.toml`) and then applies `SECURESTORE_*` environment
//! overrides. A missing file or section yields the defaults; a value of the
//! wrong type or an unknown enum name is a [`StorageError::Config`].
//!
//! ```toml
//! [storage]
//! legacy_service = "SwiftKeychainWrapper"
//! dedicated_service = "cap_sec"
//! backend = "sqlite"        # sqlite | memory | keychain
//! data_dir = "data"
//! presence = "prompt"       # prompt | allow | deny
//! platform = "linux"        # optional override
//! ```

use std::path::{Path, PathBuf};

use crate::error::{Result, StorageError};

/// Default service label of the shared legacy namespace.
pub const DEFAULT_LEGACY_SERVICE: &str = "SwiftKeychainWrapper";

/// Default service label of the dedicated namespace.
pub const DEFAULT_DEDICATED_SERVICE: &str = "cap_sec";

/// Prefix of the environment variables that override file settings.
pub const ENV_PREFIX: &str = "SECURESTORE_";

/// Which credential store backs the namespaces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    /// Encrypted SQLite file under `data_dir`.
    Sqlite,
    /// Process-local, nothing persisted.
    Memory,
    /// The operating system keychain (macOS only).
    Keychain,
}

impl BackendKind {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "sqlite" => Some(Self::Sqlite),
            "memory" => Some(Self::Memory),
            "keychain" => Some(Self::Keychain),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sqlite => "sqlite",
            Self::Memory => "memory",
            Self::Keychain => "keychain",
        }
    }
}

impl Default for BackendKind {
    fn default() -> Self {
        if cfg!(target_os = "macos") {
            Self::Keychain
        } else {
            Self::Sqlite
        }
    }
}

/// How presence checks are answered by backends that cannot ask the OS.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PresencePolicy {
    /// Ask the user interactively (the host supplies the prompt).
    #[default]
    Prompt,
    /// Treat the user as always present.
    Allow,
    /// Treat the user as never present.
    Deny,
}

impl PresencePolicy {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "prompt" => Some(Self::Prompt),
            "allow" => Some(Self::Allow),
            "deny" => Some(Self::Deny),
            _ => None,
        }
    }
}

/// Settings for building a [`SecureStorage`](crate::SecureStorage).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageConfig {
    /// Service label of the legacy shared namespace.
    pub legacy_service: String,
    /// Service label of the dedicated namespace.
    pub dedicated_service: String,
    /// Credential store backend.
    pub backend: BackendKind,
    /// Directory for the SQLite database and master key file.
    pub data_dir: PathBuf,
    /// Presence policy for backends without OS-enforced checks.
    pub presence: PresencePolicy,
    /// Platform identifier override reported by `getPlatform`.
    pub platform: Option<String>,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            legacy_service: DEFAULT_LEGACY_SERVICE.to_string(),
            dedicated_service: DEFAULT_DEDICATED_SERVICE.to_string(),
            backend: BackendKind::default(),
            data_dir: PathBuf::from("data"),
            presence: PresencePolicy::default(),
            platform: None,
        }
    }
}

impl StorageConfig {
    /// Load from `path` and apply environment overrides.
    pub fn load(path: &Path) -> Result<Self> {
        let mut config = Self::from_file(path)?;
        config.apply_overrides(|name| std::env::var(name).ok())?;
        Ok(config)
    }

    /// Load from `path` only. A missing file yields the defaults.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "no config file, using defaults");
                return Ok(Self::default());
            }
            Err(e) => return Err(e.into()),
        };
        Self::from_toml_str(&content)
    }

    /// Parse the `[storage]` section of a TOML document.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let table: toml::Table = content.parse().map_err(|e: toml::de::Error| {
            StorageError::Config {
                reason: e.to_string(),
            }
        })?;

        let mut config = Self::default();
        let storage = match table.get("storage") {
            Some(toml::Value::Table(t)) => t,
            Some(_) => {
                return Err(StorageError::Config {
                    reason: "`storage` must be a table".into(),
                });
            }
            None => return Ok(config),
        };

        for (name, value) in storage {
            let text = value.as_str().ok_or_else(|| StorageError::Config {
                reason: format!("storage.{name} must be a string"),
            })?;
            config.set_field(name, text)?;
        }

        Ok(config)
    }

    /// Apply `SECURESTORE_<FIELD>` overrides fetched through `lookup`.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        for field in [
            "legacy_service",
            "dedicated_service",
            "backend",
            "data_dir",
            "presence",
            "platform",
        ] {
            let var = format!("{ENV_PREFIX}{}", field.to_ascii_uppercase());
            if let Some(value) = lookup(&var).filter(|v| !v.trim().is_empty()) {
                tracing::debug!(var = %var, "config override from environment");
                self.set_field(field, value.trim())?;
            }
        }
        Ok(())
    }

    fn set_field(&mut self, name: &str, value: &str) -> Result<()> {
        match name {
            "legacy_service" => self.legacy_service = value.to_string(),
            "dedicated_service" => self.dedicated_service = value.to_string(),
            "backend" => {
                self.backend = BackendKind::parse(value).ok_or_else(|| StorageError::Config {
                    reason: format!("unknown backend `{value}`"),
                })?;
            }
            "data_dir" => self.data_dir = PathBuf::from(value),
            "presence" => {
                self.presence =
                    PresencePolicy::parse(value).ok_or_else(|| StorageError::Config {
                        reason: format!("unknown presence policy `{value}`"),
                    })?;
            }
            "platform" => self.platform = Some(value.to_string()),
            other => tracing::warn!(key = other, "ignoring unknown storage setting"),
        }
        Ok(())
    }

    /// Platform identifier reported to callers.
    pub fn platform_name(&self) -> String {
        self.platform
            .clone()
            .unwrap_or_else(|| std::env::consts::OS.to_string())
    }
}
