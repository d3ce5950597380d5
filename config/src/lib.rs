//! Configuration for contract enforcement.
//!
//! ```toml
//! [contracts]
//! enabled = true
//! value_preview_chars = 120
//! ```
//!
//! The file lives at `~/.covenant/config.toml`. `COVENANT_CONTRACTS=off`
//! disables enforcement regardless of the file. [`ContractSettings::resolve`]
//! combines both into the settings a wrapper should run with.

use std::env;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

/// Environment variable that overrides [`ContractSettings::enabled`].
pub const CONTRACTS_ENV: &str = "COVENANT_CONTRACTS";

const DEFAULT_PREVIEW_CHARS: usize = 120;

/// Serde helper for fields that default to `true`.
#[must_use]
pub const fn default_true() -> bool {
    true
}

const fn default_preview_chars() -> usize {
    DEFAULT_PREVIEW_CHARS
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config at {path:?}: {source}")]
    Read { path: PathBuf, source: io::Error },
    #[error("failed to parse config at {path:?}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("failed to parse config: {0}")]
    Syntax(#[from] toml::de::Error),
}

/// Top-level config file.
#[derive(Debug, Default, Deserialize)]
pub struct CovenantConfig {
    pub contracts: Option<ContractSettings>,
}

/// How wrapped functions enforce their contracts.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ContractSettings {
    /// When false, wrapped functions skip every check.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Upper bound on the rendered value in violation messages.
    #[serde(default = "default_preview_chars")]
    pub value_preview_chars: usize,
}

impl Default for ContractSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            value_preview_chars: DEFAULT_PREVIEW_CHARS,
        }
    }
}

impl ContractSettings {
    /// Settings from the user config file, then the environment override.
    #[must_use]
    pub fn resolve() -> Self {
        CovenantConfig::load().unwrap_or_default().contract_settings()
    }

    /// Apply an override value (`on`/`off` and the usual spellings).
    ///
    /// Unrecognized values are ignored with a warning.
    #[must_use]
    pub fn apply_override(mut self, value: Option<&str>) -> Self {
        let Some(raw) = value else {
            return self;
        };
        match raw.trim().to_ascii_lowercase().as_str() {
            "on" | "1" | "true" | "enabled" => self.enabled = true,
            "off" | "0" | "false" | "disabled" => self.enabled = false,
            _ => {
                tracing::warn!(
                    variable = CONTRACTS_ENV,
                    value = raw,
                    "Ignoring unrecognized contract override"
                );
            }
        }
        self
    }
}

impl CovenantConfig {
    /// Load the user config, if present.
    ///
    /// Read and parse failures are logged and treated as "no config".
    pub fn load() -> Option<Self> {
        Self::load_from_path(&config_path()?)
    }

    /// Like [`CovenantConfig::load`] for an explicit path.
    pub fn load_from_path(path: &Path) -> Option<Self> {
        if !path.exists() {
            return None;
        }

        match Self::load_from(path) {
            Ok(config) => Some(config),
            Err(err) => {
                tracing::warn!("{err}");
                None
            }
        }
    }

    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    pub fn path() -> Option<PathBuf> {
        config_path()
    }

    /// Effective contract settings: file values (or defaults), then the
    /// environment override.
    #[must_use]
    pub fn contract_settings(&self) -> ContractSettings {
        let value = env::var(CONTRACTS_ENV).ok();
        self.contract_settings_with(value.as_deref())
    }

    /// Effective contract settings for an explicit override value.
    #[must_use]
    pub fn contract_settings_with(&self, env_value: Option<&str>) -> ContractSettings {
        self.contracts
            .clone()
            .unwrap_or_default()
            .apply_override(env_value)
    }
}

fn config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".covenant").join("config.toml"))
}
