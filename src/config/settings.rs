//! Configuration structures for deserialisation.
//!
//! These structures map directly to the JSON configuration file format.

use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Root configuration structure.
///
/// This is the top-level structure that matches the JSON config file.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Config file format version.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,

    /// Configured identities, in file order.
    #[serde(default)]
    pub identities: IndexMap<String, Identity>,

    /// Global settings.
    #[serde(default)]
    pub settings: Settings,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Returns `true` if nothing was configured.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.version.is_none() && self.identities.is_empty()
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if any validation checks fail.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, identity) in &self.identities {
            if name.trim().is_empty() {
                return Err(ConfigError::ValidationError {
                    message: "identity names must not be empty".to_string(),
                });
            }
            if !identity.email.contains('@') {
                return Err(ConfigError::ValidationError {
                    message: format!("identity '{name}' has an invalid email address"),
                });
            }
        }

        if let Some(ref provider) = self.settings.default_provider {
            if Provider::parse(provider).is_none() {
                return Err(ConfigError::ValidationError {
                    message: format!(
                        "Invalid default provider '{provider}'. Must be one of: {}",
                        Provider::NAMES.join(", ")
                    ),
                });
            }
        }

        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.to_lowercase().as_str()) {
            return Err(ConfigError::ValidationError {
                message: format!(
                    "Invalid log level '{}'. Must be one of: {}",
                    self.logging.level,
                    valid_levels.join(", ")
                ),
            });
        }

        Ok(())
    }
}

/// Git hosting provider an identity belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    /// github.com or GitHub Enterprise.
    Github,
    /// gitlab.com or a self-hosted GitLab.
    Gitlab,
    /// Bitbucket.
    Bitbucket,
    /// Any other SSH-reachable git host.
    Custom,
}

impl Provider {
    /// Accepted provider names.
    pub const NAMES: [&'static str; 4] = ["github", "gitlab", "bitbucket", "custom"];

    /// Parses a provider name, ignoring case.
    #[must_use]
    pub fn parse(name: &str) -> Option<Self> {
        match name.to_lowercase().as_str() {
            "github" => Some(Self::Github),
            "gitlab" => Some(Self::Gitlab),
            "bitbucket" => Some(Self::Bitbucket),
            "custom" => Some(Self::Custom),
            _ => None,
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Github => "github",
            Self::Gitlab => "gitlab",
            Self::Bitbucket => "bitbucket",
            Self::Custom => "custom",
        })
    }
}

/// A single git identity.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Identity {
    /// Hosting provider.
    pub provider: Provider,

    /// SSH host alias used in remotes (e.g. `gitlab-work`).
    pub host: String,

    /// Real hostname behind the alias.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hostname: Option<String>,

    /// Account user name.
    pub user: String,

    /// Commit email address.
    pub email: String,

    /// SSH private key path; `~` is expanded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub identity_file: Option<String>,

    /// GPG signing settings.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gpg: Option<GpgConfig>,
}

/// Per-identity GPG signing settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GpgConfig {
    /// Signing key id.
    pub key_id: String,

    /// Sign commits with this key.
    #[serde(default)]
    pub sign_commits: bool,
}

/// Global settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    /// Provider assumed when one cannot be detected.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_provider: Option<String>,

    /// Detect the identity from the repository remote.
    #[serde(default = "default_true")]
    pub auto_detect: bool,

    /// Store tokens in the OS keychain.
    #[serde(default)]
    pub use_keychain: bool,

    /// Sign commits with GPG when the identity has a key.
    #[serde(default)]
    pub gpg_sign: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            default_provider: None,
            auto_detect: default_true(),
            use_keychain: false,
            gpg_sign: false,
        }
    }
}

const fn default_true() -> bool {
    true
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "warn".to_string()
}
