//! Error types for remote-juggler.
//!
//! Configuration errors are fatal at startup. Application error codes are
//! the positive code space (1001-1007) that tool collaborators use to label
//! domain failures; the MCP core only formats them.

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur during configuration operations.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Configuration file could not be read.
    #[error("failed to read configuration file: {path}")]
    ReadError {
        /// Path to the configuration file.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// Configuration file could not be parsed.
    #[error("failed to parse configuration file: {path}")]
    ParseError {
        /// Path to the configuration file.
        path: PathBuf,
        /// The underlying JSON error.
        #[source]
        source: serde_json::Error,
    },

    /// Configuration file not found.
    #[error("configuration file not found: {path}")]
    NotFound {
        /// Path where the configuration file was expected.
        path: PathBuf,
    },

    /// Configuration validation failed.
    #[error("configuration validation failed: {message}")]
    ValidationError {
        /// Description of the validation failure.
        message: String,
    },
}

/// Application error codes surfaced by identity, credential and provider
/// collaborators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AppErrorCode {
    /// The named identity is not configured.
    IdentityNotFound,
    /// SSH key or host validation failed.
    SshValidationFailed,
    /// A git command failed.
    GitOperationFailed,
    /// The configuration is missing or invalid.
    ConfigError,
    /// Keychain access failed.
    KeychainError,
    /// GPG key lookup or signing setup failed.
    GpgError,
    /// The provider CLI (`gh`, `glab`) failed.
    ProviderCliError,
}

impl AppErrorCode {
    /// Every application code, in numeric order.
    pub const ALL: [Self; 7] = [
        Self::IdentityNotFound,
        Self::SshValidationFailed,
        Self::GitOperationFailed,
        Self::ConfigError,
        Self::KeychainError,
        Self::GpgError,
        Self::ProviderCliError,
    ];

    /// Returns the numeric code.
    #[must_use]
    pub const fn code(self) -> i32 {
        match self {
            Self::IdentityNotFound => 1001,
            Self::SshValidationFailed => 1002,
            Self::GitOperationFailed => 1003,
            Self::ConfigError => 1004,
            Self::KeychainError => 1005,
            Self::GpgError => 1006,
            Self::ProviderCliError => 1007,
        }
    }

    /// Returns the display string for this code.
    #[must_use]
    pub const fn message(self) -> &'static str {
        match self {
            Self::IdentityNotFound => "Identity not found",
            Self::SshValidationFailed => "SSH validation failed",
            Self::GitOperationFailed => "Git operation failed",
            Self::ConfigError => "Configuration error",
            Self::KeychainError => "Keychain error",
            Self::GpgError => "GPG error",
            Self::ProviderCliError => "Provider CLI error",
        }
    }
}

impl fmt::Display for AppErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_error_display() {
        let error = ConfigError::NotFound {
            path: PathBuf::from("/path/to/config.json"),
        };
        let msg = error.to_string();
        assert!(msg.contains("not found"));
        assert!(msg.contains("config.json"));
    }

    #[test]
    fn validation_error_display() {
        let error = ConfigError::ValidationError {
            message: "invalid setting".to_string(),
        };
        let msg = error.to_string();
        assert!(msg.contains("invalid setting"));
    }

    #[test]
    fn app_codes_are_contiguous() {
        let codes: Vec<i32> = AppErrorCode::ALL.iter().map(|c| c.code()).collect();
        assert_eq!(codes, (1001..=1007).collect::<Vec<_>>());
    }

    #[test]
    fn app_code_display() {
        assert_eq!(AppErrorCode::ProviderCliError.to_string(), "Provider CLI error");
    }
}
