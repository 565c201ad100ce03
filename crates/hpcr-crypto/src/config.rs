//! External tool configuration.
//!
//! Reads the OpenSSL binary location from the environment.

use std::env;
use std::path::PathBuf;

/// Environment variable naming the OpenSSL binary.
pub const OPENSSL_BIN_ENV: &str = "OPENSSL_BIN";

/// Binary looked up on the search path when [`OPENSSL_BIN_ENV`] is unset.
pub const DEFAULT_OPENSSL: &str = "openssl";

/// Configuration for the OpenSSL-backed implementation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenSslConfig {
    /// Path or bare name of the `openssl` executable.
    pub binary: PathBuf,
    /// Directory for key and payload hand-over files; the system temporary
    /// directory when `None`.
    pub temp_dir: Option<PathBuf>,
}

impl OpenSslConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Load configuration from an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let binary = lookup(OPENSSL_BIN_ENV)
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_OPENSSL.to_string());
        Self {
            binary: PathBuf::from(binary),
            temp_dir: None,
        }
    }

    pub fn with_binary(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
            temp_dir: None,
        }
    }

    pub fn temp_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.temp_dir = Some(dir.into());
        self
    }
}

impl Default for OpenSslConfig {
    fn default() -> Self {
        Self::from_env()
    }
}
