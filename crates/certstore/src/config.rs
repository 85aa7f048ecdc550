//! Store configuration.
//!
//! An explicit [`StoreConfig`] is passed to each directory at
//! construction time; there is no process-wide configuration
//! singleton. Defaults follow the conventional PKI layout, with the
//! root prefix supporting alternate install roots (for example a
//! mounted system image during installation).

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::paths::PathResolver;

/// Errors from loading configuration.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("failed to read configuration: {0}")]
    Io(#[from] std::io::Error),

    /// The configuration did not parse as TOML.
    #[error("failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),
}

fn default_root() -> PathBuf {
    PathBuf::from("/")
}

fn default_product_cert_dir() -> PathBuf {
    PathBuf::from("/etc/pki/product")
}

fn default_entitlement_cert_dir() -> PathBuf {
    PathBuf::from("/etc/pki/entitlement")
}

/// Filesystem locations of the certificate directories.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Root prefix every path is resolved under.
    #[serde(default = "default_root")]
    pub root: PathBuf,

    /// Directory holding installed product certificates.
    #[serde(default = "default_product_cert_dir")]
    pub product_cert_dir: PathBuf,

    /// Directory holding entitlement certificates and their keys.
    #[serde(default = "default_entitlement_cert_dir")]
    pub entitlement_cert_dir: PathBuf,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            root: default_root(),
            product_cert_dir: default_product_cert_dir(),
            entitlement_cert_dir: default_entitlement_cert_dir(),
        }
    }
}

impl StoreConfig {
    /// Loads configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Parses configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] if the TOML is invalid.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// The path resolver for the configured root.
    #[must_use]
    pub fn resolver(&self) -> PathResolver {
        PathResolver::new(&self.root)
    }
}
