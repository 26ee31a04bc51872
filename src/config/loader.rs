//! Reading rule configs from TOML.
//!
//! A config loaded from a file has a relative `[meta].root` resolved against
//! the file's own directory, so a rule file can sit next to the themes it
//! patches and be used from anywhere.

use crate::config::schema::{ThemeConfig, ValidationError};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read theme config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed theme config: {0}")]
    Toml(#[from] toml_edit::de::Error),

    #[error("invalid theme config: {0}")]
    Validation(#[from] ValidationError),

    #[error("{path}: {source}")]
    InFile {
        path: PathBuf,
        #[source]
        source: Box<ConfigError>,
    },
}

impl ConfigError {
    fn in_file(self, path: &Path) -> Self {
        match self {
            ConfigError::Io { .. } | ConfigError::InFile { .. } => self,
            other => ConfigError::InFile {
                path: path.to_path_buf(),
                source: Box::new(other),
            },
        }
    }

    /// The validation issues behind this error, if validation is what failed.
    pub fn validation(&self) -> Option<&ValidationError> {
        match self {
            ConfigError::Validation(error) => Some(error),
            ConfigError::InFile { source, .. } => source.validation(),
            _ => None,
        }
    }
}

/// Parse and validate a config. Paths are kept exactly as written.
pub fn load_from_str(input: &str) -> Result<ThemeConfig, ConfigError> {
    let config: ThemeConfig = toml_edit::de::from_str(input)?;
    config.validate()?;
    Ok(config)
}

pub fn load_from_path(path: impl AsRef<Path>) -> Result<ThemeConfig, ConfigError> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let mut config = load_from_str(&contents).map_err(|error| error.in_file(path))?;

    if let Some(base) = path.parent() {
        config.meta.root = config.meta.root.map(|root| resolve_root(base, root));
    }
    Ok(config)
}

/// Absolute and `~` roots are left alone.
fn resolve_root(base: &Path, root: PathBuf) -> PathBuf {
    if root.is_absolute() || root.starts_with("~") || base.as_os_str().is_empty() {
        root
    } else {
        base.join(root)
    }
}
