//! Secret store backends.
//!
//! - `FileSecretStore` reads parameters from a TOML file of
//!   `"name" = "value"` pairs, re-read on every lookup so rotated values are
//!   picked up without a restart.
//! - `EnvSecretStore` resolves parameter names as environment variables.

use std::path::{Path, PathBuf};

use async_trait::async_trait;

use lexq_core::error::LexqError;
use lexq_core::services::SecretStore;

/// Secret store backed by a TOML parameter file.
#[derive(Debug, Clone)]
pub struct FileSecretStore {
    path: PathBuf,
}

impl FileSecretStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl SecretStore for FileSecretStore {
    async fn get_parameter(&self, name: &str) -> Result<String, LexqError> {
        let content = tokio::fs::read_to_string(&self.path).await.map_err(|e| {
            LexqError::Secret(format!(
                "failed to read {}: {}",
                self.path.display(),
                e
            ))
        })?;

        let table: toml::Table = toml::from_str(&content).map_err(|e| {
            LexqError::Secret(format!(
                "failed to parse {}: {}",
                self.path.display(),
                e
            ))
        })?;

        match table.get(name) {
            Some(toml::Value::String(value)) => Ok(value.clone()),
            Some(_) => Err(LexqError::Secret(format!(
                "parameter '{}' is not a string",
                name
            ))),
            None => Err(LexqError::SecretNotFound {
                name: name.to_string(),
            }),
        }
    }
}

/// Secret store resolving parameters from the process environment.
#[derive(Debug, Default, Clone, Copy)]
pub struct EnvSecretStore;

#[async_trait]
impl SecretStore for EnvSecretStore {
    async fn get_parameter(&self, name: &str) -> Result<String, LexqError> {
        std::env::var(name).map_err(|_| LexqError::SecretNotFound {
            name: name.to_string(),
        })
    }
}
