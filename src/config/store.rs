//! Macro file resolution
//!
//! Explicit names load exactly that file. Otherwise the primary file is
//! used, bootstrapped once from the fallback file on first run.

use super::MacroTable;
use crate::error::ConfigError;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::info;

/// A parsed table and the file it came from
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub path: PathBuf,
    pub table: MacroTable,
}

impl LoadedConfig {
    /// File name for display and for matching watcher events
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.path.display().to_string())
    }
}

/// Resolves macro file names against a config directory
#[derive(Debug, Clone)]
pub struct ConfigStore {
    dir: PathBuf,
    primary: PathBuf,
    fallback: PathBuf,
}

impl ConfigStore {
    pub fn new(dir: impl Into<PathBuf>, primary: impl AsRef<Path>, fallback: impl AsRef<Path>) -> Self {
        let dir = dir.into();
        Self {
            primary: dir.join(primary),
            fallback: dir.join(fallback),
            dir,
        }
    }

    /// Resolve a name relative to the config directory (absolute paths pass through)
    pub fn resolve(&self, name: &str) -> PathBuf {
        let path = Path::new(name);
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.dir.join(path)
        }
    }

    /// Load a macro table by name, or via primary/fallback resolution when `None`
    pub async fn load(&self, name: Option<&str>) -> Result<LoadedConfig, ConfigError> {
        let path = match name {
            Some(name) => {
                let path = self.resolve(name);
                if !exists(&path).await {
                    return Err(ConfigError::ConfigNotFound(path));
                }
                path
            }
            None => self.bootstrap().await?,
        };

        let contents = fs::read_to_string(&path)
            .await
            .map_err(|source| ConfigError::Io {
                path: path.clone(),
                source,
            })?;
        let table = MacroTable::parse(&contents, &path)?;

        info!(
            "[Config] Loaded {} macro(s) from {}",
            table.len(),
            path.display()
        );
        Ok(LoadedConfig { path, table })
    }

    /// Pick the primary file, copying the fallback into place on first run
    async fn bootstrap(&self) -> Result<PathBuf, ConfigError> {
        if exists(&self.primary).await {
            info!("[Config] Using preferred configuration: {}", self.primary.display());
            return Ok(self.primary.clone());
        }

        if exists(&self.fallback).await {
            info!(
                "[Config] {} not found, creating it from {}",
                self.primary.display(),
                self.fallback.display()
            );
            fs::copy(&self.fallback, &self.primary)
                .await
                .map_err(|source| ConfigError::Io {
                    path: self.primary.clone(),
                    source,
                })?;
            return Ok(self.primary.clone());
        }

        Err(ConfigError::NoConfigAvailable {
            primary: self.primary.clone(),
            fallback: self.fallback.clone(),
        })
    }
}

async fn exists(path: &Path) -> bool {
    fs::try_exists(path).await.unwrap_or(false)
}
