//! Application path management.
//!
//! All user files live in one config directory:
//!
//! - `default_macros.json`: the preferred macro table
//! - `macros_config.json`: shipped defaults, copied to the preferred file on first run
//! - `midi_config.json`: the remembered controller
//! - `logs/`: daily log files
//!
//! ## Directory Detection
//!
//! 1. `--config-dir` when given.
//! 2. The current working directory when it already holds one of the files
//!    above (running from a checkout or a portable folder).
//! 3. Otherwise `<config dir>/Fire Macro Runner` (`%APPDATA%` on Windows,
//!    `~/.config` on Linux).

use anyhow::Context;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Application name used for the per-user directory
const APP_NAME: &str = "Fire Macro Runner";

pub const PRIMARY_MACROS: &str = "default_macros.json";
pub const FALLBACK_MACROS: &str = "macros_config.json";
pub const DEVICE_FILE: &str = "midi_config.json";

/// Resolved locations of config, device and log files.
#[derive(Debug, Clone)]
pub struct AppPaths {
    /// Directory holding the macro and device files
    pub config_dir: PathBuf,
    /// Path to the remembered device record
    pub device_file: PathBuf,
    /// Path to the logs directory
    pub logs_dir: PathBuf,
}

impl AppPaths {
    /// Build paths rooted at an explicit directory
    pub fn in_dir(dir: impl Into<PathBuf>) -> Self {
        let config_dir = dir.into();
        Self {
            device_file: config_dir.join(DEVICE_FILE),
            logs_dir: config_dir.join("logs"),
            config_dir,
        }
    }

    /// Pick the config directory for this run.
    ///
    /// Note: This is called before logging is initialized, so we use eprintln
    /// for early diagnostic output.
    pub fn detect(explicit: Option<&Path>) -> Self {
        if let Some(dir) = explicit {
            return Self::in_dir(dir);
        }

        let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
        if holds_app_files(&cwd) {
            #[cfg(debug_assertions)]
            eprintln!("[paths] Using working directory: {}", cwd.display());
            return Self::in_dir(cwd);
        }

        let base = dirs::config_dir().unwrap_or_else(|| {
            eprintln!("[paths] WARNING: no per-user config directory, using working directory");
            cwd.clone()
        });
        Self::in_dir(base.join(APP_NAME))
    }

    /// Ensure the config and logs directories exist.
    pub fn ensure_directories(&self) -> anyhow::Result<()> {
        for dir in [&self.config_dir, &self.logs_dir] {
            if !dir.exists() {
                debug!("Creating directory: {}", dir.display());
                std::fs::create_dir_all(dir)
                    .with_context(|| format!("Failed to create {}", dir.display()))?;
            }
        }
        Ok(())
    }
}

fn holds_app_files(dir: &Path) -> bool {
    [PRIMARY_MACROS, FALLBACK_MACROS, DEVICE_FILE]
        .iter()
        .any(|name| dir.join(name).is_file())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_explicit_dir_wins() {
        let dir = TempDir::new().unwrap();
        let paths = AppPaths::detect(Some(dir.path()));

        assert_eq!(paths.config_dir, dir.path());
        assert_eq!(paths.device_file, dir.path().join("midi_config.json"));
        assert_eq!(paths.logs_dir, dir.path().join("logs"));
    }

    #[test]
    fn test_app_file_detection() {
        let dir = TempDir::new().unwrap();
        assert!(!holds_app_files(dir.path()));

        std::fs::write(dir.path().join(FALLBACK_MACROS), "{}").unwrap();
        assert!(holds_app_files(dir.path()));
    }

    #[test]
    fn test_ensure_directories() {
        let dir = TempDir::new().unwrap();
        let paths = AppPaths::in_dir(dir.path().join("nested"));

        paths.ensure_directories().unwrap();
        assert!(paths.logs_dir.is_dir());
    }
}
