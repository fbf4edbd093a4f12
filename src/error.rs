//! Error taxonomy for macro loading, action execution and dispatch.
//!
//! Only startup failures are fatal; everything raised while handling an
//! event is logged at the dispatch boundary and the loop keeps running.

use std::path::PathBuf;
use thiserror::Error;

/// Color value could not be turned into a 24-bit RGB value
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ColorError {
    #[error("invalid color format: {0}")]
    InvalidColorFormat(String),
}

/// Errors raised while resolving or parsing a macro file
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file not found: {}", .0.display())]
    ConfigNotFound(PathBuf),

    #[error(
        "no macro config available (looked for {} and {})",
        primary.display(),
        fallback.display()
    )]
    NoConfigAvailable { primary: PathBuf, fallback: PathBuf },

    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("malformed macro entry '{control}': {reason}")]
    MalformedMacroEntry { control: String, reason: String },
}

/// Failure of a single host-side action; never fatal to the engine
#[derive(Debug, Error)]
pub enum ActionError {
    #[error("failed to launch '{target}': {reason}")]
    LaunchFailed { target: String, reason: String },

    #[error("input injection failed: {0}")]
    InputInjectionFailed(String),

    #[error("failed to play '{}': {reason}", path.display())]
    PlaybackFailed { path: PathBuf, reason: String },
}

/// Failures surfaced by the dispatch engine
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("config switch to '{file}' failed (keeping current table): {source}")]
    ConfigSwitchFailed {
        file: String,
        #[source]
        source: ConfigError,
    },

    #[error(transparent)]
    Action(#[from] ActionError),
}
