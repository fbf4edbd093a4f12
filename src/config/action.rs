//! Action string grammar
//!
//! `RUN|`, `TYPE|`, `SOUND|` and `CONFIG|` select a kind (case-insensitive,
//! payload is everything after the first `|`); anything else is a key combo.

use crate::keys::KeyCombo;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// Parsed macro action
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    KeyCombo(KeyCombo),
    /// Program, file, folder or URL
    Run(String),
    Type(String),
    Sound(PathBuf),
    /// Macro file to switch to
    ConfigSwitch(String),
}

impl Action {
    /// Short kind name used in logs
    pub fn kind(&self) -> &'static str {
        match self {
            Action::KeyCombo(_) => "key",
            Action::Run(_) => "run",
            Action::Type(_) => "type",
            Action::Sound(_) => "sound",
            Action::ConfigSwitch(_) => "config",
        }
    }
}

impl FromStr for Action {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Some((prefix, payload)) = s.split_once('|') {
            let kind = prefix.trim().to_ascii_uppercase();
            if matches!(kind.as_str(), "RUN" | "TYPE" | "SOUND" | "CONFIG") {
                // Typed text keeps its whitespace; paths and names don't
                let payload = if kind == "TYPE" { payload } else { payload.trim() };
                if payload.is_empty() {
                    return Err(format!("{}| needs a payload", kind));
                }
                let action = match kind.as_str() {
                    "RUN" => Action::Run(payload.to_string()),
                    "TYPE" => Action::Type(payload.to_string()),
                    "SOUND" => Action::Sound(PathBuf::from(payload)),
                    _ => Action::ConfigSwitch(payload.to_string()),
                };
                return Ok(action);
            }
        }

        s.parse::<KeyCombo>().map(Action::KeyCombo)
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::KeyCombo(combo) => write!(f, "{}", combo),
            Action::Run(target) => write!(f, "RUN|{}", target),
            Action::Type(text) => write!(f, "TYPE|{}", text),
            Action::Sound(path) => write!(f, "SOUND|{}", path.display()),
            Action::ConfigSwitch(file) => write!(f, "CONFIG|{}", file),
        }
    }
}
