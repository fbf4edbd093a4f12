//! Macro configuration for the Fire macro runner
//!
//! Handles parsing of macro files into immutable tables, resolution of
//! which file to load, and hot-reloading when the active file changes.

pub mod action;
pub mod store;
pub mod watcher;

use crate::color::{parse_color, ColorValue, RawColor};
use crate::error::ColorError;
use crate::device::ControlId;
use crate::error::ConfigError;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;
use tracing::warn;

pub use action::Action;
pub use store::{ConfigStore, LoadedConfig};
pub use watcher::ConfigWatcher;

/// Root of a macro file as it appears on disk
///
/// Colors stay untyped here so a bad color never rejects the whole file.
#[derive(Debug, Deserialize)]
struct RawMacroFile {
    #[serde(default)]
    default_color: Option<serde_json::Value>,
    control_macros: serde_json::Map<String, serde_json::Value>,
}

/// One `control_macros` value: bare action string or object
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawEntry {
    Bare(String),
    Detailed {
        action: String,
        #[serde(default)]
        color: Option<serde_json::Value>,
    },
}

/// Action bound to a control, with an optional color override
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MacroEntry {
    pub action: Action,
    pub color: Option<ColorValue>,
}

/// Immutable mapping of control ids to macros, built once per load
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MacroTable {
    pub default_color: ColorValue,
    entries: BTreeMap<ControlId, MacroEntry>,
}

impl Default for MacroTable {
    fn default() -> Self {
        Self {
            default_color: ColorValue::WHITE,
            entries: BTreeMap::new(),
        }
    }
}

impl MacroTable {
    /// Parse a macro file. Individual bad entries are dropped with a warning.
    pub fn parse(json: &str, path: &Path) -> Result<Self, ConfigError> {
        let raw: RawMacroFile = serde_json::from_str(json).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;

        let default_color = match raw.default_color {
            None | Some(serde_json::Value::Null) => ColorValue::WHITE,
            Some(value) => color_from_json(value).unwrap_or_else(|e| {
                warn!("{}: default_color {}, using white", path.display(), e);
                ColorValue::WHITE
            }),
        };

        let mut entries = BTreeMap::new();
        for (key, value) in raw.control_macros {
            match parse_entry(&key, value) {
                Ok((id, entry)) => {
                    entries.insert(id, entry);
                }
                Err(e) => warn!("[Config] {}: {}", path.display(), e),
            }
        }

        Ok(Self {
            default_color,
            entries,
        })
    }

    pub fn get(&self, control_id: ControlId) -> Option<&MacroEntry> {
        self.entries.get(&control_id)
    }

    /// Effective LED color for a control, if it has a macro
    pub fn color_for(&self, control_id: ControlId) -> Option<ColorValue> {
        self.get(control_id)
            .map(|entry| entry.color.unwrap_or(self.default_color))
    }

    pub fn control_ids(&self) -> impl Iterator<Item = ControlId> + '_ {
        self.entries.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// JSON number or string to a color; anything else is an invalid format
fn color_from_json(value: serde_json::Value) -> Result<ColorValue, ColorError> {
    let raw: RawColor = serde_json::from_value(value.clone())
        .map_err(|_| ColorError::InvalidColorFormat(value.to_string()))?;
    parse_color(&raw)
}

fn malformed(control: &str, reason: impl Into<String>) -> ConfigError {
    ConfigError::MalformedMacroEntry {
        control: control.to_string(),
        reason: reason.into(),
    }
}

fn parse_entry(key: &str, value: serde_json::Value) -> Result<(ControlId, MacroEntry), ConfigError> {
    let id: ControlId = key
        .trim()
        .parse()
        .map_err(|_| malformed(key, "control id must be a non-negative integer"))?;

    let (action_text, color) = match serde_json::from_value::<RawEntry>(value) {
        Ok(RawEntry::Bare(action)) => (action, None),
        Ok(RawEntry::Detailed { action, color }) => (action, color),
        Err(_) => {
            return Err(malformed(
                key,
                "expected an action string or an object with a string 'action'",
            ))
        }
    };

    let action: Action = action_text.parse().map_err(|e: String| malformed(key, e))?;
    let color = color
        .filter(|c| !c.is_null())
        .map(color_from_json)
        .transpose()
        .map_err(|e| malformed(key, e.to_string()))?;

    Ok((id, MacroEntry { action, color }))
}
