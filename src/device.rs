//! Device adapter seam
//!
//! The engine only sees normalized [`ControlEvent`]s coming in and
//! [`DeviceColorCommand`]s going out. Port discovery and the persisted
//! device choice live here too.

use crate::color::{DeviceColorCommand, SurfaceProfile};
use anyhow::{Context, Result};
use async_trait::async_trait;
use midir::{MidiInput, MidiOutput};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Instant;
use tokio::fs;
use tracing::info;

/// Identifier of a pad, button or knob on the surface
pub type ControlId = u32;

/// One physical button transition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControlEvent {
    pub control_id: ControlId,
    pub pressed: bool,
    pub timestamp: Instant,
}

impl ControlEvent {
    pub fn press(control_id: ControlId) -> Self {
        Self {
            control_id,
            pressed: true,
            timestamp: Instant::now(),
        }
    }

    pub fn release(control_id: ControlId) -> Self {
        Self {
            control_id,
            pressed: false,
            timestamp: Instant::now(),
        }
    }
}

/// Illumination sink implemented by surface drivers
///
/// Takes `&self` so the engine can hold it as `Arc<dyn Surface>`;
/// implementations use interior mutability for connection state.
#[async_trait]
pub trait Surface: Send + Sync {
    /// Driver name for logs (e.g. "fire", "generic")
    fn name(&self) -> &str;

    /// LED layout used to encode colors for this surface
    fn profile(&self) -> SurfaceProfile;

    /// Push one illumination command. `NoOp` must be accepted silently.
    async fn set_illumination(&self, control_id: ControlId, command: DeviceColorCommand) -> Result<()>;
}

/// Persisted device choice (`midi_config.json`)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device_name: Option<String>,
}

impl DeviceRecord {
    /// Load the record; a missing or unreadable file yields an empty record
    pub async fn load(path: &Path) -> Self {
        let contents = match fs::read_to_string(path).await {
            Ok(contents) => contents,
            Err(_) => return Self::default(),
        };
        match serde_json::from_str(&contents) {
            Ok(record) => record,
            Err(e) => {
                tracing::warn!("[Config] Could not read {}: {}", path.display(), e);
                Self::default()
            }
        }
    }

    pub async fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self).context("Failed to serialize device record")?;
        fs::write(path, json)
            .await
            .with_context(|| format!("Failed to write {}", path.display()))?;
        info!("[Config] Saved {}", path.display());
        Ok(())
    }
}

/// List available MIDI input ports
pub fn list_input_ports() -> Result<Vec<String>> {
    let midi_in = MidiInput::new("Fire-Macro-Scanner")?;
    Ok(midi_in
        .ports()
        .iter()
        .filter_map(|port| midi_in.port_name(port).ok())
        .collect())
}

/// List available MIDI output ports
pub fn list_output_ports() -> Result<Vec<String>> {
    let midi_out = MidiOutput::new("Fire-Macro-Scanner")?;
    Ok(midi_out
        .ports()
        .iter()
        .filter_map(|port| midi_out.port_name(port).ok())
        .collect())
}

/// Case-insensitive substring match, the way port names vary across OSes
pub fn port_matches(port_name: &str, pattern: &str) -> bool {
    port_name.to_lowercase().contains(&pattern.to_lowercase())
}

/// Print discovered ports for `--list-ports`
pub fn print_ports() {
    println!("\n=== MIDI Input Ports ===");
    match list_input_ports() {
        Ok(ports) => {
            for (i, name) in ports.iter().enumerate() {
                println!("  [{}] {}", i, name);
            }
        }
        Err(e) => println!("  (unavailable: {})", e),
    }

    println!("\n=== MIDI Output Ports ===");
    match list_output_ports() {
        Ok(ports) => {
            for (i, name) in ports.iter().enumerate() {
                println!("  [{}] {}", i, name);
            }
        }
        Err(e) => println!("  (unavailable: {})", e),
    }
    println!();
}
