//! Akai Fire surface driver
//!
//! Handles MIDI communication with the controller: pad/button presses in,
//! RGB pad SysEx and palette button CCs out. Non-Fire controllers use the
//! same driver with the generic profile, which never lights anything.

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use midir::{MidiInput, MidiInputConnection, MidiInputPort, MidiOutput, MidiOutputConnection, MidiOutputPort};
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::color::{DeviceColorCommand, SurfaceProfile, PAD_END, PAD_START};
use crate::device::{port_matches, ControlEvent, ControlId, Surface};
use crate::midi::{format_hex, MidiMessage, MSGID_SET_RGB_PAD_LED_STATE};

/// CC that switches every button LED off
const CC_ALL_LEDS_OFF: u8 = 0x7F;

/// Surface driver for the Fire (or a generic pad controller)
pub struct FireSurface {
    /// MIDI input connection (kept alive for the callback)
    input_conn: Mutex<Option<MidiInputConnection<()>>>,

    /// MIDI output connection, absent for input-only generic controllers
    output_conn: Mutex<Option<MidiOutputConnection>>,

    event_tx: mpsc::Sender<ControlEvent>,
    event_rx: Option<mpsc::Receiver<ControlEvent>>,

    profile: SurfaceProfile,

    /// Port name pattern (substring, case-insensitive)
    port_name: String,
}

impl FireSurface {
    pub fn new(port_name: impl Into<String>, profile: SurfaceProfile) -> Self {
        let (event_tx, event_rx) = mpsc::channel(1000);
        Self {
            input_conn: Mutex::new(None),
            output_conn: Mutex::new(None),
            event_tx,
            event_rx: Some(event_rx),
            profile,
            port_name: port_name.into(),
        }
    }

    fn find_input_port(midi_in: &MidiInput, pattern: &str) -> Option<(MidiInputPort, String)> {
        for port in midi_in.ports() {
            if let Ok(name) = midi_in.port_name(&port) {
                if port_matches(&name, pattern) {
                    debug!("Found port '{}' matching pattern '{}'", name, pattern);
                    return Some((port, name));
                }
            }
        }
        None
    }

    fn find_output_port(midi_out: &MidiOutput, pattern: &str) -> Option<(MidiOutputPort, String)> {
        for port in midi_out.ports() {
            if let Ok(name) = midi_out.port_name(&port) {
                if port_matches(&name, pattern) {
                    debug!("Found port '{}' matching pattern '{}'", name, pattern);
                    return Some((port, name));
                }
            }
        }
        None
    }

    /// Open the input and output ports and reset the LEDs
    pub fn connect(&mut self) -> Result<()> {
        self.disconnect();

        info!("Connecting to '{}' ({:?} profile)", self.port_name, self.profile);

        let midi_in = MidiInput::new("Fire-Macro-Input").context("Failed to create MIDI input")?;
        let (in_port, in_name) = Self::find_input_port(&midi_in, &self.port_name)
            .ok_or_else(|| anyhow!("Input port '{}' not found", self.port_name))?;

        info!("Connecting to input port: {}", in_name);

        let event_tx = self.event_tx.clone();
        let input_conn = midi_in
            .connect(
                &in_port,
                "Fire-Macro-Runner",
                move |_timestamp, data, _| {
                    let event = match MidiMessage::parse(data) {
                        Some(MidiMessage::NoteOn { note, .. }) => ControlEvent::press(note as ControlId),
                        Some(MidiMessage::NoteOff { note, .. }) => ControlEvent::release(note as ControlId),
                        _ => {
                            debug!("Ignoring MIDI: {}", format_hex(data));
                            return;
                        }
                    };
                    // Never block the MIDI thread
                    if event_tx.try_send(event).is_err() {
                        warn!("Event queue full, dropping control {}", event.control_id);
                    }
                },
                (),
            )
            .map_err(|e| anyhow!("Failed to connect to input port: {}", e))?;
        *self.input_conn.lock() = Some(input_conn);

        let midi_out = MidiOutput::new("Fire-Macro-Output").context("Failed to create MIDI output")?;
        match Self::find_output_port(&midi_out, &self.port_name) {
            Some((out_port, out_name)) => {
                info!("Connecting to output port: {}", out_name);
                let output_conn = midi_out
                    .connect(&out_port, "Fire-Macro-Runner")
                    .map_err(|e| anyhow!("Failed to connect to output port: {}", e))?;
                *self.output_conn.lock() = Some(output_conn);
            }
            None if self.profile == SurfaceProfile::Generic => {
                info!("No output port for '{}', running without LED feedback", self.port_name);
            }
            None => return Err(anyhow!("Output port '{}' not found", self.port_name)),
        }

        if self.profile == SurfaceProfile::Fire {
            self.reset_leds()?;
        }

        info!("Surface connected");
        Ok(())
    }

    pub fn disconnect(&mut self) {
        let had_input = self.input_conn.lock().take().is_some();
        if let Some(conn) = self.output_conn.lock().take() {
            conn.close();
        }
        if had_input {
            info!("Surface disconnected");
        }
    }

    /// Take the event receiver (for the dispatch loop to consume)
    pub fn take_event_receiver(&mut self) -> Option<mpsc::Receiver<ControlEvent>> {
        self.event_rx.take()
    }

    /// Turn off all button LEDs and blank the pad grid
    fn reset_leds(&self) -> Result<()> {
        self.send(&MidiMessage::ControlChange {
            channel: 0,
            cc: CC_ALL_LEDS_OFF,
            value: 0,
        })?;

        let pads = (PAD_END - PAD_START + 1) as u8;
        let payload: Vec<u8> = (0..pads).flat_map(|pad| [pad, 0, 0, 0]).collect();
        self.send(&MidiMessage::fire_sysex(MSGID_SET_RGB_PAD_LED_STATE, &payload))
    }

    fn send(&self, message: &MidiMessage) -> Result<()> {
        let mut guard = self.output_conn.lock();
        let conn = guard
            .as_mut()
            .ok_or_else(|| anyhow!("Not connected to output port"))?;

        let data = message.encode();
        conn.send(&data)
            .map_err(|e| anyhow!("Failed to send MIDI message: {}", e))?;
        debug!("Sent: {} | {}", format_hex(&data), message);
        Ok(())
    }
}

/// Wire message for an illumination command
pub fn illumination_message(command: DeviceColorCommand) -> Option<MidiMessage> {
    match command {
        DeviceColorCommand::Rgb { pad, color } => {
            let (r, g, b) = color.to_7bit();
            Some(MidiMessage::fire_sysex(
                MSGID_SET_RGB_PAD_LED_STATE,
                &[pad, r, g, b],
            ))
        }
        DeviceColorCommand::Palette { cc, code } => Some(MidiMessage::ControlChange {
            channel: 0,
            cc,
            value: code,
        }),
        DeviceColorCommand::NoOp => None,
    }
}

#[async_trait]
impl Surface for FireSurface {
    fn name(&self) -> &str {
        match self.profile {
            SurfaceProfile::Fire => "fire",
            SurfaceProfile::Generic => "generic",
        }
    }

    fn profile(&self) -> SurfaceProfile {
        self.profile
    }

    async fn set_illumination(&self, control_id: ControlId, command: DeviceColorCommand) -> Result<()> {
        let Some(message) = illumination_message(command) else {
            return Ok(());
        };
        if let DeviceColorCommand::Rgb { color, .. } = command {
            debug!("[LED] set_pad_color({}, {})", control_id, color);
        }
        self.send(&message)
            .with_context(|| format!("LED update for control {} failed", control_id))
    }
}

impl Drop for FireSurface {
    fn drop(&mut self) {
        // Leave the surface dark on exit
        if self.profile == SurfaceProfile::Fire && self.output_conn.lock().is_some() {
            let _ = self.reset_leds();
        }
    }
}
