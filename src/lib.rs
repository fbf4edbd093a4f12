//! Fire Macro Runner
//!
//! Turns MIDI pad controller presses into keystrokes, launches, typed text,
//! sounds and macro-table switches, and paints the pads with each macro's color.

pub mod cli;
pub mod color;
pub mod config;
pub mod device;
pub mod engine;
pub mod error;
pub mod executor;
pub mod fire;
pub mod keys;
pub mod midi;
pub mod paths;
pub mod sound;

pub use engine::{DispatchEngine, DispatchOutcome};
