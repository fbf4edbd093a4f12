//! Console trigger lines

use crate::config::Action;
use crate::device::ControlId;
use colored::*;

const UNUSED: &str = "* UNUSED *";

/// Plain trigger line, without timestamp or colors
pub fn trigger_line(control_id: ControlId, action: Option<&Action>) -> String {
    match action {
        Some(action) => format!("Trigger: MIDI Control ID# {} -> {}", control_id, action),
        None => format!("Trigger: MIDI Control ID# {} -> {}", control_id, UNUSED),
    }
}

pub(crate) fn print_trigger(control_id: ControlId, action: Option<&Action>) {
    let stamp = chrono::Local::now().format("%H:%M:%S%.3f").to_string();
    let line = trigger_line(control_id, action);
    let line = match action {
        Some(_) => line.green(),
        None => line.yellow(),
    };
    println!("{} {}", stamp.dimmed(), line);
}

pub(crate) fn print_switch(file: &str, entries: usize) {
    println!(
        "{} {} ({} macros)",
        "Loaded config:".bold().cyan(),
        file,
        entries.to_string().green()
    );
}
