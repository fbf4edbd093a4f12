//! Interactive device selection

use anyhow::{bail, Result};
use colored::*;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;

/// Pick a port name from a numbered list, or by typing part of its name.
///
/// Returns `None` when the user cancels with Ctrl-C/Ctrl-D or an empty line.
pub fn select_device(ports: &[String]) -> Result<Option<String>> {
    if ports.is_empty() {
        bail!("No MIDI input devices found");
    }

    println!("\n{}", "=== Available MIDI Devices ===".bold().cyan());
    for (i, name) in ports.iter().enumerate() {
        println!("  [{}] {}", (i + 1).to_string().green(), name);
    }
    println!();

    let mut rl = DefaultEditor::new()?;
    loop {
        let line = match rl.readline("Select device number: ") {
            Ok(line) => line,
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let input = line.trim();
        if input.is_empty() {
            return Ok(None);
        }

        match pick(ports, input) {
            Some(name) => return Ok(Some(name.to_string())),
            None => println!("{}", format!("No device matches '{}'", input).yellow()),
        }
    }
}

/// 1-based index, else the first case-insensitive substring match
fn pick<'a>(ports: &'a [String], input: &str) -> Option<&'a str> {
    if let Ok(n) = input.parse::<usize>() {
        return n.checked_sub(1).and_then(|i| ports.get(i)).map(String::as_str);
    }
    ports
        .iter()
        .find(|name| crate::device::port_matches(name, input))
        .map(String::as_str)
}
