//! MIDI message types used by the surface driver
//!
//! Only the messages a pad controller sends or needs for LED feedback are
//! modelled; everything else is dropped at parse time.

use std::fmt;

/// Akai manufacturer id, all-devices id, Fire product id
pub const FIRE_SYSEX_PREFIX: [u8; 3] = [0x47, 0x7F, 0x43];

/// Fire SysEx message id for "set RGB pad LED state"
pub const MSGID_SET_RGB_PAD_LED_STATE: u8 = 0x65;

/// MIDI messages we care about
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MidiMessage {
    /// Note Off: channel (0-15), note (0-127), velocity (0-127)
    NoteOff { channel: u8, note: u8, velocity: u8 },

    /// Note On: channel (0-15), note (0-127), velocity (1-127)
    NoteOn { channel: u8, note: u8, velocity: u8 },

    /// Control Change: channel (0-15), cc (0-127), value (0-127)
    ControlChange { channel: u8, cc: u8, value: u8 },

    /// System Exclusive payload without the F0/F7 framing
    SysEx { data: Vec<u8> },
}

impl MidiMessage {
    /// Parse a MIDI message from raw bytes
    pub fn parse(data: &[u8]) -> Option<Self> {
        let status = *data.first()?;

        if status == 0xF0 {
            let end = data.iter().position(|&b| b == 0xF7)?;
            return Some(MidiMessage::SysEx {
                data: data[1..end].to_vec(),
            });
        }

        // Running status and other system messages are not used by pad controllers
        if !(0x80..0xF0).contains(&status) || data.len() < 3 {
            return None;
        }

        let channel = status & 0x0F;
        let d1 = data[1] & 0x7F;
        let d2 = data[2] & 0x7F;

        match status & 0xF0 {
            0x80 => Some(MidiMessage::NoteOff {
                channel,
                note: d1,
                velocity: d2,
            }),
            // Note On with velocity 0 is a Note Off
            0x90 if d2 == 0 => Some(MidiMessage::NoteOff {
                channel,
                note: d1,
                velocity: 0,
            }),
            0x90 => Some(MidiMessage::NoteOn {
                channel,
                note: d1,
                velocity: d2,
            }),
            0xB0 => Some(MidiMessage::ControlChange {
                channel,
                cc: d1,
                value: d2,
            }),
            _ => None,
        }
    }

    /// Encode the message to MIDI bytes
    pub fn encode(&self) -> Vec<u8> {
        match *self {
            MidiMessage::NoteOff { channel, note, velocity } => {
                vec![0x80 | (channel & 0x0F), note & 0x7F, velocity & 0x7F]
            }
            MidiMessage::NoteOn { channel, note, velocity } => {
                vec![0x90 | (channel & 0x0F), note & 0x7F, velocity & 0x7F]
            }
            MidiMessage::ControlChange { channel, cc, value } => {
                vec![0xB0 | (channel & 0x0F), cc & 0x7F, value & 0x7F]
            }
            MidiMessage::SysEx { ref data } => {
                let mut result = Vec::with_capacity(data.len() + 2);
                result.push(0xF0);
                result.extend_from_slice(data);
                result.push(0xF7);
                result
            }
        }
    }

    /// Build a Fire SysEx: prefix, message id, 14-bit payload length, payload
    pub fn fire_sysex(msg_id: u8, payload: &[u8]) -> Self {
        let len = payload.len();
        let mut data = Vec::with_capacity(FIRE_SYSEX_PREFIX.len() + 3 + len);
        data.extend_from_slice(&FIRE_SYSEX_PREFIX);
        data.push(msg_id);
        data.push(((len >> 7) & 0x7F) as u8);
        data.push((len & 0x7F) as u8);
        data.extend(payload.iter().map(|b| b & 0x7F));
        MidiMessage::SysEx { data }
    }
}

impl fmt::Display for MidiMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            MidiMessage::NoteOff { channel, note, velocity } => {
                write!(f, "NoteOff ch:{} n:{} v:{}", channel + 1, note, velocity)
            }
            MidiMessage::NoteOn { channel, note, velocity } => {
                write!(f, "NoteOn ch:{} n:{} v:{}", channel + 1, note, velocity)
            }
            MidiMessage::ControlChange { channel, cc, value } => {
                write!(f, "CC ch:{} cc:{} v:{}", channel + 1, cc, value)
            }
            MidiMessage::SysEx { ref data } => write!(f, "SysEx {} bytes", data.len()),
        }
    }
}

/// Format MIDI bytes as hex string for debugging
pub fn format_hex(data: &[u8]) -> String {
    data.iter()
        .map(|b| format!("{:02X}", b))
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_note_on_parsing() {
        let msg = MidiMessage::parse(&[0x90, 60, 100]).unwrap();
        assert_eq!(
            msg,
            MidiMessage::NoteOn {
                channel: 0,
                note: 60,
                velocity: 100,
            }
        );
    }

    #[test]
    fn test_note_on_velocity_zero() {
        let msg = MidiMessage::parse(&[0x90, 60, 0]).unwrap();
        assert_eq!(
            msg,
            MidiMessage::NoteOff {
                channel: 0,
                note: 60,
                velocity: 0,
            }
        );
    }

    #[test]
    fn test_unused_messages_ignored() {
        assert_eq!(MidiMessage::parse(&[]), None);
        assert_eq!(MidiMessage::parse(&[0xE0, 0x00, 0x40]), None);
        assert_eq!(MidiMessage::parse(&[0xF8]), None);
        assert_eq!(MidiMessage::parse(&[0x3C, 0x40]), None);
    }

    #[test]
    fn test_fire_pad_sysex() {
        // Pad 2 full red, components already scaled to 7 bits
        let msg = MidiMessage::fire_sysex(MSGID_SET_RGB_PAD_LED_STATE, &[2, 127, 0, 0]);
        assert_eq!(
            msg.encode(),
            vec![0xF0, 0x47, 0x7F, 0x43, 0x65, 0x00, 0x04, 2, 127, 0, 0, 0xF7]
        );
    }

    #[test]
    fn test_sysex_parse() {
        let bytes = [0xF0, 0x47, 0x7F, 0x43, 0xF7];
        assert_eq!(
            MidiMessage::parse(&bytes),
            Some(MidiMessage::SysEx {
                data: vec![0x47, 0x7F, 0x43]
            })
        );
    }

    #[test]
    fn test_format_hex() {
        assert_eq!(format_hex(&[0xB0, 0x7F, 0x00]), "B0 7F 00");
    }
}
