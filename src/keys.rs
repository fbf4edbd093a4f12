//! Key combo grammar
//!
//! `ctrl+shift+p` is one chord (keys held together); `ctrl+k, ctrl+c` is two
//! chords sent one after the other. Names are validated when the macro file
//! is loaded so nothing downstream has to look at raw strings again.

use std::fmt;
use std::str::FromStr;

/// A single key in a chord
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyToken {
    Ctrl,
    Shift,
    Alt,
    Meta,
    Function(u8),
    Enter,
    Tab,
    Escape,
    Space,
    Backspace,
    Delete,
    Home,
    End,
    PageUp,
    PageDown,
    Up,
    Down,
    Left,
    Right,
    CapsLock,
    Insert,
    PrintScreen,
    NumLock,
    ScrollLock,
    Pause,
    Menu,
    VolumeUp,
    VolumeDown,
    VolumeMute,
    PlayPause,
    NextTrack,
    PrevTrack,
    Char(char),
}

impl FromStr for KeyToken {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim().to_ascii_lowercase();

        let mut chars = name.chars();
        if let (Some(c), None) = (chars.next(), chars.next()) {
            return Ok(KeyToken::Char(c));
        }

        let token = match name.as_str() {
            "ctrl" | "control" => KeyToken::Ctrl,
            "shift" => KeyToken::Shift,
            "alt" | "option" | "alt gr" => KeyToken::Alt,
            "win" | "windows" | "cmd" | "command" | "super" | "meta" => KeyToken::Meta,
            "enter" | "return" => KeyToken::Enter,
            "tab" => KeyToken::Tab,
            "esc" | "escape" => KeyToken::Escape,
            "space" | "spacebar" => KeyToken::Space,
            "backspace" => KeyToken::Backspace,
            "delete" | "del" => KeyToken::Delete,
            "home" => KeyToken::Home,
            "end" => KeyToken::End,
            "page up" | "pageup" | "pgup" => KeyToken::PageUp,
            "page down" | "pagedown" | "pgdn" => KeyToken::PageDown,
            "up" | "up arrow" => KeyToken::Up,
            "down" | "down arrow" => KeyToken::Down,
            "left" | "left arrow" => KeyToken::Left,
            "right" | "right arrow" => KeyToken::Right,
            "caps lock" | "capslock" => KeyToken::CapsLock,
            "insert" | "ins" => KeyToken::Insert,
            "print screen" | "printscreen" | "prtsc" | "print" => KeyToken::PrintScreen,
            "num lock" | "numlock" => KeyToken::NumLock,
            "scroll lock" | "scrolllock" => KeyToken::ScrollLock,
            "pause" | "break" => KeyToken::Pause,
            "menu" | "apps" | "context menu" => KeyToken::Menu,
            "volume up" | "volumeup" => KeyToken::VolumeUp,
            "volume down" | "volumedown" => KeyToken::VolumeDown,
            "volume mute" | "volumemute" | "mute" => KeyToken::VolumeMute,
            "play/pause media" | "play/pause" | "play pause" | "media play pause" => KeyToken::PlayPause,
            "next track" | "media next" => KeyToken::NextTrack,
            "previous track" | "prev track" | "media previous" => KeyToken::PrevTrack,
            "plus" => KeyToken::Char('+'),
            "comma" => KeyToken::Char(','),
            _ => match name.strip_prefix('f').and_then(|n| n.parse::<u8>().ok()) {
                Some(n @ 1..=20) => KeyToken::Function(n),
                _ => return Err(format!("unknown key '{}'", s.trim())),
            },
        };
        Ok(token)
    }
}

impl fmt::Display for KeyToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            KeyToken::Ctrl => "ctrl",
            KeyToken::Shift => "shift",
            KeyToken::Alt => "alt",
            KeyToken::Meta => "win",
            KeyToken::Function(n) => return write!(f, "f{}", n),
            KeyToken::Enter => "enter",
            KeyToken::Tab => "tab",
            KeyToken::Escape => "esc",
            KeyToken::Space => "space",
            KeyToken::Backspace => "backspace",
            KeyToken::Delete => "delete",
            KeyToken::Home => "home",
            KeyToken::End => "end",
            KeyToken::PageUp => "page up",
            KeyToken::PageDown => "page down",
            KeyToken::Up => "up",
            KeyToken::Down => "down",
            KeyToken::Left => "left",
            KeyToken::Right => "right",
            KeyToken::CapsLock => "caps lock",
            KeyToken::Insert => "insert",
            KeyToken::PrintScreen => "print screen",
            KeyToken::NumLock => "num lock",
            KeyToken::ScrollLock => "scroll lock",
            KeyToken::Pause => "pause",
            KeyToken::Menu => "menu",
            KeyToken::VolumeUp => "volume up",
            KeyToken::VolumeDown => "volume down",
            KeyToken::VolumeMute => "volume mute",
            KeyToken::PlayPause => "play/pause media",
            KeyToken::NextTrack => "next track",
            KeyToken::PrevTrack => "previous track",
            KeyToken::Char('+') => "plus",
            KeyToken::Char(',') => "comma",
            KeyToken::Char(c) => return write!(f, "{}", c),
        };
        f.write_str(name)
    }
}

/// Keys pressed together, released in reverse order
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct KeyChord(pub Vec<KeyToken>);

/// One or more chords sent in sequence
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct KeyCombo {
    pub chords: Vec<KeyChord>,
}

impl FromStr for KeyCombo {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().is_empty() {
            return Err("empty key combo".to_string());
        }

        let mut chords = Vec::new();
        for step in s.split(',') {
            let keys = step
                .split('+')
                .map(KeyToken::from_str)
                .collect::<Result<Vec<_>, _>>()?;
            chords.push(KeyChord(keys));
        }
        Ok(KeyCombo { chords })
    }
}

impl fmt::Display for KeyCombo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, chord) in self.chords.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            for (j, key) in chord.0.iter().enumerate() {
                if j > 0 {
                    f.write_str("+")?;
                }
                write!(f, "{}", key)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simple_chord() {
        let combo: KeyCombo = "Ctrl+Shift+P".parse().unwrap();
        assert_eq!(
            combo.chords,
            vec![KeyChord(vec![KeyToken::Ctrl, KeyToken::Shift, KeyToken::Char('p')])]
        );
        assert_eq!(combo.to_string(), "ctrl+shift+p");
    }

    #[test]
    fn test_function_keys() {
        let combo: KeyCombo = "f3".parse().unwrap();
        assert_eq!(combo.chords, vec![KeyChord(vec![KeyToken::Function(3)])]);
        assert!("f21".parse::<KeyCombo>().is_err());
        assert!("f0".parse::<KeyCombo>().is_err());
    }

    #[test]
    fn test_chord_sequence() {
        let combo: KeyCombo = "ctrl+k, ctrl+c".parse().unwrap();
        assert_eq!(combo.chords.len(), 2);
        assert_eq!(combo.to_string(), "ctrl+k, ctrl+c");
    }

    #[test]
    fn test_unknown_names_rejected() {
        assert!("BOGUS|x".parse::<KeyCombo>().is_err());
        assert!("ctrl+".parse::<KeyCombo>().is_err());
        assert!("".parse::<KeyCombo>().is_err());
        assert!("hyper+a".parse::<KeyCombo>().is_err());
    }

    #[test]
    fn test_aliases() {
        assert_eq!("return".parse::<KeyToken>().unwrap(), KeyToken::Enter);
        assert_eq!("CMD".parse::<KeyToken>().unwrap(), KeyToken::Meta);
        assert_eq!("page down".parse::<KeyToken>().unwrap(), KeyToken::PageDown);
        assert_eq!("plus".parse::<KeyToken>().unwrap(), KeyToken::Char('+'));
    }

    #[test]
    fn test_system_and_media_keys() {
        let cases = [
            ("insert", KeyToken::Insert),
            ("Print Screen", KeyToken::PrintScreen),
            ("prtsc", KeyToken::PrintScreen),
            ("num lock", KeyToken::NumLock),
            ("scroll lock", KeyToken::ScrollLock),
            ("pause", KeyToken::Pause),
            ("menu", KeyToken::Menu),
            ("volume up", KeyToken::VolumeUp),
            ("volume down", KeyToken::VolumeDown),
            ("volume mute", KeyToken::VolumeMute),
            ("play/pause media", KeyToken::PlayPause),
            ("next track", KeyToken::NextTrack),
            ("previous track", KeyToken::PrevTrack),
        ];
        for (name, token) in cases {
            assert_eq!(name.parse::<KeyToken>().unwrap(), token, "{}", name);
            // Display output parses back to the same key
            assert_eq!(token.to_string().parse::<KeyToken>().unwrap(), token);
        }

        let combo: KeyCombo = "ctrl+insert".parse().unwrap();
        assert_eq!(combo.chords, vec![KeyChord(vec![KeyToken::Ctrl, KeyToken::Insert])]);
    }
}
