//! Action executor
//!
//! Runs a parsed [`Action`] against the host. OS primitives sit behind
//! [`HostActions`] so the dispatch logic can be exercised without a
//! keyboard, a desktop session or a sound card.

use crate::config::Action;
use crate::error::ActionError;
use crate::keys::{KeyCombo, KeyToken};
use crate::sound;
use enigo::{Direction, Enigo, Key, Keyboard, Settings};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::sync::Arc;
use tracing::debug;

/// What a `RUN|` payload turned out to be
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LaunchTarget {
    /// Anything with a URL scheme (`https://`, `mailto:`, ...)
    Url(String),
    /// Existing file, folder or shortcut, opened with its default handler
    Open(PathBuf),
    /// Executable path or name on PATH
    Program(String),
}

impl LaunchTarget {
    /// Classify a run payload after expanding `~` and environment variables
    pub fn resolve(payload: &str) -> Self {
        let expanded = expand_path(payload.trim());

        if has_url_scheme(&expanded) {
            return LaunchTarget::Url(expanded);
        }
        let path = PathBuf::from(&expanded);
        if path.exists() {
            return LaunchTarget::Open(path);
        }
        LaunchTarget::Program(expanded)
    }
}

/// `scheme:` with a scheme longer than one char, so `C:\...` stays a path
fn has_url_scheme(s: &str) -> bool {
    match s.split_once(':') {
        Some((scheme, _)) => {
            scheme.len() > 1
                && scheme.starts_with(|c: char| c.is_ascii_alphabetic())
                && scheme
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
        }
        None => false,
    }
}

/// Expand a leading `~` and `$VAR`, `${VAR}`, `%VAR%` references.
/// Unknown variables are left as written.
pub fn expand_path(input: &str) -> String {
    let mut s = input.to_string();

    if s == "~" || s.starts_with("~/") || s.starts_with("~\\") {
        if let Some(home) = dirs::home_dir() {
            s = format!("{}{}", home.display(), &s[1..]);
        }
    }

    let mut out = String::with_capacity(s.len());
    let mut rest = s.as_str();
    while let Some(pos) = rest.find(['$', '%']) {
        out.push_str(&rest[..pos]);
        let tail = &rest[pos..];

        let (name, consumed) = if let Some(braced) = tail.strip_prefix("${") {
            match braced.find('}') {
                Some(end) => (&braced[..end], end + 3),
                None => ("", 0),
            }
        } else if let Some(pct) = tail.strip_prefix('%') {
            match pct.find('%') {
                Some(end) => (&pct[..end], end + 2),
                None => ("", 0),
            }
        } else {
            let body = &tail[1..];
            let end = body
                .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
                .unwrap_or(body.len());
            (&body[..end], end + 1)
        };

        match (consumed, std::env::var(name)) {
            (n, Ok(value)) if n > 0 && !name.is_empty() => {
                out.push_str(&value);
                rest = &tail[n..];
            }
            _ => {
                out.push_str(&tail[..1]);
                rest = &tail[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

/// OS-level primitives used by the executor
pub trait HostActions: Send + Sync {
    fn send_keys(&self, combo: &KeyCombo) -> Result<(), ActionError>;

    fn type_text(&self, text: &str) -> Result<(), ActionError>;

    /// Must not wait for the launched program
    fn launch(&self, target: &LaunchTarget) -> Result<(), ActionError>;

    /// Must not wait for playback to finish
    fn play_sound(&self, path: &Path) -> Result<(), ActionError>;
}

/// Real host: enigo for input, `open` for URLs/files, rodio for sound
#[derive(Debug, Default)]
pub struct SystemHost;

impl SystemHost {
    fn keyboard() -> Result<Enigo, ActionError> {
        Enigo::new(&Settings::default()).map_err(|e| ActionError::InputInjectionFailed(e.to_string()))
    }
}

/// Keys enigo only offers on Windows and X11/Wayland
#[cfg(not(target_os = "macos"))]
fn platform_key(token: KeyToken) -> Option<Key> {
    match token {
        KeyToken::Insert => Some(Key::Insert),
        KeyToken::PrintScreen => Some(Key::PrintScr),
        KeyToken::NumLock => Some(Key::Numlock),
        KeyToken::ScrollLock => Some(Key::ScrollLock),
        KeyToken::Pause => Some(Key::Pause),
        KeyToken::Menu => Some(Key::Menu),
        _ => None,
    }
}

#[cfg(target_os = "macos")]
fn platform_key(_token: KeyToken) -> Option<Key> {
    None
}

fn to_enigo_key(token: KeyToken) -> Option<Key> {
    let key = match token {
        KeyToken::Ctrl => Key::Control,
        KeyToken::Shift => Key::Shift,
        KeyToken::Alt => Key::Alt,
        KeyToken::Meta => Key::Meta,
        KeyToken::Function(n) => match n {
            1 => Key::F1,
            2 => Key::F2,
            3 => Key::F3,
            4 => Key::F4,
            5 => Key::F5,
            6 => Key::F6,
            7 => Key::F7,
            8 => Key::F8,
            9 => Key::F9,
            10 => Key::F10,
            11 => Key::F11,
            12 => Key::F12,
            13 => Key::F13,
            14 => Key::F14,
            15 => Key::F15,
            16 => Key::F16,
            17 => Key::F17,
            18 => Key::F18,
            19 => Key::F19,
            _ => Key::F20,
        },
        KeyToken::Enter => Key::Return,
        KeyToken::Tab => Key::Tab,
        KeyToken::Escape => Key::Escape,
        KeyToken::Space => Key::Space,
        KeyToken::Backspace => Key::Backspace,
        KeyToken::Delete => Key::Delete,
        KeyToken::Home => Key::Home,
        KeyToken::End => Key::End,
        KeyToken::PageUp => Key::PageUp,
        KeyToken::PageDown => Key::PageDown,
        KeyToken::Up => Key::UpArrow,
        KeyToken::Down => Key::DownArrow,
        KeyToken::Left => Key::LeftArrow,
        KeyToken::Right => Key::RightArrow,
        KeyToken::CapsLock => Key::CapsLock,
        KeyToken::VolumeUp => Key::VolumeUp,
        KeyToken::VolumeDown => Key::VolumeDown,
        KeyToken::VolumeMute => Key::VolumeMute,
        KeyToken::PlayPause => Key::MediaPlayPause,
        KeyToken::NextTrack => Key::MediaNextTrack,
        KeyToken::PrevTrack => Key::MediaPrevTrack,
        KeyToken::Char(c) => Key::Unicode(c),
        KeyToken::Insert
        | KeyToken::PrintScreen
        | KeyToken::NumLock
        | KeyToken::ScrollLock
        | KeyToken::Pause
        | KeyToken::Menu => return platform_key(token),
    };
    Some(key)
}

impl HostActions for SystemHost {
    fn send_keys(&self, combo: &KeyCombo) -> Result<(), ActionError> {
        let mut enigo = Self::keyboard()?;
        let inject = |e: enigo::InputError| ActionError::InputInjectionFailed(e.to_string());

        for chord in &combo.chords {
            let keys = chord
                .0
                .iter()
                .map(|&token| {
                    to_enigo_key(token).ok_or_else(|| {
                        ActionError::InputInjectionFailed(format!("'{}' is not available on this platform", token))
                    })
                })
                .collect::<Result<Vec<Key>, _>>()?;
            let mut pressed = Vec::with_capacity(keys.len());

            let mut result = Ok(());
            for key in &keys {
                if let Err(e) = enigo.key(*key, Direction::Press) {
                    result = Err(inject(e));
                    break;
                }
                pressed.push(*key);
            }
            // Release whatever went down, even after a failure, so no modifier sticks
            for key in pressed.iter().rev() {
                if let Err(e) = enigo.key(*key, Direction::Release) {
                    if result.is_ok() {
                        result = Err(inject(e));
                    }
                }
            }
            result?;
        }
        Ok(())
    }

    fn type_text(&self, text: &str) -> Result<(), ActionError> {
        let mut enigo = Self::keyboard()?;
        enigo
            .text(text)
            .map_err(|e| ActionError::InputInjectionFailed(e.to_string()))
    }

    fn launch(&self, target: &LaunchTarget) -> Result<(), ActionError> {
        let failed = |target: &str, e: std::io::Error| ActionError::LaunchFailed {
            target: target.to_string(),
            reason: e.to_string(),
        };

        match target {
            LaunchTarget::Url(url) => open::that_detached(url).map_err(|e| failed(url, e)),
            LaunchTarget::Open(path) => {
                open::that_detached(path).map_err(|e| failed(&path.display().to_string(), e))
            }
            LaunchTarget::Program(program) => {
                // Dropping the handle detaches the child; we never wait on it
                let child = Command::new(program)
                    .stdin(Stdio::null())
                    .stdout(Stdio::null())
                    .stderr(Stdio::null())
                    .spawn()
                    .map_err(|e| failed(program, e))?;
                debug!("Started '{}' (pid {})", program, child.id());
                Ok(())
            }
        }
    }

    fn play_sound(&self, path: &Path) -> Result<(), ActionError> {
        sound::play_detached(path)
    }
}

/// Successful execution outcome
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Executed {
    Done,
    /// The engine must perform a table swap to this file
    SwitchRequested(String),
}

pub type ExecutionResult = Result<Executed, ActionError>;

/// Dispatches actions to a host implementation
#[derive(Clone)]
pub struct ActionExecutor {
    host: Arc<dyn HostActions>,
}

impl ActionExecutor {
    pub fn new(host: Arc<dyn HostActions>) -> Self {
        Self { host }
    }

    /// Executor backed by the real desktop
    pub fn system() -> Self {
        Self::new(Arc::new(SystemHost))
    }

    pub fn execute(&self, action: &Action) -> ExecutionResult {
        match action {
            Action::KeyCombo(combo) => self.host.send_keys(combo)?,
            Action::Type(text) => self.host.type_text(text)?,
            Action::Run(payload) => {
                let target = LaunchTarget::resolve(payload);
                debug!("Run target: {:?}", target);
                self.host.launch(&target)?
            }
            Action::Sound(path) => self.host.play_sound(path)?,
            Action::ConfigSwitch(file) => return Ok(Executed::SwitchRequested(file.clone())),
        }
        Ok(Executed::Done)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    #[derive(Default)]
    struct RecordingHost {
        calls: Mutex<Vec<String>>,
    }

    impl HostActions for RecordingHost {
        fn send_keys(&self, combo: &KeyCombo) -> Result<(), ActionError> {
            self.calls.lock().push(format!("keys:{}", combo));
            Ok(())
        }

        fn type_text(&self, text: &str) -> Result<(), ActionError> {
            self.calls.lock().push(format!("type:{}", text));
            Ok(())
        }

        fn launch(&self, target: &LaunchTarget) -> Result<(), ActionError> {
            self.calls.lock().push(format!("launch:{:?}", target));
            Err(ActionError::LaunchFailed {
                target: format!("{:?}", target),
                reason: "denied".to_string(),
            })
        }

        fn play_sound(&self, path: &Path) -> Result<(), ActionError> {
            self.calls.lock().push(format!("sound:{}", path.display()));
            Ok(())
        }
    }

    #[test]
    fn test_each_kind_reaches_the_host() {
        let host = Arc::new(RecordingHost::default());
        let executor = ActionExecutor::new(host.clone());

        assert_eq!(executor.execute(&"ctrl+s".parse().unwrap()).unwrap(), Executed::Done);
        assert_eq!(executor.execute(&"TYPE|hello".parse().unwrap()).unwrap(), Executed::Done);
        assert_eq!(
            executor.execute(&"SOUND|ding.wav".parse().unwrap()).unwrap(),
            Executed::Done
        );

        assert_eq!(
            *host.calls.lock(),
            vec!["keys:ctrl+s", "type:hello", "sound:ding.wav"]
        );
    }

    #[test]
    fn test_failures_are_returned_not_raised() {
        let executor = ActionExecutor::new(Arc::new(RecordingHost::default()));
        let result = executor.execute(&"RUN|https://example.com".parse().unwrap());
        assert!(matches!(result, Err(ActionError::LaunchFailed { .. })));
    }

    #[test]
    fn test_config_switch_does_no_io() {
        let host = Arc::new(RecordingHost::default());
        let executor = ActionExecutor::new(host.clone());

        let result = executor.execute(&"CONFIG|alt.json".parse().unwrap()).unwrap();
        assert_eq!(result, Executed::SwitchRequested("alt.json".to_string()));
        assert!(host.calls.lock().is_empty());
    }

    #[test]
    fn test_launch_target_resolution() {
        assert_eq!(
            LaunchTarget::resolve("https://example.com"),
            LaunchTarget::Url("https://example.com".to_string())
        );
        assert_eq!(
            LaunchTarget::resolve("mailto:me@example.com"),
            LaunchTarget::Url("mailto:me@example.com".to_string())
        );
        assert_eq!(
            LaunchTarget::resolve("surely-not-a-real-program-xyz"),
            LaunchTarget::Program("surely-not-a-real-program-xyz".to_string())
        );
        assert!(!has_url_scheme(r"C:\Windows\notepad.exe"));

        let dir = tempfile::TempDir::new().unwrap();
        assert_eq!(
            LaunchTarget::resolve(&dir.path().display().to_string()),
            LaunchTarget::Open(dir.path().to_path_buf())
        );
    }

    #[test]
    fn test_expand_path_variables() {
        std::env::set_var("FIRE_MACRO_TEST_DIR", "/opt/tools");
        assert_eq!(expand_path("$FIRE_MACRO_TEST_DIR/run"), "/opt/tools/run");
        assert_eq!(expand_path("${FIRE_MACRO_TEST_DIR}/run"), "/opt/tools/run");
        assert_eq!(expand_path("%FIRE_MACRO_TEST_DIR%\\run"), "/opt/tools\\run");
        assert_eq!(expand_path("100% sure $NOT_SET_FIRE_XYZ"), "100% sure $NOT_SET_FIRE_XYZ");
    }

    #[test]
    fn test_media_keys_map_everywhere() {
        assert!(matches!(to_enigo_key(KeyToken::VolumeUp), Some(Key::VolumeUp)));
        assert!(matches!(to_enigo_key(KeyToken::VolumeMute), Some(Key::VolumeMute)));
        assert!(matches!(to_enigo_key(KeyToken::PlayPause), Some(Key::MediaPlayPause)));
        assert!(matches!(to_enigo_key(KeyToken::PrevTrack), Some(Key::MediaPrevTrack)));
        assert!(matches!(to_enigo_key(KeyToken::Function(13)), Some(Key::F13)));
    }

    #[cfg(not(target_os = "macos"))]
    #[test]
    fn test_system_keys_map_on_windows_and_linux() {
        assert!(matches!(to_enigo_key(KeyToken::Insert), Some(Key::Insert)));
        assert!(matches!(to_enigo_key(KeyToken::PrintScreen), Some(Key::PrintScr)));
        assert!(matches!(to_enigo_key(KeyToken::NumLock), Some(Key::Numlock)));
        assert!(matches!(to_enigo_key(KeyToken::ScrollLock), Some(Key::ScrollLock)));
        assert!(matches!(to_enigo_key(KeyToken::Pause), Some(Key::Pause)));
        assert!(matches!(to_enigo_key(KeyToken::Menu), Some(Key::Menu)));
    }

    #[test]
    fn test_expand_home() {
        if let Some(home) = dirs::home_dir() {
            assert_eq!(
                expand_path("~/bin/tool"),
                format!("{}/bin/tool", home.display())
            );
        }
        assert_eq!(expand_path("a~b"), "a~b");
    }
}
