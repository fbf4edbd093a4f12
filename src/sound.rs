//! Fire-and-forget sound playback
//!
//! Each sound gets its own thread holding the output stream until the clip
//! ends. The caller only waits until decoding and stream setup succeed, so
//! missing or unsupported files are still reported as errors.

use crate::error::ActionError;
use crossbeam::channel;
use rodio::{Decoder, OutputStream, Sink};
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::thread;
use tracing::debug;

/// Start playing `path` in the background
pub fn play_detached(path: &Path) -> Result<(), ActionError> {
    let fail = |path: &Path, reason: String| ActionError::PlaybackFailed {
        path: path.to_path_buf(),
        reason,
    };

    if !path.is_file() {
        return Err(fail(path, "file not found".to_string()));
    }

    let (ready_tx, ready_rx) = channel::bounded::<Result<(), String>>(1);
    let owned: PathBuf = path.to_path_buf();

    thread::Builder::new()
        .name("sound".to_string())
        .spawn(move || {
            // The stream must outlive the sink or playback stops
            let (_stream, sink) = match start(&owned) {
                Ok(playing) => {
                    let _ = ready_tx.send(Ok(()));
                    playing
                }
                Err(reason) => {
                    let _ = ready_tx.send(Err(reason));
                    return;
                }
            };
            sink.sleep_until_end();
            debug!("Finished playing {}", owned.display());
        })
        .map_err(|e| fail(path, format!("could not start playback thread: {}", e)))?;

    match ready_rx.recv() {
        Ok(Ok(())) => Ok(()),
        Ok(Err(reason)) => Err(fail(path, reason)),
        Err(_) => Err(fail(path, "playback thread exited early".to_string())),
    }
}

fn start(path: &Path) -> Result<(OutputStream, Sink), String> {
    let file = File::open(path).map_err(|e| format!("failed to open audio file: {}", e))?;
    let source = Decoder::new(BufReader::new(file))
        .map_err(|e| format!("failed to decode audio file: {}", e))?;

    let (stream, stream_handle) =
        OutputStream::try_default().map_err(|e| format!("no audio output: {}", e))?;
    let sink = Sink::try_new(&stream_handle).map_err(|e| format!("failed to create audio sink: {}", e))?;
    sink.append(source);

    Ok((stream, sink))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_fails_fast() {
        let err = play_detached(Path::new("/definitely/not/here.wav")).unwrap_err();
        assert!(matches!(err, ActionError::PlaybackFailed { .. }));
    }

    #[test]
    fn test_undecodable_file_is_reported() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("noise.wav");
        std::fs::write(&path, b"this is not audio").unwrap();

        let err = play_detached(&path).unwrap_err();
        assert!(matches!(err, ActionError::PlaybackFailed { .. }));
    }
}
