//! Config directory watcher for hot-reload support

use anyhow::{Context, Result};
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, error, info};

/// Time given to editors to finish writing before we reload
const DEBOUNCE: Duration = Duration::from_millis(100);

/// Watches the config directory and reports modified macro files
pub struct ConfigWatcher {
    watcher: RecommendedWatcher,
    watched: HashSet<PathBuf>,
    rx: mpsc::Receiver<PathBuf>,
}

impl ConfigWatcher {
    /// Start watching `dir` (non-recursive) for changes to `.json` files
    pub fn new(dir: &Path) -> Result<Self> {
        let (tx, rx) = mpsc::channel(10);

        // notify callbacks run on their own OS thread, not in Tokio context
        let runtime_handle = tokio::runtime::Handle::current();

        let mut watcher = notify::recommended_watcher(move |res: Result<Event, notify::Error>| {
            match res {
                Ok(event) => {
                    if !matches!(event.kind, EventKind::Modify(_) | EventKind::Create(_)) {
                        return;
                    }
                    for path in event.paths {
                        if path.extension().map_or(true, |ext| ext != "json") {
                            continue;
                        }
                        debug!("Macro file modified: {}", path.display());

                        let tx = tx.clone();
                        runtime_handle.spawn(async move {
                            tokio::time::sleep(DEBOUNCE).await;
                            if let Err(e) = tx.send(path).await {
                                error!("Failed to send config change: {}", e);
                            }
                        });
                    }
                }
                Err(e) => {
                    error!("Watch error: {}", e);
                }
            }
        })?;

        watcher
            .watch(dir, RecursiveMode::NonRecursive)
            .with_context(|| format!("Failed to watch config directory: {}", dir.display()))?;

        info!("Config watcher started for: {}", dir.display());

        let mut watched = HashSet::new();
        watched.insert(watch_key(dir));
        Ok(Self { watcher, watched, rx })
    }

    /// Also watch `dir`, e.g. the folder of a macro file loaded from elsewhere.
    /// Directories already watched are skipped.
    pub fn ensure_watching(&mut self, dir: &Path) -> Result<()> {
        if self.is_watching(dir) {
            return Ok(());
        }
        self.watcher
            .watch(dir, RecursiveMode::NonRecursive)
            .with_context(|| format!("Failed to watch directory: {}", dir.display()))?;
        self.watched.insert(watch_key(dir));
        info!("Config watcher added: {}", dir.display());
        Ok(())
    }

    pub fn is_watching(&self, dir: &Path) -> bool {
        self.watched.contains(&watch_key(dir))
    }

    /// Wait for the next modified file.
    /// Returns None if the watcher has been closed
    pub async fn next_change(&mut self) -> Option<PathBuf> {
        self.rx.recv().await
    }

    /// Take every notification already queued; a single write often fires
    /// several events, and different files can change together.
    pub fn drain_pending(&mut self) -> Vec<PathBuf> {
        let mut paths = Vec::new();
        while let Ok(path) = self.rx.try_recv() {
            debug!("Coalesced change: {}", path.display());
            if !paths.contains(&path) {
                paths.push(path);
            }
        }
        paths
    }
}

fn watch_key(dir: &Path) -> PathBuf {
    dir.canonicalize().unwrap_or_else(|_| dir.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_config_watcher_reports_json_changes() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let config_path = temp_dir.path().join("default_macros.json");
        fs::write(&config_path, r#"{"control_macros":{}}"#)?;

        let mut watcher = ConfigWatcher::new(temp_dir.path())?;

        tokio::time::sleep(Duration::from_millis(100)).await;
        fs::write(&config_path, r#"{"control_macros":{"54":"f1"}}"#)?;

        let changed = tokio::time::timeout(Duration::from_secs(2), watcher.next_change())
            .await?
            .expect("watcher closed without reporting the change");
        assert_eq!(changed.file_name(), config_path.file_name());

        Ok(())
    }

    #[tokio::test]
    async fn test_drain_pending_keeps_every_changed_file() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let other = temp_dir.path().join("other.json");
        let active = temp_dir.path().join("default_macros.json");
        fs::write(&other, "{}")?;
        fs::write(&active, "{}")?;

        let mut watcher = ConfigWatcher::new(temp_dir.path())?;
        tokio::time::sleep(Duration::from_millis(100)).await;

        fs::write(&other, r#"{"control_macros":{}}"#)?;
        fs::write(&active, r#"{"control_macros":{"54":"f1"}}"#)?;

        let first = tokio::time::timeout(Duration::from_secs(2), watcher.next_change())
            .await?
            .expect("watcher closed without reporting a change");
        tokio::time::sleep(Duration::from_millis(400)).await;

        let mut changed = vec![first];
        changed.extend(watcher.drain_pending());
        let names: Vec<_> = changed.iter().filter_map(|p| p.file_name()).collect();
        assert!(names.contains(&active.file_name().unwrap()), "{:?}", names);
        assert!(names.contains(&other.file_name().unwrap()), "{:?}", names);

        Ok(())
    }

    #[tokio::test]
    async fn test_ensure_watching_adds_each_directory_once() -> Result<()> {
        let config_dir = TempDir::new()?;
        let elsewhere = TempDir::new()?;
        let mut watcher = ConfigWatcher::new(config_dir.path())?;

        assert!(watcher.is_watching(config_dir.path()));
        assert!(!watcher.is_watching(elsewhere.path()));

        watcher.ensure_watching(elsewhere.path())?;
        watcher.ensure_watching(elsewhere.path())?;
        assert!(watcher.is_watching(elsewhere.path()));

        tokio::time::sleep(Duration::from_millis(100)).await;
        let outside = elsewhere.path().join("foo.json");
        fs::write(&outside, r#"{"control_macros":{}}"#)?;

        let changed = tokio::time::timeout(Duration::from_secs(2), watcher.next_change())
            .await?
            .expect("watcher closed without reporting the change");
        assert_eq!(changed.file_name(), outside.file_name());

        Ok(())
    }
}
