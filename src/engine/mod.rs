//! Dispatch engine - turns control events into actions
//!
//! The engine owns the active macro table and is the only place that
//! replaces it. Each press is resolved against a snapshot of the table,
//! executed, and reported on the console. Config switches and live
//! reloads go through one swap path that also repaints the surface.

mod refresh;
mod report;

pub use report::trigger_line;


use crate::config::{Action, ConfigStore, LoadedConfig, MacroEntry};
use crate::device::{ControlEvent, ControlId, Surface};
use crate::error::{ConfigError, DispatchError};
use crate::executor::{ActionExecutor, Executed};
use parking_lot::RwLock;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// What happened to one event
#[derive(Debug)]
pub enum DispatchOutcome {
    /// Button release, never fires anything
    Ignored,
    /// No entry for this control in the active table
    Unused(ControlId),
    /// Action ran without error
    Executed(Action),
    /// A config switch replaced the active table
    Switched { from: String, to: String },
    /// The action (or switch) failed; the engine keeps going
    Failed { action: Action, error: DispatchError },
}

/// Event-to-action dispatcher
pub struct DispatchEngine {
    store: ConfigStore,
    executor: ActionExecutor,
    pub(crate) surface: Arc<dyn Surface>,
    active: RwLock<Arc<LoadedConfig>>,
}

impl DispatchEngine {
    /// Load the initial table and light the surface
    ///
    /// `initial` names an explicit macro file; `None` uses the primary file,
    /// bootstrapping it from the fallback when needed. Nothing is dispatched
    /// before this returns.
    pub async fn start(
        store: ConfigStore,
        executor: ActionExecutor,
        surface: Arc<dyn Surface>,
        initial: Option<&str>,
    ) -> Result<Self, ConfigError> {
        let loaded = store.load(initial).await?;
        info!(
            "[Config] Active: {} ({} macros)",
            loaded.path.display(),
            loaded.table.len()
        );
        report::print_switch(&loaded.file_name(), loaded.table.len());

        let engine = Self {
            store,
            executor,
            surface,
            active: RwLock::new(Arc::new(loaded)),
        };

        let snapshot = engine.snapshot();
        engine.refresh_all(&snapshot.table).await;
        Ok(engine)
    }

    /// Read-only view of the active table
    pub fn snapshot(&self) -> Arc<LoadedConfig> {
        self.active.read().clone()
    }

    pub fn resolve(&self, control_id: ControlId) -> Option<MacroEntry> {
        self.snapshot().table.get(control_id).cloned()
    }

    /// File name of the active table
    pub fn active_file(&self) -> String {
        self.snapshot().file_name()
    }

    /// Full path of the active macro file
    pub fn active_path(&self) -> PathBuf {
        self.snapshot().path.clone()
    }

    /// Whether a changed path is the file the active table came from
    pub fn is_active_file(&self, path: &Path) -> bool {
        same_file(path, &self.snapshot().path)
    }

    /// Whether any of a batch of changed paths is the active file
    pub fn touches_active_file(&self, paths: &[PathBuf]) -> bool {
        paths.iter().any(|path| self.is_active_file(path))
    }

    /// Handle one control event to completion
    pub async fn dispatch(&self, event: ControlEvent) -> DispatchOutcome {
        if !event.pressed {
            return DispatchOutcome::Ignored;
        }

        let control_id = event.control_id;
        let snapshot = self.snapshot();
        let Some(entry) = snapshot.table.get(control_id) else {
            report::print_trigger(control_id, None);
            debug!(control_id, "No macro for control");
            return DispatchOutcome::Unused(control_id);
        };
        let action = entry.action.clone();
        drop(snapshot);

        report::print_trigger(control_id, Some(&action));

        let result = match self.executor.execute(&action) {
            Ok(Executed::Done) => Ok(None),
            Ok(Executed::SwitchRequested(file)) => {
                let from = self.active_file();
                self.switch_config(&file).await.map(|()| Some((from, file)))
            }
            Err(e) => Err(DispatchError::from(e)),
        };

        match result {
            Ok(None) => DispatchOutcome::Executed(action),
            Ok(Some((from, to))) => DispatchOutcome::Switched { from, to },
            Err(error) => {
                match &error {
                    DispatchError::ConfigSwitchFailed { .. } => {
                        error!(control_id, action = action.kind(), "{}", error)
                    }
                    DispatchError::Action(_) => {
                        warn!(control_id, action = action.kind(), "Action failed: {}", error)
                    }
                }
                DispatchOutcome::Failed { action, error }
            }
        }
    }

    /// Replace the active table with `file` and repaint the surface
    ///
    /// On failure the current table stays active.
    pub async fn switch_config(&self, file: &str) -> Result<(), DispatchError> {
        self.swap_to(file).await
    }

    /// Re-read the active file after an on-disk edit
    pub async fn reload_active(&self) -> Result<(), DispatchError> {
        let path = self.snapshot().path.clone();
        self.swap_to(&path.to_string_lossy()).await
    }

    async fn swap_to(&self, file: &str) -> Result<(), DispatchError> {
        let loaded = self
            .store
            .load(Some(file))
            .await
            .map_err(|source| DispatchError::ConfigSwitchFailed {
                file: file.to_string(),
                source,
            })?;

        let name = loaded.file_name();
        let entries = loaded.table.len();
        let current = Arc::new(loaded);

        // Guard is dropped before the refresh awaits
        let previous = {
            let mut active = self.active.write();
            std::mem::replace(&mut *active, current.clone())
        };

        info!("[Config] Switched {} -> {} ({} macros)", previous.file_name(), name, entries);
        report::print_switch(&name, entries);

        self.refresh_after_swap(&previous.table, &current.table).await;
        Ok(())
    }
}

/// Compare resolved paths; falls back to a plain comparison when either side
/// no longer exists (editors that save by rename)
fn same_file(a: &Path, b: &Path) -> bool {
    match (a.canonicalize(), b.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => a == b,
    }
}
