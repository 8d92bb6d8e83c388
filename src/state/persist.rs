//! Persisted UI selection
//!
//! Only the current project and view survive a restart. The file lives next to
//! the config (~/.config/clawdash/state.toml) and is rewritten on every change.

use super::ViewKey;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

/// Keys that are written to storage
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistedState {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub view: Option<String>,
}

/// Storage backend for `PersistedState`
///
/// `load` never fails: missing or unreadable storage means "nothing saved".
pub trait StatePersistence: Send + Sync {
    fn load(&self) -> PersistedState;

    /// Save the project, `None` clears it
    fn save_project(&self, project_id: Option<&str>) -> Result<()>;

    fn save_view(&self, view: ViewKey) -> Result<()>;
}

// ─────────────────────────────────────────────────────────────────────────────
// File backend
// ─────────────────────────────────────────────────────────────────────────────

/// TOML file backend
#[derive(Debug)]
pub struct FileStatePersistence {
    path: PathBuf,
    // Serializes read-modify-write cycles
    write_lock: Mutex<()>,
}

impl FileStatePersistence {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    /// Default location: ~/.config/clawdash/state.toml
    pub fn default_path() -> Option<PathBuf> {
        dirs::home_dir().map(|p| p.join(".config").join("clawdash").join("state.toml"))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read(&self) -> Result<PersistedState> {
        match std::fs::read_to_string(&self.path) {
            Ok(contents) => toml::from_str(&contents)
                .with_context(|| format!("Failed to parse {}", self.path.display())),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(PersistedState::default()),
            Err(e) => Err(e).with_context(|| format!("Failed to read {}", self.path.display())),
        }
    }

    fn update(&self, apply: impl FnOnce(&mut PersistedState)) -> Result<()> {
        let _guard = self.write_lock.lock().unwrap_or_else(|e| e.into_inner());

        // A corrupt file is replaced rather than blocking every later save
        let mut state = self.read().unwrap_or_else(|e| {
            tracing::warn!("Discarding unreadable state file: {:#}", e);
            PersistedState::default()
        });
        apply(&mut state);

        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        let contents = toml::to_string(&state).context("Failed to serialize state")?;
        std::fs::write(&self.path, contents)
            .with_context(|| format!("Failed to write {}", self.path.display()))
    }
}

impl StatePersistence for FileStatePersistence {
    fn load(&self) -> PersistedState {
        self.read().unwrap_or_else(|e| {
            tracing::warn!("Ignoring saved state: {:#}", e);
            PersistedState::default()
        })
    }

    fn save_project(&self, project_id: Option<&str>) -> Result<()> {
        self.update(|state| state.project_id = project_id.map(str::to_string))
    }

    fn save_view(&self, view: ViewKey) -> Result<()> {
        self.update(|state| state.view = Some(view.as_str().to_string()))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Memory backend
// ─────────────────────────────────────────────────────────────────────────────

/// In-memory backend, for tests and `--no-persist` runs
///
/// Clones share the same storage.
#[derive(Debug, Clone, Default)]
pub struct MemoryStatePersistence {
    state: Arc<Mutex<PersistedState>>,
}

impl MemoryStatePersistence {
    fn lock(&self) -> std::sync::MutexGuard<'_, PersistedState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl StatePersistence for MemoryStatePersistence {
    fn load(&self) -> PersistedState {
        self.lock().clone()
    }

    fn save_project(&self, project_id: Option<&str>) -> Result<()> {
        self.lock().project_id = project_id.map(str::to_string);
        Ok(())
    }

    fn save_view(&self, view: ViewKey) -> Result<()> {
        self.lock().view = Some(view.as_str().to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_loads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStatePersistence::new(dir.path().join("state.toml"));
        assert_eq!(store.load(), PersistedState::default());
    }

    #[test]
    fn test_file_round_trip_and_clear() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("state.toml");
        let store = FileStatePersistence::new(&path);

        store.save_project(Some("p-1")).unwrap();
        store.save_view(ViewKey::SprintHealth).unwrap();

        let reopened = FileStatePersistence::new(&path);
        assert_eq!(reopened.load().project_id.as_deref(), Some("p-1"));
        assert_eq!(reopened.load().view.as_deref(), Some("sprinthealth"));

        reopened.save_project(None).unwrap();
        let contents = std::fs::read_to_string(&path).unwrap();
        assert!(!contents.contains("project_id"));
        assert!(contents.contains("view = \"sprinthealth\""));
    }

    #[test]
    fn test_corrupt_file_is_ignored_and_replaced() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.toml");
        std::fs::write(&path, "project_id = [unterminated").unwrap();
        let store = FileStatePersistence::new(&path);

        assert_eq!(store.load(), PersistedState::default());

        store.save_view(ViewKey::Tickets).unwrap();
        assert_eq!(store.load().view.as_deref(), Some("tickets"));
    }

    #[test]
    fn test_memory_backend_clones_share_storage() {
        let a = MemoryStatePersistence::default();
        let b = a.clone();
        a.save_project(Some("p-9")).unwrap();
        assert_eq!(b.load().project_id.as_deref(), Some("p-9"));
    }
}
