//! Preferences blob stores.

use crate::error::{Result, ViewsError};
use crate::model::UserPreferences;
use crate::storage::PreferencesStore;
use serde_json::Value;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Preferences kept as a pretty-printed JSON file.
///
/// Saves write a sibling temp file and rename it over the target, so a
/// crash mid-write leaves the previous file intact.
#[derive(Debug, Clone)]
pub struct JsonFilePreferencesStore {
    path: PathBuf,
}

impl JsonFilePreferencesStore {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

impl PreferencesStore for JsonFilePreferencesStore {
    fn load(&self) -> Result<Option<Value>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let contents = fs::read_to_string(&self.path)?;
        if contents.trim().is_empty() {
            return Ok(None);
        }
        Ok(Some(serde_json::from_str(&contents)?))
    }

    fn save(&self, preferences: &UserPreferences) -> Result<bool> {
        let payload = serde_json::to_string_pretty(preferences)?;
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let temp = self.temp_path();
        let write = || -> std::io::Result<()> {
            let mut file = fs::File::create(&temp)?;
            file.write_all(payload.as_bytes())?;
            file.write_all(b"\n")?;
            file.sync_all()?;
            fs::rename(&temp, &self.path)
        };
        write().map_err(|err| {
            let _ = fs::remove_file(&temp);
            ViewsError::PreferencesWrite {
                path: self.path.clone(),
                reason: err.to_string(),
            }
        })?;

        tracing::debug!(path = %self.path.display(), "Saved preferences");
        Ok(true)
    }
}

/// In-memory preferences store; counts saves for tests.
#[derive(Debug, Default)]
pub struct MemoryPreferencesStore {
    raw: Mutex<Option<Value>>,
    saves: AtomicUsize,
}

impl MemoryPreferencesStore {
    #[must_use]
    pub fn with_raw(raw: Value) -> Self {
        Self {
            raw: Mutex::new(Some(raw)),
            saves: AtomicUsize::new(0),
        }
    }

    #[must_use]
    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn raw(&self) -> Option<Value> {
        self.raw
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone()
    }
}

impl PreferencesStore for MemoryPreferencesStore {
    fn load(&self) -> Result<Option<Value>> {
        Ok(self.raw())
    }

    fn save(&self, preferences: &UserPreferences) -> Result<bool> {
        let value = serde_json::to_value(preferences)?;
        *self
            .raw
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner) = Some(value);
        self.saves.fetch_add(1, Ordering::SeqCst);
        Ok(true)
    }
}
