//! Persisted runtime settings
//!
//! Administrative changes (backend, voice) survive restarts through a small
//! JSON document. A missing or unreadable document never blocks startup.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use speech_synthesis::{BackendKind, gateway::Selection};
use tracing::{debug, info, warn};

use crate::error::ServiceError;

/// Backend and voice chosen at runtime
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RuntimeSettings {
    #[serde(default)]
    pub backend: BackendKind,

    #[serde(default)]
    pub voice: Option<String>,

    /// When an administrative operation last changed the settings
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl RuntimeSettings {
    #[must_use]
    pub fn selection(&self) -> Selection {
        Selection {
            backend: self.backend,
            voice: self.voice.clone(),
        }
    }

    /// Snapshot a selection, stamped with the current time
    #[must_use]
    pub fn from_selection(selection: Selection) -> Self {
        Self {
            backend: selection.backend,
            voice: selection.voice,
            updated_at: Some(Utc::now()),
        }
    }
}

/// JSON file holding [`RuntimeSettings`]
#[derive(Debug, Clone)]
pub struct SettingsStore {
    path: PathBuf,
}

impl SettingsStore {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load settings, falling back to [`RuntimeSettings::default`]
    #[must_use]
    pub fn load(&self) -> RuntimeSettings {
        self.load_or(RuntimeSettings::default())
    }

    /// Load settings, falling back to `defaults` when the file is missing or corrupt
    #[must_use]
    pub fn load_or(&self, defaults: RuntimeSettings) -> RuntimeSettings {
        match Self::read(&self.path) {
            Ok(settings) => {
                debug!(path = %self.path.display(), backend = %settings.backend, "Loaded runtime settings");
                settings
            },
            Err(ServiceError::Storage(e)) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "No runtime settings file, using defaults");
                defaults
            },
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "Ignoring unreadable runtime settings");
                defaults
            },
        }
    }

    fn read(path: &Path) -> Result<RuntimeSettings, ServiceError> {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Write settings as pretty JSON, creating parent directories
    pub fn save(&self, settings: &RuntimeSettings) -> Result<(), ServiceError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(settings)?;
        std::fs::write(&self.path, json)?;
        info!(
            path = %self.path.display(),
            backend = %settings.backend,
            voice = ?settings.voice,
            "Persisted runtime settings"
        );
        Ok(())
    }
}
