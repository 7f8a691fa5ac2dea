//! Engine settings, persisted as JSON in the OS config directory.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::model::history::MAX_UNDO_FRAMES;
use crate::snapshot::MAX_SNAPSHOTS;

/// Limits and defaults the row store enforces.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineSettings {
    /// Undo frames kept before the oldest is dropped.
    pub max_undo_frames: usize,
    /// Row count a project must stay below.
    pub max_rows: usize,
    pub max_snapshots: usize,
    pub max_display_name_length: usize,
    pub max_alias_length: usize,
    /// Weekly days off for new projects (0 = Sunday).
    pub default_regular_days_off: Vec<u32>,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            max_undo_frames: MAX_UNDO_FRAMES,
            max_rows: 999,
            max_snapshots: MAX_SNAPSHOTS,
            max_display_name_length: 255,
            max_alias_length: 30,
            default_regular_days_off: vec![0, 6],
        }
    }
}

impl EngineSettings {
    /// Location of `settings.json`, falling back to the working directory.
    pub fn config_path() -> PathBuf {
        if let Some(proj_dirs) = directories::ProjectDirs::from("", "", "WbsGantt") {
            proj_dirs.config_dir().join("settings.json")
        } else {
            PathBuf::from(".").join("settings.json")
        }
    }

    /// Load from the default location.
    pub fn load() -> Self {
        Self::load_from(&Self::config_path())
    }

    /// Load from `path`. A missing file gives the defaults; an unreadable one
    /// is reported and also gives the defaults.
    pub fn load_from(path: &Path) -> Self {
        let contents = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Self::default(),
            Err(e) => {
                tracing::warn!("failed to read settings {:?}: {}", path, e);
                return Self::default();
            }
        };
        match serde_json::from_str(&contents) {
            Ok(settings) => settings,
            Err(e) => {
                tracing::warn!("failed to parse settings {:?}: {}", path, e);
                Self::default()
            }
        }
    }

    pub fn save_to(&self, path: &Path) -> crate::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }
}
