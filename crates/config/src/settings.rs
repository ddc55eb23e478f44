//! The persisted settings object.
//!
//! One JSON document per installation:
//!
//! ```json
//! { "enabled": true, "activePreset": "Default", "presets": { "Default": { … } } }
//! ```
//!
//! Preset order in the file is the order shown to the user, so presets are
//! kept in an [`IndexMap`]. Loading never fails: a missing or unreadable file
//! yields empty settings, and the preset store fills in the built-ins. Fields
//! of the wrong type fall back to defaults and a damaged preset entry is
//! skipped on its own. A file that cannot be parsed at all is copied to
//! `<file>.bak` first, so a later save never destroys it.

use crate::ConfigError;
use impersonator_core::{lenient, PresetBundle};
use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedSettings {
    /// Generation is a no-op while false
    #[serde(default, deserialize_with = "lenient::flag_or_false")]
    pub enabled: bool,

    /// Key into `presets`; may be stale, the store repairs it on load
    #[serde(default, alias = "activeName", deserialize_with = "lenient::text")]
    pub active_preset: String,

    #[serde(default, deserialize_with = "presets_skipping_invalid")]
    pub presets: IndexMap<String, PresetBundle>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawPresets {
    Entries(IndexMap<String, serde_json::Value>),
    Other(serde_json::Value),
}

fn presets_skipping_invalid<'de, D: Deserializer<'de>>(
    d: D,
) -> Result<IndexMap<String, PresetBundle>, D::Error> {
    let entries = match RawPresets::deserialize(d)? {
        RawPresets::Entries(entries) => entries,
        RawPresets::Other(serde_json::Value::Null) => return Ok(IndexMap::new()),
        RawPresets::Other(other) => {
            warn!("Ignoring presets: expected an object, found {other}");
            return Ok(IndexMap::new());
        }
    };

    let mut presets = IndexMap::with_capacity(entries.len());
    for (name, raw) in entries {
        match serde_json::from_value::<PresetBundle>(raw) {
            Ok(bundle) => {
                presets.insert(name, bundle);
            }
            Err(e) => warn!(preset = %name, "Skipping unreadable preset: {e}"),
        }
    }
    Ok(presets)
}

impl PersistedSettings {
    /// Read settings from `path`, falling back to defaults on any problem.
    pub fn load_or_default(path: &Path) -> Self {
        match Self::load_from(path) {
            Ok(Some(settings)) => settings,
            Ok(None) => {
                debug!("No settings file at {}, starting fresh", path.display());
                Self::default()
            }
            Err(e) => {
                warn!("Ignoring unusable settings file: {e}");
                if matches!(e, ConfigError::ParseError { .. }) {
                    back_up(path);
                }
                Self::default()
            }
        }
    }

    /// Read settings from `path`. `Ok(None)` when the file does not exist.
    pub fn load_from(path: &Path) -> Result<Option<Self>, ConfigError> {
        if !path.exists() {
            return Ok(None);
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        serde_json::from_str(&content)
            .map(Some)
            .map_err(|e| ConfigError::ParseError {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })
    }

    /// Write settings as pretty JSON, creating parent directories.
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        let write_err = |reason: String| ConfigError::WriteError {
            path: path.to_path_buf(),
            reason,
        };

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| write_err(e.to_string()))?;
        }

        let json = serde_json::to_string_pretty(self).map_err(|e| write_err(e.to_string()))?;
        std::fs::write(path, json).map_err(|e| write_err(e.to_string()))?;
        debug!(presets = self.presets.len(), "Settings saved to {}", path.display());
        Ok(())
    }
}

/// Where an unparsable settings file is preserved: `<file>.bak`.
pub fn backup_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".bak");
    PathBuf::from(name)
}

fn back_up(path: &Path) {
    let backup = backup_path(path);
    match std::fs::copy(path, &backup) {
        Ok(_) => warn!("Unparsable settings copied to {}", backup.display()),
        Err(e) => warn!("Could not back up {}: {e}", path.display()),
    }
}
