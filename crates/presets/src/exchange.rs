//! Export and import payloads.
//!
//! A single preset travels as `{version, preset, timestamp}`; the whole
//! settings object as `{version, settings, timestamp}`. Both are written as
//! pretty UTF-8 JSON.

use chrono::{DateTime, Utc};
use impersonator_config::PersistedSettings;
use impersonator_core::{PresetBundle, PresetError};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Payload format version written by this crate.
pub const EXPORT_VERSION: &str = "1.0";

/// Prefix of every exported file name.
const FILE_PREFIX: &str = "impersonator";

/// A single exported preset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PresetExport {
    pub version: String,
    pub preset: PresetBundle,
    pub timestamp: DateTime<Utc>,
}

impl PresetExport {
    pub fn new(bundle: &PresetBundle) -> Self {
        Self {
            version: EXPORT_VERSION.into(),
            preset: bundle.clone(),
            timestamp: Utc::now(),
        }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// File name for this export, e.g. `impersonator-first-person-short-1718000000000.json`.
    pub fn file_name(&self) -> String {
        export_file_name(&slug(&self.preset.name), self.timestamp)
    }

    /// Extract the bundle from a payload.
    ///
    /// Only the presence of a non-empty `preset.name` is required; every other
    /// bundle field falls back to its default.
    pub fn parse(payload: &str) -> Result<PresetBundle, PresetError> {
        let value = parse_json(payload)?;
        check_version(&value);

        let preset = value
            .get("preset")
            .filter(|p| p.is_object())
            .ok_or_else(|| PresetError::InvalidFormat("missing preset object".into()))?;

        let has_name = preset
            .get("name")
            .and_then(|n| n.as_str())
            .is_some_and(|n| !n.trim().is_empty());
        if !has_name {
            return Err(PresetError::InvalidFormat("preset has no name".into()));
        }

        serde_json::from_value(preset.clone()).map_err(|e| PresetError::InvalidFormat(e.to_string()))
    }
}

/// The whole settings object, exported.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SettingsExport {
    pub version: String,
    pub settings: PersistedSettings,
    pub timestamp: DateTime<Utc>,
}

impl SettingsExport {
    pub fn new(settings: PersistedSettings) -> Self {
        Self {
            version: EXPORT_VERSION.into(),
            settings,
            timestamp: Utc::now(),
        }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn file_name(&self) -> String {
        export_file_name("settings", self.timestamp)
    }

    /// Extract the settings object from a payload.
    pub fn parse(payload: &str) -> Result<PersistedSettings, PresetError> {
        let value = parse_json(payload)?;
        check_version(&value);

        let settings = value
            .get("settings")
            .filter(|s| s.is_object())
            .ok_or_else(|| PresetError::InvalidFormat("missing settings object".into()))?;

        serde_json::from_value(settings.clone()).map_err(|e| PresetError::InvalidFormat(e.to_string()))
    }
}

fn parse_json(payload: &str) -> Result<serde_json::Value, PresetError> {
    serde_json::from_str(payload).map_err(|e| PresetError::InvalidFormat(format!("not valid JSON: {e}")))
}

fn check_version(value: &serde_json::Value) {
    match value.get("version").and_then(|v| v.as_str()) {
        Some(EXPORT_VERSION) => {}
        Some(other) => warn!(version = other, "Importing payload with unknown version"),
        None => warn!("Importing payload without a version"),
    }
}

/// Lowercase a preset name and collapse whitespace runs into dashes.
pub fn slug(name: &str) -> String {
    name.split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join("-")
}

fn export_file_name(stem: &str, at: DateTime<Utc>) -> String {
    format!("{FILE_PREFIX}-{stem}-{}.json", at.timestamp_millis())
}
