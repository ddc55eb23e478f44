//! The preset store: named bundles plus the active selection.
//!
//! Invariants kept by every operation:
//! - every key is a non-empty name and equals its bundle's `name`
//! - all built-ins are present (they may be customized, never removed)
//! - `active_name` always resolves to a bundle

use crate::builtins::{self, DEFAULT_PRESET};
use crate::exchange::PresetExport;
use impersonator_config::PersistedSettings;
use impersonator_core::{PresetBundle, PresetError};
use indexmap::IndexMap;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, PartialEq)]
pub struct PresetStore {
    bundles: IndexMap<String, PresetBundle>,
    active_name: String,
}

impl PresetStore {
    /// A store holding only the built-ins, with the default preset active.
    pub fn with_builtins() -> Self {
        Self::load(&PersistedSettings::default())
    }

    /// Merge persisted presets with the built-ins.
    ///
    /// Persisted bundles win over built-ins of the same name; built-ins only
    /// fill gaps and are appended after the persisted ones. A stale or empty
    /// active name falls back to the default preset.
    pub fn load(persisted: &PersistedSettings) -> Self {
        let capacity = persisted.presets.len() + builtins::BUILTIN_NAMES.len();
        let mut bundles = IndexMap::with_capacity(capacity);

        for (key, bundle) in &persisted.presets {
            if key.trim().is_empty() {
                warn!("Skipping persisted preset with an empty name");
                continue;
            }
            let mut bundle = bundle.clone();
            if bundle.name != *key {
                debug!(key = %key, name = %bundle.name, "Preset name differs from its key, using key");
                bundle.name = key.clone();
            }
            bundles.insert(key.clone(), bundle);
        }

        for builtin in builtins::builtin_presets() {
            if !bundles.contains_key(&builtin.name) {
                bundles.insert(builtin.name.clone(), builtin);
            }
        }

        let active_name = if bundles.contains_key(&persisted.active_preset) {
            persisted.active_preset.clone()
        } else {
            if !persisted.active_preset.is_empty() {
                warn!(
                    preset = %persisted.active_preset,
                    fallback = DEFAULT_PRESET,
                    "Active preset missing, falling back"
                );
            }
            DEFAULT_PRESET.to_string()
        };

        debug!(presets = bundles.len(), active = %active_name, "Preset store loaded");
        Self {
            bundles,
            active_name,
        }
    }

    /// Snapshot for persistence.
    pub fn to_settings(&self, enabled: bool) -> PersistedSettings {
        PersistedSettings {
            enabled,
            active_preset: self.active_name.clone(),
            presets: self.bundles.clone(),
        }
    }

    /// Preset names in display (insertion) order.
    pub fn list(&self) -> Vec<&str> {
        self.bundles.keys().map(String::as_str).collect()
    }

    pub fn len(&self) -> usize {
        self.bundles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bundles.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.bundles.contains_key(name)
    }

    pub fn get(&self, name: &str) -> Option<&PresetBundle> {
        self.bundles.get(name)
    }

    pub fn is_builtin(&self, name: &str) -> bool {
        builtins::is_builtin(name)
    }

    pub fn active_name(&self) -> &str {
        &self.active_name
    }

    /// The bundle selected by `active_name`.
    pub fn active(&self) -> &PresetBundle {
        // active_name always resolves
        &self.bundles[self.active_name.as_str()]
    }

    /// Select a preset and return a working copy of it.
    pub fn switch(&mut self, name: &str) -> Result<PresetBundle, PresetError> {
        let bundle = self
            .bundles
            .get(name)
            .cloned()
            .ok_or_else(|| PresetError::NotFound(name.to_string()))?;
        self.active_name = name.to_string();
        info!(preset = %name, "Switched preset");
        Ok(bundle)
    }

    /// Insert or overwrite a preset. Overwriting a built-in is allowed.
    pub fn save(&mut self, name: &str, bundle: PresetBundle) -> Result<(), PresetError> {
        validate_name(name)?;
        let bundle = if bundle.name == name {
            bundle
        } else {
            bundle.renamed(name)
        };
        self.bundles.insert(name.to_string(), bundle);
        debug!(preset = %name, "Saved preset");
        Ok(())
    }

    /// Add a new preset copied from `from`. Never overwrites.
    pub fn create(&mut self, name: &str, from: &PresetBundle) -> Result<PresetBundle, PresetError> {
        validate_name(name)?;
        if self.contains(name) {
            return Err(self.conflict(name, "copy"));
        }
        let bundle = from.renamed(name);
        self.bundles.insert(name.to_string(), bundle.clone());
        info!(preset = %name, "Created preset");
        Ok(bundle)
    }

    /// Delete a user preset. If it was active, the default becomes active.
    pub fn remove(&mut self, name: &str) -> Result<PresetBundle, PresetError> {
        if builtins::is_builtin(name) {
            return Err(PresetError::Protected(name.to_string()));
        }
        let removed = self
            .bundles
            .shift_remove(name)
            .ok_or_else(|| PresetError::NotFound(name.to_string()))?;
        if self.active_name == name {
            self.active_name = DEFAULT_PRESET.to_string();
        }
        info!(preset = %name, "Deleted preset");
        Ok(removed)
    }

    /// Wrap one preset in an export payload.
    pub fn export_one(&self, name: &str) -> Result<PresetExport, PresetError> {
        self.get(name)
            .map(PresetExport::new)
            .ok_or_else(|| PresetError::NotFound(name.to_string()))
    }

    /// Add a preset from an export payload and return the name it was stored
    /// under.
    ///
    /// If the payload's name is taken and no `rename` is given, this fails
    /// with [`PresetError::NameConflict`] carrying a suggested free name.
    /// A `rename` that is itself taken is rejected the same way; existing
    /// presets are never overwritten.
    pub fn import_one(&mut self, payload: &str, rename: Option<&str>) -> Result<String, PresetError> {
        let bundle = PresetExport::parse(payload)?;

        let name = match rename.map(str::trim) {
            Some(new_name) => new_name.to_string(),
            None => bundle.name.clone(),
        };
        validate_name(&name)?;
        if self.contains(&name) {
            return Err(self.conflict(&name, "imported"));
        }

        self.bundles.insert(name.clone(), bundle.renamed(name.as_str()));
        info!(preset = %name, "Imported preset");
        Ok(name)
    }

    /// A free name derived from `base` and a `tag`, e.g. "Default (imported)"
    /// or "Default (copy 2)".
    pub fn suggest_name(&self, base: &str, tag: &str) -> String {
        let first = format!("{base} ({tag})");
        if !self.contains(&first) {
            return first;
        }
        (2..)
            .map(|n| format!("{base} ({tag} {n})"))
            .find(|candidate| !self.contains(candidate))
            .unwrap_or(first)
    }

    fn conflict(&self, name: &str, tag: &str) -> PresetError {
        PresetError::NameConflict {
            name: name.to_string(),
            suggestion: self.suggest_name(name, tag),
        }
    }
}

impl Default for PresetStore {
    fn default() -> Self {
        Self::with_builtins()
    }
}

fn validate_name(name: &str) -> Result<(), PresetError> {
    if name.trim().is_empty() {
        return Err(PresetError::InvalidName(name.to_string()));
    }
    Ok(())
}
