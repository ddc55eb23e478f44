//! A preset store paired with its working copy.
//!
//! Every operation that changes which preset is active also rebuilds the
//! working copy, so callers never see the two disagree. Changes are announced
//! on the event bus (when one is attached) so the host can persist them.

use crate::active::{ActiveConfiguration, FieldEdit};
use crate::builtins::DEFAULT_PRESET;
use crate::exchange::{PresetExport, SettingsExport};
use crate::store::PresetStore;
use impersonator_config::PersistedSettings;
use impersonator_core::{DomainEvent, EventBus, NotificationLevel, PresetChange, PresetError};
use std::sync::Arc;
use tracing::info;

pub struct PresetSession {
    store: PresetStore,
    active: ActiveConfiguration,
    events: Option<Arc<EventBus>>,
}

impl PresetSession {
    /// Build a session from persisted settings (see [`PresetStore::load`]).
    pub fn load(settings: &PersistedSettings) -> Self {
        let store = PresetStore::load(settings);
        let active = ActiveConfiguration::new(settings.enabled, store.active().clone());
        Self {
            store,
            active,
            events: None,
        }
    }

    /// Announce changes on `bus`.
    pub fn with_events(mut self, bus: Arc<EventBus>) -> Self {
        self.events = Some(bus);
        self
    }

    pub fn store(&self) -> &PresetStore {
        &self.store
    }

    pub fn active(&self) -> &ActiveConfiguration {
        &self.active
    }

    pub fn is_enabled(&self) -> bool {
        self.active.enabled
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.active.enabled = enabled;
        info!(enabled, "Impersonation toggled");
        self.publish(DomainEvent::SettingsChanged {
            enabled,
            timestamp: chrono::Utc::now(),
        });
    }

    /// Apply a form edit to the working copy only.
    pub fn edit(&mut self, edit: FieldEdit) {
        self.active.apply(edit);
    }

    /// Make `name` active and reload the working copy from it.
    pub fn switch(&mut self, name: &str) -> Result<(), PresetError> {
        self.active.bundle = self.store.switch(name)?;
        self.changed(name, PresetChange::Switched);
        Ok(())
    }

    /// Save the working copy into the active preset.
    pub fn commit(&mut self) -> Result<(), PresetError> {
        let name = self.store.active_name().to_string();
        self.store.save(&name, self.active.bundle.clone())?;
        self.active.bundle.name = name.clone();
        self.notify(NotificationLevel::Success, format!("Saved to preset \"{name}\""));
        self.changed(&name, PresetChange::Saved);
        Ok(())
    }

    /// Create a preset from the working copy and make it active.
    pub fn create(&mut self, name: &str) -> Result<(), PresetError> {
        let name = name.trim();
        self.store.create(name, &self.active.bundle)?;
        self.active.bundle = self.store.switch(name)?;
        self.notify(NotificationLevel::Success, format!("Created preset \"{name}\""));
        self.changed(name, PresetChange::Created);
        Ok(())
    }

    /// Delete a user preset; deleting the active one reactivates the default.
    pub fn remove(&mut self, name: &str) -> Result<(), PresetError> {
        let was_active = self.store.active_name() == name;
        self.store.remove(name)?;
        if was_active {
            self.active.bundle = self.store.switch(DEFAULT_PRESET)?;
        }
        self.notify(NotificationLevel::Success, format!("Deleted preset \"{name}\""));
        self.changed(name, PresetChange::Deleted);
        Ok(())
    }

    /// Delete whichever preset is active.
    pub fn remove_active(&mut self) -> Result<(), PresetError> {
        let name = self.store.active_name().to_string();
        self.remove(&name)
    }

    pub fn export(&self, name: &str) -> Result<PresetExport, PresetError> {
        self.store.export_one(name)
    }

    pub fn export_active(&self) -> Result<PresetExport, PresetError> {
        self.store.export_one(self.store.active_name())
    }

    /// Import a preset payload and make it active. See [`PresetStore::import_one`].
    pub fn import(&mut self, payload: &str, rename: Option<&str>) -> Result<String, PresetError> {
        let name = self.store.import_one(payload, rename)?;
        self.active.bundle = self.store.switch(&name)?;
        self.notify(NotificationLevel::Success, format!("Imported preset \"{name}\""));
        self.changed(&name, PresetChange::Imported);
        Ok(name)
    }

    pub fn export_settings(&self) -> SettingsExport {
        SettingsExport::new(self.to_settings())
    }

    /// Replace everything with an exported settings object. Built-ins are
    /// merged back in exactly as on a normal load.
    pub fn import_settings(&mut self, payload: &str) -> Result<(), PresetError> {
        let settings = SettingsExport::parse(payload)?;
        let events = self.events.take();
        *self = Self::load(&settings);
        self.events = events;

        let active = self.store.active_name().to_string();
        self.notify(NotificationLevel::Success, "Settings imported");
        self.changed(&active, PresetChange::Imported);
        self.publish(DomainEvent::SettingsChanged {
            enabled: self.active.enabled,
            timestamp: chrono::Utc::now(),
        });
        Ok(())
    }

    /// Snapshot for persistence. The working copy is not included.
    pub fn to_settings(&self) -> PersistedSettings {
        self.store.to_settings(self.active.enabled)
    }

    fn changed(&self, name: &str, change: PresetChange) {
        self.publish(DomainEvent::preset_changed(name, change));
    }

    fn notify(&self, level: NotificationLevel, message: impl Into<String>) {
        if let Some(bus) = &self.events {
            bus.notify(level, message);
        }
    }

    fn publish(&self, event: DomainEvent) {
        if let Some(bus) = &self.events {
            bus.publish(event);
        }
    }
}

impl Default for PresetSession {
    fn default() -> Self {
        Self::load(&PersistedSettings::default())
    }
}
