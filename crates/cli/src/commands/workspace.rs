//! Loaded config, settings and preset session for one CLI invocation.

use super::notify::NotificationPrinter;
use chrono::Local;
use impersonator_config::{AppConfig, PersistedSettings};
use impersonator_core::{Error, EventBus, HostContext, MacroSource, Result};
use impersonator_presets::PresetSession;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

pub struct Workspace {
    pub config: AppConfig,
    pub settings_path: PathBuf,
    pub session: PresetSession,
    pub events: Arc<EventBus>,
    printer: NotificationPrinter,
}

impl Workspace {
    pub fn open(settings_override: Option<PathBuf>) -> Result<Self> {
        let config = AppConfig::load()?;
        let settings_path = settings_override.unwrap_or_else(|| config.settings_path());
        let persisted = PersistedSettings::load_or_default(&settings_path);

        let events = Arc::new(EventBus::default());
        let printer = NotificationPrinter::attach(&events);
        let session = PresetSession::load(&persisted).with_events(events.clone());
        debug!(
            path = %settings_path.display(),
            presets = session.store().len(),
            active = %session.store().active_name(),
            "Settings loaded"
        );

        Ok(Self {
            config,
            settings_path,
            session,
            events,
            printer,
        })
    }

    /// Print pending notifications and save the settings file if anything changed.
    pub fn finish(mut self) -> Result<()> {
        if self.printer.flush() {
            self.session.to_settings().save_to(&self.settings_path)?;
            info!(path = %self.settings_path.display(), "Settings saved");
        }
        Ok(())
    }

    /// Directory for exports: `--out` when given, else the configured one.
    pub fn export_dir(&self, out: Option<PathBuf>) -> PathBuf {
        out.unwrap_or_else(|| self.config.export_dir.clone())
    }
}

/// Macros the command line host can answer itself: `{{time}}`, `{{date}}`
/// and `{{weekday}}` from the local clock. Anything else falls through to the
/// chat file's `macros` map.
pub fn host_macros() -> Arc<dyn MacroSource> {
    Arc::new(|name: &str| {
        let now = Local::now();
        let value = match name.to_ascii_lowercase().as_str() {
            "time" => now.format("%-I:%M %p"),
            "date" => now.format("%B %-d, %Y"),
            "weekday" => now.format("%A"),
            _ => return None,
        };
        Some(value.to_string())
    })
}

/// Read a chat snapshot from a JSON file.
pub fn load_chat(path: &Path) -> Result<HostContext> {
    let raw = std::fs::read_to_string(path).map_err(|e| {
        Error::Io(std::io::Error::new(
            e.kind(),
            format!("failed to read chat {}: {e}", path.display()),
        ))
    })?;
    let chat: HostContext = serde_json::from_str(&raw)
        .inspect_err(|e| warn!(path = %path.display(), "Chat file is not valid: {e}"))?;
    debug!(turns = chat.turns.len(), "Chat loaded");
    Ok(chat)
}

/// Write `contents` into `dir/file_name`, creating `dir` if needed.
pub fn write_export(dir: &Path, file_name: &str, contents: &str) -> Result<PathBuf> {
    std::fs::create_dir_all(dir)?;
    let path = dir.join(file_name);
    std::fs::write(&path, contents)?;
    Ok(path)
}
