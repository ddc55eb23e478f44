//! `impersonator settings | enable | disable`: Whole-settings commands.

use super::workspace::{write_export, Workspace};
use clap::Subcommand;
use std::path::PathBuf;

#[derive(Subcommand)]
pub enum SettingsAction {
    /// Export every preset and the enabled flag to a JSON file
    Export {
        /// Output directory
        #[arg(long)]
        out: Option<PathBuf>,
    },

    /// Replace all settings with an exported file (built-ins are restored)
    Import { file: PathBuf },
}

pub fn run(settings: Option<PathBuf>, action: SettingsAction) -> Result<(), Box<dyn std::error::Error>> {
    let mut ws = Workspace::open(settings)?;

    match action {
        SettingsAction::Export { out } => {
            let export = ws.session.export_settings();
            let path = write_export(&ws.export_dir(out), &export.file_name(), &export.to_json()?)?;
            println!("✅ Settings exported to {}", path.display());
        }
        SettingsAction::Import { file } => {
            let payload = std::fs::read_to_string(&file)
                .map_err(|e| format!("Failed to read {}: {e}", file.display()))?;
            ws.session
                .import_settings(&payload)
                .map_err(|e| format!("Failed to import settings: {e}"))?;
            println!(
                "Active preset: {} ({} presets, {})",
                ws.session.store().active_name(),
                ws.session.store().len(),
                if ws.session.is_enabled() { "enabled" } else { "disabled" }
            );
        }
    }

    Ok(ws.finish()?)
}

pub fn toggle(settings: Option<PathBuf>, enabled: bool) -> Result<(), Box<dyn std::error::Error>> {
    let mut ws = Workspace::open(settings)?;
    ws.session.set_enabled(enabled);
    println!("Impersonator {}", if enabled { "enabled" } else { "disabled" });
    Ok(ws.finish()?)
}
