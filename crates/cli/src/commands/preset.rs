//! `impersonator preset`: Preset management commands.

use super::workspace::{write_export, Workspace};
use clap::Subcommand;
use impersonator_core::PresetError;
use impersonator_presets::FieldEdit;
use std::path::PathBuf;

#[derive(Subcommand)]
pub enum PresetAction {
    /// List presets (active one marked with *)
    List,

    /// Show a preset's fields (default: the active preset)
    Show { name: Option<String> },

    /// Make a preset active
    Use { name: String },

    /// Create a preset from the active one and switch to it
    New { name: String },

    /// Set one field of the active preset and save it
    Set { field: String, value: String },

    /// Delete a preset (default: the active preset)
    Delete { name: Option<String> },

    /// Export a preset to a JSON file (default: the active preset)
    Export {
        name: Option<String>,

        /// Output directory
        #[arg(long)]
        out: Option<PathBuf>,
    },

    /// Import a preset from a JSON file and switch to it
    Import {
        file: PathBuf,

        /// Name to import under, for when the preset's own name is taken
        #[arg(long)]
        name: Option<String>,
    },
}

pub fn run(settings: Option<PathBuf>, action: PresetAction) -> Result<(), Box<dyn std::error::Error>> {
    let mut ws = Workspace::open(settings)?;

    match action {
        PresetAction::List => list(&ws),
        PresetAction::Show { name } => show(&ws, name.as_deref())?,
        PresetAction::Use { name } => {
            ws.session.switch(&name)?;
            println!("Active preset: {name}");
        }
        PresetAction::New { name } => ws.session.create(&name)?,
        PresetAction::Set { field, value } => {
            let edit = FieldEdit::parse(&field, &value)?;
            ws.session.edit(edit.clone());
            ws.session.commit()?;
            println!("{edit}");
        }
        PresetAction::Delete { name } => match name {
            Some(name) => ws.session.remove(&name)?,
            None => ws.session.remove_active()?,
        },
        PresetAction::Export { name, out } => {
            let export = match name {
                Some(name) => ws.session.export(&name)?,
                None => ws.session.export_active()?,
            };
            let path = write_export(&ws.export_dir(out), &export.file_name(), &export.to_json()?)?;
            println!("✅ Preset exported to {}", path.display());
        }
        PresetAction::Import { file, name } => {
            let payload = std::fs::read_to_string(&file)
                .map_err(|e| format!("Failed to read {}: {e}", file.display()))?;
            if let Err(e) = ws.session.import(&payload, name.as_deref()) {
                if let PresetError::NameConflict { suggestion, .. } = &e {
                    eprintln!("   Retry with --name \"{suggestion}\"");
                }
                return Err(format!("Failed to import preset: {e}").into());
            }
        }
    }

    Ok(ws.finish()?)
}

fn list(ws: &Workspace) {
    let store = ws.session.store();
    for name in store.list() {
        let marker = if name == store.active_name() { "*" } else { " " };
        let tag = if store.is_builtin(name) { "  (built-in)" } else { "" };
        println!("{marker} {name}{tag}");
    }
}

fn show(ws: &Workspace, name: Option<&str>) -> Result<(), Box<dyn std::error::Error>> {
    let bundle = match name {
        Some(name) => ws
            .session
            .store()
            .get(name)
            .ok_or_else(|| PresetError::NotFound(name.to_string()))?,
        None => &ws.session.active().bundle,
    };
    println!("{}", serde_json::to_string_pretty(bundle)?);
    Ok(())
}
