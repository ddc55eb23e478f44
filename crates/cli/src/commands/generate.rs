//! `impersonator generate | test | prompt`: Run the pipeline against a chat file.

use super::workspace::{host_macros, load_chat, Workspace};
use impersonator_agent::{Impersonator, PromptAssembler};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Build the impersonator for an enabled workspace, or explain why not.
fn impersonator(ws: &Workspace, chat: &Path) -> Result<Option<Impersonator>, Box<dyn std::error::Error>> {
    if !ws.session.is_enabled() {
        eprintln!("⚠️  Impersonator is disabled. Run `impersonator enable` first.");
        return Ok(None);
    }

    let context = load_chat(chat)?;
    let generator = impersonator_providers::build_from_config(&ws.config.generator)?;
    Ok(Some(
        Impersonator::new(generator, Arc::new(context))
            .with_events(ws.events.clone())
            .with_macros(host_macros()),
    ))
}

pub async fn run(
    settings: Option<PathBuf>,
    chat: &Path,
    quiet: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let ws = Workspace::open(settings)?;
    let Some(imp) = impersonator(&ws, chat)? else {
        return Ok(());
    };

    let text = imp.command(ws.session.active(), quiet).await;
    ws.finish()?;

    if text.is_empty() {
        return Err("No impersonation generated".into());
    }
    println!("{text}");
    Ok(())
}

pub async fn test(settings: Option<PathBuf>, chat: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let ws = Workspace::open(settings)?;
    let Some(imp) = impersonator(&ws, chat)? else {
        return Ok(());
    };

    let preset = ws.session.active().name().to_string();
    let report = imp.test(ws.session.active()).await;
    ws.finish()?;

    let Some(report) = report else {
        return Err("Test impersonation failed".into());
    };

    println!("🧪 Test Impersonation Result ({preset})");
    println!("==========================");
    println!("{}", report.text);
    println!();
    println!("  {} characters, {} words", report.characters, report.words);
    Ok(())
}

pub fn prompt(settings: Option<PathBuf>, chat: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let ws = Workspace::open(settings)?;
    let context = load_chat(chat)?;
    let active = ws.session.active();

    let prompt = PromptAssembler::new()
        .with_macros(host_macros())
        .assemble(&active.bundle, Some(&context))?;
    let meta = &prompt.metadata;

    println!("── System prompt ─────────────────────────────");
    println!("{}", prompt.system_prompt);
    println!();
    println!("── User prompt ───────────────────────────────");
    println!("{}", prompt.user_prompt);
    println!();
    println!("  Preset:    {}", meta.preset);
    println!("  Turns:     {} of {} in window", meta.turns_included, meta.window);
    println!("  POV:       {}", meta.point_of_view);
    println!("  Style:     {}", meta.response_style);
    match active.bundle.response_length() {
        Some(n) => println!("  Max tokens: {n}"),
        None => println!("  Max tokens: unbounded"),
    }
    if !active.enabled {
        println!("\n  ⚠️  Impersonator is disabled; `generate` would do nothing");
    }

    Ok(ws.finish()?)
}
