//! The presets every installation ships with.
//!
//! Built-ins can be overwritten but never deleted; a missing built-in is
//! restored the next time settings are loaded.

use impersonator_core::{PointOfView, PresetBundle, ResponseStyle};

/// The fallback preset name. Always present in a loaded store.
pub const DEFAULT_PRESET: &str = "Default";

/// Names of all built-in presets, in display order.
pub const BUILTIN_NAMES: [&str; 6] = [
    DEFAULT_PRESET,
    "First Person Short",
    "First Person Detailed",
    "Second Person",
    "Third Person",
    "Adaptive Context",
];

pub fn is_builtin(name: &str) -> bool {
    BUILTIN_NAMES.contains(&name)
}

fn bundle(
    name: &str,
    system_prompt: &str,
    context_size: u32,
    max_tokens: u32,
    instruction: &str,
    point_of_view: PointOfView,
    response_style: ResponseStyle,
) -> PresetBundle {
    PresetBundle {
        name: name.into(),
        system_prompt: system_prompt.into(),
        context_size,
        max_tokens,
        instruction: instruction.into(),
        include_character_card: false,
        include_persona: true,
        point_of_view,
        response_style,
    }
}

/// Fresh copies of the built-in presets, in display order.
pub fn builtin_presets() -> Vec<PresetBundle> {
    vec![
        bundle(
            DEFAULT_PRESET,
            "You are {{user}}. Continue the conversation naturally based on the context and your personality. Stay in character.",
            10,
            200,
            "Write in first person perspective. Match the conversation style.",
            PointOfView::First,
            ResponseStyle::Medium,
        ),
        bundle(
            "First Person Short",
            "You are {{user}}. Reply briefly in first person, staying in character.",
            5,
            100,
            "Use \"I\" perspective. Keep responses to 1-2 sentences. Be direct and immediate.",
            PointOfView::First,
            ResponseStyle::Short,
        ),
        bundle(
            "First Person Detailed",
            "You are {{user}}. Provide detailed first-person responses that reflect your personality, thoughts, and emotions.",
            15,
            400,
            "Use \"I\" perspective. Include internal thoughts and feelings. Be descriptive and expressive.",
            PointOfView::First,
            ResponseStyle::Long,
        ),
        bundle(
            "Second Person",
            "Narrate {{user}}'s actions and responses in second person perspective.",
            10,
            250,
            "Use \"You\" perspective. Describe actions and dialogue as if narrating to the reader.",
            PointOfView::Second,
            ResponseStyle::Medium,
        ),
        bundle(
            "Third Person",
            "Narrate {{user}}'s actions and responses in third person perspective.",
            10,
            250,
            "Use \"{{user}}\" or appropriate pronouns. Describe actions and dialogue from an outside perspective.",
            PointOfView::Third,
            ResponseStyle::Medium,
        ),
        bundle(
            "Adaptive Context",
            "You are {{user}}. Analyze the recent conversation and match the style, length, and tone of previous {{user}} messages.",
            20,
            300,
            "Adapt to the conversation style. If previous messages were short, be brief. If detailed, be expressive. Match the established pattern.",
            PointOfView::First,
            ResponseStyle::Adaptive,
        ),
    ]
}

/// A fresh copy of one built-in by name.
pub fn builtin(name: &str) -> Option<PresetBundle> {
    builtin_presets().into_iter().find(|b| b.name == name)
}
