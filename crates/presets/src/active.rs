//! The working copy of the active preset.
//!
//! Form edits land here first. Nothing is written back to the store until
//! the user commits ("save to preset"), and the working copy is rebuilt from
//! the store on every load and preset switch.

use impersonator_core::preset::clamp_count;
use impersonator_core::{PointOfView, PresetBundle, ResponseStyle};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveConfiguration {
    /// Generation is a no-op while false
    pub enabled: bool,

    /// Working copy of the active bundle
    pub bundle: PresetBundle,
}

/// A single settings-form edit, as raw as the form delivers it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldEdit {
    SystemPrompt(String),
    ContextSize(i64),
    MaxTokens(i64),
    Instruction(String),
    IncludeCharacterCard(bool),
    IncludePersona(bool),
    PointOfView(PointOfView),
    ResponseStyle(ResponseStyle),
}

impl ActiveConfiguration {
    pub fn new(enabled: bool, bundle: PresetBundle) -> Self {
        Self { enabled, bundle }
    }

    pub fn name(&self) -> &str {
        &self.bundle.name
    }

    /// Apply a form edit in place. Counts are clamped to `>= 0` here.
    pub fn apply(&mut self, edit: FieldEdit) {
        let b = &mut self.bundle;
        match edit {
            FieldEdit::SystemPrompt(text) => b.system_prompt = text,
            FieldEdit::ContextSize(n) => b.context_size = clamp_count(n),
            FieldEdit::MaxTokens(n) => b.max_tokens = clamp_count(n),
            FieldEdit::Instruction(text) => b.instruction = text,
            FieldEdit::IncludeCharacterCard(on) => b.include_character_card = on,
            FieldEdit::IncludePersona(on) => b.include_persona = on,
            FieldEdit::PointOfView(pov) => b.point_of_view = pov,
            FieldEdit::ResponseStyle(style) => b.response_style = style,
        }
    }
}

impl FieldEdit {
    /// Field names accepted by [`FieldEdit::parse`], in form order.
    pub const FIELDS: [&'static str; 8] = [
        "systemPrompt",
        "contextSize",
        "maxTokens",
        "instruction",
        "includeCharCard",
        "includePersona",
        "pov",
        "responseStyle",
    ];

    /// Build an edit from a field name and its textual value.
    ///
    /// Field names are matched ignoring case, `_` and `-`, so
    /// `context-size`, `context_size` and `contextSize` are the same field.
    pub fn parse(field: &str, value: &str) -> Result<Self, String> {
        let key: String = field
            .chars()
            .filter(|c| *c != '_' && *c != '-')
            .flat_map(char::to_lowercase)
            .collect();

        let edit = match key.as_str() {
            "systemprompt" | "prompt" => Self::SystemPrompt(value.to_string()),
            "contextsize" => Self::ContextSize(parse_number(value)?),
            "maxtokens" => Self::MaxTokens(parse_number(value)?),
            "instruction" => Self::Instruction(value.to_string()),
            "includecharcard" | "includecharactercard" => {
                Self::IncludeCharacterCard(parse_flag(value)?)
            }
            "includepersona" => Self::IncludePersona(parse_flag(value)?),
            "pov" | "pointofview" => Self::PointOfView(value.parse()?),
            "responsestyle" | "style" => Self::ResponseStyle(value.parse()?),
            _ => {
                return Err(format!(
                    "unknown field {field:?} (expected one of: {})",
                    Self::FIELDS.join(", ")
                ));
            }
        };
        Ok(edit)
    }
}

impl fmt::Display for FieldEdit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SystemPrompt(text) => write!(f, "systemPrompt = {text:?}"),
            Self::ContextSize(n) => write!(f, "contextSize = {n}"),
            Self::MaxTokens(n) => write!(f, "maxTokens = {n}"),
            Self::Instruction(text) => write!(f, "instruction = {text:?}"),
            Self::IncludeCharacterCard(on) => write!(f, "includeCharCard = {on}"),
            Self::IncludePersona(on) => write!(f, "includePersona = {on}"),
            Self::PointOfView(pov) => write!(f, "pov = {pov}"),
            Self::ResponseStyle(style) => write!(f, "responseStyle = {style}"),
        }
    }
}

fn parse_number(value: &str) -> Result<i64, String> {
    let trimmed = value.trim();
    trimmed
        .parse::<i64>()
        .or_else(|_| trimmed.parse::<f64>().map(|f| f as i64))
        .map_err(|_| format!("expected a number, got {value:?}"))
}

/// Accepts the usual spellings of a boolean toggle.
pub fn parse_flag(value: &str) -> Result<bool, String> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "on" | "yes" | "1" => Ok(true),
        "false" | "off" | "no" | "0" => Ok(false),
        _ => Err(format!("expected true/false, got {value:?}")),
    }
}
