//! Preset bundles: named configurations for prompt assembly.
//!
//! A bundle is what the user edits in the settings panel: the system prompt
//! template, how much of the chat to include, and the style knobs. Bundles
//! travel as JSON (settings file, export payloads) using the field names the
//! original settings layout used (`systemPrompt`, `includeCharCard`, `pov`…).

use crate::lenient;
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;

pub use crate::lenient::clamp_count;

/// Trailing turns included when a bundle does not say otherwise.
pub const DEFAULT_CONTEXT_SIZE: u32 = 10;

/// Narrative perspective of the generated reply.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PointOfView {
    #[default]
    First,
    Second,
    Third,
}

impl PointOfView {
    pub const ALL: [PointOfView; 3] = [Self::First, Self::Second, Self::Third];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::First => "first",
            Self::Second => "second",
            Self::Third => "third",
        }
    }

    /// Directive text substituted for `{{pov}}`.
    ///
    /// May itself contain macros; it is expanded in the second resolver phase.
    pub fn directive(self) -> &'static str {
        match self {
            Self::First => "first-person, I/me/my",
            Self::Second => "second-person, you/your",
            Self::Third => "third-person, using {{user}}'s name or pronouns",
        }
    }
}

/// Target length and texture of the generated reply.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseStyle {
    Short,
    #[default]
    Medium,
    Long,
    Adaptive,
}

impl ResponseStyle {
    pub const ALL: [ResponseStyle; 4] = [Self::Short, Self::Medium, Self::Long, Self::Adaptive];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Short => "short",
            Self::Medium => "medium",
            Self::Long => "long",
            Self::Adaptive => "adaptive",
        }
    }

    /// Directive text substituted for `{{length}}`.
    pub fn directive(self) -> &'static str {
        match self {
            Self::Short => "1–3 sentences, direct",
            Self::Medium => "2–4 paragraphs, balanced",
            Self::Long => "4+ paragraphs, detailed, with internal thought",
            Self::Adaptive => "match the length/style of {{user}}'s prior messages",
        }
    }
}

macro_rules! keyword_enum_impls {
    ($ty:ident, $what:literal) => {
        impl FromStr for $ty {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let wanted = s.trim().to_ascii_lowercase();
                Self::ALL
                    .into_iter()
                    .find(|v| v.as_str() == wanted)
                    .ok_or_else(|| {
                        let options: Vec<&str> = Self::ALL.iter().map(|v| v.as_str()).collect();
                        format!("unknown {} {s:?} (expected one of: {})", $what, options.join(", "))
                    })
            }
        }

        /// Persisted values are read leniently: anything that is not a
        /// known keyword falls back to the default.
        impl<'de> Deserialize<'de> for $ty {
            fn deserialize<D: Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
                Ok(match serde_json::Value::deserialize(d)? {
                    serde_json::Value::String(s) => s.parse().unwrap_or_default(),
                    _ => Self::default(),
                })
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

keyword_enum_impls!(PointOfView, "point of view");
keyword_enum_impls!(ResponseStyle, "response style");

/// A named configuration bundle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PresetBundle {
    /// Unique key within a store
    #[serde(default, deserialize_with = "lenient::text")]
    pub name: String,

    /// System prompt template; may contain `{{pov}}`, `{{length}}` and macros
    #[serde(default, deserialize_with = "lenient::text")]
    pub system_prompt: String,

    /// Number of trailing chat turns considered for the transcript
    #[serde(default = "default_context_size", deserialize_with = "context_size")]
    pub context_size: u32,

    /// Response length passed to the backend; 0 means unbounded
    #[serde(default, deserialize_with = "max_tokens")]
    pub max_tokens: u32,

    /// Free-text instruction appended to the system prompt (empty = none)
    #[serde(default, deserialize_with = "lenient::text")]
    pub instruction: String,

    #[serde(
        default,
        rename = "includeCharCard",
        alias = "includeCharacterCard",
        deserialize_with = "lenient::flag_or_false"
    )]
    pub include_character_card: bool,

    #[serde(default = "default_true", deserialize_with = "lenient::flag_or_true")]
    pub include_persona: bool,

    #[serde(default, rename = "pov", alias = "pointOfView")]
    pub point_of_view: PointOfView,

    #[serde(default)]
    pub response_style: ResponseStyle,
}

fn default_context_size() -> u32 {
    DEFAULT_CONTEXT_SIZE
}

fn default_true() -> bool {
    true
}

fn context_size<'de, D: Deserializer<'de>>(d: D) -> Result<u32, D::Error> {
    let value = Option::<serde_json::Value>::deserialize(d)?;
    Ok(value
        .as_ref()
        .and_then(lenient::count_from_value)
        .unwrap_or(DEFAULT_CONTEXT_SIZE))
}

fn max_tokens<'de, D: Deserializer<'de>>(d: D) -> Result<u32, D::Error> {
    let value = Option::<serde_json::Value>::deserialize(d)?;
    Ok(value.as_ref().and_then(lenient::count_from_value).unwrap_or(0))
}

impl PresetBundle {
    /// A bundle with the given name and default knobs.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            system_prompt: String::new(),
            context_size: DEFAULT_CONTEXT_SIZE,
            max_tokens: 0,
            instruction: String::new(),
            include_character_card: false,
            include_persona: true,
            point_of_view: PointOfView::default(),
            response_style: ResponseStyle::default(),
        }
    }

    /// The instruction text, or `None` when blank.
    pub fn instruction(&self) -> Option<&str> {
        let trimmed = self.instruction.trim();
        (!trimmed.is_empty()).then_some(trimmed)
    }

    /// Response length for the backend: `None` means unbounded.
    pub fn response_length(&self) -> Option<u32> {
        (self.max_tokens > 0).then_some(self.max_tokens)
    }

    /// Copy of this bundle under another name.
    pub fn renamed(&self, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..self.clone()
        }
    }
}
