//! Host-supplied chat state.
//!
//! The host application owns the message store, the character cards and the
//! user persona. Impersonator only ever reads a snapshot of them through
//! [`ContextSource`]. Field aliases accept the chat export layout used by
//! SillyTavern (`name`, `mes`, `is_user`, `is_system`).

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A single chat turn as the host stores it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationTurn {
    /// Display name of whoever wrote the turn
    #[serde(default, alias = "name")]
    pub speaker_name: String,

    /// Message body; absent for some host-internal entries
    #[serde(default, alias = "mes")]
    pub text: Option<String>,

    /// Host notes (narrator, hidden system messages) are never windowed
    #[serde(default, alias = "is_system")]
    pub is_system_note: bool,

    /// Whether the user wrote this turn
    #[serde(default, alias = "is_user")]
    pub is_from_user: bool,
}

impl ConversationTurn {
    /// A turn written by the user.
    pub fn user(speaker: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            speaker_name: speaker.into(),
            text: Some(text.into()),
            is_system_note: false,
            is_from_user: true,
        }
    }

    /// A turn written by a character.
    pub fn character(speaker: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            speaker_name: speaker.into(),
            text: Some(text.into()),
            is_system_note: false,
            is_from_user: false,
        }
    }

    /// A host system note.
    pub fn system_note(text: impl Into<String>) -> Self {
        Self {
            speaker_name: "System".into(),
            text: Some(text.into()),
            is_system_note: true,
            is_from_user: false,
        }
    }

    /// The message body when present and non-empty.
    pub fn body(&self) -> Option<&str> {
        self.text.as_deref().filter(|t| !t.is_empty())
    }
}

/// The character card currently selected in the host.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CharacterInfo {
    #[serde(default)]
    pub id: String,

    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub description: String,
}

/// A read-only snapshot of everything prompt assembly needs from the host.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostContext {
    /// Ordered chat, oldest first
    #[serde(default, alias = "chat")]
    pub turns: Vec<ConversationTurn>,

    /// Active character, if a character chat is open
    #[serde(default)]
    pub character: Option<CharacterInfo>,

    /// The user's default persona name
    #[serde(default, alias = "name1")]
    pub user_name: String,

    /// Per-chat name override; wins over `user_name` when set
    #[serde(default)]
    pub user_name_override: Option<String>,

    /// Persona description text
    #[serde(default)]
    pub persona: String,

    /// Whatever the user has typed into the input box so far
    #[serde(default)]
    pub input: String,

    /// Host-wide macro values (`{{time}}`, `{{model}}`, …)
    #[serde(default)]
    pub macros: BTreeMap<String, String>,
}

impl HostContext {
    /// The name the user is shown as: override first, then persona name.
    pub fn user_display_name(&self) -> &str {
        self.user_name_override
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .unwrap_or(self.user_name.as_str())
    }

    /// The active character's name, or empty when there is none.
    pub fn character_name(&self) -> &str {
        self.character.as_ref().map_or("", |c| c.name.as_str())
    }

    pub fn has_conversation(&self) -> bool {
        !self.turns.is_empty()
    }
}

/// Expands host-wide `{{name}}` macros that Impersonator does not own.
///
/// This is the host's macro-substitution function. Returning `None` means
/// the host has no value; the resolver then tries the snapshot's `macros`
/// map and finally substitutes an empty string.
pub trait MacroSource: Send + Sync {
    fn lookup(&self, name: &str) -> Option<String>;
}

impl<F> MacroSource for F
where
    F: Fn(&str) -> Option<String> + Send + Sync,
{
    fn lookup(&self, name: &str) -> Option<String> {
        self(name)
    }
}

/// Supplies the current chat snapshot, or `None` when no chat is open.
pub trait ContextSource: Send + Sync {
    fn snapshot(&self) -> Option<HostContext>;
}

/// A fixed snapshot, e.g. loaded from a chat export file.
impl ContextSource for HostContext {
    fn snapshot(&self) -> Option<HostContext> {
        Some(self.clone())
    }
}

impl<F> ContextSource for F
where
    F: Fn() -> Option<HostContext> + Send + Sync,
{
    fn snapshot(&self) -> Option<HostContext> {
        self()
    }
}
