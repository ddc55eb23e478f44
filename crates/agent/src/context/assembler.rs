//! Prompt assembly: bundle + host snapshot in, `{system, user}` prompts out.
//!
//! The system prompt is built from the resolved template followed by up to
//! four optional sections, always in this order:
//!
//! 1. **Persona** (`includePersona`, non-empty persona text)
//! 2. **Character** (`includeCharCard`, a character with a description)
//! 3. **Additional instructions** (non-empty `instruction`)
//! 4. **Style summary** (only when neither template nor instruction embeds
//!    `{{pov}}`/`{{length}}`)
//!
//! A section whose placeholder already appears in the template is not
//! appended a second time. Empty sections are skipped without a header.
//!
//! # Determinism
//!
//! Assembly is pure: identical bundle and snapshot always produce
//! byte-identical prompts. No clock or randomness is involved.

use crate::context::resolver::{self, PlaceholderResolver};
use crate::context::window::{self, Transcript};
use impersonator_core::{
    GenerationError, HostContext, MacroSource, PointOfView, PresetBundle, ResponseStyle,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;

// ── Types ─────────────────────────────────────────────────────────────────

/// The two prompt strings sent to the generator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImpersonationPrompt {
    pub system_prompt: String,
    pub user_prompt: String,
    pub metadata: PromptMetadata,
}

/// What went into an assembled prompt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromptMetadata {
    /// Bundle the prompt was built from
    pub preset: String,
    /// Turns considered (`min(contextSize, total)`)
    pub window: usize,
    /// Turns present in the transcript
    pub turns_included: usize,
    /// Optional sections appended to the system prompt, in order
    pub sections: Vec<Section>,
    pub point_of_view: PointOfView,
    pub response_style: ResponseStyle,
}

/// Optional prompt sections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Section {
    Persona,
    Character,
    Instruction,
    StyleSummary,
    Idea,
}

/// Errors from prompt assembly.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AssemblyError {
    /// No chat is open, or it has no turns.
    #[error("No conversation context available")]
    NoContext,
}

impl From<AssemblyError> for GenerationError {
    fn from(err: AssemblyError) -> Self {
        match err {
            AssemblyError::NoContext => GenerationError::NoContext,
        }
    }
}

// ── Assembler ─────────────────────────────────────────────────────────────

/// The prompt assembler. Holds no per-request state; create one and reuse it.
#[derive(Clone, Default)]
pub struct PromptAssembler {
    /// Host macro function, consulted before the snapshot's `macros`
    macros: Option<Arc<dyn MacroSource>>,
}

impl PromptAssembler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Expand host macros through `macros`.
    pub fn with_macros(mut self, macros: Arc<dyn MacroSource>) -> Self {
        self.macros = Some(macros);
        self
    }

    /// Assemble prompts for `bundle` against a host snapshot.
    ///
    /// Fails with [`AssemblyError::NoContext`] when `context` is `None` or has
    /// no turns. An empty transcript after filtering is not an error.
    pub fn assemble(
        &self,
        bundle: &PresetBundle,
        context: Option<&HostContext>,
    ) -> Result<ImpersonationPrompt, AssemblyError> {
        let ctx = context
            .filter(|c| c.has_conversation())
            .ok_or(AssemblyError::NoContext)?;

        let mut resolver = PlaceholderResolver::new(ctx, bundle);
        if let Some(macros) = &self.macros {
            resolver = resolver.with_macros(macros.as_ref());
        }
        let user = Self::user_label(ctx);
        let mut sections = Vec::new();

        // ── System prompt ─────────────────────────────────────────────────
        let mut system_prompt = resolver.resolve(&bundle.system_prompt);

        if let Some(persona) = Self::persona_section(bundle, ctx, user) {
            system_prompt.push_str(&persona);
            sections.push(Section::Persona);
        }

        if let Some(character) = Self::character_section(bundle, ctx) {
            system_prompt.push_str(&character);
            sections.push(Section::Character);
        }

        let instruction = bundle.instruction();
        if let Some(text) = instruction {
            let resolved = resolver.resolve(text);
            if !resolved.trim().is_empty() {
                system_prompt.push_str("\n\n### Additional Instructions:\n");
                system_prompt.push_str(resolved.trim());
                sections.push(Section::Instruction);
            }
        }

        let embeds_style = [bundle.system_prompt.as_str(), instruction.unwrap_or("")]
            .iter()
            .any(|t| resolver::mentions(t, resolver::POV) || resolver::mentions(t, resolver::LENGTH));
        if !embeds_style {
            system_prompt.push_str(&format!(
                "\n\n### Style Instructions:\nPoint of view: {}\nResponse length: {}",
                resolver.expand_macros(bundle.point_of_view.directive()),
                resolver.expand_macros(bundle.response_style.directive()),
            ));
            sections.push(Section::StyleSummary);
        }

        // ── User prompt ───────────────────────────────────────────────────
        let transcript = window::window(&ctx.turns, bundle.context_size as usize, user);
        let mut user_prompt = String::new();

        if !transcript.is_empty() {
            user_prompt.push_str("### Recent Conversation:\n\n");
            user_prompt.push_str(&transcript.text);
            user_prompt.push_str("\n\n");
        }

        if let Some(idea) = Self::idea_section(bundle, ctx, &resolver, user) {
            user_prompt.push_str(&idea);
            sections.push(Section::Idea);
        }

        user_prompt.push_str(user);
        user_prompt.push(':');

        Ok(ImpersonationPrompt {
            system_prompt,
            user_prompt,
            metadata: Self::metadata(bundle, &transcript, sections),
        })
    }

    // ── Private section renderers ─────────────────────────────────────────

    /// Label for the user's turns and the trailing speaker line: the display
    /// name, else the name on the user's latest turn, else "User".
    fn user_label(ctx: &HostContext) -> &str {
        let name = ctx.user_display_name().trim();
        if !name.is_empty() {
            return name;
        }
        ctx.turns
            .iter()
            .rev()
            .filter(|t| t.is_from_user)
            .map(|t| t.speaker_name.trim())
            .find(|n| !n.is_empty())
            .unwrap_or("User")
    }

    fn persona_section(bundle: &PresetBundle, ctx: &HostContext, user: &str) -> Option<String> {
        if !bundle.include_persona || resolver::mentions(&bundle.system_prompt, resolver::PERSONA) {
            return None;
        }
        let persona = ctx.persona.trim();
        if persona.is_empty() {
            return None;
        }
        Some(format!("\n\n### Your Persona ({user}):\n{persona}"))
    }

    fn character_section(bundle: &PresetBundle, ctx: &HostContext) -> Option<String> {
        if !bundle.include_character_card
            || resolver::mentions(&bundle.system_prompt, resolver::DESCRIPTION)
        {
            return None;
        }
        let character = ctx.character.as_ref()?;
        let description = character.description.trim();
        if description.is_empty() {
            return None;
        }
        Some(format!(
            "\n\n### Character Information ({}):\n{description}",
            character.name
        ))
    }

    /// Free-form input, offered as guidance for the next message.
    fn idea_section(
        bundle: &PresetBundle,
        ctx: &HostContext,
        resolver: &PlaceholderResolver<'_>,
        user: &str,
    ) -> Option<String> {
        let embedded = [bundle.system_prompt.as_str(), bundle.instruction.as_str()]
            .iter()
            .any(|t| resolver::mentions(t, resolver::INPUT));
        if embedded || ctx.input.trim().is_empty() {
            return None;
        }
        let idea = resolver.resolve(ctx.input.trim());
        let idea = idea.trim();
        if idea.is_empty() {
            return None;
        }
        Some(format!(
            "### Idea for {user}'s next message (guidance only, do not copy verbatim):\n{idea}\n\n"
        ))
    }

    fn metadata(bundle: &PresetBundle, transcript: &Transcript, sections: Vec<Section>) -> PromptMetadata {
        PromptMetadata {
            preset: bundle.name.clone(),
            window: transcript.window,
            turns_included: transcript.included,
            sections,
            point_of_view: bundle.point_of_view,
            response_style: bundle.response_style,
        }
    }
}
