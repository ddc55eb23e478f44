//! Placeholder resolution for templates.
//!
//! Resolution runs in two phases over a single-pass scanner:
//!
//! 1. **Style**: `{{pov}}` and `{{length}}` become directive text derived from
//!    the bundle's point of view and response style.
//! 2. **Macros**: `{{user}}`, `{{char}}`, `{{persona}}`, `{{description}}`,
//!    `{{input}}` and any host macro are replaced with live values.
//!
//! Style directives may themselves mention `{{user}}`, so phase 1 always
//! runs first. Substituted values are never scanned again, and a macro with
//! no value resolves to an empty string.

use impersonator_core::{HostContext, MacroSource, PointOfView, PresetBundle, ResponseStyle};

const OPEN: &str = "{{";
const CLOSE: &str = "}}";

/// Macro names owned by the resolver itself.
pub const POV: &str = "pov";
pub const LENGTH: &str = "length";
pub const USER: &str = "user";
pub const CHAR: &str = "char";
pub const PERSONA: &str = "persona";
pub const DESCRIPTION: &str = "description";
pub const INPUT: &str = "input";

/// Resolves templates against one host snapshot and one bundle.
pub struct PlaceholderResolver<'a> {
    context: &'a HostContext,
    host_macros: Option<&'a dyn MacroSource>,
    point_of_view: PointOfView,
    response_style: ResponseStyle,
    include_persona: bool,
    include_character_card: bool,
}

impl<'a> PlaceholderResolver<'a> {
    pub fn new(context: &'a HostContext, bundle: &PresetBundle) -> Self {
        Self {
            context,
            host_macros: None,
            point_of_view: bundle.point_of_view,
            response_style: bundle.response_style,
            include_persona: bundle.include_persona,
            include_character_card: bundle.include_character_card,
        }
    }

    /// Consult the host's macro function before the snapshot's `macros` map.
    pub fn with_macros(mut self, macros: &'a dyn MacroSource) -> Self {
        self.host_macros = Some(macros);
        self
    }

    /// Run both phases.
    pub fn resolve(&self, template: &str) -> String {
        self.expand_macros(&self.resolve_style(template))
    }

    /// Phase 1: replace `{{pov}}` and `{{length}}`. Everything else is kept verbatim.
    pub fn resolve_style(&self, template: &str) -> String {
        scan(template, |name| match normalize(name).as_str() {
            POV => Some(self.point_of_view.directive().to_string()),
            LENGTH => Some(self.response_style.directive().to_string()),
            _ => None,
        })
    }

    /// Phase 2: replace every remaining `{{name}}` with its value or `""`.
    pub fn expand_macros(&self, text: &str) -> String {
        scan(text, |name| Some(self.macro_value(name)))
    }

    fn macro_value(&self, name: &str) -> String {
        let ctx = self.context;
        match normalize(name).as_str() {
            USER => ctx.user_display_name().to_string(),
            CHAR => ctx.character_name().to_string(),
            PERSONA if self.include_persona => ctx.persona.trim().to_string(),
            DESCRIPTION if self.include_character_card => ctx
                .character
                .as_ref()
                .map(|c| c.description.clone())
                .unwrap_or_default(),
            PERSONA | DESCRIPTION => String::new(),
            INPUT => ctx.input.clone(),
            // Style tokens only survive into phase 2 when text skipped phase 1.
            POV => self.point_of_view.directive().to_string(),
            LENGTH => self.response_style.directive().to_string(),
            _ => {
                let key = name.trim();
                self.host_macros
                    .and_then(|host| host.lookup(key))
                    .or_else(|| ctx.macros.get(key).cloned())
                    .unwrap_or_default()
            }
        }
    }
}

/// Whether `text` contains a `{{name}}` placeholder (case and padding insensitive).
pub fn mentions(text: &str, name: &str) -> bool {
    let mut found = false;
    scan(text, |candidate| {
        found |= normalize(candidate) == name;
        None
    });
    found
}

fn normalize(name: &str) -> String {
    name.trim().to_ascii_lowercase()
}

/// Walk `text` once, handing each `{{name}}` to `replace`.
///
/// `Some(value)` is emitted as-is; `None` keeps the placeholder. An unclosed
/// `{{` is copied through literally, and so is a stray `{{` that precedes a
/// real placeholder: the name starts at the last `{{` before `}}`.
fn scan(text: &str, mut replace: impl FnMut(&str) -> Option<String>) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;

    while let Some(start) = rest.find(OPEN) {
        let after_open = &rest[start + OPEN.len()..];
        let Some(end) = after_open.find(CLOSE) else {
            break;
        };

        let name = &after_open[..end];
        if let Some(inner) = name.rfind(OPEN) {
            let literal = start + OPEN.len() + inner;
            out.push_str(&rest[..literal]);
            rest = &rest[literal..];
            continue;
        }

        out.push_str(&rest[..start]);
        match replace(name) {
            Some(value) => out.push_str(&value),
            None => {
                out.push_str(OPEN);
                out.push_str(name);
                out.push_str(CLOSE);
            }
        }
        rest = &after_open[end + CLOSE.len()..];
    }

    out.push_str(rest);
    out
}
