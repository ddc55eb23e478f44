//! Conversation windowing: the last N eligible turns as a transcript.

use impersonator_core::ConversationTurn;

/// The rendered window plus what went into it.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Transcript {
    /// `"<speaker>: <text>"` lines joined by a blank line
    pub text: String,

    /// Turns considered: `min(window size, total turns)`
    pub window: usize,

    /// Turns that survived filtering and appear in `text`
    pub included: usize,
}

impl Transcript {
    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }
}

/// Render the most recent `size` turns, oldest first.
///
/// The window is taken before filtering, so system notes and empty turns
/// inside it reduce the transcript rather than pulling in older turns.
/// User turns are labelled `user_label` (their own name when it is blank);
/// everyone else by their own name.
pub fn window(turns: &[ConversationTurn], size: usize, user_label: &str) -> Transcript {
    let take = size.min(turns.len());
    let recent = &turns[turns.len() - take..];

    let lines: Vec<String> = recent
        .iter()
        .filter(|turn| !turn.is_system_note)
        .filter_map(|turn| {
            let body = turn.body()?;
            let speaker = if turn.is_from_user && !user_label.trim().is_empty() {
                user_label
            } else {
                turn.speaker_name.as_str()
            };
            Some(format!("{speaker}: {body}"))
        })
        .collect();

    Transcript {
        included: lines.len(),
        window: take,
        text: lines.join("\n\n"),
    }
}
