//! Prompt construction from a preset bundle and a host snapshot.
//!
//! | Stage | Module | Output |
//! |-------|--------|--------|
//! | Placeholders | `resolver` | Template with style directives and macros expanded |
//! | Window | `window` | Last N eligible turns as a transcript |
//! | Assembly | `assembler` | System prompt and user prompt |

pub mod assembler;
pub mod resolver;
pub mod window;

pub use assembler::{AssemblyError, ImpersonationPrompt, PromptAssembler, PromptMetadata, Section};
pub use resolver::PlaceholderResolver;
pub use window::{window, Transcript};
