//! The impersonation pipeline.
//!
//! A trigger (button, slash command or host event) reaches the
//! [`Impersonator`], which:
//!
//! 1. **Gates** the request (at most one in flight, nothing while disabled)
//! 2. **Assembles** the system and user prompts from the active bundle
//! 3. **Generates** through the configured [`impersonator_core::Generator`]
//! 4. **Trims** the result and hands it back, or notifies the failure

pub mod context;
pub mod gate;
pub mod impersonator;

pub use context::{
    AssemblyError, ImpersonationPrompt, PlaceholderResolver, PromptAssembler, PromptMetadata,
    Section, Transcript,
};
pub use gate::{BusyGuard, GenerationGate};
pub use impersonator::{Impersonator, TestReport, Trigger};
