//! # Impersonator Core
//!
//! Domain types, traits, and error definitions for the Impersonator
//! prompt-construction layer. This crate has **no framework dependencies**;
//! it defines the domain model every other crate implements against.
//!
//! ## Design Philosophy
//!
//! The host application owns the chat, the character store and the text
//! generation backend. Each of those collaborators is a trait here:
//! - [`ContextSource`] hands out read-only snapshots of the chat
//! - [`MacroSource`] expands arbitrary `{{name}}` tokens from host state
//! - [`Generator`] turns a system prompt + user prompt into text

pub mod context;
pub mod error;
pub mod event;
pub mod generator;
pub mod lenient;
pub mod preset;

// Re-export key types at crate root for ergonomics
pub use context::{CharacterInfo, ContextSource, ConversationTurn, HostContext, MacroSource};
pub use error::{BackendError, Error, GenerationError, PresetError, Result};
pub use event::{DomainEvent, EventBus, NotificationLevel, PresetChange};
pub use generator::{GenerationRequest, Generator};
pub use preset::{PointOfView, PresetBundle, ResponseStyle};
