//! Preset management for Impersonator.
//!
//! Named configuration bundles, the six built-ins, the working copy the
//! settings form edits, and the JSON export/import payloads.

pub mod active;
pub mod builtins;
pub mod exchange;
pub mod session;
pub mod store;

pub use active::{ActiveConfiguration, FieldEdit};
pub use builtins::{BUILTIN_NAMES, DEFAULT_PRESET};
pub use exchange::{PresetExport, SettingsExport};
pub use session::PresetSession;
pub use store::PresetStore;
