//! Error types for the Impersonator domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Each bounded context has its own error enum.

use thiserror::Error;

/// The top-level error type for all Impersonator operations.
#[derive(Debug, Error)]
pub enum Error {
    // --- Preset errors ---
    #[error("Preset error: {0}")]
    Preset(#[from] PresetError),

    // --- Generation errors ---
    #[error("Generation error: {0}")]
    Generation(#[from] GenerationError),

    // --- Configuration errors ---
    #[error("Configuration error: {message}")]
    Config { message: String },

    // --- Serialization ---
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // --- Generic ---
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

// --- Bounded context errors ---

/// Failures of preset store operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PresetError {
    #[error("Preset not found: {0}")]
    NotFound(String),

    #[error("Cannot delete built-in preset: {0}")]
    Protected(String),

    #[error("Invalid preset file: {0}")]
    InvalidFormat(String),

    #[error("Preset \"{name}\" already exists (try \"{suggestion}\")")]
    NameConflict { name: String, suggestion: String },

    #[error("Invalid preset name: {0:?}")]
    InvalidName(String),
}

/// Failures raised by a [`crate::Generator`] backend.
#[derive(Debug, Clone, Error)]
pub enum BackendError {
    #[error("API request failed: {message} (status: {status_code})")]
    ApiError { status_code: u16, message: String },

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Rate limited by backend, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("Network error: {0}")]
    Network(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Backend not configured: {0}")]
    NotConfigured(String),
}

/// Failures of a single impersonation request.
#[derive(Debug, Clone, Error)]
pub enum GenerationError {
    /// The feature toggle is off. Not a user-facing error.
    #[error("Impersonation is disabled")]
    Disabled,

    #[error("Impersonation already in progress")]
    AlreadyInProgress,

    #[error("No conversation context available")]
    NoContext,

    #[error("Empty response received")]
    EmptyResponse,

    #[error("Failed to generate response: {0}")]
    Failed(#[from] BackendError),
}

impl GenerationError {
    /// Whether this failure should be shown to the user at all.
    pub fn is_user_facing(&self) -> bool {
        !matches!(self, Self::Disabled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backend_error_displays_correctly() {
        let err = Error::Generation(GenerationError::Failed(BackendError::ApiError {
            status_code: 500,
            message: "upstream exploded".into(),
        }));
        assert!(err.to_string().contains("500"));
        assert!(err.to_string().contains("upstream exploded"));
    }

    #[test]
    fn name_conflict_carries_suggestion() {
        let err = PresetError::NameConflict {
            name: "Default".into(),
            suggestion: "Default (imported)".into(),
        };
        assert!(err.to_string().contains("Default (imported)"));
    }

    #[test]
    fn disabled_is_silent() {
        assert!(!GenerationError::Disabled.is_user_facing());
        assert!(GenerationError::NoContext.is_user_facing());
        assert!(GenerationError::AlreadyInProgress.is_user_facing());
    }
}
