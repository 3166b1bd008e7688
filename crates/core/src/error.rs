use crate::types::DbId;

/// Domain error shared by the notification core and the HTTP boundary.
///
/// Only [`CoreError::Transport`] represents a retryable condition, and it is
/// surfaced only once the retry budget of a channel is exhausted.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Entity not found: {entity} with id {id}")]
    NotFound { entity: &'static str, id: DbId },

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    /// Missing or invalid credential.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Provider configuration is unparseable, of the wrong kind, or inactive.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// A stored secret could not be decrypted. This is a data-integrity
    /// fault, never the caller's.
    #[error("Decryption failed: {0}")]
    Decryption(String),

    #[error("failed after {attempts} retries: {message}")]
    Transport { attempts: u32, message: String },

    #[error("No active devices found for member {0}")]
    NoDevices(DbId),

    #[error("Cancelled: {0}")]
    Cancelled(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl CoreError {
    /// Shorthand for a missing or invalid credential.
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::Unauthorized(message.into())
    }

    /// Shorthand for caller input that failed validation.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Shorthand for a provider configuration fault.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }
}
