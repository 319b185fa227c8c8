//! Error types for the tacos session adapter.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A shared error type for the entire adapter.
///
/// Expected-but-exceptional remote conditions (token rejection, rate limiting,
/// duplicate orders) are modelled as dedicated variants so callers can decide
/// whether to retry by matching on the variant instead of inspecting messages.
#[derive(Error, Debug, Clone, Serialize, Deserialize)]
pub enum TacosError {
    /// No session record exists for this id
    #[error("Session not found: '{session_id}'")]
    SessionNotFound { session_id: String },

    /// The session record exists but has been idle longer than the TTL
    #[error("Session expired: '{session_id}' (idle for {idle_secs}s)")]
    SessionExpired { session_id: String, idle_secs: i64 },

    /// The remote system rejected the anti-forgery token twice in a row
    #[error("Session invalid: '{session_id}' - {reason}")]
    SessionInvalid { session_id: String, reason: String },

    /// The remote system signalled rate limiting
    #[error("Rate limited by remote system: {message}")]
    RateLimited { message: String },

    /// The remote system reported a conflicting (duplicate) submission
    #[error("Duplicate submission: {message}")]
    DuplicateSubmission { message: String },

    /// A remote response could not be decoded
    #[error("Decode failure: {0}")]
    DecodeFailure(String),

    /// A shareable recipe identity is malformed
    #[error("Invalid recipe identity '{input}': {reason}")]
    InvalidIdentity { input: String, reason: String },

    /// No response was received at all
    #[error("Remote system unreachable ({url}): {message}")]
    Unreachable { url: String, message: String },

    /// The remote system answered with an unexpected status
    #[error("Remote error (HTTP {status}): {message}")]
    Remote { status: u16, message: String },

    /// The caller asked for something the adapter cannot express remotely
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// IO error (file system operations)
    #[error("IO error: {message}")]
    Io { message: String },

    /// Data access error (repository/storage layer)
    #[error("Data access error: {0}")]
    DataAccess(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {format} - {message}")]
    Serialization { format: String, message: String },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Internal error (should not happen in normal operation)
    #[error("Internal error: {0}")]
    Internal(String),
}

impl TacosError {
    // ============================================================================
    // Constructor helpers
    // ============================================================================

    /// Creates a SessionNotFound error
    pub fn session_not_found(session_id: impl Into<String>) -> Self {
        Self::SessionNotFound {
            session_id: session_id.into(),
        }
    }

    /// Creates a SessionInvalid error
    pub fn session_invalid(session_id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::SessionInvalid {
            session_id: session_id.into(),
            reason: reason.into(),
        }
    }

    /// Creates an InvalidIdentity error
    pub fn invalid_identity(input: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidIdentity {
            input: input.into(),
            reason: reason.into(),
        }
    }

    /// Creates an Unreachable error
    pub fn unreachable(url: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Unreachable {
            url: url.into(),
            message: message.into(),
        }
    }

    /// Creates an IO error
    pub fn io(message: impl Into<String>) -> Self {
        Self::Io {
            message: message.into(),
        }
    }

    /// Creates a DataAccess error
    pub fn data_access(message: impl Into<String>) -> Self {
        Self::DataAccess(message.into())
    }

    /// Creates a Config error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Creates an Internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    // ============================================================================
    // Type checking methods
    // ============================================================================

    /// Check if this is a SessionNotFound error
    pub fn is_session_not_found(&self) -> bool {
        matches!(self, Self::SessionNotFound { .. })
    }

    /// Check if this is a SessionExpired error
    pub fn is_session_expired(&self) -> bool {
        matches!(self, Self::SessionExpired { .. })
    }

    /// Check if this is a SessionInvalid error
    pub fn is_session_invalid(&self) -> bool {
        matches!(self, Self::SessionInvalid { .. })
    }

    /// Check if this is a RateLimited error
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, Self::RateLimited { .. })
    }

    /// Check if this is a DuplicateSubmission error
    pub fn is_duplicate_submission(&self) -> bool {
        matches!(self, Self::DuplicateSubmission { .. })
    }

    /// Check if this is an Unreachable error
    pub fn is_unreachable(&self) -> bool {
        matches!(self, Self::Unreachable { .. })
    }

    /// Whether the application layer may reasonably retry the whole operation later.
    ///
    /// Only rate limiting and missing responses qualify. Token rejection has
    /// already been retried once by the transport and is final.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::RateLimited { .. } | Self::Unreachable { .. })
    }
}

// ============================================================================
// From implementations for automatic conversion
// ============================================================================

impl From<std::io::Error> for TacosError {
    fn from(err: std::io::Error) -> Self {
        Self::Io {
            message: format!("{} (kind: {:?})", err, err.kind()),
        }
    }
}

impl From<serde_json::Error> for TacosError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization {
            format: "JSON".to_string(),
            message: err.to_string(),
        }
    }
}

impl From<toml::de::Error> for TacosError {
    fn from(err: toml::de::Error) -> Self {
        Self::Serialization {
            format: "TOML".to_string(),
            message: err.to_string(),
        }
    }
}

impl From<toml::ser::Error> for TacosError {
    fn from(err: toml::ser::Error) -> Self {
        Self::Serialization {
            format: "TOML".to_string(),
            message: err.to_string(),
        }
    }
}

/// Conversion from anyhow::Error, used at the binary edge
impl From<anyhow::Error> for TacosError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(err.to_string())
    }
}

/// A type alias for `Result<T, TacosError>`.
pub type Result<T> = std::result::Result<T, TacosError>;
