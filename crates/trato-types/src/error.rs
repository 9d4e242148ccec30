//! Error types for Trato
//!
//! All errors are explicit and typed so presentation logic can react
//! distinctly (refresh stale UI state vs. show "not found").

use crate::{EscrowStatus, SourceKind};
use thiserror::Error;

/// Result type for Trato operations
pub type Result<T> = std::result::Result<T, TratoError>;

/// Trato error types
#[derive(Debug, Clone, Error)]
pub enum TratoError {
    // ========================================================================
    // Escrow Errors
    // ========================================================================

    /// Escrow transaction not found
    #[error("Escrow {escrow_id} not found")]
    NotFound { escrow_id: String },

    /// Operation not valid from the current status
    #[error("Escrow {escrow_id}: invalid transition {from} -> {requested}")]
    InvalidTransition {
        escrow_id: String,
        from: EscrowStatus,
        requested: EscrowStatus,
    },

    /// Acting identity does not match the role required for the operation
    #[error("Escrow {escrow_id}: unauthorized - {reason}")]
    Unauthorized { escrow_id: String, reason: String },

    // ========================================================================
    // Peer Ledger Errors
    // ========================================================================

    /// Peer ledger record not found
    #[error("{kind} record {id} not found")]
    RecordNotFound { kind: SourceKind, id: String },

    /// Peer ledger record cannot advance from its current status
    #[error("{kind} record {id} cannot advance from status {from}")]
    InvalidStatusChange {
        kind: SourceKind,
        id: String,
        from: String,
    },

    // ========================================================================
    // General Errors
    // ========================================================================

    /// Durable write failed
    #[error("Persistence failure: {message}")]
    Persistence { message: String },

    /// Invalid input
    #[error("Invalid input: {field} - {reason}")]
    InvalidInput { field: String, reason: String },

    /// Internal error
    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl TratoError {
    /// Create a persistence error
    pub fn persistence(message: impl Into<String>) -> Self {
        Self::Persistence {
            message: message.into(),
        }
    }

    /// Create an unauthorized error
    pub fn unauthorized(escrow_id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Unauthorized {
            escrow_id: escrow_id.into(),
            reason: reason.into(),
        }
    }

    /// Create an invalid input error
    pub fn invalid_input(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidInput {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Create an internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Check if this is a retriable error
    pub fn is_retriable(&self) -> bool {
        matches!(self, Self::Persistence { .. } | Self::Internal { .. })
    }

    /// Get an error code for API responses
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::NotFound { .. } => "NOT_FOUND",
            Self::InvalidTransition { .. } => "INVALID_TRANSITION",
            Self::Unauthorized { .. } => "UNAUTHORIZED",
            Self::RecordNotFound { .. } => "RECORD_NOT_FOUND",
            Self::InvalidStatusChange { .. } => "INVALID_STATUS_CHANGE",
            Self::Persistence { .. } => "PERSISTENCE_FAILURE",
            Self::InvalidInput { .. } => "INVALID_INPUT",
            Self::Internal { .. } => "INTERNAL_ERROR",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        let err = TratoError::InvalidTransition {
            escrow_id: "esc_test".to_string(),
            from: EscrowStatus::Released,
            requested: EscrowStatus::Disputed,
        };
        assert_eq!(err.error_code(), "INVALID_TRANSITION");
        assert!(err.to_string().contains("released"));
        assert!(err.to_string().contains("disputed"));
    }

    #[test]
    fn test_retriable_errors() {
        let persistence = TratoError::persistence("disk full");
        assert!(persistence.is_retriable());

        let not_found = TratoError::NotFound {
            escrow_id: "esc_test".to_string(),
        };
        assert!(!not_found.is_retriable());
    }
}
