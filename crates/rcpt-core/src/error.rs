//! # Error Hierarchy
//!
//! Structured error types for the core receipt model, built with `thiserror`.
//! Each variant carries the context an operator needs to diagnose the
//! failure without reading logs.

use thiserror::Error;

use crate::receipt::AnchorStatus;

/// Errors during canonical serialization.
#[derive(Error, Debug)]
pub enum CanonicalizationError {
    /// JSON serialization failed during canonicalization.
    #[error("serialization failed: {0}")]
    SerializationFailed(#[from] serde_json::Error),
}

/// Errors parsing a hex-encoded content digest.
#[derive(Error, Debug)]
pub enum DigestError {
    /// The hex string does not encode exactly 32 bytes.
    #[error("digest hex must be 64 chars, got {0}")]
    InvalidLength(usize),

    /// The string contains non-hex characters.
    #[error("invalid digest hex: {0}")]
    InvalidHex(String),
}

/// Errors during anchoring-status transitions.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StateTransitionError {
    /// The receipt has already left `PENDING`.
    #[error("invalid transition from {from} to {to}: receipt status is already terminal")]
    AlreadyTerminal {
        /// The current status.
        from: AnchorStatus,
        /// The attempted target status.
        to: AnchorStatus,
    },
}

/// Validation errors for domain primitive newtypes.
#[derive(Error, Debug)]
pub enum ValidationError {
    /// Receipt identifier is not a UUID.
    #[error("invalid receipt ID: \"{0}\" (expected a UUID)")]
    InvalidReceiptId(String),

    /// Status string is not one of the known anchoring statuses.
    #[error("invalid anchor status: \"{0}\" (expected PENDING, ANCHORED or SKIPPED)")]
    InvalidAnchorStatus(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn already_terminal_display_names_both_states() {
        let err = StateTransitionError::AlreadyTerminal {
            from: AnchorStatus::Anchored,
            to: AnchorStatus::Skipped,
        };
        let msg = err.to_string();
        assert!(msg.contains("ANCHORED"));
        assert!(msg.contains("SKIPPED"));
    }

    #[test]
    fn validation_error_carries_input() {
        let err = ValidationError::InvalidReceiptId("nope".to_string());
        assert!(err.to_string().contains("nope"));
    }
}
