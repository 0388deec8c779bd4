//! Ledger anchoring error types.

use crate::config::ConfigError;

/// Errors from a ledger anchoring attempt.
///
/// All variants are transient from the receipt's point of view: the record
/// stays `PENDING` and a later sweep may retry. A ledger that refuses by
/// policy returns [`AnchorOutcome::Declined`](crate::AnchorOutcome::Declined)
/// instead of an error.
#[derive(Debug, thiserror::Error)]
pub enum AnchorError {
    /// HTTP transport error.
    #[error("HTTP error calling {method}: {source}")]
    Http {
        /// JSON-RPC method being called.
        method: String,
        /// Underlying transport failure.
        source: reqwest::Error,
    },
    /// Endpoint returned a non-2xx status.
    #[error("ledger RPC {method} returned {status}: {body}")]
    Status {
        /// JSON-RPC method being called.
        method: String,
        /// HTTP status code.
        status: u16,
        /// Response body, for diagnostics.
        body: String,
    },
    /// Endpoint returned a JSON-RPC error object.
    #[error("ledger RPC {method} failed with code {code}: {message}")]
    Rpc {
        /// JSON-RPC method being called.
        method: String,
        /// JSON-RPC error code.
        code: i64,
        /// JSON-RPC error message.
        message: String,
    },
    /// Response was not a usable JSON-RPC result.
    #[error("invalid response from {method}: {reason}")]
    InvalidResponse {
        /// JSON-RPC method being called.
        method: String,
        /// What was wrong with it.
        reason: String,
    },
    /// Anchor is misconfigured.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
}
