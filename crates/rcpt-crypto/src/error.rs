//! # Cryptographic Error Types
//!
//! Structured errors for key handling in `rcpt-crypto`. Token-level
//! failures live in [`crate::jws::JwsError`].

use thiserror::Error;

/// Errors from P-256 key material.
#[derive(Error, Debug)]
pub enum CryptoError {
    /// Secret scalar is malformed or outside the curve order.
    #[error("invalid P-256 signing key: {0}")]
    InvalidSigningKey(String),

    /// Public key coordinates do not describe a point on P-256.
    #[error("invalid P-256 public key: {0}")]
    InvalidPublicKey(String),

    /// Key material could not be obtained from its source.
    #[error("key unavailable: {0}")]
    KeyUnavailable(String),

    /// Hex decoding error.
    #[error("hex decode error: {0}")]
    HexDecode(String),

    /// Base64url decoding error.
    #[error("base64url decode error: {0}")]
    Base64Decode(String),
}
