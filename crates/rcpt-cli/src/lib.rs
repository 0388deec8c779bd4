//! # rcpt-cli: Command-Line Tools for Signed Receipts
//!
//! Provides the `rcpt` command:
//!
//! - `rcpt keygen`: generate an ES256 signing key for the service.
//! - `rcpt hash FILE`: canonical form and SHA-256 of a JSON document.
//! - `rcpt verify --jwks FILE TOKEN`: offline token verification.
//!
//! ```bash
//! rcpt keygen --kid 2024-06
//! rcpt hash payment.json
//! curl -s localhost:8080/jwks.json > jwks.json
//! rcpt verify --jwks jwks.json --payload payment.json "$TOKEN"
//! ```

pub mod inspect;
pub mod keys;
