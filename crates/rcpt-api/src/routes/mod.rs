//! # Route Handlers
//!
//! - [`receipts`]: issuance and verification.
//! - [`keys`]: JWKS publication.

pub mod keys;
pub mod receipts;
