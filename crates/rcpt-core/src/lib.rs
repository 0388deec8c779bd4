#![deny(missing_docs)]

//! # rcpt-core: Foundational Types for the Receipt Service
//!
//! This crate defines the types every other crate in the workspace depends
//! on. It has no internal crate dependencies, only `serde`, `serde_json`,
//! `serde_jcs`, `thiserror`, `chrono`, `uuid`, `sha2` and `hex` from the ecosystem.
//!
//! ## Design Principles
//!
//! 1. **[`CanonicalBytes`] is the sole path to digest computation.** Every
//!    receipt hash flows through `CanonicalBytes::new()`, which emits RFC 8785
//!    (JCS) output: sorted keys, compact separators, shortest numbers.
//!
//! 2. **The receipt hash is derived, never supplied.** [`Receipt::issue`]
//!    computes `hash` from the canonical payload it stores, so a record can
//!    never carry a hash that disagrees with its payload.
//!
//! 3. **Closed anchoring lifecycle.** [`AnchorStatus`] is an enum with one
//!    legal move: `PENDING` to exactly one of `ANCHORED` or `SKIPPED`.
//!
//! 4. **Structured errors with `thiserror`.** No `.unwrap()` outside tests.

pub mod canonical;
pub mod digest;
pub mod error;
pub mod receipt;

// Re-export primary types at crate root for ergonomic imports.
pub use canonical::CanonicalBytes;
pub use digest::{sha256_digest, ContentDigest};
pub use error::{CanonicalizationError, DigestError, StateTransitionError, ValidationError};
pub use receipt::{AnchorResolution, AnchorStatus, Receipt, ReceiptId, VerificationResult};
