//! # rcpt-ledger: Ledger Anchoring for Receipt Hashes
//!
//! Provides the [`LedgerAnchor`] capability the receipt service calls after
//! a receipt is persisted, and two implementations:
//!
//! - [`EvmRpcAnchor`]: submits the digest to an Ethereum-compatible node
//!   over JSON-RPC.
//! - [`DecliningAnchor`]: declines every request, for deployments that do
//!   not anchor.
//!
//! The anchoring contract's own logic is out of scope; this crate only
//! delivers the digest and reports the transaction reference.

pub mod anchor;
pub mod config;
pub mod error;
pub mod evm;
pub(crate) mod retry;

pub use anchor::{AnchorOutcome, DecliningAnchor, LedgerAnchor};
pub use config::{ConfigError, LedgerConfig};
pub use error::AnchorError;
pub use evm::{EvmRpcAnchor, NO_CONTRACT_REASON};
