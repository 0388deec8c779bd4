//! # Receipt Persistence
//!
//! The [`ReceiptStore`] trait owns the receipt lifecycle: creation, the one
//! `PENDING` → terminal transition, and lookup. Receipts are never deleted.
//!
//! Two backends:
//!
//! - [`InMemoryReceiptStore`]: process-local, for development and tests.
//! - [`crate::db::PgReceiptStore`]: Postgres via SQLx, selected when
//!   `DATABASE_URL` is set.
//!
//! Terminal updates are conditional on the stored status still being
//! `PENDING`, so a reconciliation sweep racing a request handler cannot
//! overwrite an outcome that is already recorded.

pub mod memory;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rcpt_core::{AnchorResolution, AnchorStatus, Receipt, ReceiptId};
use thiserror::Error;

pub use memory::InMemoryReceiptStore;

/// Errors surfaced by a [`ReceiptStore`].
#[derive(Error, Debug)]
pub enum StoreError {
    /// A record with this id already exists.
    #[error("receipt {0} already exists")]
    Duplicate(ReceiptId),

    /// No record with this id.
    #[error("receipt {0} not found")]
    NotFound(ReceiptId),

    /// The record has already left `PENDING`.
    #[error("receipt {id} is already {status}")]
    Conflict {
        /// The receipt that was targeted.
        id: ReceiptId,
        /// Its current status.
        status: AnchorStatus,
    },

    /// A stored row could not be mapped back to a receipt.
    #[error("corrupt receipt row: {0}")]
    Corrupt(String),

    /// The backend could not be reached or refused the operation.
    #[error("receipt store unavailable: {0}")]
    Unavailable(String),

    /// Database driver error.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Durable storage for receipts.
#[async_trait]
pub trait ReceiptStore: Send + Sync {
    /// Persist a new receipt. Fails with [`StoreError::Duplicate`] if the id is taken.
    async fn insert(&self, receipt: &Receipt) -> Result<(), StoreError>;

    /// Fetch a receipt by id.
    async fn get(&self, id: &ReceiptId) -> Result<Option<Receipt>, StoreError>;

    /// Move a `PENDING` receipt to the terminal state described by
    /// `resolution` and return the updated record.
    ///
    /// Fails with [`StoreError::Conflict`] if the record is already terminal.
    async fn resolve_anchor(
        &self,
        id: &ReceiptId,
        resolution: &AnchorResolution,
        at: DateTime<Utc>,
    ) -> Result<Receipt, StoreError>;

    /// Up to `limit` `PENDING` receipts, oldest first.
    async fn list_pending(&self, limit: usize) -> Result<Vec<Receipt>, StoreError>;

    /// Backend name for logs.
    fn name(&self) -> &str;
}
