//! Receipt persistence operations.
//!
//! All queries operate on the `receipts` table created by the embedded
//! migrations. The terminal update is a single conditional statement, so
//! concurrent resolvers cannot both succeed.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rcpt_core::{AnchorResolution, AnchorStatus, Receipt, ReceiptId};
use sqlx::PgPool;
use uuid::Uuid;

use crate::store::{ReceiptStore, StoreError};

const COLUMNS: &str = "id, canonical_payload, token, hash, key_id, anchor_reference, \
                       status, skip_reason, created_at, updated_at";

/// Postgres-backed [`ReceiptStore`].
#[derive(Debug, Clone)]
pub struct PgReceiptStore {
    pool: PgPool,
}

impl PgReceiptStore {
    /// Wrap a connected, migrated pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn fetch(&self, id: &ReceiptId) -> Result<Option<Receipt>, StoreError> {
        let row = sqlx::query_as::<_, ReceiptRow>(&format!(
            "SELECT {COLUMNS} FROM receipts WHERE id = $1"
        ))
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        row.map(ReceiptRow::into_receipt).transpose()
    }
}

#[async_trait]
impl ReceiptStore for PgReceiptStore {
    async fn insert(&self, receipt: &Receipt) -> Result<(), StoreError> {
        let result = sqlx::query(
            "INSERT INTO receipts (id, canonical_payload, token, hash, key_id, anchor_reference,
             status, skip_reason, created_at, updated_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)",
        )
        .bind(receipt.id.as_uuid())
        .bind(&receipt.canonical_payload)
        .bind(&receipt.token)
        .bind(&receipt.hash)
        .bind(&receipt.key_id)
        .bind(&receipt.anchor_reference)
        .bind(receipt.status.as_str())
        .bind(&receipt.skip_reason)
        .bind(receipt.created_at)
        .bind(receipt.updated_at)
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(()),
            Err(sqlx::Error::Database(db)) if db.is_unique_violation() => {
                Err(StoreError::Duplicate(receipt.id))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn get(&self, id: &ReceiptId) -> Result<Option<Receipt>, StoreError> {
        self.fetch(id).await
    }

    async fn resolve_anchor(
        &self,
        id: &ReceiptId,
        resolution: &AnchorResolution,
        at: DateTime<Utc>,
    ) -> Result<Receipt, StoreError> {
        let (anchor_reference, skip_reason) = match resolution {
            AnchorResolution::Anchored { tx_ref } => (Some(tx_ref.as_str()), None),
            AnchorResolution::Skipped { reason } => (None, Some(reason.as_str())),
        };

        let row = sqlx::query_as::<_, ReceiptRow>(&format!(
            "UPDATE receipts
             SET status = $2, anchor_reference = $3, skip_reason = $4,
                 updated_at = GREATEST(updated_at, $5)
             WHERE id = $1 AND status = 'PENDING'
             RETURNING {COLUMNS}"
        ))
        .bind(id.as_uuid())
        .bind(resolution.status().as_str())
        .bind(anchor_reference)
        .bind(skip_reason)
        .bind(at)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => row.into_receipt(),
            None => match self.fetch(id).await? {
                Some(current) => Err(StoreError::Conflict {
                    id: *id,
                    status: current.status,
                }),
                None => Err(StoreError::NotFound(*id)),
            },
        }
    }

    async fn list_pending(&self, limit: usize) -> Result<Vec<Receipt>, StoreError> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let rows = sqlx::query_as::<_, ReceiptRow>(&format!(
            "SELECT {COLUMNS} FROM receipts
             WHERE status = 'PENDING'
             ORDER BY created_at, id
             LIMIT $1"
        ))
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(ReceiptRow::into_receipt).collect()
    }

    fn name(&self) -> &str {
        "postgres"
    }
}

/// Internal row type for SQLx mapping.
#[derive(sqlx::FromRow)]
struct ReceiptRow {
    id: Uuid,
    canonical_payload: String,
    token: String,
    hash: String,
    key_id: String,
    anchor_reference: Option<String>,
    status: String,
    skip_reason: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl ReceiptRow {
    fn into_receipt(self) -> Result<Receipt, StoreError> {
        let status: AnchorStatus = self.status.parse().map_err(|e| {
            tracing::error!(id = %self.id, status = %self.status, "unknown receipt status in database");
            StoreError::Corrupt(format!("{e}"))
        })?;
        Ok(Receipt {
            id: ReceiptId::from_uuid(self.id),
            canonical_payload: self.canonical_payload,
            token: self.token,
            hash: self.hash,
            key_id: self.key_id,
            anchor_reference: self.anchor_reference,
            status,
            skip_reason: self.skip_reason,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(status: &str) -> ReceiptRow {
        let now = Utc::now();
        ReceiptRow {
            id: Uuid::new_v4(),
            canonical_payload: r#"{"amount":100}"#.into(),
            token: "h.c.s".into(),
            hash: "0".repeat(64),
            key_id: "k".into(),
            anchor_reference: None,
            status: status.into(),
            skip_reason: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn row_maps_status() {
        let receipt = row("PENDING").into_receipt().unwrap();
        assert_eq!(receipt.status, AnchorStatus::Pending);
        assert_eq!(receipt.canonical_payload, r#"{"amount":100}"#);
    }

    #[test]
    fn unknown_status_is_corrupt() {
        let err = row("LOST").into_receipt().unwrap_err();
        assert!(matches!(err, StoreError::Corrupt(ref m) if m.contains("LOST")));
    }
}
