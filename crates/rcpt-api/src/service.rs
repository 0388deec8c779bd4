//! # Receipt Service
//!
//! Issuance, verification and anchoring reconciliation, independent of
//! HTTP. Route handlers delegate here.
//!
//! ## Issuance sequence
//!
//! 1. Canonicalize and hash the payload.
//! 2. Sign the claims with the active key.
//! 3. Persist the receipt as `PENDING`.
//! 4. Ask the ledger to anchor the hash.
//! 5. Persist the terminal outcome, if there is one.
//!
//! Steps 1 and 2 have no side effects, so failing there leaves nothing
//! behind. After step 3 the receipt exists: a ledger or storage failure
//! in steps 4 and 5 is reported as `pending_reason` and the record stays
//! `PENDING` for [`ReceiptService::reconcile_pending`] to pick up.

use std::sync::Arc;

use chrono::{DateTime, SubsecRound, Utc};
use rcpt_core::{
    sha256_digest, AnchorResolution, CanonicalBytes, CanonicalizationError, ContentDigest,
    Receipt, ReceiptId, VerificationResult,
};
use rcpt_crypto::{sign_compact, verify_compact, CryptoError, JwkSet, JwsError, KeySet, ReceiptClaims};
use rcpt_ledger::{AnchorOutcome, LedgerAnchor};
use serde::Serialize;
use thiserror::Error;
use url::Url;

use crate::qr::QrRenderer;
use crate::store::{ReceiptStore, StoreError};

/// Errors from receipt operations.
#[derive(Error, Debug)]
pub enum ReceiptError {
    /// The payload cannot be canonically serialized.
    #[error("encoding error: {0}")]
    Encoding(#[from] CanonicalizationError),

    /// The active key could not sign.
    #[error("signing failed: {0}")]
    Signing(JwsError),

    /// The receipt store failed.
    #[error("storage error: {0}")]
    Storage(#[from] StoreError),

    /// The token is malformed, uses another algorithm, names an unknown
    /// key, or its signature does not verify.
    #[error("invalid signature: {0}")]
    InvalidSignature(JwsError),

    /// The token's hash differs from the stored receipt's.
    #[error("hash mismatch for receipt {0}")]
    HashMismatch(ReceiptId),

    /// No receipt with this id.
    #[error("receipt not found: {0}")]
    NotFound(String),

    /// Public key material could not be projected.
    #[error("key error: {0}")]
    Keys(#[from] CryptoError),
}

/// A freshly issued receipt plus what the caller needs to share it.
#[derive(Debug, Clone)]
pub struct IssuedReceipt {
    /// The record as currently stored.
    pub receipt: Receipt,
    /// Verification link carrying `rid` and `jws`.
    pub verify_url: Url,
    /// PNG QR code of `verify_url`; `None` if rendering failed.
    pub qr_png: Option<Vec<u8>>,
    /// Why the receipt is still `PENDING`, when anchoring did not complete.
    pub pending_reason: Option<String>,
}

/// Counts from one reconciliation sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ReconcileReport {
    /// Pending receipts looked at.
    pub examined: usize,
    /// Newly anchored.
    pub anchored: usize,
    /// Newly skipped.
    pub skipped: usize,
    /// Still pending after a failed attempt.
    pub still_pending: usize,
    /// Already resolved by someone else before this sweep could record it.
    pub conflicts: usize,
}

/// Receipt issuance and verification over injected collaborators.
pub struct ReceiptService {
    keys: KeySet,
    store: Arc<dyn ReceiptStore>,
    anchor: Arc<dyn LedgerAnchor>,
    qr: Arc<dyn QrRenderer>,
    verify_base_url: Url,
}

impl std::fmt::Debug for ReceiptService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReceiptService")
            .field("keys", &self.keys)
            .field("store", &self.store.name())
            .field("anchor", &self.anchor.name())
            .field("verify_base_url", &self.verify_base_url.as_str())
            .finish()
    }
}

impl ReceiptService {
    /// Assemble a service.
    pub fn new(
        keys: KeySet,
        store: Arc<dyn ReceiptStore>,
        anchor: Arc<dyn LedgerAnchor>,
        qr: Arc<dyn QrRenderer>,
        verify_base_url: Url,
    ) -> Self {
        Self {
            keys,
            store,
            anchor,
            qr,
            verify_base_url,
        }
    }

    /// The key set used for signing and verification.
    pub fn keys(&self) -> &KeySet {
        &self.keys
    }

    /// Issue, persist and attempt to anchor a receipt for `payload`.
    pub async fn create_receipt(
        &self,
        payload: &serde_json::Value,
    ) -> Result<IssuedReceipt, ReceiptError> {
        let canonical = CanonicalBytes::new(payload)?;
        let issued_at = now();

        let signer = self.keys.signer();
        let claims = ReceiptClaims::new(&canonical, issued_at.timestamp());
        let token = sign_compact(signer, &claims).map_err(ReceiptError::Signing)?;

        let receipt = Receipt::issue(
            ReceiptId::new(),
            &canonical,
            token,
            signer.key_id().to_string(),
            issued_at,
        );
        self.store.insert(&receipt).await?;
        tracing::info!(rid = %receipt.id, hash = %receipt.hash, kid = %receipt.key_id, "receipt issued");

        let digest = sha256_digest(&canonical);
        let (receipt, pending_reason) = self.anchor_and_record(receipt, &digest).await;

        let verify_url = self.verify_url(&receipt);
        let qr_png = match self.qr.render_png(verify_url.as_str()) {
            Ok(png) => Some(png),
            Err(e) => {
                tracing::warn!(rid = %receipt.id, error = %e, "QR rendering failed, omitting qrPng");
                None
            }
        };

        Ok(IssuedReceipt {
            receipt,
            verify_url,
            qr_png,
            pending_reason,
        })
    }

    /// Check `token` against the receipt stored under `rid`.
    ///
    /// The receipt must exist before the token is examined, so an unknown
    /// id is `NotFound` whatever the token looks like.
    pub async fn verify_receipt(
        &self,
        rid: &str,
        token: &str,
    ) -> Result<VerificationResult, ReceiptError> {
        let id: ReceiptId = rid
            .parse()
            .map_err(|_| ReceiptError::NotFound(rid.to_string()))?;
        let receipt = self
            .store
            .get(&id)
            .await?
            .ok_or_else(|| ReceiptError::NotFound(rid.to_string()))?;

        let verified = verify_compact(token, &self.keys).map_err(ReceiptError::InvalidSignature)?;
        if verified.claims.hash != receipt.hash {
            return Err(ReceiptError::HashMismatch(id));
        }

        Ok(VerificationResult::for_receipt(&receipt))
    }

    /// Public keys as a JWKS document.
    pub fn jwks(&self) -> Result<JwkSet, ReceiptError> {
        Ok(self.keys.jwks()?)
    }

    /// Re-attempt anchoring for up to `limit` pending receipts, oldest first.
    pub async fn reconcile_pending(&self, limit: usize) -> Result<ReconcileReport, ReceiptError> {
        let pending = self.store.list_pending(limit).await?;
        let mut report = ReconcileReport {
            examined: pending.len(),
            ..ReconcileReport::default()
        };

        for receipt in pending {
            let digest = match ContentDigest::from_hex(&receipt.hash) {
                Ok(d) => d,
                Err(e) => {
                    tracing::error!(rid = %receipt.id, error = %e, "stored hash is not a digest");
                    report.still_pending += 1;
                    continue;
                }
            };
            let resolution = match self.anchor.anchor(&digest).await {
                Ok(outcome) => resolution_for(outcome),
                Err(e) => {
                    tracing::warn!(rid = %receipt.id, error = %e, "anchoring retry failed");
                    report.still_pending += 1;
                    continue;
                }
            };
            match self.store.resolve_anchor(&receipt.id, &resolution, now()).await {
                Ok(updated) => match updated.status {
                    rcpt_core::AnchorStatus::Anchored => report.anchored += 1,
                    rcpt_core::AnchorStatus::Skipped => report.skipped += 1,
                    rcpt_core::AnchorStatus::Pending => report.still_pending += 1,
                },
                Err(StoreError::Conflict { status, .. }) => {
                    tracing::debug!(rid = %receipt.id, %status, "receipt resolved concurrently");
                    report.conflicts += 1;
                }
                Err(e) => {
                    tracing::warn!(rid = %receipt.id, error = %e, "failed to record anchoring outcome");
                    report.still_pending += 1;
                }
            }
        }

        if report.examined > 0 {
            tracing::info!(
                examined = report.examined,
                anchored = report.anchored,
                skipped = report.skipped,
                still_pending = report.still_pending,
                conflicts = report.conflicts,
                "reconciliation sweep finished"
            );
        }
        Ok(report)
    }

    async fn anchor_and_record(
        &self,
        receipt: Receipt,
        digest: &ContentDigest,
    ) -> (Receipt, Option<String>) {
        let resolution = match self.anchor.anchor(digest).await {
            Ok(outcome) => resolution_for(outcome),
            Err(e) => {
                tracing::warn!(rid = %receipt.id, anchor = self.anchor.name(), error = %e, "anchoring failed, receipt left pending");
                return (receipt, Some(format!("ledger anchoring failed: {e}")));
            }
        };

        match self.store.resolve_anchor(&receipt.id, &resolution, now()).await {
            Ok(updated) => {
                tracing::info!(rid = %updated.id, status = %updated.status, "anchoring outcome recorded");
                (updated, None)
            }
            Err(StoreError::Conflict { .. }) => match self.store.get(&receipt.id).await {
                Ok(Some(current)) => (current, None),
                _ => (receipt, None),
            },
            Err(e) => {
                tracing::warn!(rid = %receipt.id, error = %e, "failed to record anchoring outcome, receipt left pending");
                (
                    receipt,
                    Some(format!("failed to record anchoring outcome: {e}")),
                )
            }
        }
    }

    fn verify_url(&self, receipt: &Receipt) -> Url {
        let mut url = self.verify_base_url.clone();
        url.query_pairs_mut()
            .append_pair("rid", &receipt.id.to_string())
            .append_pair("jws", &receipt.token);
        url
    }
}

fn resolution_for(outcome: AnchorOutcome) -> AnchorResolution {
    match outcome {
        AnchorOutcome::Anchored { tx_ref } => AnchorResolution::Anchored { tx_ref },
        AnchorOutcome::Declined { reason } => AnchorResolution::Skipped { reason },
    }
}

/// Current time at the store's (microsecond) precision.
fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}
