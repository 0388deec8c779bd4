//! # Receipt Record and Anchoring Lifecycle
//!
//! [`Receipt`] is the durable record of one issuance. Everything except the
//! anchoring fields is fixed at construction; the anchoring fields move
//! through a one-shot state machine:
//!
//! ```text
//! PENDING ──► ANCHORED   (ledger accepted the hash; anchor_reference set)
//!    │
//!    └──────► SKIPPED    (ledger declined; skip_reason set)
//! ```
//!
//! A record stuck in `PENDING` is distinguishable from both terminal states,
//! which is what lets a reconciliation sweep find it after a crash or a
//! transient ledger failure.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::canonical::CanonicalBytes;
use crate::digest::sha256_digest;
use crate::error::{StateTransitionError, ValidationError};

/// Opaque unique receipt identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReceiptId(Uuid);

impl ReceiptId {
    /// Generate a fresh random identifier.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Wrap an existing UUID.
    pub fn from_uuid(id: Uuid) -> Self {
        Self(id)
    }

    /// Return the underlying UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for ReceiptId {
    fn default() -> Self {
        Self::new()
    }
}

impl FromStr for ReceiptId {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s.trim())
            .map(Self)
            .map_err(|_| ValidationError::InvalidReceiptId(s.to_string()))
    }
}

impl fmt::Display for ReceiptId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

/// Anchoring lifecycle status of a receipt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AnchorStatus {
    /// Persisted; anchoring not yet resolved.
    Pending,
    /// The hash was recorded on the external ledger.
    Anchored,
    /// The ledger declined to anchor (e.g. no contract configured).
    Skipped,
}

impl AnchorStatus {
    /// Return the wire/storage representation of this status.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Anchored => "ANCHORED",
            Self::Skipped => "SKIPPED",
        }
    }

    /// Whether no further transition is possible.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Pending)
    }
}

impl fmt::Display for AnchorStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AnchorStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(Self::Pending),
            "ANCHORED" => Ok(Self::Anchored),
            "SKIPPED" => Ok(Self::Skipped),
            other => Err(ValidationError::InvalidAnchorStatus(other.to_string())),
        }
    }
}

/// Terminal outcome applied to a pending receipt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum AnchorResolution {
    /// Anchored with the given ledger transaction reference.
    Anchored {
        /// Ledger transaction reference.
        tx_ref: String,
    },
    /// Anchoring declined by ledger policy.
    Skipped {
        /// Why the ledger declined.
        reason: String,
    },
}

impl AnchorResolution {
    /// The status a receipt takes once this resolution is applied.
    pub fn status(&self) -> AnchorStatus {
        match self {
            Self::Anchored { .. } => AnchorStatus::Anchored,
            Self::Skipped { .. } => AnchorStatus::Skipped,
        }
    }
}

/// The durable record of one receipt issuance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Receipt {
    /// Identifier assigned when the record is first persisted.
    pub id: ReceiptId,
    /// Canonical serialization of the original payload.
    pub canonical_payload: String,
    /// Compact signed token issued for this payload.
    pub token: String,
    /// Lowercase hex SHA-256 of `canonical_payload`.
    pub hash: String,
    /// Identifier of the key that signed `token`.
    pub key_id: String,
    /// Ledger transaction reference, once anchored.
    pub anchor_reference: Option<String>,
    /// Anchoring lifecycle status.
    pub status: AnchorStatus,
    /// Why anchoring was skipped, only when `status` is `SKIPPED`.
    pub skip_reason: Option<String>,
    /// When the receipt was issued.
    pub created_at: DateTime<Utc>,
    /// When the record last changed.
    pub updated_at: DateTime<Utc>,
}

impl Receipt {
    /// Build a new `PENDING` receipt.
    ///
    /// The hash is computed here from `canonical` so that it always matches
    /// the stored payload.
    pub fn issue(
        id: ReceiptId,
        canonical: &CanonicalBytes,
        token: String,
        key_id: String,
        issued_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            canonical_payload: canonical.as_str().to_string(),
            token,
            hash: sha256_digest(canonical).to_hex(),
            key_id,
            anchor_reference: None,
            status: AnchorStatus::Pending,
            skip_reason: None,
            created_at: issued_at,
            updated_at: issued_at,
        }
    }

    /// Apply a terminal anchoring outcome.
    ///
    /// Fails without modifying the record if it is no longer `PENDING`.
    pub fn resolve(
        &mut self,
        resolution: &AnchorResolution,
        at: DateTime<Utc>,
    ) -> Result<(), StateTransitionError> {
        if self.status.is_terminal() {
            return Err(StateTransitionError::AlreadyTerminal {
                from: self.status,
                to: resolution.status(),
            });
        }
        match resolution {
            AnchorResolution::Anchored { tx_ref } => {
                self.anchor_reference = Some(tx_ref.clone());
                self.skip_reason = None;
            }
            AnchorResolution::Skipped { reason } => {
                self.anchor_reference = None;
                self.skip_reason = Some(reason.clone());
            }
        }
        self.status = resolution.status();
        self.updated_at = at.max(self.updated_at);
        Ok(())
    }

    /// Recompute the payload hash and compare it with the stored one.
    pub fn hash_is_consistent(&self) -> bool {
        CanonicalBytes::from_json_str(&self.canonical_payload)
            .map(|cb| sha256_digest(&cb).to_hex() == self.hash)
            .unwrap_or(false)
    }
}

/// Outcome of a successful verification. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationResult {
    /// Always `true`; failures are reported as errors.
    pub ok: bool,
    /// The receipt's status at verification time.
    pub status: AnchorStatus,
    /// Key that signed the receipt.
    #[serde(rename = "kid")]
    pub key_id: String,
    /// When the receipt was issued.
    #[serde(rename = "ts")]
    pub issued_at: DateTime<Utc>,
}

impl VerificationResult {
    /// Project a verified receipt into a result.
    pub fn for_receipt(receipt: &Receipt) -> Self {
        Self {
            ok: true,
            status: receipt.status,
            key_id: receipt.key_id.clone(),
            issued_at: receipt.created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn pending_receipt() -> Receipt {
        let canonical = CanonicalBytes::new(&serde_json::json!({"amount": 100, "currency": "USD"}))
            .unwrap();
        Receipt::issue(
            ReceiptId::new(),
            &canonical,
            "h.c.s".to_string(),
            "key-1".to_string(),
            Utc::now(),
        )
    }

    #[test]
    fn issue_starts_pending_with_derived_hash() {
        let r = pending_receipt();
        assert_eq!(r.status, AnchorStatus::Pending);
        assert_eq!(
            r.hash,
            "9d1215b4ce08e5b8c77bccd7c2f673af82d153b1eabea22a1e3c524272b78db1"
        );
        assert!(r.hash_is_consistent());
        assert_eq!(r.created_at, r.updated_at);
        assert!(r.anchor_reference.is_none());
        assert!(r.skip_reason.is_none());
    }

    #[test]
    fn resolve_anchored_sets_reference() {
        let mut r = pending_receipt();
        let later = r.created_at + Duration::seconds(2);
        r.resolve(&AnchorResolution::Anchored { tx_ref: "0xabc".into() }, later)
            .unwrap();
        assert_eq!(r.status, AnchorStatus::Anchored);
        assert_eq!(r.anchor_reference.as_deref(), Some("0xabc"));
        assert!(r.skip_reason.is_none());
        assert_eq!(r.updated_at, later);
    }

    #[test]
    fn resolve_skipped_sets_reason() {
        let mut r = pending_receipt();
        r.resolve(
            &AnchorResolution::Skipped { reason: "no contract".into() },
            Utc::now(),
        )
        .unwrap();
        assert_eq!(r.status, AnchorStatus::Skipped);
        assert_eq!(r.skip_reason.as_deref(), Some("no contract"));
        assert!(r.anchor_reference.is_none());
    }

    #[test]
    fn terminal_receipt_rejects_second_resolution() {
        let mut r = pending_receipt();
        r.resolve(&AnchorResolution::Anchored { tx_ref: "0x1".into() }, Utc::now())
            .unwrap();
        let before = r.clone();
        let err = r
            .resolve(&AnchorResolution::Skipped { reason: "late".into() }, Utc::now())
            .unwrap_err();
        assert_eq!(
            err,
            StateTransitionError::AlreadyTerminal {
                from: AnchorStatus::Anchored,
                to: AnchorStatus::Skipped,
            }
        );
        assert_eq!(r, before, "failed transition must not modify the record");
    }

    #[test]
    fn updated_at_never_moves_backwards() {
        let mut r = pending_receipt();
        let earlier = r.created_at - Duration::seconds(30);
        r.resolve(&AnchorResolution::Skipped { reason: "x".into() }, earlier)
            .unwrap();
        assert_eq!(r.updated_at, r.created_at);
    }

    #[test]
    fn tampered_hash_detected() {
        let mut r = pending_receipt();
        r.hash = "0".repeat(64);
        assert!(!r.hash_is_consistent());
    }

    #[test]
    fn status_string_forms() {
        for status in [AnchorStatus::Pending, AnchorStatus::Anchored, AnchorStatus::Skipped] {
            assert_eq!(status.as_str().parse::<AnchorStatus>().unwrap(), status);
            assert_eq!(
                serde_json::to_string(&status).unwrap(),
                format!("\"{}\"", status.as_str())
            );
        }
        assert!("anchored".parse::<AnchorStatus>().is_err());
        assert!(!AnchorStatus::Pending.is_terminal());
        assert!(AnchorStatus::Skipped.is_terminal());
    }

    #[test]
    fn receipt_id_parses_display_form() {
        let id = ReceiptId::new();
        assert_eq!(id.to_string().parse::<ReceiptId>().unwrap(), id);
        assert!("not-a-uuid".parse::<ReceiptId>().is_err());
    }

    #[test]
    fn verification_result_wire_names() {
        let r = pending_receipt();
        let json = serde_json::to_value(VerificationResult::for_receipt(&r)).unwrap();
        assert_eq!(json["ok"], true);
        assert_eq!(json["status"], "PENDING");
        assert_eq!(json["kid"], "key-1");
        assert!(json.get("ts").is_some());
    }
}
