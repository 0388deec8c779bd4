//! # Ledger Anchoring Capability
//!
//! The receipt service depends only on [`LedgerAnchor`], so the chain
//! client can be swapped for a test double or for [`DecliningAnchor`] in
//! deployments that do not anchor at all.
//!
//! An anchoring attempt has three results, and they drive the receipt's
//! status differently:
//!
//! | Result                        | Receipt status |
//! |-------------------------------|----------------|
//! | `Ok(Anchored { tx_ref })`     | `ANCHORED`     |
//! | `Ok(Declined { reason })`     | `SKIPPED`      |
//! | `Err(AnchorError)`            | stays `PENDING`|

use async_trait::async_trait;
use rcpt_core::ContentDigest;

use crate::error::AnchorError;

/// Successful (non-error) result of an anchoring attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnchorOutcome {
    /// The ledger recorded the hash.
    Anchored {
        /// Ledger transaction reference.
        tx_ref: String,
    },
    /// The ledger declined by policy; retrying will not help.
    Declined {
        /// Why anchoring was declined.
        reason: String,
    },
}

/// Records a content digest on an external ledger.
#[async_trait]
pub trait LedgerAnchor: Send + Sync {
    /// Anchor `digest`.
    async fn anchor(&self, digest: &ContentDigest) -> Result<AnchorOutcome, AnchorError>;

    /// Human-readable name for logs.
    fn name(&self) -> &str;
}

/// An anchor that declines every request with a fixed reason.
#[derive(Debug, Clone)]
pub struct DecliningAnchor {
    reason: String,
}

impl DecliningAnchor {
    /// Decline with `reason`.
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

impl Default for DecliningAnchor {
    fn default() -> Self {
        Self::new("anchoring disabled")
    }
}

#[async_trait]
impl LedgerAnchor for DecliningAnchor {
    async fn anchor(&self, _digest: &ContentDigest) -> Result<AnchorOutcome, AnchorError> {
        Ok(AnchorOutcome::Declined {
            reason: self.reason.clone(),
        })
    }

    fn name(&self) -> &str {
        "declining"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn declining_anchor_always_declines() {
        let anchor = DecliningAnchor::new("no contract");
        let digest = ContentDigest::from_bytes([1; 32]);
        for _ in 0..3 {
            assert_eq!(
                anchor.anchor(&digest).await.unwrap(),
                AnchorOutcome::Declined {
                    reason: "no contract".into()
                }
            );
        }
        assert_eq!(anchor.name(), "declining");
    }

    #[tokio::test]
    async fn works_behind_trait_object() {
        let anchor: Box<dyn LedgerAnchor> = Box::new(DecliningAnchor::default());
        let outcome = anchor.anchor(&ContentDigest::from_bytes([0; 32])).await.unwrap();
        assert!(matches!(outcome, AnchorOutcome::Declined { .. }));
    }
}
