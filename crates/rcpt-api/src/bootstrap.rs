//! # Service Bootstrap
//!
//! Turns a [`ServiceConfig`] into a running [`AppState`].
//!
//! ## Bootstrap Sequence
//!
//! 1. **Load Signing Key**: from `RECEIPT_SIGNING_KEY`, or generate an
//!    ephemeral key (dev mode, logged as a warning).
//! 2. **Load Rotated Keys**: verification-only keys from the JWKS file
//!    named by `RECEIPT_VERIFICATION_JWKS`.
//! 3. **Open Store**: Postgres when `DATABASE_URL` is set, else in-memory.
//! 4. **Build Ledger Client**: EVM JSON-RPC anchor.
//! 5. **Log Identity**: active kid, store and anchor in one startup line.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use rcpt_crypto::{EnvKeyProvider, JwkSet, KeyProvider, KeySet, LocalKeyProvider};
use rcpt_ledger::{AnchorError, EvmRpcAnchor, LedgerAnchor};
use tokio::task::JoinHandle;

use crate::config::{ServiceConfig, SIGNING_KEY_VAR};
use crate::qr::PngQrRenderer;
use crate::service::ReceiptService;
use crate::state::AppState;
use crate::store::{InMemoryReceiptStore, ReceiptStore};

/// Errors during startup.
#[derive(Debug, thiserror::Error)]
pub enum BootstrapError {
    /// Signing key could not be loaded.
    #[error("signing key error: {0}")]
    SigningKey(#[from] rcpt_crypto::CryptoError),

    /// The verification JWKS file could not be read or parsed.
    #[error("verification keys {path}: {reason}")]
    VerificationKeys {
        /// File path.
        path: String,
        /// What went wrong.
        reason: String,
    },

    /// Database connection or migration failed.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Ledger client could not be built.
    #[error("ledger client error: {0}")]
    Ledger(#[from] AnchorError),
}

/// Build application state from configuration.
pub async fn bootstrap(config: &ServiceConfig) -> Result<AppState, BootstrapError> {
    let provider = signing_key(config)?;
    let mut keys = KeySet::new(provider);
    if let Some(path) = &config.verification_jwks {
        keys = keys.with_jwks(&load_jwks(path)?)?;
    }

    let store: Arc<dyn ReceiptStore> = match &config.database {
        Some(db) => {
            let pool = crate::db::init_pool(db).await?;
            Arc::new(crate::db::PgReceiptStore::new(pool))
        }
        None => {
            tracing::warn!(
                "DATABASE_URL not set, running with the in-memory store. \
                 Receipts will not survive restarts."
            );
            Arc::new(InMemoryReceiptStore::new())
        }
    };

    let anchor = EvmRpcAnchor::new(config.ledger.clone())?;
    if !config.ledger.anchoring_enabled() {
        tracing::warn!("LEDGER_CONTRACT_ADDRESS is the zero address, receipts will be SKIPPED");
    }
    let anchor: Arc<dyn LedgerAnchor> = Arc::new(anchor);

    tracing::info!(
        kid = keys.active_kid(),
        provider = keys.signer().provider_name(),
        keys = keys.len(),
        store = store.name(),
        anchor = anchor.name(),
        rpc_url = %config.ledger.rpc_url,
        "receipt service configured"
    );

    Ok(AppState::new(ReceiptService::new(
        keys,
        store,
        anchor,
        Arc::new(PngQrRenderer::default()),
        config.verify_base_url.clone(),
    )))
}

/// Run [`ReceiptService::reconcile_pending`] every `every`, forever.
///
/// The first sweep runs one full period after startup.
pub fn spawn_reconciler(
    service: Arc<ReceiptService>,
    every: Duration,
    batch: usize,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + every, every);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            if let Err(e) = service.reconcile_pending(batch).await {
                tracing::warn!(error = %e, "reconciliation sweep failed");
            }
        }
    })
}

fn signing_key(config: &ServiceConfig) -> Result<Arc<dyn KeyProvider>, BootstrapError> {
    match &config.signing_key {
        Some(secret) => {
            let mut provider = EnvKeyProvider::from_hex(SIGNING_KEY_VAR, secret)?;
            if let Some(kid) = &config.signing_kid {
                provider = provider.with_key_id(kid.clone());
            }
            Ok(Arc::new(provider))
        }
        None => {
            let mut provider = LocalKeyProvider::generate();
            if let Some(kid) = &config.signing_kid {
                provider = provider.with_key_id(kid.clone());
            }
            tracing::warn!(
                kid = provider.key_id(),
                "{SIGNING_KEY_VAR} not set, using an ephemeral signing key. \
                 Tokens will not verify after a restart."
            );
            Ok(Arc::new(provider))
        }
    }
}

fn load_jwks(path: &Path) -> Result<JwkSet, BootstrapError> {
    let err = |reason: String| BootstrapError::VerificationKeys {
        path: path.display().to_string(),
        reason,
    };
    let raw = std::fs::read_to_string(path).map_err(|e| err(e.to_string()))?;
    serde_json::from_str(&raw).map_err(|e| err(e.to_string()))
}
