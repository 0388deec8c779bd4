//! # EVM JSON-RPC Anchor
//!
//! Anchors a receipt hash by sending a transaction to the configured
//! contract with the 32-byte digest as calldata:
//!
//! ```json
//! {"jsonrpc":"2.0","id":1,"method":"eth_sendTransaction",
//!  "params":[{"from":"0x…","to":"<contract>","data":"0x<sha256>"}]}
//! ```
//!
//! The returned transaction hash is the receipt's anchor reference. The
//! node signs with an unlocked account (`LEDGER_FROM_ADDRESS`, or the first
//! entry of `eth_accounts`), which suits development chains and managed
//! signer proxies. With the zero contract address nothing is sent and every
//! request is declined.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use rcpt_core::ContentDigest;
use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::anchor::{AnchorOutcome, LedgerAnchor};
use crate::config::{ConfigError, LedgerConfig};
use crate::error::AnchorError;

/// Reason recorded on receipts when no contract is configured.
pub const NO_CONTRACT_REASON: &str = "no anchoring contract configured";

/// [`LedgerAnchor`] backed by an Ethereum-compatible JSON-RPC node.
#[derive(Debug)]
pub struct EvmRpcAnchor {
    http: reqwest::Client,
    config: LedgerConfig,
    next_id: AtomicU64,
}

#[derive(Debug, Deserialize)]
struct RpcResponse<T> {
    #[serde(default = "Option::default")]
    result: Option<T>,
    #[serde(default)]
    error: Option<RpcErrorObject>,
}

#[derive(Debug, Deserialize)]
struct RpcErrorObject {
    code: i64,
    message: String,
}

impl EvmRpcAnchor {
    /// Build a client for `config`.
    pub fn new(config: LedgerConfig) -> Result<Self, AnchorError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| AnchorError::Http {
                method: "client_init".into(),
                source: e,
            })?;
        Ok(Self {
            http,
            config,
            next_id: AtomicU64::new(1),
        })
    }

    /// The configuration this client was built with.
    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    async fn call<T: DeserializeOwned>(
        &self,
        method: &str,
        params: serde_json::Value,
    ) -> Result<T, AnchorError> {
        let body = serde_json::json!({
            "jsonrpc": "2.0",
            "id": self.next_id.fetch_add(1, Ordering::Relaxed),
            "method": method,
            "params": params,
        });

        let resp = crate::retry::retry_send(|| {
            self.http
                .post(self.config.rpc_url.clone())
                .json(&body)
                .send()
        })
        .await
        .map_err(|e| AnchorError::Http {
            method: method.into(),
            source: e,
        })?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let body = resp.text().await.unwrap_or_default();
            return Err(AnchorError::Status {
                method: method.into(),
                status,
                body,
            });
        }

        let parsed: RpcResponse<T> =
            resp.json().await.map_err(|e| AnchorError::InvalidResponse {
                method: method.into(),
                reason: e.to_string(),
            })?;

        if let Some(err) = parsed.error {
            return Err(AnchorError::Rpc {
                method: method.into(),
                code: err.code,
                message: err.message,
            });
        }
        parsed.result.ok_or_else(|| AnchorError::InvalidResponse {
            method: method.into(),
            reason: "missing result".into(),
        })
    }

    async fn sender(&self) -> Result<String, AnchorError> {
        if let Some(from) = &self.config.from_address {
            return Ok(from.clone());
        }
        let accounts: Vec<String> = self.call("eth_accounts", serde_json::json!([])).await?;
        accounts
            .into_iter()
            .next()
            .ok_or(AnchorError::Config(ConfigError::NoSender))
    }
}

#[async_trait]
impl LedgerAnchor for EvmRpcAnchor {
    async fn anchor(&self, digest: &ContentDigest) -> Result<AnchorOutcome, AnchorError> {
        if !self.config.anchoring_enabled() {
            return Ok(AnchorOutcome::Declined {
                reason: NO_CONTRACT_REASON.to_string(),
            });
        }

        let from = self.sender().await?;
        let tx = serde_json::json!({
            "from": from,
            "to": self.config.contract_address,
            "data": format!("0x{}", digest.to_hex()),
        });
        let tx_ref: String = self
            .call("eth_sendTransaction", serde_json::json!([tx]))
            .await?;

        if !is_tx_hash(&tx_ref) {
            return Err(AnchorError::InvalidResponse {
                method: "eth_sendTransaction".into(),
                reason: format!("not a transaction hash: {tx_ref}"),
            });
        }

        tracing::info!(tx_ref = %tx_ref, digest = %digest, "hash anchored on ledger");
        Ok(AnchorOutcome::Anchored { tx_ref })
    }

    fn name(&self) -> &str {
        "evm-rpc"
    }
}

fn is_tx_hash(s: &str) -> bool {
    s.strip_prefix("0x")
        .map(|hex| hex.len() == 64 && hex.chars().all(|c| c.is_ascii_hexdigit()))
        .unwrap_or(false)
}
