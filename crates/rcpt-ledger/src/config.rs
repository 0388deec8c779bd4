//! Ledger client configuration.
//!
//! Defaults target a local development node with no anchoring contract, in
//! which case every anchoring attempt is declined rather than failed.

use url::Url;

/// Configuration for the EVM JSON-RPC anchor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerConfig {
    /// JSON-RPC endpoint.
    pub rpc_url: Url,
    /// Anchoring contract address (`0x`-prefixed hex). The zero address
    /// disables anchoring.
    pub contract_address: String,
    /// Sender account. When absent the node's first unlocked account is used.
    pub from_address: Option<String>,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
}

const DEFAULT_RPC_URL: &str = "http://localhost:8545";
const DEFAULT_CONTRACT: &str = "0x0";
const DEFAULT_TIMEOUT_SECS: u64 = 10;

impl LedgerConfig {
    /// Configuration for `rpc_url` and `contract_address` with default
    /// sender lookup and timeout.
    pub fn new(rpc_url: Url, contract_address: impl Into<String>) -> Self {
        Self {
            rpc_url,
            contract_address: contract_address.into(),
            from_address: None,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }

    /// Load configuration from environment variables.
    ///
    /// Variables:
    /// - `LEDGER_RPC_URL` (default: `http://localhost:8545`)
    /// - `LEDGER_CONTRACT_ADDRESS` (default: `0x0`, anchoring disabled)
    /// - `LEDGER_FROM_ADDRESS` (optional)
    /// - `LEDGER_TIMEOUT_SECS` (default: 10)
    pub fn from_env() -> Result<Self, ConfigError> {
        let contract_address =
            std::env::var("LEDGER_CONTRACT_ADDRESS").unwrap_or_else(|_| DEFAULT_CONTRACT.to_string());
        validate_address("LEDGER_CONTRACT_ADDRESS", &contract_address)?;

        let from_address = match std::env::var("LEDGER_FROM_ADDRESS") {
            Ok(addr) if !addr.trim().is_empty() => {
                validate_address("LEDGER_FROM_ADDRESS", &addr)?;
                Some(addr)
            }
            _ => None,
        };

        Ok(Self {
            rpc_url: env_url("LEDGER_RPC_URL", DEFAULT_RPC_URL)?,
            contract_address,
            from_address,
            timeout_secs: std::env::var("LEDGER_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(DEFAULT_TIMEOUT_SECS),
        })
    }

    /// Whether a real anchoring contract is configured.
    pub fn anchoring_enabled(&self) -> bool {
        !is_zero_address(&self.contract_address)
    }
}

/// True for `0x0`, `0x000…0` and the empty string.
pub fn is_zero_address(addr: &str) -> bool {
    let hex = addr.trim().trim_start_matches("0x").trim_start_matches("0X");
    hex.chars().all(|c| c == '0')
}

fn validate_address(var: &str, addr: &str) -> Result<(), ConfigError> {
    let trimmed = addr.trim();
    let hex = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .ok_or_else(|| ConfigError::InvalidAddress(var.to_string(), addr.to_string()))?;
    let ok = hex.len() <= 40 && hex.chars().all(|c| c.is_ascii_hexdigit());
    if ok && (hex.len() == 40 || is_zero_address(trimmed)) {
        Ok(())
    } else {
        Err(ConfigError::InvalidAddress(var.to_string(), addr.to_string()))
    }
}

fn env_url(var: &str, default: &str) -> Result<Url, ConfigError> {
    let raw = std::env::var(var).unwrap_or_else(|_| default.to_string());
    Url::parse(&raw).map_err(|e| ConfigError::InvalidUrl(var.to_string(), e.to_string()))
}

/// Configuration errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    /// A URL variable does not parse.
    #[error("invalid URL for {0}: {1}")]
    InvalidUrl(String, String),
    /// An address variable is not a 20-byte hex address.
    #[error("invalid address for {0}: {1}")]
    InvalidAddress(String, String),
    /// No sender account is configured or available on the node.
    #[error("no sender account: set LEDGER_FROM_ADDRESS or unlock an account on the node")]
    NoSender,
}
