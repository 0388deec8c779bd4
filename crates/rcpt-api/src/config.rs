//! # Service Configuration
//!
//! Everything the binary reads from the environment, resolved once at
//! startup. Unset variables fall back to development defaults: an
//! in-memory store, an ephemeral signing key and a ledger with no
//! anchoring contract.
//!
//! | Variable | Default |
//! |---|---|
//! | `LISTEN_ADDR` | `0.0.0.0:8080` (`:8080` is accepted) |
//! | `VERIFY_BASE_URL` | `http://localhost:8080/verify` |
//! | `DATABASE_URL` | unset, in-memory store |
//! | `DATABASE_NAME` | `receipts` when the URL names no database |
//! | `RECEIPT_SIGNING_KEY` | unset, ephemeral key |
//! | `RECEIPT_SIGNING_KID` | JWK thumbprint |
//! | `RECEIPT_VERIFICATION_JWKS` | unset |
//! | `RECONCILE_INTERVAL_SECS` | unset, no sweep |
//! | `RECONCILE_BATCH_SIZE` | `100` |
//! | `LOG_FORMAT` | `text` (`json` for structured output) |
//!
//! Ledger variables (`LEDGER_*`) are read by [`LedgerConfig::from_env`].

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use rcpt_ledger::LedgerConfig;
use url::Url;
use zeroize::Zeroizing;

/// Environment variable holding the hex signing key.
pub const SIGNING_KEY_VAR: &str = "RECEIPT_SIGNING_KEY";

const DEFAULT_LISTEN_ADDR: &str = "0.0.0.0:8080";
const DEFAULT_VERIFY_BASE_URL: &str = "http://localhost:8080/verify";
const DEFAULT_DATABASE_NAME: &str = "receipts";
const DEFAULT_RECONCILE_BATCH: usize = 100;

/// Errors resolving the service configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// A socket address variable does not parse.
    #[error("invalid listen address {0:?}: expected host:port or :port")]
    InvalidListenAddr(String),

    /// A URL variable does not parse.
    #[error("invalid URL for {var}: {reason}")]
    InvalidUrl {
        /// Variable name.
        var: String,
        /// Parser message.
        reason: String,
    },

    /// A numeric variable does not parse or is zero.
    #[error("invalid value for {var}: {value:?}")]
    InvalidNumber {
        /// Variable name.
        var: String,
        /// Offending value.
        value: String,
    },

    /// Ledger configuration is invalid.
    #[error(transparent)]
    Ledger(#[from] rcpt_ledger::ConfigError),
}

/// Output format for log events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Human-readable lines.
    #[default]
    Text,
    /// One JSON object per event.
    Json,
}

impl LogFormat {
    /// Parse `LOG_FORMAT`. Anything other than `json` is text.
    pub fn parse(value: &str) -> Self {
        if value.trim().eq_ignore_ascii_case("json") {
            Self::Json
        } else {
            Self::Text
        }
    }
}

/// Postgres connection settings.
#[derive(Clone)]
pub struct DatabaseConfig {
    /// Connection URI. May carry credentials.
    pub url: String,
    /// Database name to apply over the URI's own.
    pub name: Option<String>,
}

impl DatabaseConfig {
    /// The database name to connect to, given the name parsed from the URI.
    pub fn effective_name<'a>(&'a self, from_url: Option<&'a str>) -> &'a str {
        self.name
            .as_deref()
            .or(from_url.filter(|n| !n.is_empty()))
            .unwrap_or(DEFAULT_DATABASE_NAME)
    }
}

impl std::fmt::Debug for DatabaseConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DatabaseConfig")
            .field("url", &redact_url(&self.url))
            .field("name", &self.name)
            .finish()
    }
}

/// Resolved service configuration.
#[derive(Clone)]
pub struct ServiceConfig {
    /// Socket the HTTP server binds.
    pub listen_addr: SocketAddr,
    /// Base of the verification link embedded in responses and QR codes.
    pub verify_base_url: Url,
    /// Postgres settings; `None` selects the in-memory store.
    pub database: Option<DatabaseConfig>,
    /// Ledger client settings.
    pub ledger: LedgerConfig,
    /// Hex P-256 secret scalar; `None` generates an ephemeral key.
    pub signing_key: Option<Zeroizing<String>>,
    /// Published key id; `None` uses the JWK thumbprint.
    pub signing_kid: Option<String>,
    /// JWKS file of verification-only (rotated) keys.
    pub verification_jwks: Option<PathBuf>,
    /// Reconciliation sweep period; `None` disables the sweep.
    pub reconcile_interval: Option<Duration>,
    /// Maximum receipts re-attempted per sweep.
    pub reconcile_batch: usize,
    /// Log output format.
    pub log_format: LogFormat,
}

impl ServiceConfig {
    /// Development defaults: in-memory store, ephemeral key, no anchoring.
    pub fn local(ledger: LedgerConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            listen_addr: parse_listen_addr(DEFAULT_LISTEN_ADDR)?,
            verify_base_url: parse_url("VERIFY_BASE_URL", DEFAULT_VERIFY_BASE_URL)?,
            database: None,
            ledger,
            signing_key: None,
            signing_kid: None,
            verification_jwks: None,
            reconcile_interval: None,
            reconcile_batch: DEFAULT_RECONCILE_BATCH,
            log_format: LogFormat::Text,
        })
    }

    /// Load the configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        let listen_addr = parse_listen_addr(&env_or("LISTEN_ADDR", DEFAULT_LISTEN_ADDR))?;
        let verify_base_url = parse_url(
            "VERIFY_BASE_URL",
            &env_or("VERIFY_BASE_URL", DEFAULT_VERIFY_BASE_URL),
        )?;

        let database = env_opt("DATABASE_URL").map(|url| DatabaseConfig {
            url,
            name: env_opt("DATABASE_NAME"),
        });

        let reconcile_interval = env_opt("RECONCILE_INTERVAL_SECS")
            .map(|v| parse_positive("RECONCILE_INTERVAL_SECS", &v))
            .transpose()?
            .map(Duration::from_secs);
        let reconcile_batch = env_opt("RECONCILE_BATCH_SIZE")
            .map(|v| parse_positive("RECONCILE_BATCH_SIZE", &v))
            .transpose()?
            .map(|n| n as usize)
            .unwrap_or(DEFAULT_RECONCILE_BATCH);

        Ok(Self {
            listen_addr,
            verify_base_url,
            database,
            ledger: LedgerConfig::from_env()?,
            signing_key: env_opt(SIGNING_KEY_VAR).map(Zeroizing::new),
            signing_kid: env_opt("RECEIPT_SIGNING_KID"),
            verification_jwks: env_opt("RECEIPT_VERIFICATION_JWKS").map(PathBuf::from),
            reconcile_interval,
            reconcile_batch,
            log_format: env_opt("LOG_FORMAT")
                .map(|v| LogFormat::parse(&v))
                .unwrap_or_default(),
        })
    }
}

impl std::fmt::Debug for ServiceConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceConfig")
            .field("listen_addr", &self.listen_addr)
            .field("verify_base_url", &self.verify_base_url.as_str())
            .field("database", &self.database)
            .field("ledger", &self.ledger)
            .field(
                "signing_key",
                &self.signing_key.as_ref().map(|_| "[REDACTED]"),
            )
            .field("signing_kid", &self.signing_kid)
            .field("verification_jwks", &self.verification_jwks)
            .field("reconcile_interval", &self.reconcile_interval)
            .field("reconcile_batch", &self.reconcile_batch)
            .field("log_format", &self.log_format)
            .finish()
    }
}

/// Parse `host:port`, or `:port` meaning all interfaces.
pub fn parse_listen_addr(raw: &str) -> Result<SocketAddr, ConfigError> {
    let trimmed = raw.trim();
    let candidate = if trimmed.starts_with(':') {
        format!("0.0.0.0{trimmed}")
    } else {
        trimmed.to_string()
    };
    candidate
        .parse()
        .map_err(|_| ConfigError::InvalidListenAddr(raw.to_string()))
}

fn parse_url(var: &str, raw: &str) -> Result<Url, ConfigError> {
    Url::parse(raw).map_err(|e| ConfigError::InvalidUrl {
        var: var.to_string(),
        reason: e.to_string(),
    })
}

fn parse_positive(var: &str, raw: &str) -> Result<u64, ConfigError> {
    match raw.trim().parse::<u64>() {
        Ok(n) if n > 0 => Ok(n),
        _ => Err(ConfigError::InvalidNumber {
            var: var.to_string(),
            value: raw.to_string(),
        }),
    }
}

fn env_opt(var: &str) -> Option<String> {
    std::env::var(var).ok().filter(|v| !v.trim().is_empty())
}

fn env_or(var: &str, default: &str) -> String {
    env_opt(var).unwrap_or_else(|| default.to_string())
}

/// Replace the password in a connection URI.
fn redact_url(raw: &str) -> String {
    match Url::parse(raw) {
        Ok(mut url) if url.password().is_some() => {
            // set_password only fails for cannot-be-a-base URLs, which have no password.
            let _ = url.set_password(Some("***"));
            url.to_string()
        }
        Ok(url) => url.to_string(),
        Err(_) => "[UNPARSEABLE]".to_string(),
    }
}
