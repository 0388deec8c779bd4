//! # Hash and Verify Subcommands
//!
//! Offline counterparts of the service's issuance and verification:
//!
//! - `rcpt hash FILE`: print the canonical form of a JSON document and
//!   its SHA-256, exactly as the service would compute them.
//! - `rcpt verify --jwks FILE TOKEN`: check a receipt token's signature
//!   against a published JWKS and confirm its payload matches its hash.
//!   With `--payload FILE` the token must also cover that document.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{TimeZone, Utc};
use clap::Args;

use rcpt_core::{sha256_digest, CanonicalBytes};
use rcpt_crypto::{verify_compact, JwkSet, VerifiedToken};

/// Arguments for `rcpt hash`.
#[derive(Args, Debug)]
pub struct HashArgs {
    /// JSON document to canonicalize.
    #[arg(value_name = "FILE")]
    pub file: PathBuf,
}

/// Arguments for `rcpt verify`.
#[derive(Args, Debug)]
pub struct VerifyArgs {
    /// JWKS document (e.g. saved from `/jwks.json`).
    #[arg(long)]
    pub jwks: PathBuf,

    /// Document the token is expected to cover.
    #[arg(long)]
    pub payload: Option<PathBuf>,

    /// Compact receipt token.
    #[arg(value_name = "TOKEN")]
    pub token: String,
}

/// Canonical form and hash of a JSON document.
pub fn canonical_hash(json: &str) -> Result<(CanonicalBytes, String)> {
    let value: serde_json::Value = serde_json::from_str(json).context("invalid JSON")?;
    let canonical = CanonicalBytes::new(&value).context("failed to canonicalize document")?;
    let hash = sha256_digest(&canonical).to_hex();
    Ok((canonical, hash))
}

/// Why an offline verification failed.
#[derive(Debug, PartialEq, Eq)]
pub enum Rejection {
    /// Signature, algorithm, key id or token shape is wrong.
    Signature(String),
    /// The signed hash is not the hash of the signed payload.
    InconsistentClaims,
    /// The token does not cover the expected document.
    PayloadMismatch {
        /// Hash in the token.
        token: String,
        /// Hash of the supplied document.
        document: String,
    },
}

/// Verify `token` against `jwks`, optionally requiring it to cover `expected_hash`.
pub fn check_token(
    token: &str,
    jwks: &JwkSet,
    expected_hash: Option<&str>,
) -> std::result::Result<VerifiedToken, Rejection> {
    let verified =
        verify_compact(token.trim(), jwks).map_err(|e| Rejection::Signature(e.to_string()))?;
    if !verified.claims.payload_matches_hash() {
        return Err(Rejection::InconsistentClaims);
    }
    if let Some(expected) = expected_hash {
        if verified.claims.hash != expected {
            return Err(Rejection::PayloadMismatch {
                token: verified.claims.hash.clone(),
                document: expected.to_string(),
            });
        }
    }
    Ok(verified)
}

/// Execute `rcpt hash`.
pub fn run_hash(args: &HashArgs) -> Result<u8> {
    let content = read(&args.file, "document")?;
    let (canonical, hash) = canonical_hash(&content)
        .with_context(|| format!("failed to hash {}", args.file.display()))?;
    println!("{}", canonical.as_str());
    println!("{hash}");
    Ok(0)
}

/// Execute `rcpt verify`.
pub fn run_verify(args: &VerifyArgs) -> Result<u8> {
    let jwks: JwkSet = serde_json::from_str(&read(&args.jwks, "JWKS")?)
        .with_context(|| format!("failed to parse JWKS: {}", args.jwks.display()))?;

    let expected = match &args.payload {
        Some(path) => Some(canonical_hash(&read(path, "payload")?)?.1),
        None => None,
    };

    match check_token(&args.token, &jwks, expected.as_deref()) {
        Ok(verified) => {
            let issued = Utc
                .timestamp_opt(verified.claims.iat, 0)
                .single()
                .map(|t| t.to_rfc3339())
                .unwrap_or_else(|| verified.claims.iat.to_string());
            println!("OK: signature is valid");
            println!("  kid:     {}", verified.kid());
            println!("  hash:    {}", verified.claims.hash);
            println!("  issued:  {issued}");
            println!("  payload: {}", verified.claims.payload);
            Ok(0)
        }
        Err(rejection) => {
            match rejection {
                Rejection::Signature(reason) => println!("FAIL: {reason}"),
                Rejection::InconsistentClaims => {
                    println!("FAIL: token hash does not match its payload")
                }
                Rejection::PayloadMismatch { token, document } => {
                    println!("FAIL: token covers {token}, document hashes to {document}")
                }
            }
            Ok(1)
        }
    }
}

fn read(path: &Path, what: &str) -> Result<String> {
    std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {what}: {}", path.display()))
}
