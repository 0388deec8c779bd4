//! # Keygen Subcommand
//!
//! Generates a P-256 signing key for the receipt service and prints it in
//! the forms the service and verifiers consume: the hex secret for
//! `RECEIPT_SIGNING_KEY`, the key id, and the public JWK.
//!
//! With `--output DIR` the secret is written to `DIR/<prefix>.key` and a
//! single-key JWKS to `DIR/<prefix>.jwks.json` instead of printing the secret.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Args;
use zeroize::Zeroizing;

use rcpt_crypto::{thumbprint, Es256KeyPair, Jwk, JwkSet};

/// Arguments for `rcpt keygen`.
#[derive(Args, Debug)]
pub struct KeygenArgs {
    /// Key id to publish. Defaults to the RFC 7638 thumbprint.
    #[arg(long)]
    pub kid: Option<String>,

    /// Write key files here instead of printing the secret.
    #[arg(long, short)]
    pub output: Option<PathBuf>,

    /// Prefix for the key filenames.
    #[arg(long, default_value = "receipt-signing")]
    pub prefix: String,
}

/// A freshly generated key in its exportable forms.
pub struct GeneratedKey {
    /// Hex-encoded 32-byte secret scalar.
    pub secret_hex: Zeroizing<String>,
    /// Published key id.
    pub kid: String,
    /// Public JWK.
    pub jwk: Jwk,
}

/// Generate a key, using `kid` or the thumbprint as its id.
pub fn generate_key(kid: Option<&str>) -> Result<GeneratedKey> {
    let key = Es256KeyPair::generate();
    let public = key.public_key();
    let kid = match kid {
        Some(k) => k.to_string(),
        None => thumbprint(&public).context("failed to compute key thumbprint")?,
    };
    let jwk = Jwk::from_public_key(&kid, &public).context("failed to build JWK")?;
    Ok(GeneratedKey {
        secret_hex: key.secret_hex(),
        kid,
        jwk,
    })
}

/// Execute `rcpt keygen`.
pub fn run_keygen(args: &KeygenArgs) -> Result<u8> {
    let key = generate_key(args.kid.as_deref())?;
    let jwk_json = serde_json::to_string_pretty(&key.jwk)?;

    match &args.output {
        Some(dir) => {
            let (key_path, jwks_path) = write_key_files(&key, dir, &args.prefix)?;
            println!("OK: generated ES256 signing key");
            println!("  kid:         {}", key.kid);
            println!("  Private key: {}", key_path.display());
            println!("  JWKS:        {}", jwks_path.display());
        }
        None => {
            println!("RECEIPT_SIGNING_KEY={}", key.secret_hex.as_str());
            println!("RECEIPT_SIGNING_KID={}", key.kid);
            println!("{jwk_json}");
        }
    }
    Ok(0)
}

/// Write the secret and a single-key JWKS under `dir`.
pub fn write_key_files(key: &GeneratedKey, dir: &Path, prefix: &str) -> Result<(PathBuf, PathBuf)> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("failed to create output directory: {}", dir.display()))?;

    let key_path = dir.join(format!("{prefix}.key"));
    let jwks_path = dir.join(format!("{prefix}.jwks.json"));

    std::fs::write(&key_path, key.secret_hex.as_bytes())
        .with_context(|| format!("failed to write private key: {}", key_path.display()))?;

    let jwks = JwkSet {
        keys: vec![key.jwk.clone()],
    };
    std::fs::write(&jwks_path, serde_json::to_string_pretty(&jwks)?)
        .with_context(|| format!("failed to write JWKS: {}", jwks_path.display()))?;

    Ok((key_path, jwks_path))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_kid_is_thumbprint() {
        let key = generate_key(None).unwrap();
        let public = key.jwk.to_public_key().unwrap();
        assert_eq!(key.kid, thumbprint(&public).unwrap());
        assert_eq!(key.secret_hex.len(), 64);
    }

    #[test]
    fn explicit_kid_is_used() {
        let key = generate_key(Some("2024-06")).unwrap();
        assert_eq!(key.kid, "2024-06");
        assert_eq!(key.jwk.kid, "2024-06");
    }

    #[test]
    fn secret_reloads_to_same_public_key() {
        let key = generate_key(None).unwrap();
        let reloaded = Es256KeyPair::from_secret_hex(&key.secret_hex).unwrap();
        assert_eq!(reloaded.public_key(), key.jwk.to_public_key().unwrap());
    }

    #[test]
    fn writes_key_files() {
        let dir = tempfile::tempdir().unwrap();
        let key = generate_key(Some("k1")).unwrap();
        let (key_path, jwks_path) = write_key_files(&key, dir.path(), "svc").unwrap();

        assert_eq!(std::fs::read_to_string(&key_path).unwrap(), *key.secret_hex);
        let jwks: JwkSet =
            serde_json::from_str(&std::fs::read_to_string(&jwks_path).unwrap()).unwrap();
        assert!(jwks.find("k1").is_some());
        assert!(key_path.ends_with("svc.key"));
    }
}
