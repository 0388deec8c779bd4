//! # Key Provider Abstraction
//!
//! Abstracts P-256 key storage behind a trait that hands the JWS encoder
//! its signing key:
//!
//! - [`LocalKeyProvider`]: In-memory key for development and testing.
//! - [`EnvKeyProvider`]: Loads key material from an environment variable
//!   (hex-encoded 32-byte P-256 secret scalar). Suitable for container
//!   deployments where secrets are injected via environment.
//!
//! Every provider carries the `kid` its signatures are published under.
//! When none is supplied the RFC 7638 thumbprint of the public key is used,
//! so the same key always gets the same id across restarts.
//!
//! ## Security Invariants
//!
//! - `p256::ecdsa::SigningKey` zeroizes its scalar on drop.
//! - `KeyProvider` is `Send + Sync` for use across async tasks.

use jsonwebtoken::EncodingKey;

use crate::error::CryptoError;
use crate::es256::{Es256KeyPair, Es256PublicKey};
use crate::jwk::thumbprint;

/// Trait for ES256 key storage backends.
pub trait KeyProvider: Send + Sync {
    /// Identifier published in token headers and the JWKS.
    fn key_id(&self) -> &str;

    /// The managed key as an ES256 `EncodingKey`.
    fn encoding_key(&self) -> Result<EncodingKey, CryptoError>;

    /// Return the public key.
    fn public_key(&self) -> Result<Es256PublicKey, CryptoError>;

    /// Human-readable name for this provider (for diagnostics/logging).
    fn provider_name(&self) -> &str;
}

fn default_kid(key: &Es256KeyPair) -> String {
    // Thumbprint only fails for a point with no affine form, which a
    // verifying key derived from a valid scalar never is.
    thumbprint(&key.public_key()).unwrap_or_else(|_| "receipt-signing-key".to_string())
}

// ─── LocalKeyProvider ────────────────────────────────────────────────────

/// In-memory P-256 key provider for development and testing.
pub struct LocalKeyProvider {
    key: Es256KeyPair,
    kid: String,
}

impl LocalKeyProvider {
    /// Create from an existing key pair, keyed by its thumbprint.
    pub fn new(key: Es256KeyPair) -> Self {
        let kid = default_kid(&key);
        Self { key, kid }
    }

    /// Generate a new random key using the OS CSPRNG.
    pub fn generate() -> Self {
        Self::new(Es256KeyPair::generate())
    }

    /// Override the published key id.
    pub fn with_key_id(mut self, kid: impl Into<String>) -> Self {
        self.kid = kid.into();
        self
    }
}

impl KeyProvider for LocalKeyProvider {
    fn key_id(&self) -> &str {
        &self.kid
    }

    fn encoding_key(&self) -> Result<EncodingKey, CryptoError> {
        self.key.encoding_key()
    }

    fn public_key(&self) -> Result<Es256PublicKey, CryptoError> {
        Ok(self.key.public_key())
    }

    fn provider_name(&self) -> &str {
        "LocalKeyProvider"
    }
}

// ─── EnvKeyProvider ──────────────────────────────────────────────────────

/// Loads a P-256 signing key from an environment variable.
///
/// The variable must contain a 64-character hex string encoding the
/// 32-byte secret scalar. The key is loaded once at construction.
///
/// ```bash
/// export RECEIPT_SIGNING_KEY="c9afa9d8..."  # 64 hex chars
/// ```
pub struct EnvKeyProvider {
    key: Es256KeyPair,
    kid: String,
    var_name: String,
}

impl EnvKeyProvider {
    /// Load the signing key from the named environment variable.
    pub fn from_env(var_name: &str) -> Result<Self, CryptoError> {
        let value = std::env::var(var_name).map_err(|_| {
            CryptoError::KeyUnavailable(format!("environment variable {var_name} not set"))
        })?;
        Self::from_hex(var_name, &value)
    }

    /// Build from a hex secret already read from `var_name`.
    pub fn from_hex(var_name: &str, secret_hex: &str) -> Result<Self, CryptoError> {
        let key = Es256KeyPair::from_secret_hex(secret_hex).map_err(|e| match e {
            CryptoError::HexDecode(msg) | CryptoError::InvalidSigningKey(msg) => {
                CryptoError::InvalidSigningKey(format!("{var_name}: {msg}"))
            }
            other => other,
        })?;
        let kid = default_kid(&key);
        Ok(Self {
            key,
            kid,
            var_name: var_name.to_string(),
        })
    }

    /// Override the published key id.
    pub fn with_key_id(mut self, kid: impl Into<String>) -> Self {
        self.kid = kid.into();
        self
    }

    /// Return the environment variable name this provider was loaded from.
    pub fn var_name(&self) -> &str {
        &self.var_name
    }
}

impl KeyProvider for EnvKeyProvider {
    fn key_id(&self) -> &str {
        &self.kid
    }

    fn encoding_key(&self) -> Result<EncodingKey, CryptoError> {
        self.key.encoding_key()
    }

    fn public_key(&self) -> Result<Es256PublicKey, CryptoError> {
        Ok(self.key.public_key())
    }

    fn provider_name(&self) -> &str {
        "EnvKeyProvider"
    }
}

// ─── Tests ──────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "c9afa9d845ba75166b5c215767b1d6934e50c3db36e89b127b8a622b120f6721";

    #[test]
    fn local_provider_yields_encoding_key() {
        let provider = LocalKeyProvider::generate();
        let token = jsonwebtoken::encode(
            &jsonwebtoken::Header::new(jsonwebtoken::Algorithm::ES256),
            &serde_json::json!({"n": 1}),
            &provider.encoding_key().expect("encoding key"),
        )
        .expect("sign");
        assert_eq!(token.split('.').count(), 3);
    }

    #[test]
    fn default_kid_is_thumbprint() {
        let provider = LocalKeyProvider::generate();
        let expected = thumbprint(&provider.public_key().unwrap()).unwrap();
        assert_eq!(provider.key_id(), expected);
    }

    #[test]
    fn with_key_id_overrides() {
        let provider = LocalKeyProvider::generate().with_key_id("demo-key-1");
        assert_eq!(provider.key_id(), "demo-key-1");
        assert_eq!(provider.provider_name(), "LocalKeyProvider");
    }

    #[test]
    fn env_provider_from_hex_is_deterministic() {
        let a = EnvKeyProvider::from_hex("TEST_KEY", SECRET).unwrap();
        let b = EnvKeyProvider::from_hex("TEST_KEY", SECRET).unwrap();
        assert_eq!(a.public_key().unwrap(), b.public_key().unwrap());
        assert_eq!(a.key_id(), b.key_id());
        assert_eq!(a.var_name(), "TEST_KEY");
        assert_eq!(a.provider_name(), "EnvKeyProvider");
    }

    #[test]
    fn env_provider_rejects_bad_hex() {
        let err = EnvKeyProvider::from_hex("TEST_KEY", "zz").err().expect("bad hex");
        assert!(matches!(err, CryptoError::InvalidSigningKey(ref m) if m.contains("TEST_KEY")));
        assert!(EnvKeyProvider::from_hex("TEST_KEY", "abcd").is_err());
    }

    #[test]
    fn env_provider_missing_variable() {
        let err = EnvKeyProvider::from_env("RCPT_TEST_UNSET_SIGNING_KEY_VAR")
            .err()
            .expect("unset var");
        assert!(matches!(err, CryptoError::KeyUnavailable(_)));
    }
}
