//! # Compact JWS for Receipt Tokens
//!
//! A receipt token is a compact JWS issued and checked with `jsonwebtoken`:
//!
//! - header `{"typ":"JWT","alg":"ES256","kid":"<key id>"}`
//! - claims `{"payload":"<canonical payload>","hash":"<sha256 hex>","iat":<unix secs>}`
//! - signature the 64-byte `r || s` ES256 signature over `header "." claims`.
//!
//! Verification resolves `kid` through a [`KeyResolver`] and checks the
//! signature before the claims are decoded, so nothing in an
//! unauthenticated claims segment is trusted. Receipts never expire, so
//! no registered claim is required.

use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, Header, Validation};
use rcpt_core::{sha256_digest, CanonicalBytes};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::CryptoError;
use crate::key_provider::KeyProvider;
use crate::keyset::KeyResolver;

/// The only accepted JOSE algorithm.
pub const ALG_ES256: &str = "ES256";

/// Errors issuing or verifying a compact token.
#[derive(Error, Debug)]
pub enum JwsError {
    /// Token is not three base64url segments with a JSON header.
    #[error("malformed token: {0}")]
    Malformed(String),

    /// Header names an algorithm other than ES256.
    #[error("unsupported algorithm: {0}")]
    UnsupportedAlgorithm(String),

    /// Header carries no `kid`.
    #[error("token header has no kid")]
    MissingKeyId,

    /// No known public key for the header's `kid`.
    #[error("unknown signing key: {0}")]
    UnknownKey(String),

    /// Signature does not verify under the resolved key.
    #[error("signature verification failed")]
    BadSignature,

    /// Signature verified but the claims segment is not a receipt claim set.
    #[error("invalid claims: {0}")]
    Claims(String),

    /// Key material could not be turned into a JOSE key.
    #[error("key error: {0}")]
    Key(#[from] CryptoError),

    /// The encoder failed to produce a token.
    #[error("signing failed: {0}")]
    Signing(String),
}

impl JwsError {
    /// Stable snake_case name of the failure, suitable for API error details.
    pub fn reason(&self) -> &'static str {
        match self {
            Self::Malformed(_) => "malformed",
            Self::UnsupportedAlgorithm(_) => "unsupported_algorithm",
            Self::MissingKeyId => "missing_kid",
            Self::UnknownKey(_) => "unknown_key",
            Self::BadSignature => "bad_signature",
            Self::Claims(_) => "invalid_claims",
            Self::Key(_) => "key_error",
            Self::Signing(_) => "signing_failed",
        }
    }
}

/// Claims carried by a receipt token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReceiptClaims {
    /// Canonical payload text.
    pub payload: String,
    /// Lowercase hex SHA-256 of `payload`.
    pub hash: String,
    /// Issuance time, Unix seconds.
    pub iat: i64,
}

impl ReceiptClaims {
    /// Build claims for `canonical`, deriving the hash from it.
    pub fn new(canonical: &CanonicalBytes, issued_at: i64) -> Self {
        Self {
            payload: canonical.as_str().to_string(),
            hash: sha256_digest(canonical).to_hex(),
            iat: issued_at,
        }
    }

    /// Whether `hash` is the digest of the canonical form of `payload`.
    pub fn payload_matches_hash(&self) -> bool {
        CanonicalBytes::from_json_str(&self.payload)
            .map(|cb| sha256_digest(&cb).to_hex() == self.hash)
            .unwrap_or(false)
    }
}

/// A token whose signature has been checked.
#[derive(Debug, Clone)]
pub struct VerifiedToken {
    /// Decoded header.
    pub header: Header,
    /// Decoded claims.
    pub claims: ReceiptClaims,
}

impl VerifiedToken {
    /// The key id the token was verified under.
    pub fn kid(&self) -> &str {
        self.header.kid.as_deref().unwrap_or_default()
    }
}

/// Protected header for an ES256 token signed by `kid`.
pub fn es256_header(kid: &str) -> Header {
    let mut header = Header::new(Algorithm::ES256);
    header.kid = Some(kid.to_string());
    header
}

/// Sign `claims` with the provider's key and return the compact token.
pub fn sign_compact(
    provider: &dyn KeyProvider,
    claims: &ReceiptClaims,
) -> Result<String, JwsError> {
    let key = provider.encoding_key()?;
    jsonwebtoken::encode(&es256_header(provider.key_id()), claims, &key)
        .map_err(|e| JwsError::Signing(e.to_string()))
}

/// Decode only the header of a compact token, without verifying anything.
pub fn decode_header(token: &str) -> Result<Header, JwsError> {
    jsonwebtoken::decode_header(token).map_err(|e| JwsError::Malformed(e.to_string()))
}

/// Verify a compact token against the keys known to `resolver`.
pub fn verify_compact<R: KeyResolver + ?Sized>(
    token: &str,
    resolver: &R,
) -> Result<VerifiedToken, JwsError> {
    let header = decode_header(token)?;
    if header.alg != Algorithm::ES256 {
        return Err(JwsError::UnsupportedAlgorithm(format!("{:?}", header.alg)));
    }
    let kid = header.kid.as_deref().ok_or(JwsError::MissingKeyId)?;
    let key = resolver
        .resolve(kid)
        .ok_or_else(|| JwsError::UnknownKey(kid.to_string()))?
        .decoding_key()?;

    let data = jsonwebtoken::decode::<ReceiptClaims>(token, &key, &receipt_validation())
        .map_err(|e| match e.kind() {
            ErrorKind::InvalidSignature => JwsError::BadSignature,
            ErrorKind::InvalidAlgorithm => JwsError::UnsupportedAlgorithm(ALG_ES256.to_string()),
            ErrorKind::Json(_) => JwsError::Claims(e.to_string()),
            _ => JwsError::Malformed(e.to_string()),
        })?;
    Ok(VerifiedToken {
        header: data.header,
        claims: data.claims,
    })
}

fn receipt_validation() -> Validation {
    let mut validation = Validation::new(Algorithm::ES256);
    validation.required_spec_claims.clear();
    validation.validate_exp = false;
    validation.validate_aud = false;
    validation
}
