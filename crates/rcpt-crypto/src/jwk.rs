//! # JWK / JWKS Projection
//!
//! Public P-256 keys in RFC 7517 form so third parties can verify receipt
//! tokens without trusting this service at verification time:
//!
//! ```json
//! {"keys":[{"kty":"EC","crv":"P-256","kid":"...","use":"sig","alg":"ES256","x":"...","y":"..."}]}
//! ```
//!
//! Coordinates are base64url without padding.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use rcpt_core::CanonicalBytes;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::CryptoError;
use crate::es256::Es256PublicKey;

/// A single EC public key in JWK form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Jwk {
    /// Key type, always `EC` for keys this crate emits.
    pub kty: String,
    /// Curve name, always `P-256`.
    pub crv: String,
    /// Key identifier referenced by token headers.
    pub kid: String,
    /// Intended usage.
    #[serde(rename = "use", default)]
    pub key_use: String,
    /// Algorithm the key is used with.
    #[serde(default)]
    pub alg: String,
    /// Base64url affine x coordinate.
    pub x: String,
    /// Base64url affine y coordinate.
    pub y: String,
}

impl Jwk {
    /// Project a public key into a signing JWK under `kid`.
    pub fn from_public_key(kid: &str, key: &Es256PublicKey) -> Result<Self, CryptoError> {
        let (x, y) = key.coordinates()?;
        Ok(Self {
            kty: "EC".to_string(),
            crv: "P-256".to_string(),
            kid: kid.to_string(),
            key_use: "sig".to_string(),
            alg: crate::jws::ALG_ES256.to_string(),
            x: URL_SAFE_NO_PAD.encode(x),
            y: URL_SAFE_NO_PAD.encode(y),
        })
    }

    /// Rebuild the public key, rejecting anything other than an EC P-256 key.
    pub fn to_public_key(&self) -> Result<Es256PublicKey, CryptoError> {
        if self.kty != "EC" || self.crv != "P-256" {
            return Err(CryptoError::InvalidPublicKey(format!(
                "unsupported key type {}/{}",
                self.kty, self.crv
            )));
        }
        if !self.alg.is_empty() && self.alg != crate::jws::ALG_ES256 {
            return Err(CryptoError::InvalidPublicKey(format!(
                "unsupported alg {}",
                self.alg
            )));
        }
        let x = URL_SAFE_NO_PAD
            .decode(&self.x)
            .map_err(|e| CryptoError::Base64Decode(e.to_string()))?;
        let y = URL_SAFE_NO_PAD
            .decode(&self.y)
            .map_err(|e| CryptoError::Base64Decode(e.to_string()))?;
        Es256PublicKey::from_coordinates(&x, &y)
    }
}

/// A JWK Set document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JwkSet {
    /// Published keys.
    pub keys: Vec<Jwk>,
}

impl JwkSet {
    /// Find a key by `kid`.
    pub fn find(&self, kid: &str) -> Option<&Jwk> {
        self.keys.iter().find(|k| k.kid == kid)
    }
}

/// RFC 7638 thumbprint of an EC public key, base64url-encoded.
///
/// Hash input is the required members `crv`, `kty`, `x`, `y` in
/// lexicographic order with no whitespace, which is exactly the canonical
/// form of that object.
pub fn thumbprint(key: &Es256PublicKey) -> Result<String, CryptoError> {
    let (x, y) = key.coordinates()?;
    let members = serde_json::json!({
        "crv": "P-256",
        "kty": "EC",
        "x": URL_SAFE_NO_PAD.encode(x),
        "y": URL_SAFE_NO_PAD.encode(y),
    });
    let canonical = CanonicalBytes::new(&members)
        .map_err(|e| CryptoError::InvalidPublicKey(e.to_string()))?;
    Ok(URL_SAFE_NO_PAD.encode(Sha256::digest(canonical.as_bytes())))
}
