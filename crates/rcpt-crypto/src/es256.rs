//! # ES256 Signing and Verification
//!
//! P-256 key material for the algorithm named `ES256` in JOSE. Keys are
//! generated, imported and exported here with `p256`; the signing itself
//! happens in [`crate::jws`] through `jsonwebtoken`, which receives the
//! keys as an [`EncodingKey`] (PKCS#8) or a [`DecodingKey`] (affine
//! coordinates).
//!
//! ## Security Invariant
//!
//! `Es256KeyPair` does not implement `Serialize` or `Debug` with key
//! material. The secret scalar leaves the type only through
//! [`Es256KeyPair::secret_hex`] and [`Es256KeyPair::encoding_key`], both
//! of which go through zeroizing buffers.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use jsonwebtoken::{DecodingKey, EncodingKey};
use p256::ecdsa::{SigningKey, VerifyingKey};
use p256::pkcs8::EncodePrivateKey;
use p256::{EncodedPoint, FieldBytes};
use zeroize::Zeroizing;

use crate::error::CryptoError;

/// A P-256 public key used to verify ES256 signatures.
#[derive(Clone)]
pub struct Es256PublicKey {
    key: VerifyingKey,
}

/// A P-256 key pair for signing.
pub struct Es256KeyPair {
    key: SigningKey,
}

// ---------------------------------------------------------------------------
// Es256PublicKey
// ---------------------------------------------------------------------------

impl Es256PublicKey {
    /// Build a key from 32-byte big-endian affine coordinates.
    pub fn from_coordinates(x: &[u8], y: &[u8]) -> Result<Self, CryptoError> {
        if x.len() != 32 || y.len() != 32 {
            return Err(CryptoError::InvalidPublicKey(format!(
                "coordinates must be 32 bytes each, got x={} y={}",
                x.len(),
                y.len()
            )));
        }
        let point = EncodedPoint::from_affine_coordinates(
            FieldBytes::from_slice(x),
            FieldBytes::from_slice(y),
            false,
        );
        let key = VerifyingKey::from_encoded_point(&point)
            .map_err(|e| CryptoError::InvalidPublicKey(e.to_string()))?;
        Ok(Self { key })
    }

    /// Return the 32-byte affine `x` and `y` coordinates.
    pub fn coordinates(&self) -> Result<([u8; 32], [u8; 32]), CryptoError> {
        let point = self.key.to_encoded_point(false);
        match (point.x(), point.y()) {
            (Some(x), Some(y)) => {
                let mut xs = [0u8; 32];
                let mut ys = [0u8; 32];
                xs.copy_from_slice(x);
                ys.copy_from_slice(y);
                Ok((xs, ys))
            }
            _ => Err(CryptoError::InvalidPublicKey(
                "point has no affine coordinates".to_string(),
            )),
        }
    }

    /// Uncompressed SEC1 encoding (`0x04 || x || y`).
    pub fn to_sec1_bytes(&self) -> Vec<u8> {
        self.key.to_encoded_point(false).as_bytes().to_vec()
    }

    /// The key in the form `jsonwebtoken` verifies ES256 signatures with.
    pub fn decoding_key(&self) -> Result<DecodingKey, CryptoError> {
        let (x, y) = self.coordinates()?;
        DecodingKey::from_ec_components(&URL_SAFE_NO_PAD.encode(x), &URL_SAFE_NO_PAD.encode(y))
            .map_err(|e| CryptoError::InvalidPublicKey(e.to_string()))
    }
}

impl PartialEq for Es256PublicKey {
    fn eq(&self, other: &Self) -> bool {
        self.key.to_encoded_point(false) == other.key.to_encoded_point(false)
    }
}

impl Eq for Es256PublicKey {}

impl std::fmt::Debug for Es256PublicKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let sec1 = self.to_sec1_bytes();
        write!(f, "Es256PublicKey({}...)", hex::encode(&sec1[1..9]))
    }
}

// ---------------------------------------------------------------------------
// Es256KeyPair
// ---------------------------------------------------------------------------

impl Es256KeyPair {
    /// Generate a new random key pair from the OS CSPRNG.
    pub fn generate() -> Self {
        Self {
            key: SigningKey::random(&mut rand_core::OsRng),
        }
    }

    /// Create a key pair from a 32-byte big-endian secret scalar.
    pub fn from_secret_bytes(bytes: &[u8]) -> Result<Self, CryptoError> {
        if bytes.len() != 32 {
            return Err(CryptoError::InvalidSigningKey(format!(
                "expected 32 bytes, got {}",
                bytes.len()
            )));
        }
        let key = SigningKey::from_slice(bytes)
            .map_err(|e| CryptoError::InvalidSigningKey(e.to_string()))?;
        Ok(Self { key })
    }

    /// Create a key pair from a 64-character hex secret scalar.
    pub fn from_secret_hex(hex_str: &str) -> Result<Self, CryptoError> {
        let bytes = Zeroizing::new(
            hex::decode(hex_str.trim()).map_err(|e| CryptoError::HexDecode(e.to_string()))?,
        );
        Self::from_secret_bytes(&bytes)
    }

    /// Export the secret scalar as lowercase hex.
    pub fn secret_hex(&self) -> Zeroizing<String> {
        Zeroizing::new(hex::encode(self.key.to_bytes()))
    }

    /// Return the public half.
    pub fn public_key(&self) -> Es256PublicKey {
        Es256PublicKey {
            key: self.key.verifying_key().clone(),
        }
    }

    /// The key as a PKCS#8 `EncodingKey` for ES256 signing.
    pub fn encoding_key(&self) -> Result<EncodingKey, CryptoError> {
        let der = self
            .key
            .to_pkcs8_der()
            .map_err(|e| CryptoError::InvalidSigningKey(e.to_string()))?;
        Ok(EncodingKey::from_ec_der(der.as_bytes()))
    }
}

impl std::fmt::Debug for Es256KeyPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Es256KeyPair")
            .field("public_key", &self.public_key())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{Algorithm, Header, Validation};
    use serde_json::{json, Value};

    fn no_claim_checks() -> Validation {
        let mut validation = Validation::new(Algorithm::ES256);
        validation.required_spec_claims.clear();
        validation.validate_exp = false;
        validation
    }

    #[test]
    fn encoding_key_signs_what_decoding_key_verifies() {
        let kp = Es256KeyPair::generate();
        let token = jsonwebtoken::encode(
            &Header::new(Algorithm::ES256),
            &json!({"n": 1}),
            &kp.encoding_key().unwrap(),
        )
        .unwrap();
        let decoded = jsonwebtoken::decode::<Value>(
            &token,
            &kp.public_key().decoding_key().unwrap(),
            &no_claim_checks(),
        )
        .unwrap();
        assert_eq!(decoded.claims, json!({"n": 1}));
    }

    #[test]
    fn other_public_key_does_not_verify() {
        let a = Es256KeyPair::generate();
        let b = Es256KeyPair::generate();
        let token = jsonwebtoken::encode(
            &Header::new(Algorithm::ES256),
            &json!({"n": 1}),
            &a.encoding_key().unwrap(),
        )
        .unwrap();
        let err = jsonwebtoken::decode::<Value>(
            &token,
            &b.public_key().decoding_key().unwrap(),
            &no_claim_checks(),
        )
        .unwrap_err();
        assert!(matches!(
            err.kind(),
            jsonwebtoken::errors::ErrorKind::InvalidSignature
        ));
    }

    #[test]
    fn secret_hex_reloads_same_key() {
        let kp = Es256KeyPair::generate();
        let hex_secret = kp.secret_hex();
        assert_eq!(hex_secret.len(), 64);
        let reloaded = Es256KeyPair::from_secret_hex(&hex_secret).unwrap();
        assert_eq!(reloaded.public_key(), kp.public_key());
    }

    #[test]
    fn zero_scalar_rejected() {
        assert!(matches!(
            Es256KeyPair::from_secret_bytes(&[0u8; 32]),
            Err(CryptoError::InvalidSigningKey(_))
        ));
        assert!(matches!(
            Es256KeyPair::from_secret_bytes(&[1u8; 31]),
            Err(CryptoError::InvalidSigningKey(_))
        ));
        assert!(matches!(
            Es256KeyPair::from_secret_hex("not hex"),
            Err(CryptoError::HexDecode(_))
        ));
    }

    #[test]
    fn coordinates_rebuild_public_key() {
        let pk = Es256KeyPair::generate().public_key();
        let (x, y) = pk.coordinates().unwrap();
        assert_eq!(Es256PublicKey::from_coordinates(&x, &y).unwrap(), pk);
        assert_eq!(pk.to_sec1_bytes().len(), 65);
    }

    #[test]
    fn off_curve_point_rejected() {
        assert!(Es256PublicKey::from_coordinates(&[1u8; 32], &[2u8; 32]).is_err());
        assert!(Es256PublicKey::from_coordinates(&[1u8; 31], &[2u8; 32]).is_err());
    }

    #[test]
    fn debug_does_not_leak_secret() {
        let kp = Es256KeyPair::generate();
        let secret = kp.secret_hex();
        let dbg = format!("{kp:?}");
        assert!(!dbg.contains(secret.as_str()));
    }
}
