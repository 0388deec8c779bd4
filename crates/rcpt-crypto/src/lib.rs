#![deny(missing_docs)]

//! # rcpt-crypto: Receipt Token Cryptography
//!
//! ES256 key handling and the compact JWS format used for receipt tokens.
//!
//! - [`es256`]: P-256 key pairs, public keys and their `jsonwebtoken` keys.
//! - [`jws`]: issuing and verifying `header.claims.signature` tokens.
//! - [`key_provider`]: where the signing key comes from.
//! - [`keyset`]: the immutable active-plus-rotated key set and the
//!   [`KeyResolver`] seam verification goes through.
//! - [`jwk`]: JWK/JWKS projection and RFC 7638 thumbprints.

pub mod error;
pub mod es256;
pub mod jwk;
pub mod jws;
pub mod key_provider;
pub mod keyset;

pub use error::CryptoError;
pub use es256::{Es256KeyPair, Es256PublicKey};
pub use jwk::{thumbprint, Jwk, JwkSet};
pub use jws::{
    decode_header, es256_header, sign_compact, verify_compact, JwsError, ReceiptClaims,
    VerifiedToken, ALG_ES256,
};
pub use key_provider::{EnvKeyProvider, KeyProvider, LocalKeyProvider};
pub use keyset::{KeyResolver, KeySet};
