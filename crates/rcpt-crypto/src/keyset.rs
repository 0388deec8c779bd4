//! # Key Set
//!
//! The immutable set of keys a running service knows about: one active
//! [`KeyProvider`] that signs new receipts, plus any number of
//! verification-only public keys kept around after rotation. Built once at
//! startup and shared behind an `Arc`.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::error::CryptoError;
use crate::es256::Es256PublicKey;
use crate::jwk::{Jwk, JwkSet};
use crate::key_provider::KeyProvider;

/// Resolves a `kid` to a public key for token verification.
pub trait KeyResolver {
    /// Return the public key published under `kid`, if any.
    fn resolve(&self, kid: &str) -> Option<Es256PublicKey>;
}

/// Active signing key plus verification-only keys, indexed by `kid`.
#[derive(Clone)]
pub struct KeySet {
    active: Arc<dyn KeyProvider>,
    active_public: Option<Es256PublicKey>,
    retired: BTreeMap<String, Es256PublicKey>,
}

impl KeySet {
    /// A key set holding only the active signer.
    pub fn new(active: Arc<dyn KeyProvider>) -> Self {
        let active_public = active.public_key().ok();
        Self {
            active,
            active_public,
            retired: BTreeMap::new(),
        }
    }

    /// Add a verification-only key. A `kid` equal to the active key's is ignored.
    pub fn with_verification_key(mut self, kid: impl Into<String>, key: Es256PublicKey) -> Self {
        let kid = kid.into();
        if kid != self.active.key_id() {
            self.retired.insert(kid, key);
        }
        self
    }

    /// Add every parseable key of a JWKS document as verification-only.
    pub fn with_jwks(mut self, jwks: &JwkSet) -> Result<Self, CryptoError> {
        for jwk in &jwks.keys {
            let key = jwk.to_public_key()?;
            self = self.with_verification_key(jwk.kid.clone(), key);
        }
        Ok(self)
    }

    /// The provider that signs new receipts.
    pub fn signer(&self) -> &dyn KeyProvider {
        self.active.as_ref()
    }

    /// The active key's id.
    pub fn active_kid(&self) -> &str {
        self.active.key_id()
    }

    /// Number of keys (active plus verification-only).
    pub fn len(&self) -> usize {
        1 + self.retired.len()
    }

    /// Always false; a key set has an active key.
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Project all public keys, active first.
    pub fn jwks(&self) -> Result<JwkSet, CryptoError> {
        let mut keys = Vec::with_capacity(self.len());
        let active = match &self.active_public {
            Some(pk) => pk.clone(),
            None => self.active.public_key()?,
        };
        keys.push(Jwk::from_public_key(self.active.key_id(), &active)?);
        for (kid, key) in &self.retired {
            keys.push(Jwk::from_public_key(kid, key)?);
        }
        Ok(JwkSet { keys })
    }
}

impl std::fmt::Debug for KeySet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeySet")
            .field("active_kid", &self.active.key_id())
            .field("provider", &self.active.provider_name())
            .field("verification_kids", &self.retired.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl KeyResolver for KeySet {
    fn resolve(&self, kid: &str) -> Option<Es256PublicKey> {
        if kid == self.active.key_id() {
            return self
                .active_public
                .clone()
                .or_else(|| self.active.public_key().ok());
        }
        self.retired.get(kid).cloned()
    }
}

impl KeyResolver for JwkSet {
    fn resolve(&self, kid: &str) -> Option<Es256PublicKey> {
        self.find(kid).and_then(|jwk| jwk.to_public_key().ok())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jws::{sign_compact, verify_compact, ReceiptClaims};
    use crate::key_provider::LocalKeyProvider;
    use rcpt_core::CanonicalBytes;

    fn claims() -> ReceiptClaims {
        ReceiptClaims::new(&CanonicalBytes::new(&serde_json::json!({"n": 1})).unwrap(), 1)
    }

    #[test]
    fn resolves_active_key() {
        let provider = Arc::new(LocalKeyProvider::generate().with_key_id("active"));
        let set = KeySet::new(provider.clone());
        assert_eq!(set.active_kid(), "active");
        assert_eq!(set.resolve("active"), Some(provider.public_key().unwrap()));
        assert!(set.resolve("missing").is_none());
    }

    #[test]
    fn rotated_key_still_verifies() {
        let old = LocalKeyProvider::generate().with_key_id("2024-01");
        let token = sign_compact(&old, &claims()).unwrap();

        let set = KeySet::new(Arc::new(LocalKeyProvider::generate().with_key_id("2024-06")))
            .with_verification_key("2024-01", old.public_key().unwrap());
        assert_eq!(set.len(), 2);
        let verified = verify_compact(&token, &set).unwrap();
        assert_eq!(verified.kid(), "2024-01");
    }

    #[test]
    fn verification_key_cannot_shadow_active() {
        let provider = Arc::new(LocalKeyProvider::generate().with_key_id("k"));
        let other = LocalKeyProvider::generate().public_key().unwrap();
        let set = KeySet::new(provider.clone()).with_verification_key("k", other);
        assert_eq!(set.len(), 1);
        assert_eq!(set.resolve("k"), Some(provider.public_key().unwrap()));
    }

    #[test]
    fn jwks_lists_active_first_then_retired() {
        let retired = LocalKeyProvider::generate().public_key().unwrap();
        let set = KeySet::new(Arc::new(LocalKeyProvider::generate().with_key_id("now")))
            .with_verification_key("then", retired);
        let jwks = set.jwks().unwrap();
        let kids: Vec<&str> = jwks.keys.iter().map(|k| k.kid.as_str()).collect();
        assert_eq!(kids, vec!["now", "then"]);
    }

    #[test]
    fn jwks_document_round_trips_through_with_jwks() {
        let signer = LocalKeyProvider::generate().with_key_id("published");
        let token = sign_compact(&signer, &claims()).unwrap();
        let published = KeySet::new(Arc::new(signer)).jwks().unwrap();

        let json = serde_json::to_string(&published).unwrap();
        let parsed: JwkSet = serde_json::from_str(&json).unwrap();
        assert!(verify_compact(&token, &parsed).is_ok());

        let set = KeySet::new(Arc::new(LocalKeyProvider::generate()))
            .with_jwks(&parsed)
            .unwrap();
        assert!(verify_compact(&token, &set).is_ok());
    }

    #[test]
    fn debug_lists_kids_only() {
        let set = KeySet::new(Arc::new(LocalKeyProvider::generate().with_key_id("dbg")));
        let s = format!("{set:?}");
        assert!(s.contains("dbg"));
        assert!(s.contains("LocalKeyProvider"));
    }
}
