//! # Canonical Serialization
//!
//! This module defines [`CanonicalBytes`], the sole construction path for the
//! bytes that receipts hash and sign.
//!
//! ## Security Invariant
//!
//! The inner buffer is private. The only way to construct `CanonicalBytes`
//! is through [`CanonicalBytes::new()`], so two payloads with the same
//! logical content always hash identically regardless of the key order or
//! whitespace they arrived with.
//!
//! ## Rules
//!
//! Output follows RFC 8785 (JSON Canonicalization Scheme) via `serde_jcs`:
//!
//! 1. Object keys sorted by UTF-16 code units, at every depth.
//! 2. Array order preserved.
//! 3. Compact separators, no whitespace.
//! 4. Numbers in their shortest ECMAScript form, so `12.50` and `12.5`
//!    share one spelling, as do `100.0` and `100`.

use serde::Serialize;
use serde_json::Value;

use crate::error::CanonicalizationError;

/// Bytes produced exclusively by canonical serialization.
///
/// The output of canonical JSON serialization is always valid UTF-8, so the
/// bytes are held as a `String` and exposed both as bytes (for hashing) and
/// as text (for the `payload` claim and the stored record).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CanonicalBytes(String);

impl CanonicalBytes {
    /// Construct canonical bytes from any serializable value.
    ///
    /// This is the ONLY way to construct `CanonicalBytes`. All digest
    /// computation in the workspace must flow through this constructor.
    pub fn new(obj: &impl Serialize) -> Result<Self, CanonicalizationError> {
        let value = serde_json::to_value(obj)?;
        Ok(Self(serde_jcs::to_string(&value)?))
    }

    /// Parse JSON text and canonicalize it.
    pub fn from_json_str(json: &str) -> Result<Self, CanonicalizationError> {
        let value: Value = serde_json::from_str(json)?;
        Self::new(&value)
    }

    /// Access the canonical bytes for digest computation.
    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }

    /// Access the canonical form as text.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consume and return the canonical text.
    pub fn into_string(self) -> String {
        self.0
    }

    /// Number of canonical bytes.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the canonical form is empty (never true for a valid value).
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl AsRef<[u8]> for CanonicalBytes {
    fn as_ref(&self) -> &[u8] {
        self.0.as_bytes()
    }
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    fn json_value() -> impl Strategy<Value = Value> {
        let leaf = prop_oneof![
            Just(Value::Null),
            any::<bool>().prop_map(Value::Bool),
            (-(1i64 << 53)..(1i64 << 53)).prop_map(|n| serde_json::json!(n)),
            (-1.0e15f64..1.0e15).prop_map(|f| serde_json::json!(f)),
            "[a-zA-Z0-9_ ]{0,50}".prop_map(Value::String),
        ];
        leaf.prop_recursive(4, 64, 8, |inner| {
            prop_oneof![
                prop::collection::vec(inner.clone(), 0..8).prop_map(Value::Array),
                prop::collection::btree_map("[a-z]{1,10}", inner, 0..8).prop_map(|m| {
                    let map: serde_json::Map<String, Value> = m.into_iter().collect();
                    Value::Object(map)
                }),
            ]
        })
    }

    proptest! {
        #[test]
        fn canonicalization_is_deterministic(value in json_value()) {
            let a = CanonicalBytes::new(&value).unwrap();
            let b = CanonicalBytes::new(&value).unwrap();
            prop_assert_eq!(a.as_bytes(), b.as_bytes());
        }

        #[test]
        fn canonicalization_is_idempotent(value in json_value()) {
            let once = CanonicalBytes::new(&value).unwrap();
            let twice = CanonicalBytes::from_json_str(once.as_str()).unwrap();
            prop_assert_eq!(once, twice);
        }

        #[test]
        fn key_insertion_order_is_irrelevant(
            entries in prop::collection::btree_map("[a-z]{1,8}", any::<i64>(), 1..8)
        ) {
            let forward: String = entries
                .iter()
                .map(|(k, v)| format!("\"{k}\":{v}"))
                .collect::<Vec<_>>()
                .join(",");
            let reverse: String = entries
                .iter()
                .rev()
                .map(|(k, v)| format!("\"{k}\":{v}"))
                .collect::<Vec<_>>()
                .join(",");
            let a = CanonicalBytes::from_json_str(&format!("{{{forward}}}")).unwrap();
            let b = CanonicalBytes::from_json_str(&format!("{{ {reverse} }}")).unwrap();
            prop_assert_eq!(a.as_bytes(), b.as_bytes());
        }

        #[test]
        fn canonical_output_is_valid_json(value in json_value()) {
            let cb = CanonicalBytes::new(&value).unwrap();
            let parsed: Result<Value, _> = serde_json::from_slice(cb.as_bytes());
            prop_assert!(parsed.is_ok(), "not valid JSON: {:?}", parsed.err());
        }

        #[test]
        fn decimal_spelling_is_irrelevant(cents in -10_000_000i64..10_000_000) {
            let plain = format!("{{\"amount\":{}.{:02}}}", cents / 100, (cents % 100).abs());
            let padded = format!("{{\"amount\":{}.{:02}0}}", cents / 100, (cents % 100).abs());
            let a = CanonicalBytes::from_json_str(&plain).unwrap();
            let b = CanonicalBytes::from_json_str(&padded).unwrap();
            prop_assert_eq!(a.as_bytes(), b.as_bytes());
        }
    }
}
