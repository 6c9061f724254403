//! Content Hasher.
//!
//! `hash(value) = SHA-256-hex(canonical_encode(value))`. Never panics;
//! encoder diagnostics propagate unchanged. Domain-separated variants let
//! callers hash a value under a named namespace so two otherwise-identical
//! byte strings drawn from unrelated value families never collide.

use sha2::{Digest, Sha256};

use crate::canonical::{self, CanonicalInput};
use crate::config::NormalizationConfig;
use crate::errors::CoreResult;

/// Hash a canonical input under the default (un-namespaced) domain.
pub fn hash(input: &CanonicalInput, cfg: &NormalizationConfig) -> CoreResult<String> {
    let bytes = canonical::encode(input, cfg)?;
    Ok(hash_bytes_hex(&bytes))
}

/// Hash a plain JSON value under the default domain.
pub fn hash_value(value: &serde_json::Value, cfg: &NormalizationConfig) -> CoreResult<String> {
    hash(&CanonicalInput::Json(value.clone()), cfg)
}

/// Hash a canonical input under an explicit namespace label, so that two
/// value families which happen to canonicalize to the same bytes never
/// produce colliding digests.
pub fn hash_with_domain(
    input: &CanonicalInput,
    domain: &str,
    cfg: &NormalizationConfig,
) -> CoreResult<String> {
    let mut bytes = canonical::encode(input, cfg)?;
    let mut buf = Vec::with_capacity(domain.len() + 1 + bytes.len());
    buf.extend_from_slice(domain.as_bytes());
    buf.push(0);
    buf.append(&mut bytes);
    Ok(hash_bytes_hex(&buf))
}

/// Hash raw bytes and return their lowercase hex digest.
pub fn hash_bytes_hex(bytes: &[u8]) -> String {
    let mut h = Sha256::new();
    h.update(bytes);
    hex::encode(h.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn cfg() -> NormalizationConfig {
        NormalizationConfig::default()
    }

    #[test]
    fn golden_empty_object() {
        assert_eq!(
            hash_value(&json!({}), &cfg()).unwrap(),
            "44136fa355b3678a1146ad16f7e8649e94fb4fc21fe77e8310c060f61caaff8a"
        );
    }

    #[test]
    fn golden_empty_array() {
        assert_eq!(
            hash_value(&json!([]), &cfg()).unwrap(),
            "4f53cda18c2baa0c0354bb5f9a3ecbe5ed12ab4d8e11ba873c2f11161202b945"
        );
    }

    #[test]
    fn golden_single_field_object() {
        assert_eq!(
            hash_value(&json!({"a": 1}), &cfg()).unwrap(),
            "015abd7f5cc57a2dd94b7590f04ad8084273905ee33ec5cebeae62276a97f862"
        );
    }

    #[test]
    fn domain_separation_changes_digest() {
        let input = CanonicalInput::Json(json!({"a": 1}));
        let a = hash_with_domain(&input, "content", &cfg()).unwrap();
        let b = hash_with_domain(&input, "tsconfig", &cfg()).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn deterministic_across_calls() {
        let input = CanonicalInput::Json(json!({"z": 1, "a": [1, 2, 3]}));
        let h1 = hash(&input, &cfg()).unwrap();
        let h2 = hash(&input, &cfg()).unwrap();
        assert_eq!(h1, h2);
    }
}
