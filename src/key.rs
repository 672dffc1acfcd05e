//! Key Derivation Module
//!
//! Turns a (namespace, parameters) pair into a deterministic cache key.
//!
//! Parameters are encoded canonically before hashing: object members are
//! written in sorted key order at every depth, so two parameter objects that
//! differ only in construction order produce the same key.

use std::fmt;

use serde_json::Value;
use sha2::{Digest, Sha256};

// == Cache Key ==
/// Deterministic key for the result cache and the in-flight registry.
///
/// The namespace is kept alongside the digest so entries can be cleared per
/// namespace without relying on string prefixes.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    namespace: String,
    digest: String,
}

impl CacheKey {
    // == Derive ==
    /// Derives the key for `namespace` and `params`.
    ///
    /// Pure: equal inputs always yield equal keys.
    pub fn derive(namespace: &str, params: &Value) -> Self {
        let mut encoded = String::new();
        write_canonical(params, &mut encoded);

        let mut hasher = Sha256::new();
        hasher.update(namespace.as_bytes());
        hasher.update([0u8]);
        hasher.update(encoded.as_bytes());

        Self {
            namespace: namespace.to_string(),
            digest: format!("{:x}", hasher.finalize()),
        }
    }

    /// The namespace the key was derived under.
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Hex-encoded SHA-256 digest of namespace and canonical parameters.
    pub fn digest(&self) -> &str {
        &self.digest
    }

    /// Returns the first `len` characters of the rendered key.
    pub fn prefix(&self, len: usize) -> String {
        self.to_string().chars().take(len).collect()
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.namespace, self.digest)
    }
}

// == Canonical Encoding ==
/// Writes `value` as compact JSON with object members sorted by key.
fn write_canonical(value: &Value, out: &mut String) {
    match value {
        Value::Object(map) => {
            let mut members: Vec<(&String, &Value)> = map.iter().collect();
            members.sort_by(|a, b| a.0.cmp(b.0));

            out.push('{');
            for (i, (key, member)) in members.into_iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                // Serializing a plain string cannot fail
                out.push_str(&Value::String(key.clone()).to_string());
                out.push(':');
                write_canonical(member, out);
            }
            out.push('}');
        }
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_canonical(item, out);
            }
            out.push(']');
        }
        scalar => out.push_str(&scalar.to_string()),
    }
}
