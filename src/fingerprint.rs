//! Fingerprint hasher: a pure function from (content, parent fingerprints)
//! to a fingerprint string.
//!
//! Grounded in the teacher's canonicalize-then-hash pattern
//! (`core/workunit.rs::canonical_hash_hex`, `core/state_commit.rs`'s
//! scope-record encoding): fold the inputs into one canonical structure and
//! SHA-256 its serialized bytes. Using a `BTreeMap` for parents gets
//! commutativity under id-sorting for free from `serde_json`'s map
//! serialization, rather than hand-rolling a sort step.

use serde::Serialize;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;

pub trait Hasher: Send + Sync {
    fn fingerprint(&self, content: &[u8], parents: &BTreeMap<String, String>) -> String;
}

#[derive(Serialize)]
struct CanonicalInput<'a> {
    content_sha256: String,
    parents: &'a BTreeMap<String, String>,
}

pub fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Sha256Hasher;

impl Hasher for Sha256Hasher {
    fn fingerprint(&self, content: &[u8], parents: &BTreeMap<String, String>) -> String {
        let canon = CanonicalInput {
            content_sha256: sha256_hex(content),
            parents,
        };
        // BTreeMap serializes keys in sorted order, so this is automatically
        // stable under permutation of insertion order.
        let bytes = serde_json::to_vec(&canon).expect("canonical input is always serializable");
        sha256_hex(&bytes)
    }
}
