//! Hashing primitives: record content hashes and stable node ids

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::borrow::Borrow;
use std::fmt;

/// Modulus applied to the rolling content hash
const CONTENT_HASH_MODULUS: u32 = 1_000_000;

/// Cheap deterministic hash of a record's full content
///
/// Not cryptographic. Only used to tell whether an entity changed between
/// two refresh cycles.
#[derive(Copy, Clone, Debug, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
pub struct ContentHash(u32);

impl ContentHash {
    pub const fn as_u32(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:06}", self.0)
    }
}

/// Hash a record's canonical JSON serialization
///
/// `serde_json` keeps object keys sorted, so two records with the same
/// content always serialize to the same text regardless of source key order.
pub fn content_hash(record: &Value) -> ContentHash {
    hash_text(&record.to_string())
}

/// 32-bit signed rolling hash (`h = h * 31 + c`) reduced modulo 1,000,000
pub fn hash_text(text: &str) -> ContentHash {
    let mut acc: i32 = 0;
    for ch in text.chars() {
        acc = acc.wrapping_shl(5).wrapping_sub(acc).wrapping_add(ch as i32);
    }
    ContentHash(acc.unsigned_abs() % CONTENT_HASH_MODULUS)
}

/// Stable node identifier
///
/// Derived from the parent's id and the node's `(type, value)` pair, so the
/// same ancestor chain always yields the same id across refreshes and
/// process restarts.
#[derive(Clone, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(String);

impl NodeId {
    /// Number of digest bytes kept in the id
    const LEN: usize = 12;

    /// Derive the id for a node under `parent`
    pub fn derive(parent: Option<&NodeId>, kind: &str, value_key: &str) -> Self {
        let mut hasher = blake3::Hasher::new();
        if let Some(parent) = parent {
            hasher.update(parent.0.as_bytes());
        }
        hasher.update(&[0]);
        hasher.update(kind.as_bytes());
        hasher.update(&[0]);
        hasher.update(value_key.as_bytes());
        let digest = hasher.finalize();
        Self(to_hex(&digest.as_bytes()[..Self::LEN]))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NodeId({})", self.0)
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for NodeId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

fn to_hex(bytes: &[u8]) -> String {
    const HEX_CHARS: &[u8] = b"0123456789abcdef";
    let mut hex = String::with_capacity(bytes.len() * 2);
    for &byte in bytes {
        hex.push(HEX_CHARS[(byte >> 4) as usize] as char);
        hex.push(HEX_CHARS[(byte & 0xf) as usize] as char);
    }
    hex
}
