//! Payload digest using Blake3.

use sbor::prelude::*;
use std::fmt;

/// A 32-byte Blake3 digest of a template payload.
///
/// Carried alongside pushed fragments so the receiver can verify a
/// reassembled payload before handing it to the cache.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, BasicSbor)]
#[sbor(transparent)]
pub struct PayloadHash([u8; 32]);

impl PayloadHash {
    /// Size of the digest in bytes.
    pub const BYTES: usize = 32;

    /// Digest of the empty payload.
    pub fn empty() -> Self {
        Self::of(&[])
    }

    /// Hash a payload.
    pub fn of(payload: &[u8]) -> Self {
        Self(*blake3::hash(payload).as_bytes())
    }

    /// Hash a payload delivered as ordered slices, without concatenating.
    pub fn of_parts<'a>(parts: impl IntoIterator<Item = &'a [u8]>) -> Self {
        let mut hasher = blake3::Hasher::new();
        for part in parts {
            hasher.update(part);
        }
        Self(*hasher.finalize().as_bytes())
    }

    /// Convert to hex string.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Get bytes as slice reference.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl fmt::Debug for PayloadHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let hex = self.to_hex();
        write!(f, "PayloadHash({}..{})", &hex[..8], &hex[56..])
    }
}

impl fmt::Display for PayloadHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}
