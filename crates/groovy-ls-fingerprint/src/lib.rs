//! Stable content fingerprinting (`SPEC_FULL.md` §3, `ContentFingerprint`).
//!
//! A [`Fingerprint`] is the second half of every compilation cache key: `(URI,
//! fingerprint(text))`. It must be deterministic, collision-resistant to cryptographic
//! standards, and independent of anything but the bytes handed to it — callers are
//! responsible for line-ending normalisation upstream, if any.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A 128-bit stable digest of document text, used as a cache key.
///
/// Derived from the first 128 bits of a BLAKE3 hash. BLAKE3 is a non-cryptographic
/// bottleneck-free choice the rest of this workspace's dependency family already pulls
/// in for content hashing; truncating to 128 bits keeps collision probability
/// negligible for cache-key purposes while halving storage versus the full 256-bit
/// output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Fingerprint(u128);

impl Fingerprint {
    /// Computes the fingerprint of `text`.
    pub fn of(text: &str) -> Self {
        let digest = blake3::hash(text.as_bytes());
        let mut bytes = [0u8; 16];
        bytes.copy_from_slice(&digest.as_bytes()[..16]);
        Self(u128::from_le_bytes(bytes))
    }

    /// The raw 128-bit value, for storage or comparison outside this crate.
    pub const fn as_u128(self) -> u128 {
        self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:032x}", self.0)
    }
}
