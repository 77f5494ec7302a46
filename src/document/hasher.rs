//! Fingerprint computation for documents using BLAKE3

use crate::types::{Fingerprint, Hash};
use blake3::Hasher;

/// Compute the content fingerprint of a document's source text
///
/// Fingerprint = hash("document" || source_len || source)
///
/// Only content participates: the same bytes under a different path share a
/// fingerprint.
pub fn compute_fingerprint(source: &str) -> Fingerprint {
    let bytes = source.as_bytes();
    let mut hasher = Hasher::new();

    hasher.update(b"document");
    // 8 bytes, big-endian for determinism
    hasher.update(&(bytes.len() as u64).to_be_bytes());
    hasher.update(bytes);

    Fingerprint::from_hash(*hasher.finalize().as_bytes())
}

/// Compute a generic hash of arbitrary data
pub fn compute_hash(data: &[u8]) -> Hash {
    let mut hasher = Hasher::new();
    hasher.update(data);
    *hasher.finalize().as_bytes()
}
