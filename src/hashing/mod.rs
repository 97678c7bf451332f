//! Query normalization and digests used as cache keys and point ids.

use blake3::Hasher;

/// Case-folds and trims a query so equivalent spellings share one cache row.
#[inline]
pub fn normalize_query(query: &str) -> String {
    query.trim().to_lowercase()
}

/// Hex BLAKE3 digest of the normalized query.
#[inline]
pub fn hash_query(query: &str) -> String {
    blake3::hash(normalize_query(query).as_bytes())
        .to_hex()
        .to_string()
}

/// Hex BLAKE3 digest of an artifact's exact text. Identifies the artifact across
/// evaluation versions.
#[inline]
pub fn artifact_digest(text: &str) -> String {
    blake3::hash(text.as_bytes()).to_hex().to_string()
}

/// Stable point id for a passage, derived from its source id.
#[inline]
pub fn passage_point_id(passage_id: &str) -> u64 {
    let mut hasher = Hasher::new();
    hasher.update(b"passage|");
    hasher.update(passage_id.as_bytes());
    let hash = hasher.finalize();
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&hash.as_bytes()[0..8]);
    u64::from_le_bytes(bytes)
}
