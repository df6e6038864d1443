//! ID generation for views, sections and filters.
//!
//! IDs have the form `<prefix>-<hash>` where hash is base36 lowercase
//! (0-9, a-z) derived from SHA256 over the seed text, creation time and a
//! process-wide nonce.

use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};
use std::sync::atomic::{AtomicU32, Ordering};

/// Hash length used for generated IDs.
pub const ID_HASH_LENGTH: usize = 10;

static NONCE: AtomicU32 = AtomicU32::new(0);

/// What an ID is being generated for; selects the prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdKind {
    View,
    Section,
    Filter,
}

impl IdKind {
    #[must_use]
    pub const fn prefix(&self) -> &'static str {
        match self {
            Self::View => "view",
            Self::Section => "section",
            Self::Filter => "filter",
        }
    }
}

/// Generate a fresh ID.
#[must_use]
pub fn generate_id(kind: IdKind, seed_text: &str, created_at: DateTime<Utc>) -> String {
    let nonce = NONCE.fetch_add(1, Ordering::Relaxed);
    generate_candidate(kind, seed_text, created_at, nonce)
}

/// Deterministic candidate for the given inputs.
#[must_use]
pub fn generate_candidate(
    kind: IdKind,
    seed_text: &str,
    created_at: DateTime<Utc>,
    nonce: u32,
) -> String {
    let seed = format!(
        "{}|{}|{}|{}",
        kind.prefix(),
        seed_text,
        created_at.timestamp_nanos_opt().unwrap_or(0),
        nonce
    );
    format!("{}-{}", kind.prefix(), compute_id_hash(&seed, ID_HASH_LENGTH))
}

/// Compute a base36 hash of the input string with a specific length.
///
/// Uses SHA256 to hash the input, then converts the first 8 bytes to a u64,
/// encodes as base36, and truncates to the requested length.
#[must_use]
pub fn compute_id_hash(input: &str, length: usize) -> String {
    let mut hasher = Sha256::new();
    hasher.update(input.as_bytes());
    let result = hasher.finalize();

    let mut num = 0u64;
    for &byte in result.iter().take(8) {
        num = (num << 8) | u64::from(byte);
    }

    let mut s = base36_encode(num);
    if s.len() < length {
        s = format!("{s:0>length$}");
    }

    s.chars().take(length).collect()
}

fn base36_encode(mut num: u64) -> String {
    const ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    if num == 0 {
        return "0".to_string();
    }
    let mut chars = Vec::new();
    while num > 0 {
        chars.push(ALPHABET[(num % 36) as usize] as char);
        num /= 36;
    }
    chars.into_iter().rev().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::collections::HashSet;

    #[test]
    fn candidate_is_deterministic() {
        let at = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
        let a = generate_candidate(IdKind::View, "Board", at, 0);
        let b = generate_candidate(IdKind::View, "Board", at, 0);
        let c = generate_candidate(IdKind::View, "Board", at, 1);
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert!(a.starts_with("view-"));
        assert_eq!(a.len(), "view-".len() + ID_HASH_LENGTH);
    }

    #[test]
    fn generated_ids_are_distinct_within_one_instant() {
        let at = Utc::now();
        let ids: HashSet<String> = (0..200)
            .map(|_| generate_id(IdKind::Filter, "", at))
            .collect();
        assert_eq!(ids.len(), 200);
    }

    #[test]
    fn base36_hash_is_lowercase_alphanumeric() {
        let hash = compute_id_hash("anything", 8);
        assert_eq!(hash.len(), 8);
        assert!(
            hash.chars()
                .all(|c| c.is_ascii_digit() || c.is_ascii_lowercase())
        );
    }
}
