//! (company, title) identity and cache key derivation.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt::{self, Write};

/// Delimiter between company and title in the key material.
pub const KEY_DELIMITER: char = ':';

/// A (company, title) pair exactly as it appeared in a record.
///
/// This is what the classifier sees; resolution identity is [`PairKey`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct JobPair {
    pub company: String,
    pub title: String,
}

impl JobPair {
    pub fn new(company: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            company: company.into(),
            title: title.into(),
        }
    }

    pub fn key(&self) -> PairKey {
        PairKey::new(&self.company, &self.title)
    }
}

impl fmt::Display for JobPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} - {}", self.company, self.title)
    }
}

/// Case-insensitive (company, title) identity.
///
/// Two records with the same `PairKey` always resolve to the same seniority.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PairKey {
    company: String,
    title: String,
}

impl PairKey {
    pub fn new(company: &str, title: &str) -> Self {
        Self {
            company: company.to_lowercase(),
            title: title.to_lowercase(),
        }
    }

    pub fn company(&self) -> &str {
        &self.company
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    /// Pre-hash key material: `company:title`, lower-cased, unescaped.
    ///
    /// This is the layout existing cache entries were written under. A
    /// delimiter inside a component is not escaped, so `("a:b", "c")` and
    /// `("a", "b:c")` share one entry.
    pub fn material(&self) -> String {
        format!("{}{}{}", self.company, KEY_DELIMITER, self.title)
    }

    /// SHA-256 hex digest of [`material`](Self::material); always 64 chars.
    pub fn cache_key(&self) -> String {
        let digest = Sha256::digest(self.material().as_bytes());
        let mut hex = String::with_capacity(64);
        for byte in digest {
            // Writing to a String never fails.
            let _ = write!(hex, "{:02x}", byte);
        }
        hex
    }
}

/// Derives the cache key for a raw (company, title) pair.
pub fn cache_key(company: &str, title: &str) -> String {
    PairKey::new(company, title).cache_key()
}
