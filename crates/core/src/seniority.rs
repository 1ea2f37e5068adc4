//! Seniority classification.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Label for levels outside the table.
pub const UNKNOWN_LABEL: &str = "Unknown";

/// Lowest recognized level.
pub const MIN_LEVEL: i32 = 1;

/// Highest recognized level.
pub const MAX_LEVEL: i32 = 7;

const LABELS: [&str; 7] = [
    "Entry Level",
    "Junior Level",
    "Associate Level",
    "Manager Level",
    "Director Level",
    "Executive Level",
    "Senior Executive Level",
];

/// Inferred seniority level.
///
/// The classifier is expected to return 1-7, but any integer is carried
/// as-is; levels outside the table read back as [`UNKNOWN_LABEL`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Seniority(i32);

impl Seniority {
    pub const fn new(level: i32) -> Self {
        Self(level)
    }

    pub fn level(&self) -> i32 {
        self.0
    }

    pub fn is_known(&self) -> bool {
        (MIN_LEVEL..=MAX_LEVEL).contains(&self.0)
    }

    /// Human-readable label for the level.
    pub fn label(&self) -> &'static str {
        if self.is_known() {
            LABELS[(self.0 - MIN_LEVEL) as usize]
        } else {
            UNKNOWN_LABEL
        }
    }
}

impl From<i32> for Seniority {
    fn from(level: i32) -> Self {
        Self(level)
    }
}

impl fmt::Display for Seniority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.0, self.label())
    }
}
