//! Merging a seniority result into a posting.
//!
//! Augmentation is best-effort: when the posting cannot take the two output
//! fields, the original is handed back as [`Augmentation::Unchanged`] instead
//! of failing the batch.

use serde_json::Value;
use tracing::error;

use crate::record::{JobPosting, SENIORITY_FIELD, SENIORITY_LEVEL_FIELD};
use crate::seniority::Seniority;

/// Outcome of [`augment`].
#[derive(Debug, Clone, PartialEq)]
pub enum Augmentation {
    /// A new posting carrying `seniority` and `seniority_level`.
    Augmented(JobPosting),
    /// The input posting, returned as-is.
    Unchanged { posting: JobPosting, reason: String },
}

impl Augmentation {
    pub fn is_augmented(&self) -> bool {
        matches!(self, Self::Augmented(_))
    }

    /// The posting, augmented or not.
    pub fn into_posting(self) -> JobPosting {
        match self {
            Self::Augmented(posting) => posting,
            Self::Unchanged { posting, .. } => posting,
        }
    }
}

/// Returns a copy of `posting` with the seniority fields set.
///
/// Existing seniority fields of the expected types are overwritten, so
/// augmenting twice with the same value is a no-op. A field of another type
/// under either name belongs to some upstream schema; it is left alone and
/// the posting comes back unchanged.
pub fn augment(posting: &JobPosting, seniority: Seniority) -> Augmentation {
    if let Some(reason) = conflicting_field(posting) {
        error!(
            company = %posting.company(),
            title = %posting.title(),
            seniority = seniority.level(),
            reason = %reason,
            "Error augmenting job posting"
        );
        return Augmentation::Unchanged {
            posting: posting.clone(),
            reason,
        };
    }

    let mut augmented = posting.clone();
    augmented.set_field(SENIORITY_FIELD, seniority.level());
    augmented.set_field(SENIORITY_LEVEL_FIELD, seniority.label());
    Augmentation::Augmented(augmented)
}

fn conflicting_field(posting: &JobPosting) -> Option<String> {
    match posting.field(SENIORITY_FIELD) {
        Some(Value::Number(n)) if n.is_i64() => {}
        Some(other) => {
            return Some(format!("existing '{}' is not an integer: {}", SENIORITY_FIELD, other))
        }
        None => {}
    }
    match posting.field(SENIORITY_LEVEL_FIELD) {
        Some(Value::String(_)) | None => None,
        Some(other) => Some(format!(
            "existing '{}' is not a string: {}",
            SENIORITY_LEVEL_FIELD, other
        )),
    }
}
