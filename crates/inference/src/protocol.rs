//! Classifier wire format.
//!
//! Each request item carries a positional `uuid`; the classifier may answer
//! in any order and responses are matched back by that id.

use augment_core::JobPair;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeniorityRequest {
    pub uuid: u32,
    pub company: String,
    pub title: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeniorityRequestBatch {
    pub batch: Vec<SeniorityRequest>,
}

impl SeniorityRequestBatch {
    /// Numbers the pairs by position. Callers chunk to at most
    /// `u32::MAX` pairs, which `InferenceConfig::validate` enforces.
    pub fn from_pairs(pairs: &[JobPair]) -> Self {
        Self {
            batch: pairs
                .iter()
                .enumerate()
                .map(|(idx, pair)| SeniorityRequest {
                    uuid: idx as u32,
                    company: pair.company.clone(),
                    title: pair.title.clone(),
                })
                .collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.batch.len()
    }

    pub fn is_empty(&self) -> bool {
        self.batch.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeniorityResponse {
    pub uuid: u32,
    pub seniority: i32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeniorityResponseBatch {
    pub batch: Vec<SeniorityResponse>,
}
