//! Test fixtures for job postings.

use augment_core::JobPosting;
use bytes::Bytes;

/// Container holding input files in tests.
pub const INPUT_BUCKET: &str = "incoming";

/// A posting with an `id` field so outputs can be matched to inputs.
pub fn posting(id: u64, company: &str, title: &str) -> JobPosting {
    JobPosting::new(company, title)
        .with_field("id", id)
        .with_field("location", "Remote")
}

/// Postings from `(company, title)` pairs, numbered from 1.
pub fn postings(pairs: &[(&str, &str)]) -> Vec<JobPosting> {
    pairs
        .iter()
        .enumerate()
        .map(|(i, (company, title))| posting(i as u64 + 1, company, title))
        .collect()
}

/// `n` postings cycling through `unique` distinct pairs.
pub fn generated(n: usize, unique: usize) -> Vec<JobPosting> {
    (0..n)
        .map(|i| {
            let k = i % unique.max(1);
            posting(i as u64, &format!("Company {}", k), &format!("Role {}", k))
                .with_field("description", "lorem ipsum dolor sit amet ".repeat(8))
        })
        .collect()
}

/// Newline-delimited JSON of `records`.
pub fn jsonl(records: &[JobPosting]) -> Bytes {
    let lines: Vec<String> = records
        .iter()
        .map(|r| serde_json::to_string(r).unwrap())
        .collect();
    Bytes::from(lines.join("\n"))
}

/// Raw lines joined with newlines.
pub fn raw_jsonl(lines: &[&str]) -> Bytes {
    Bytes::from(lines.join("\n"))
}
