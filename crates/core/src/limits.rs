//! Default sizes and limits shared across crates.
//!
//! Config structs use these as their serde defaults so the numbers live in
//! one place.

// === Pipeline ===

/// Records per batch carved from one input unit.
pub const DEFAULT_BATCH_SIZE: usize = 1000;

/// Logical prefix under which augmented batches are written.
pub const DEFAULT_OUTPUT_PREFIX: &str = "job-postings-mod";

// === Inference ===

/// Maximum (company, title) pairs in one inference request.
pub const DEFAULT_INFERENCE_BATCH_SIZE: usize = 1000;

/// Inference requests per second.
pub const DEFAULT_RATE_LIMIT: f64 = 1000.0;

/// Per-request inference timeout in milliseconds.
pub const DEFAULT_INFERENCE_TIMEOUT_MS: u64 = 10_000;

// === Cache ===

/// Cache entry time-to-live (30 days).
pub const DEFAULT_CACHE_TTL_SECS: u64 = 30 * 24 * 60 * 60;

// === Output ===

/// Payloads larger than this go through a multipart upload (8 MiB).
pub const DEFAULT_MULTIPART_THRESHOLD: usize = 8 * 1024 * 1024;

/// Multipart part size (8 MiB).
pub const DEFAULT_PART_SIZE: usize = 8 * 1024 * 1024;

// === Intake ===

/// Extension of input files the watcher accepts.
pub const INPUT_EXTENSION: &str = ".jsonl";

/// Maximum deliveries pulled per poll.
pub const DEFAULT_MAX_MESSAGES: usize = 10;

/// Long-poll wait in seconds.
pub const DEFAULT_WAIT_SECS: u64 = 20;

/// Seconds before an unacknowledged delivery becomes visible again.
pub const DEFAULT_VISIBILITY_TIMEOUT_SECS: u64 = 300;
