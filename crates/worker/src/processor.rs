//! Batch processor: the per-unit pipeline.
//!
//! For one input file: fetch, decode, carve into batches, then per batch
//! dedup pairs, look them up in the cache, infer the misses, store the new
//! results, augment and write. Per-record and per-key problems degrade the
//! output; only a failed write (or an unresolved key under
//! [`UnresolvedPolicy::FailUnit`]) fails the unit.

use augment_core::{augment, Augmentation, Error, JobPair, JobPosting, PairKey, Result, Seniority};
use blob_store::{BlobStore, OutputWriter};
use inference_client::InferenceClient;
use intake_queue::FileRef;
use seniority_cache::CacheClient;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Instant;
use telemetry::metrics;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use crate::config::{ProcessorConfig, UnresolvedPolicy};

/// Per-batch counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchOutcome {
    pub records: usize,
    pub unique_pairs: usize,
    pub cache_hits: usize,
    pub inferred: usize,
    pub augmented: usize,
    pub unresolved: usize,
    pub unchanged: usize,
    pub written: bool,
}

/// Per-unit counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UnitOutcome {
    pub records_read: usize,
    pub malformed: usize,
    pub batches: usize,
    pub batches_written: usize,
    pub augmented: usize,
    pub unresolved: usize,
    pub unchanged: usize,
}

impl UnitOutcome {
    fn add(&mut self, batch: &BatchOutcome) {
        self.batches += 1;
        self.batches_written += usize::from(batch.written);
        self.augmented += batch.augmented;
        self.unresolved += batch.unresolved;
        self.unchanged += batch.unchanged;
    }
}

/// Resolves and writes seniority for input units.
#[derive(Clone)]
pub struct BatchProcessor {
    cache: CacheClient,
    inference: Arc<InferenceClient>,
    source: Arc<dyn BlobStore>,
    writer: OutputWriter,
    config: Arc<ProcessorConfig>,
}

impl BatchProcessor {
    pub fn new(
        cache: CacheClient,
        inference: Arc<InferenceClient>,
        source: Arc<dyn BlobStore>,
        writer: OutputWriter,
        config: ProcessorConfig,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            cache,
            inference,
            source,
            writer,
            config: Arc::new(config),
        })
    }

    pub fn config(&self) -> &ProcessorConfig {
        &self.config
    }

    /// Runs the full pipeline for one file.
    ///
    /// `Ok` means the unit may be acknowledged.
    pub async fn process_unit(&self, file: &FileRef) -> Result<UnitOutcome> {
        let start = Instant::now();
        let body = self.source.get(&file.bucket, &file.key).await?;
        let (records, malformed) = decode_records(&body);

        metrics().records_read.inc_by(records.len() as u64);
        metrics().records_malformed.inc_by(malformed as u64);

        let mut outcome = UnitOutcome {
            records_read: records.len(),
            malformed,
            ..Default::default()
        };

        if records.is_empty() {
            info!(file = %file, malformed = malformed, "Unit has no records");
            return Ok(outcome);
        }

        let batches: Vec<Vec<JobPosting>> = records
            .chunks(self.config.batch_size)
            .map(<[JobPosting]>::to_vec)
            .collect();

        if self.config.batch_concurrency <= 1 || batches.len() == 1 {
            for batch in &batches {
                let result = self.process_batch(batch).await?;
                outcome.add(&result);
            }
        } else {
            for result in self.process_concurrently(batches).await? {
                outcome.add(&result);
            }
        }

        metrics()
            .unit_latency_ms
            .observe(start.elapsed().as_millis() as u64);
        info!(
            file = %file,
            records = outcome.records_read,
            batches = outcome.batches,
            augmented = outcome.augmented,
            unresolved = outcome.unresolved,
            latency_ms = %start.elapsed().as_millis(),
            "Unit processed"
        );
        Ok(outcome)
    }

    async fn process_concurrently(&self, batches: Vec<Vec<JobPosting>>) -> Result<Vec<BatchOutcome>> {
        let permits = Arc::new(Semaphore::new(self.config.batch_concurrency));
        let mut tasks = JoinSet::new();

        for batch in batches {
            let processor = self.clone();
            let permits = permits.clone();
            tasks.spawn(async move {
                let _permit = permits
                    .acquire_owned()
                    .await
                    .map_err(|_| Error::Closed("batch pool"))?;
                processor.process_batch(&batch).await
            });
        }

        let mut outcomes = Vec::new();
        let mut first_error = None;
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(Ok(outcome)) => outcomes.push(outcome),
                Ok(Err(e)) => {
                    first_error.get_or_insert(e);
                }
                Err(e) => {
                    first_error.get_or_insert(Error::internal(format!("batch task failed: {}", e)));
                }
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(outcomes),
        }
    }

    /// Resolves, augments and writes one batch.
    pub async fn process_batch(&self, batch: &[JobPosting]) -> Result<BatchOutcome> {
        let mut outcome = BatchOutcome {
            records: batch.len(),
            ..Default::default()
        };

        let pairs = unique_pairs(batch);
        outcome.unique_pairs = pairs.len();
        let keys: Vec<PairKey> = pairs.iter().map(JobPair::key).collect();

        let mut resolved = self.cache.bulk_get(&keys).await;
        outcome.cache_hits = resolved.len();

        let misses: Vec<JobPair> = pairs
            .into_iter()
            .filter(|pair| !resolved.contains_key(&pair.key()))
            .collect();

        if !misses.is_empty() {
            let inferred = self.inference.infer_batch(&misses).await;
            outcome.inferred = inferred.len();
            if !inferred.is_empty() {
                self.cache.bulk_set(&inferred).await;
                resolved.extend(inferred);
            }
        }

        let kept = self.augment_batch(batch, &resolved, &mut outcome);
        metrics().batches_processed.inc();

        debug!(
            records = outcome.records,
            unique = outcome.unique_pairs,
            cache_hits = outcome.cache_hits,
            inferred = outcome.inferred,
            unresolved = outcome.unresolved,
            "Batch resolved"
        );

        if outcome.unresolved > 0 && self.config.unresolved_policy == UnresolvedPolicy::FailUnit {
            return Err(Error::inference(format!(
                "{} records without seniority",
                outcome.unresolved
            )));
        }

        if !kept.is_empty() {
            if !self.writer.write_batch(&kept, &self.config.output_prefix).await {
                error!(records = kept.len(), "Batch was not written");
                return Err(Error::storage("augmented batch was not written"));
            }
            outcome.written = true;
        }

        Ok(outcome)
    }

    fn augment_batch(
        &self,
        batch: &[JobPosting],
        resolved: &HashMap<PairKey, Seniority>,
        outcome: &mut BatchOutcome,
    ) -> Vec<JobPosting> {
        let mut kept = Vec::with_capacity(batch.len());

        for record in batch {
            match resolved.get(&record.key()) {
                Some(seniority) => match augment(record, *seniority) {
                    Augmentation::Augmented(posting) => {
                        outcome.augmented += 1;
                        kept.push(posting);
                    }
                    Augmentation::Unchanged { reason, .. } => {
                        warn!(company = %record.company(), title = %record.title(), reason = %reason, "Record left unchanged");
                        outcome.unchanged += 1;
                    }
                },
                None => {
                    warn!(company = %record.company(), title = %record.title(), "No seniority data");
                    outcome.unresolved += 1;
                }
            }
        }

        metrics().records_augmented.inc_by(outcome.augmented as u64);
        metrics().records_unresolved.inc_by(outcome.unresolved as u64);
        metrics().records_unchanged.inc_by(outcome.unchanged as u64);
        kept
    }
}

/// Unique pairs of `batch` in first-seen order; the first spelling wins.
pub fn unique_pairs(batch: &[JobPosting]) -> Vec<JobPair> {
    let mut seen = HashSet::with_capacity(batch.len());
    batch
        .iter()
        .filter(|record| seen.insert(record.key()))
        .map(JobPosting::pair)
        .collect()
}

/// Decodes newline-delimited records, skipping blank lines.
///
/// Lines that fail to decode are logged and counted, not fatal.
pub fn decode_records(body: &[u8]) -> (Vec<JobPosting>, usize) {
    let mut records = Vec::new();
    let mut malformed = 0;

    for (idx, line) in body.split(|b| *b == b'\n').enumerate() {
        let line = line.strip_suffix(b"\r").unwrap_or(line);
        if line.iter().all(u8::is_ascii_whitespace) {
            continue;
        }
        match JobPosting::from_json_line(line) {
            Ok(record) => records.push(record),
            Err(e) => {
                warn!(line = idx + 1, error = %e, "Skipping malformed record");
                malformed += 1;
            }
        }
    }

    (records, malformed)
}
