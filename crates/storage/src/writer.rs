//! Output writer for augmented batches.
//!
//! A batch is encoded as newline-delimited JSON and written under
//! `<prefix>/<uuid>.jsonl` in the output container. Payloads above the
//! multipart threshold are split into fixed-size parts; the object only
//! appears once the upload is completed, and any failure aborts it.

use augment_core::{JobPosting, Result};
use bytes::Bytes;
use std::sync::Arc;
use std::time::Instant;
use telemetry::metrics;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::config::WriterConfig;
use crate::store::{BlobStore, CompletedPart};

/// Persists augmented records to the blob store.
#[derive(Clone)]
pub struct OutputWriter {
    store: Arc<dyn BlobStore>,
    config: WriterConfig,
}

impl OutputWriter {
    pub fn new(store: Arc<dyn BlobStore>, config: WriterConfig) -> Self {
        Self { store, config }
    }

    /// Writes `records` to a fresh key under `prefix`.
    ///
    /// Returns `false` after logging if the batch was not durably written.
    pub async fn write_batch(&self, records: &[JobPosting], prefix: &str) -> bool {
        let key = batch_key(prefix);
        let payload = match encode_batch(records) {
            Ok(payload) => payload,
            Err(e) => {
                error!(key = %key, error = %e, "Failed to encode batch");
                metrics().batch_write_errors.inc();
                return false;
            }
        };

        let start = Instant::now();
        let size = payload.len();
        let result = if size > self.config.multipart_threshold {
            metrics().multipart_uploads.inc();
            self.write_multipart(&key, payload).await
        } else {
            self.store
                .put(&self.config.output_container, &key, payload)
                .await
        };
        metrics()
            .write_latency_ms
            .observe(start.elapsed().as_millis() as u64);

        match result {
            Ok(()) => {
                metrics().batches_written.inc();
                info!(
                    container = %self.config.output_container,
                    key = %key,
                    records = records.len(),
                    bytes = size,
                    "Batch written"
                );
                true
            }
            Err(e) => {
                metrics().batch_write_errors.inc();
                error!(
                    container = %self.config.output_container,
                    key = %key,
                    records = records.len(),
                    error = %e,
                    "Failed to write batch"
                );
                false
            }
        }
    }

    /// Writes one record to an explicit key.
    pub async fn write_single(&self, record: &JobPosting, key: &str) -> bool {
        let body = match record.to_json() {
            Ok(json) => Bytes::from(json),
            Err(e) => {
                error!(key = %key, error = %e, "Failed to encode record");
                return false;
            }
        };

        match self
            .store
            .put(&self.config.output_container, key, body)
            .await
        {
            Ok(()) => {
                debug!(key = %key, "Record written");
                true
            }
            Err(e) => {
                error!(key = %key, error = %e, "Failed to write record");
                false
            }
        }
    }

    async fn write_multipart(&self, key: &str, payload: Bytes) -> Result<()> {
        let container = &self.config.output_container;
        let upload_id = self.store.create_multipart(container, key).await?;

        match self.upload_parts(key, &upload_id, payload).await {
            Ok(parts) => {
                debug!(key = %key, parts = parts.len(), "Completing multipart upload");
                let completed = self
                    .store
                    .complete_multipart(container, key, &upload_id, parts)
                    .await;
                if completed.is_err() {
                    self.abort(key, &upload_id).await;
                }
                completed
            }
            Err(e) => {
                self.abort(key, &upload_id).await;
                Err(e)
            }
        }
    }

    async fn upload_parts(
        &self,
        key: &str,
        upload_id: &str,
        payload: Bytes,
    ) -> Result<Vec<CompletedPart>> {
        let part_size = self.config.part_size.max(1);
        let mut parts = Vec::with_capacity(payload.len().div_ceil(part_size));
        let mut offset = 0;

        while offset < payload.len() {
            let end = (offset + part_size).min(payload.len());
            let part_number = parts.len() as u32 + 1;
            let etag = self
                .store
                .upload_part(
                    &self.config.output_container,
                    key,
                    upload_id,
                    part_number,
                    payload.slice(offset..end),
                )
                .await?;
            parts.push(CompletedPart { part_number, etag });
            offset = end;
        }

        Ok(parts)
    }

    async fn abort(&self, key: &str, upload_id: &str) {
        if let Err(e) = self
            .store
            .abort_multipart(&self.config.output_container, key, upload_id)
            .await
        {
            warn!(key = %key, upload_id = %upload_id, error = %e, "Failed to abort multipart upload");
        }
    }
}

/// `<prefix>/<uuid>.jsonl`
pub fn batch_key(prefix: &str) -> String {
    let prefix = prefix.trim_end_matches('/');
    if prefix.is_empty() {
        format!("{}.jsonl", Uuid::new_v4())
    } else {
        format!("{}/{}.jsonl", prefix, Uuid::new_v4())
    }
}

/// One JSON object per line, no trailing newline.
pub fn encode_batch(records: &[JobPosting]) -> Result<Bytes> {
    let mut lines = Vec::with_capacity(records.len());
    for record in records {
        lines.push(record.to_json()?);
    }
    Ok(Bytes::from(lines.join("\n")))
}
