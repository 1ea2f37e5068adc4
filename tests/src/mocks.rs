//! Mock implementations for testing.

use async_trait::async_trait;
use augment_core::{Error, JobPair, PairKey, Result};
use blob_store::{BlobStore, CompletedPart, MemoryBlobStore};
use bytes::Bytes;
use inference_client::{
    SeniorityModel, SeniorityRequestBatch, SeniorityResponse, SeniorityResponseBatch,
};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Mock classifier answering from a fixed table.
///
/// Pairs missing from the table are left out of the response. Responses
/// come back in reverse order so callers have to match by id.
#[derive(Clone, Default)]
pub struct MockModel {
    table: Arc<Mutex<HashMap<PairKey, i32>>>,
    calls: Arc<Mutex<Vec<Vec<JobPair>>>>,
    should_fail: Arc<AtomicBool>,
}

impl MockModel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an answer for `(company, title)`.
    pub fn with(self, company: &str, title: &str, seniority: i32) -> Self {
        self.table
            .lock()
            .insert(PairKey::new(company, title), seniority);
        self
    }

    /// Makes every subsequent call fail with a transport error.
    pub fn set_should_fail(&self, fail: bool) {
        self.should_fail.store(fail, Ordering::SeqCst);
    }

    /// Pairs sent in each call, in call order.
    pub fn calls(&self) -> Vec<Vec<JobPair>> {
        self.calls.lock().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }
}

#[async_trait]
impl SeniorityModel for MockModel {
    async fn infer(&self, request: SeniorityRequestBatch) -> Result<SeniorityResponseBatch> {
        let pairs: Vec<JobPair> = request
            .batch
            .iter()
            .map(|item| JobPair::new(&item.company, &item.title))
            .collect();
        self.calls.lock().push(pairs);

        if self.should_fail.load(Ordering::SeqCst) {
            return Err(Error::inference("mock classifier unavailable"));
        }

        let table = self.table.lock();
        let batch = request
            .batch
            .iter()
            .rev()
            .filter_map(|item| {
                table
                    .get(&PairKey::new(&item.company, &item.title))
                    .map(|seniority| SeniorityResponse {
                        uuid: item.uuid,
                        seniority: *seniority,
                    })
            })
            .collect();
        Ok(SeniorityResponseBatch { batch })
    }

    async fn ping(&self) -> Result<()> {
        if self.should_fail.load(Ordering::SeqCst) {
            return Err(Error::inference("mock classifier unavailable"));
        }
        Ok(())
    }

    async fn close(&self) {}
}

/// In-memory blob store whose writes can be switched off.
#[derive(Clone, Default)]
pub struct FailingBlobStore {
    inner: Arc<MemoryBlobStore>,
    fail_writes: Arc<AtomicBool>,
}

impl FailingBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes puts and part uploads fail while set.
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// The backing store, for inspecting written objects.
    pub fn inner(&self) -> &MemoryBlobStore {
        &self.inner
    }

    fn check_writable(&self) -> Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(Error::storage("mock storage rejected write"));
        }
        Ok(())
    }
}

#[async_trait]
impl BlobStore for FailingBlobStore {
    fn name(&self) -> &'static str {
        "failing-memory"
    }

    async fn get(&self, container: &str, key: &str) -> Result<Bytes> {
        self.inner.get(container, key).await
    }

    async fn put(&self, container: &str, key: &str, body: Bytes) -> Result<()> {
        self.check_writable()?;
        self.inner.put(container, key, body).await
    }

    async fn create_multipart(&self, container: &str, key: &str) -> Result<String> {
        self.inner.create_multipart(container, key).await
    }

    async fn upload_part(
        &self,
        container: &str,
        key: &str,
        upload_id: &str,
        part_number: u32,
        body: Bytes,
    ) -> Result<String> {
        self.check_writable()?;
        self.inner
            .upload_part(container, key, upload_id, part_number, body)
            .await
    }

    async fn complete_multipart(
        &self,
        container: &str,
        key: &str,
        upload_id: &str,
        parts: Vec<CompletedPart>,
    ) -> Result<()> {
        self.inner
            .complete_multipart(container, key, upload_id, parts)
            .await
    }

    async fn abort_multipart(&self, container: &str, key: &str, upload_id: &str) -> Result<()> {
        self.inner.abort_multipart(container, key, upload_id).await
    }

    async fn ping(&self) -> Result<()> {
        self.inner.ping().await
    }
}
