//! Test context for the augmentation pipeline.

use api::{router, AppState};
use augment_core::JobPosting;
use axum::Router;
use blob_store::{BlobStore, OutputWriter, WriterConfig};
use inference_client::{InferenceClient, InferenceConfig};
use intake_queue::{FileRef, MemoryQueue, MessageQueue, QueueConfig, StorageNotification};
use seniority_cache::{CacheClient, MemoryCacheStore};
use std::sync::Arc;
use std::time::Duration;
use worker::{BatchProcessor, IntakeWorker, ProcessorConfig, Watcher, WatcherConfig};

use crate::fixtures::{jsonl, INPUT_BUCKET};
use crate::mocks::{FailingBlobStore, MockModel};

/// Visibility timeout of the test queues.
pub const VISIBILITY: Duration = Duration::from_secs(30);

/// Pipeline wired on in-memory backends with a mock classifier.
pub struct TestContext {
    pub store: FailingBlobStore,
    pub model: MockModel,
    pub cache: CacheClient,
    pub inference: Arc<InferenceClient>,
    pub notifications: Arc<MemoryQueue>,
    pub intake: Arc<MemoryQueue>,
    pub processor: BatchProcessor,
    pub worker: IntakeWorker,
    pub watcher: Watcher,
    pub writer_config: WriterConfig,
    pub processor_config: ProcessorConfig,
    pub router: Router,
}

impl TestContext {
    pub fn new(model: MockModel) -> Self {
        Self::with_config(model, ProcessorConfig::default(), WriterConfig::default())
    }

    pub fn with_config(
        model: MockModel,
        processor_config: ProcessorConfig,
        writer_config: WriterConfig,
    ) -> Self {
        let store = FailingBlobStore::new();
        let storage: Arc<dyn BlobStore> = Arc::new(store.clone());

        let cache = CacheClient::new(
            Arc::new(MemoryCacheStore::default()),
            Duration::from_secs(3600),
        );

        let inference_config = InferenceConfig {
            rate_limit: 1_000.0,
            burst: 100,
            ..Default::default()
        };
        let inference = Arc::new(
            InferenceClient::new(Arc::new(model.clone()), &inference_config)
                .expect("Failed to create inference client"),
        );

        let writer = OutputWriter::new(storage.clone(), writer_config.clone());
        let processor = BatchProcessor::new(
            cache.clone(),
            inference.clone(),
            storage,
            writer,
            processor_config.clone(),
        )
        .expect("Failed to create batch processor");

        let queue_config = QueueConfig {
            wait_secs: 0,
            ..Default::default()
        };
        let notifications = Arc::new(MemoryQueue::new("notifications", VISIBILITY));
        let intake = Arc::new(MemoryQueue::new("intake", VISIBILITY));

        let worker = IntakeWorker::new(intake.clone(), processor.clone(), &queue_config);
        let watcher = Watcher::new(
            notifications.clone(),
            intake.clone(),
            &WatcherConfig::default(),
            &queue_config,
        );

        let router = router(AppState::new("all"));

        Self {
            store,
            model,
            cache,
            inference,
            notifications,
            intake,
            processor,
            worker,
            watcher,
            writer_config,
            processor_config,
            router,
        }
    }

    /// Stores `records` as an input file and returns its reference.
    pub async fn upload(&self, key: &str, records: &[JobPosting]) -> FileRef {
        self.upload_raw(key, jsonl(records)).await
    }

    pub async fn upload_raw(&self, key: &str, body: bytes::Bytes) -> FileRef {
        self.store
            .put(INPUT_BUCKET, key, body)
            .await
            .expect("Failed to upload input");
        FileRef::new(INPUT_BUCKET, key)
    }

    /// Puts a file reference on the intake queue. Returns the message id.
    pub async fn enqueue(&self, file: &FileRef) -> String {
        self.intake
            .send(&file.to_body().unwrap())
            .await
            .expect("Failed to enqueue")
    }

    /// Publishes a storage notification for `files`.
    pub async fn notify(&self, files: &[FileRef]) -> String {
        self.notifications
            .send(&StorageNotification::for_files(files).to_body().unwrap())
            .await
            .expect("Failed to publish notification")
    }

    /// Keys of every output object, sorted.
    pub fn output_keys(&self) -> Vec<String> {
        self.store.inner().keys(
            &self.writer_config.output_container,
            &self.processor_config.output_prefix,
        )
    }

    /// Every output record, grouped by object.
    pub fn output_batches(&self) -> Vec<Vec<JobPosting>> {
        self.output_keys()
            .iter()
            .map(|key| {
                let body = self
                    .store
                    .inner()
                    .object(&self.writer_config.output_container, key)
                    .expect("Listed object missing");
                let (records, malformed) = worker::decode_records(&body);
                assert_eq!(malformed, 0, "output object {} is not valid JSONL", key);
                records
            })
            .collect()
    }

    /// Every output record, sorted by `id`.
    pub fn output_records(&self) -> Vec<JobPosting> {
        let mut records: Vec<JobPosting> = self.output_batches().into_iter().flatten().collect();
        records.sort_by_key(|r| r.field("id").and_then(|v| v.as_u64()));
        records
    }
}
