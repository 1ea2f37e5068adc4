//! Inference client: chunking, pacing, and id matching.
//!
//! A failed or timed-out chunk is logged and its pairs are left out of the
//! result; there is no retry inside a call.

use augment_core::{Error, JobPair, PairKey, Result, Seniority};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use telemetry::metrics;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use crate::config::InferenceConfig;
use crate::model::{HttpSeniorityModel, SeniorityModel};
use crate::protocol::SeniorityRequestBatch;
use crate::rate_limit::RateLimiter;

/// Resolves seniority for pairs the cache could not answer.
pub struct InferenceClient {
    model: Arc<dyn SeniorityModel>,
    limiter: RateLimiter,
    max_batch_size: usize,
    timeout: Duration,
    closed: AtomicBool,
}

impl InferenceClient {
    pub fn new(model: Arc<dyn SeniorityModel>, config: &InferenceConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            model,
            limiter: RateLimiter::new(config.rate_limit, config.burst),
            max_batch_size: config.max_batch_size,
            timeout: config.timeout(),
            closed: AtomicBool::new(false),
        })
    }

    /// Connects to the HTTP classifier at `config.url`.
    pub fn from_config(config: &InferenceConfig) -> Result<Self> {
        let model = HttpSeniorityModel::new(&config.url, config.timeout())?;
        Self::new(Arc::new(model), config)
    }

    /// Infers seniority for `pairs`, one paced request per chunk of at most
    /// `max_batch_size` pairs.
    ///
    /// Results are keyed by normalized pair. Pairs from failed chunks are
    /// absent.
    pub async fn infer_batch(&self, pairs: &[JobPair]) -> HashMap<PairKey, Seniority> {
        let mut results = HashMap::with_capacity(pairs.len());

        for chunk in pairs.chunks(self.max_batch_size) {
            if self.is_closed() {
                warn!(pairs = chunk.len(), "Inference client closed, skipping chunk");
                metrics().inference_errors.inc();
                continue;
            }

            let waited = self.limiter.acquire().await;

            match self.call_chunk(chunk).await {
                Ok(resolved) => {
                    debug!(
                        pairs = chunk.len(),
                        resolved = resolved.len(),
                        waited_ms = %waited.as_millis(),
                        "Inference chunk complete"
                    );
                    for (pair, seniority) in resolved {
                        results.insert(pair.key(), seniority);
                    }
                }
                Err(e) => {
                    error!(pairs = chunk.len(), error = %e, "RPC failed");
                    metrics().inference_errors.inc();
                }
            }
        }

        results
    }

    async fn call_chunk<'a>(&self, chunk: &'a [JobPair]) -> Result<Vec<(&'a JobPair, Seniority)>> {
        let request = SeniorityRequestBatch::from_pairs(chunk);
        metrics().inference_requests.inc();
        metrics().inference_pairs.inc_by(chunk.len() as u64);

        let start = Instant::now();
        let response = tokio::time::timeout(self.timeout, self.model.infer(request))
            .await
            .map_err(|_| Error::timeout(format!("inference chunk after {:?}", self.timeout)))??;
        metrics()
            .inference_latency_ms
            .observe(start.elapsed().as_millis() as u64);

        let mut resolved = Vec::with_capacity(response.batch.len());
        for item in response.batch {
            match chunk.get(item.uuid as usize) {
                Some(pair) => resolved.push((pair, Seniority::new(item.seniority))),
                None => warn!(uuid = item.uuid, pairs = chunk.len(), "Response id outside request"),
            }
        }
        Ok(resolved)
    }

    pub async fn ping(&self) -> Result<()> {
        if self.is_closed() {
            return Err(Error::Closed("inference client"));
        }
        self.model.ping().await
    }

    /// Releases the classifier connection. Idempotent.
    pub async fn close(&self) {
        if !self.closed.swap(true, Ordering::SeqCst) {
            self.model.close().await;
            info!("Inference client closed");
        }
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}
