//! Classifier transport.

use async_trait::async_trait;
use augment_core::{Error, Result};
use parking_lot::RwLock;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::protocol::{SeniorityRequestBatch, SeniorityResponseBatch};

/// Transport to the seniority classifier.
///
/// Implementations hold a long-lived connection; `close` releases it and
/// every later call fails with [`Error::Closed`].
#[async_trait]
pub trait SeniorityModel: Send + Sync {
    async fn infer(&self, request: SeniorityRequestBatch) -> Result<SeniorityResponseBatch>;

    async fn ping(&self) -> Result<()>;

    async fn close(&self);
}

/// JSON-over-HTTP classifier transport.
///
/// `POST {base_url}/v1/seniority:batch` with a [`SeniorityRequestBatch`]
/// body; the reply is a [`SeniorityResponseBatch`]. The pooled client keeps
/// connections alive between calls.
pub struct HttpSeniorityModel {
    base_url: String,
    http_client: RwLock<Option<reqwest::Client>>,
}

impl HttpSeniorityModel {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .pool_idle_timeout(None)
            .build()
            .map_err(|e| Error::inference(format!("Failed to create HTTP client: {}", e)))?;

        info!(url = %base_url, "Created inference client");

        Ok(Self {
            base_url,
            http_client: RwLock::new(Some(http_client)),
        })
    }

    fn client(&self) -> Result<reqwest::Client> {
        self.http_client
            .read()
            .clone()
            .ok_or(Error::Closed("inference connection"))
    }
}

fn map_reqwest(e: reqwest::Error) -> Error {
    if e.is_timeout() {
        Error::timeout(format!("inference request: {}", e))
    } else {
        Error::inference(format!("inference request failed: {}", e))
    }
}

#[async_trait]
impl SeniorityModel for HttpSeniorityModel {
    async fn infer(&self, request: SeniorityRequestBatch) -> Result<SeniorityResponseBatch> {
        let client = self.client()?;
        let url = format!("{}/v1/seniority:batch", self.base_url);

        debug!(url = %url, pairs = request.len(), "Calling inference service");

        let response = client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(map_reqwest)?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            warn!(status = %status, body = %body, "Inference service returned error");
            return Err(Error::inference(format!(
                "Inference service returned {}: {}",
                status, body
            )));
        }

        response
            .json::<SeniorityResponseBatch>()
            .await
            .map_err(|e| Error::inference(format!("Invalid inference response: {}", e)))
    }

    async fn ping(&self) -> Result<()> {
        let client = self.client()?;
        let response = client
            .get(format!("{}/health", self.base_url))
            .send()
            .await
            .map_err(map_reqwest)?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(Error::inference(format!(
                "Inference health returned {}",
                response.status()
            )))
        }
    }

    async fn close(&self) {
        if self.http_client.write().take().is_some() {
            info!(url = %self.base_url, "Inference connection closed");
        }
    }
}
