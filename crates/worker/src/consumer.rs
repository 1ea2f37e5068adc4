//! Intake worker: queue → batch processor → acknowledge.
//!
//! 1. Long-poll the intake queue for up to `max_messages` file references
//! 2. Process the referenced units concurrently
//! 3. Acknowledge each unit that completed; leave failed ones for redelivery
//! 4. Repeat until shutdown

use augment_core::Result;
use intake_queue::{Delivery, FileRef, MessageQueue, QueueConfig};
use std::sync::Arc;
use std::time::Duration;
use telemetry::{health, metrics};
use tokio::sync::watch;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use crate::processor::BatchProcessor;

/// Pause after a failed receive.
const RECEIVE_BACKOFF: Duration = Duration::from_secs(1);

/// What happened to one delivery.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryOutcome {
    /// Processed and acknowledged
    Acked,
    /// Processing failed; left on the queue
    Failed,
    /// Unreadable body; acknowledged so it is not redelivered forever
    Poison,
}

/// Consumes file references from the intake queue.
pub struct IntakeWorker {
    queue: Arc<dyn MessageQueue>,
    processor: BatchProcessor,
    max_messages: usize,
    wait: Duration,
}

impl IntakeWorker {
    pub fn new(queue: Arc<dyn MessageQueue>, processor: BatchProcessor, config: &QueueConfig) -> Self {
        Self {
            queue,
            processor,
            max_messages: config.max_messages,
            wait: config.wait(),
        }
    }

    /// Main loop. Returns once `shutdown` flips to true; an iteration that
    /// already received messages runs to completion first.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        info!(
            queue = self.queue.name(),
            max_messages = self.max_messages,
            wait_secs = self.wait.as_secs(),
            "Intake worker starting"
        );

        loop {
            if *shutdown.borrow() {
                break;
            }

            let received = tokio::select! {
                _ = shutdown.changed() => break,
                received = self.receive() => received,
            };

            match received {
                Ok(deliveries) => {
                    if !deliveries.is_empty() {
                        let outcomes = self.process_deliveries(deliveries).await;
                        debug!(count = outcomes.len(), "Processed deliveries");
                    }
                }
                Err(e) => {
                    error!(queue = self.queue.name(), error = %e, "Receive failed");
                    tokio::select! {
                        _ = shutdown.changed() => break,
                        _ = tokio::time::sleep(RECEIVE_BACKOFF) => {}
                    }
                }
            }
        }

        info!(queue = self.queue.name(), "Intake worker stopped");
    }

    /// One receive and process round. Returns the outcome of each delivery.
    pub async fn poll_once(&self) -> Result<Vec<DeliveryOutcome>> {
        let deliveries = self.receive().await?;
        Ok(self.process_deliveries(deliveries).await)
    }

    async fn receive(&self) -> Result<Vec<Delivery>> {
        let received = self.queue.receive(self.max_messages, self.wait).await;
        match &received {
            Ok(_) => health().queue.set_healthy(),
            Err(e) => health().queue.set_unhealthy(e.to_string()),
        }
        received
    }

    async fn process_deliveries(&self, deliveries: Vec<Delivery>) -> Vec<DeliveryOutcome> {
        metrics().units_received.inc_by(deliveries.len() as u64);

        let mut tasks = JoinSet::new();
        for delivery in deliveries {
            let queue = self.queue.clone();
            let processor = self.processor.clone();
            tasks.spawn(handle_delivery(queue, processor, delivery));
        }

        let mut outcomes = Vec::new();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(outcome) => outcomes.push(outcome),
                Err(e) => {
                    error!(error = %e, "Unit task failed");
                    metrics().units_failed.inc();
                    outcomes.push(DeliveryOutcome::Failed);
                }
            }
        }
        outcomes
    }
}

async fn handle_delivery(
    queue: Arc<dyn MessageQueue>,
    processor: BatchProcessor,
    delivery: Delivery,
) -> DeliveryOutcome {
    let file = match FileRef::from_body(&delivery.body) {
        Ok(file) => file,
        Err(e) => {
            warn!(id = %delivery.id, error = %e, "Dropping unreadable intake message");
            metrics().poison_messages.inc();
            if let Err(e) = queue.ack(&delivery.receipt).await {
                error!(id = %delivery.id, error = %e, "Failed to acknowledge poison message");
            }
            return DeliveryOutcome::Poison;
        }
    };

    metrics().units_in_flight.inc();
    let result = processor.process_unit(&file).await;
    metrics().units_in_flight.dec();

    match result {
        Ok(outcome) => match queue.ack(&delivery.receipt).await {
            Ok(()) => {
                metrics().units_processed.inc();
                info!(
                    file = %file,
                    augmented = outcome.augmented,
                    unresolved = outcome.unresolved,
                    "Unit acknowledged"
                );
                DeliveryOutcome::Acked
            }
            Err(e) => {
                // processed but still pending; it will be redelivered
                error!(file = %file, error = %e, "Failed to acknowledge unit");
                metrics().units_failed.inc();
                DeliveryOutcome::Failed
            }
        },
        Err(e) => {
            error!(file = %file, error = %e, "Unit failed, leaving for redelivery");
            metrics().units_failed.inc();
            DeliveryOutcome::Failed
        }
    }
}
