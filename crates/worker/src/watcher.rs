//! Watcher: storage notifications → intake file references.

use augment_core::Result;
use intake_queue::{Delivery, FileRef, MessageQueue, QueueConfig, StorageNotification};
use std::sync::Arc;
use std::time::Duration;
use telemetry::{health, metrics};
use tokio::sync::watch;
use tracing::{error, info, warn};

use crate::config::WatcherConfig;

const RECEIVE_BACKOFF: Duration = Duration::from_secs(1);

/// Translates each accepted file of a notification into one intake message.
///
/// A notification is acknowledged only after all of its accepted files were
/// enqueued; if an enqueue fails the whole notification is redelivered, so
/// a file may be enqueued more than once.
pub struct Watcher {
    notifications: Arc<dyn MessageQueue>,
    intake: Arc<dyn MessageQueue>,
    extensions: Vec<String>,
    max_messages: usize,
    wait: Duration,
}

impl Watcher {
    pub fn new(
        notifications: Arc<dyn MessageQueue>,
        intake: Arc<dyn MessageQueue>,
        config: &WatcherConfig,
        queue_config: &QueueConfig,
    ) -> Self {
        Self {
            notifications,
            intake,
            extensions: config.extensions.clone(),
            max_messages: queue_config.max_messages,
            wait: queue_config.wait(),
        }
    }

    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        info!(
            notifications = self.notifications.name(),
            intake = self.intake.name(),
            extensions = ?self.extensions,
            "Watcher starting"
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
                    for delivery in deliveries {
                        self.handle(delivery).await;
                    }
                }
                Err(e) => {
                    error!(queue = self.notifications.name(), error = %e, "Error in watcher");
                    tokio::select! {
                        _ = shutdown.changed() => break,
                        _ = tokio::time::sleep(RECEIVE_BACKOFF) => {}
                    }
                }
            }
        }

        info!("Watcher stopped");
    }

    /// One receive round. Returns the number of files enqueued.
    pub async fn poll_once(&self) -> Result<usize> {
        let deliveries = self.receive().await?;

        let mut enqueued = 0;
        for delivery in deliveries {
            enqueued += self.handle(delivery).await;
        }
        Ok(enqueued)
    }

    /// Receives notifications, recording queue health either way.
    async fn receive(&self) -> Result<Vec<Delivery>> {
        let received = self
            .notifications
            .receive(self.max_messages, self.wait)
            .await;
        match &received {
            Ok(_) => health().queue.set_healthy(),
            Err(e) => health().queue.set_unhealthy(e.to_string()),
        }
        received
    }

    async fn handle(&self, delivery: Delivery) -> usize {
        metrics().notifications_received.inc();

        let notification = match StorageNotification::from_body(&delivery.body) {
            Ok(notification) => notification,
            Err(e) => {
                warn!(id = %delivery.id, error = %e, "Dropping unreadable notification");
                metrics().poison_messages.inc();
                self.ack(&delivery).await;
                return 0;
            }
        };

        match self.enqueue_files(&notification).await {
            Ok(enqueued) => {
                self.ack(&delivery).await;
                enqueued
            }
            Err(e) => {
                error!(id = %delivery.id, error = %e, "Failed to enqueue files, notification left for redelivery");
                0
            }
        }
    }

    async fn enqueue_files(&self, notification: &StorageNotification) -> Result<usize> {
        let mut enqueued = 0;
        for file in notification.files() {
            if !file.has_extension(&self.extensions) {
                info!(file = %file, "Skipping file with unrecognized extension");
                metrics().files_skipped.inc();
                continue;
            }

            self.publish(&file).await?;
            enqueued += 1;
        }
        Ok(enqueued)
    }

    async fn publish(&self, file: &FileRef) -> Result<()> {
        let id = self.intake.send(&file.to_body()?).await?;
        metrics().files_enqueued.inc();
        info!(file = %file, id = %id, "Enqueued file");
        Ok(())
    }

    async fn ack(&self, delivery: &Delivery) {
        if let Err(e) = self.notifications.ack(&delivery.receipt).await {
            error!(id = %delivery.id, error = %e, "Failed to acknowledge notification");
        }
    }
}
