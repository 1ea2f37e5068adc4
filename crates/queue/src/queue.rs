//! Queue backend trait.

use async_trait::async_trait;
use augment_core::Result;
use std::time::Duration;

/// A received, not yet acknowledged message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
    /// Stable message id
    pub id: String,
    /// Handle passed back to [`MessageQueue::ack`]
    pub receipt: String,
    pub body: String,
}

/// At-least-once message queue.
///
/// `receive` hides each returned message until it is acknowledged or its
/// visibility timeout lapses, after which it is delivered again.
#[async_trait]
pub trait MessageQueue: Send + Sync {
    /// Queue (stream) name, for logs.
    fn name(&self) -> &str;

    /// Enqueues `body` and returns the message id.
    async fn send(&self, body: &str) -> Result<String>;

    /// Waits up to `wait` for at most `max` messages.
    async fn receive(&self, max: usize, wait: Duration) -> Result<Vec<Delivery>>;

    /// Removes a delivered message for good.
    async fn ack(&self, receipt: &str) -> Result<()>;

    async fn ping(&self) -> Result<()>;
}
