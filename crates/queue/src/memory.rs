//! In-process queue with visibility timeouts.

use async_trait::async_trait;
use augment_core::{Error, Result};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::time::Duration;
use tokio::sync::Notify;
use tokio::time::Instant;
use uuid::Uuid;

use crate::queue::{Delivery, MessageQueue};

struct Entry {
    id: String,
    body: String,
    /// Receipt of the outstanding delivery, if any
    receipt: Option<String>,
    invisible_until: Option<Instant>,
    deliveries: u32,
}

pub struct MemoryQueue {
    name: String,
    visibility_timeout: Duration,
    entries: Mutex<VecDeque<Entry>>,
    notify: Notify,
}

impl MemoryQueue {
    pub fn new(name: impl Into<String>, visibility_timeout: Duration) -> Self {
        Self {
            name: name.into(),
            visibility_timeout,
            entries: Mutex::new(VecDeque::new()),
            notify: Notify::new(),
        }
    }

    /// Messages not yet acknowledged, visible or not.
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Times the message with `id` has been handed out.
    pub fn delivery_count(&self, id: &str) -> Option<u32> {
        self.entries
            .lock()
            .iter()
            .find(|e| e.id == id)
            .map(|e| e.deliveries)
    }

    fn take_visible(&self, max: usize) -> Vec<Delivery> {
        let now = Instant::now();
        let mut entries = self.entries.lock();
        let mut out = Vec::new();

        for entry in entries.iter_mut() {
            if out.len() >= max {
                break;
            }
            if entry.invisible_until.is_some_and(|until| until > now) {
                continue;
            }
            let receipt = Uuid::new_v4().to_string();
            entry.receipt = Some(receipt.clone());
            entry.invisible_until = Some(now + self.visibility_timeout);
            entry.deliveries += 1;
            out.push(Delivery {
                id: entry.id.clone(),
                receipt,
                body: entry.body.clone(),
            });
        }
        out
    }

    fn next_visible_at(&self) -> Option<Instant> {
        self.entries
            .lock()
            .iter()
            .filter_map(|e| e.invisible_until)
            .min()
    }
}

#[async_trait]
impl MessageQueue for MemoryQueue {
    fn name(&self) -> &str {
        &self.name
    }

    async fn send(&self, body: &str) -> Result<String> {
        let id = Uuid::new_v4().to_string();
        self.entries.lock().push_back(Entry {
            id: id.clone(),
            body: body.to_string(),
            receipt: None,
            invisible_until: None,
            deliveries: 0,
        });
        self.notify.notify_waiters();
        Ok(id)
    }

    async fn receive(&self, max: usize, wait: Duration) -> Result<Vec<Delivery>> {
        let deadline = Instant::now() + wait;
        loop {
            let notified = self.notify.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            let deliveries = self.take_visible(max);
            if !deliveries.is_empty() {
                return Ok(deliveries);
            }

            let now = Instant::now();
            if now >= deadline {
                return Ok(Vec::new());
            }

            // Wake on a new send, on a hidden message turning visible, or at the deadline.
            let wake = self
                .next_visible_at()
                .filter(|at| *at > now)
                .map_or(deadline, |at| at.min(deadline));
            tokio::select! {
                _ = &mut notified => {}
                _ = tokio::time::sleep_until(wake) => {}
            }
        }
    }

    async fn ack(&self, receipt: &str) -> Result<()> {
        let mut entries = self.entries.lock();
        let position = entries
            .iter()
            .position(|e| e.receipt.as_deref() == Some(receipt))
            .ok_or_else(|| Error::queue(format!("unknown or expired receipt: {}", receipt)))?;
        entries.remove(position);
        Ok(())
    }

    async fn ping(&self) -> Result<()> {
        Ok(())
    }
}
