//! Single-process queue for tests and local runs.
//!
//! Implements the same at-least-once contract as the hosted queue: a
//! fetched message is invisible for the visibility window and is
//! redelivered unless acked in time.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use tokio::sync::Mutex;

use crate::error::QueueError;

use super::{ClassificationQueue, QueueMessage};

#[derive(Debug)]
struct StoredMessage {
    receipt: String,
    body: String,
    /// When this message becomes visible again.
    visible_at: Instant,
}

/// In-memory queue with visibility-window redelivery.
pub struct InMemoryQueue {
    visibility: Duration,
    messages: Mutex<VecDeque<StoredMessage>>,
    next_receipt: Mutex<u64>,
}

impl InMemoryQueue {
    /// Create a queue with the given visibility window.
    pub fn new(visibility: Duration) -> Self {
        Self {
            visibility,
            messages: Mutex::new(VecDeque::new()),
            next_receipt: Mutex::new(0),
        }
    }

    /// Number of messages currently stored (visible or in flight).
    pub async fn len(&self) -> usize {
        self.messages.lock().await.len()
    }

    /// Whether the queue holds no messages at all.
    pub async fn is_empty(&self) -> bool {
        self.messages.lock().await.is_empty()
    }
}

impl Default for InMemoryQueue {
    fn default() -> Self {
        Self::new(Duration::from_secs(60))
    }
}

#[async_trait::async_trait]
impl ClassificationQueue for InMemoryQueue {
    async fn send(&self, body: &str) -> Result<(), QueueError> {
        let receipt = {
            let mut counter = self.next_receipt.lock().await;
            *counter += 1;
            format!("receipt-{}", *counter)
        };
        self.messages.lock().await.push_back(StoredMessage {
            receipt,
            body: body.to_string(),
            visible_at: Instant::now(),
        });
        Ok(())
    }

    async fn fetch_batch(&self, max: u32) -> Result<Vec<QueueMessage>, QueueError> {
        let now = Instant::now();
        let mut messages = self.messages.lock().await;
        let mut batch = Vec::new();

        for stored in messages.iter_mut() {
            if batch.len() as u32 >= max {
                break;
            }
            if stored.visible_at <= now {
                stored.visible_at = now + self.visibility;
                batch.push(QueueMessage {
                    receipt: stored.receipt.clone(),
                    body: stored.body.clone(),
                });
            }
        }

        Ok(batch)
    }

    async fn ack(&self, receipt: &str) -> Result<(), QueueError> {
        let mut messages = self.messages.lock().await;
        messages.retain(|m| m.receipt != receipt);
        Ok(())
    }
}
