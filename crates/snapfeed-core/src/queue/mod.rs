//! Classification queue transport.
//!
//! Carries `{"s3_metadata_path": ...}` messages from the capture side to
//! the classification worker with at-least-once delivery: fetched messages
//! are hidden for a visibility window and reappear unless acked. Consumers
//! tolerate redelivery (the record store upsert is idempotent) and must
//! tolerate extra fields in the payload.

mod memory;
mod sqs;

pub use memory::InMemoryQueue;
pub use sqs::SqsQueue;

use serde::{Deserialize, Serialize};

use crate::error::QueueError;

/// Payload of a classification request message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassificationRequest {
    /// Blob key (or s3:// URI) of the metadata record to classify.
    pub s3_metadata_path: String,
    /// Unrecognized fields are carried through untouched.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl ClassificationRequest {
    /// Build a request for a metadata record key.
    pub fn new(s3_metadata_path: impl Into<String>) -> Self {
        Self {
            s3_metadata_path: s3_metadata_path.into(),
            extra: serde_json::Map::new(),
        }
    }

    /// Serialize to the wire format.
    pub fn to_body(&self) -> Result<String, QueueError> {
        serde_json::to_string(self).map_err(|source| QueueError::Json { source })
    }

    /// Parse from the wire format.
    pub fn from_body(body: &str) -> Result<Self, QueueError> {
        serde_json::from_str(body).map_err(|source| QueueError::Json { source })
    }
}

/// A fetched message with its receipt handle.
#[derive(Debug, Clone)]
pub struct QueueMessage {
    /// Opaque handle used to ack this delivery.
    pub receipt: String,
    /// UTF-8 JSON body.
    pub body: String,
}

/// Capability set every queue backend provides.
#[async_trait::async_trait]
pub trait ClassificationQueue: Send + Sync {
    /// Append a message.
    async fn send(&self, body: &str) -> Result<(), QueueError>;

    /// Return up to `max` messages, hiding them from other consumers for
    /// the visibility window.
    async fn fetch_batch(&self, max: u32) -> Result<Vec<QueueMessage>, QueueError>;

    /// Permanently remove a delivered message.
    async fn ack(&self, receipt: &str) -> Result<(), QueueError>;
}
