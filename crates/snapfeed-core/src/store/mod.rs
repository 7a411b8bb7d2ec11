//! The classified-record store.
//!
//! A key-value table of [`ClassifiedRecord`]s keyed by `tweet_id`. Upserts
//! are idempotent and last-write-wins, which is what makes the queue's
//! at-least-once delivery safe for the worker.

mod dynamo;
mod memory;

pub use dynamo::DynamoStore;
pub use memory::InMemoryStore;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::StoreError;

/// Classification fields of a stored record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassificationResult {
    /// Level-1 topic (or `Uncertain`).
    pub l1_topics: String,
    /// Raw level-1 model response, kept for auditability.
    pub l1_raw_response: String,
    /// Primary level-2 topic, when one was assigned.
    pub l2_topic: Option<String>,
    /// Raw level-2 model response, when a level-2 call was made.
    pub l2_raw_response: Option<String>,
}

/// Models involved in producing a record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AiModelsUsed {
    /// The classification model.
    pub classification: String,
}

/// One classified post, as persisted for downstream consumers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassifiedRecord {
    /// Stable post ID (the table's partition key).
    pub tweet_id: String,
    /// Author's platform user ID.
    pub author_id: Option<String>,
    /// Author's handle.
    pub author_username: Option<String>,
    /// The text that was classified.
    pub tweet_text: String,
    /// Post creation time as recorded in the metadata record.
    pub created_at: Option<String>,
    /// Classification outcome.
    pub classification_result: ClassificationResult,
    /// Models used.
    pub ai_models_used: AiModelsUsed,
    /// Canonical screenshot (first of the capture's screenshot keys).
    pub screenshot_s3_path: Option<String>,
    /// When classification ran.
    pub classified_at: DateTime<Utc>,
}

/// Capability set every record-store backend provides.
#[async_trait::async_trait]
pub trait RecordStore: Send + Sync {
    /// Idempotent upsert of a batch of records, keyed by `tweet_id`.
    async fn put_batch(&self, records: &[ClassifiedRecord]) -> Result<(), StoreError>;
}
