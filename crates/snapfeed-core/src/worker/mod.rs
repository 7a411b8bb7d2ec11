//! The classification worker loop.
//!
//! Long-running consumer of the classification queue: pull a batch, load
//! each referenced metadata record from blob storage, classify its text,
//! upsert the resulting records, then ack. A message whose processing
//! fails is left un-acked and returns after the visibility window; the
//! idempotent store upsert makes the redelivery harmless. Multiple worker
//! instances may run in parallel with no shared state beyond the queue
//! and the store.


use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::blob::BlobStore;
use crate::classify::Classifier;
use crate::error::{BlobError, QueueError};
use crate::queue::{ClassificationQueue, ClassificationRequest, QueueMessage};
use crate::store::{AiModelsUsed, ClassificationResult, ClassifiedRecord, RecordStore};
use crate::taxonomy::UNCERTAIN;

/// Why one message could not be processed (it stays queued).
#[derive(Debug, thiserror::Error)]
enum MessageError {
    #[error("malformed message body: {0}")]
    Malformed(String),

    #[error("metadata record unavailable: {0}")]
    Blob(#[from] BlobError),
}

/// Worker behavior knobs.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Messages pulled per iteration.
    pub batch_size: u32,
    /// Sleep between empty polls.
    pub idle_sleep: Duration,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            batch_size: 10,
            idle_sleep: Duration::from_secs(1),
        }
    }
}

/// Queue-driven classification worker.
pub struct ClassificationWorker {
    queue: Arc<dyn ClassificationQueue>,
    blob: Arc<dyn BlobStore>,
    classifier: Arc<dyn Classifier>,
    store: Arc<dyn RecordStore>,
    config: WorkerConfig,
}

impl ClassificationWorker {
    /// Wire a worker from its collaborators.
    pub fn new(
        queue: Arc<dyn ClassificationQueue>,
        blob: Arc<dyn BlobStore>,
        classifier: Arc<dyn Classifier>,
        store: Arc<dyn RecordStore>,
        config: WorkerConfig,
    ) -> Self {
        Self {
            queue,
            blob,
            classifier,
            store,
            config,
        }
    }

    /// Run until cancellation. The in-flight batch is drained before the
    /// loop exits; no new batch is fetched after cancellation.
    pub async fn run(&self, cancel: CancellationToken) {
        tracing::info!(batch_size = self.config.batch_size, "classification worker started");

        loop {
            if cancel.is_cancelled() {
                break;
            }

            match self.process_once().await {
                Ok(0) => {
                    tokio::select! {
                        _ = cancel.cancelled() => break,
                        _ = tokio::time::sleep(self.config.idle_sleep) => {}
                    }
                }
                Ok(stored) => {
                    tracing::info!(stored, "worker iteration complete");
                }
                Err(e) => {
                    tracing::warn!(error = %e, "queue fetch failed, backing off");
                    tokio::select! {
                        _ = cancel.cancelled() => break,
                        _ = tokio::time::sleep(self.config.idle_sleep) => {}
                    }
                }
            }
        }

        tracing::info!("classification worker stopped");
    }

    /// Process one batch. Returns the number of records stored.
    pub async fn process_once(&self) -> Result<usize, QueueError> {
        let messages = self.queue.fetch_batch(self.config.batch_size).await?;
        if messages.is_empty() {
            return Ok(0);
        }
        tracing::debug!(count = messages.len(), "fetched classification requests");

        let mut records = Vec::new();
        let mut processed = Vec::new();
        for message in &messages {
            match self.process_message(message).await {
                Ok(record) => {
                    records.push(record);
                    processed.push(message.receipt.clone());
                }
                Err(e) => {
                    tracing::warn!(
                        receipt = %message.receipt,
                        error = %e,
                        "message processing failed, leaving it for redelivery"
                    );
                }
            }
        }

        if records.is_empty() {
            return Ok(0);
        }

        if let Err(e) = self.store.put_batch(&records).await {
            // Nothing is acked: the whole batch comes back after the
            // visibility window and the upsert overwrites cleanly.
            tracing::warn!(error = %e, "record store write failed, batch will be redelivered");
            return Ok(0);
        }

        for receipt in &processed {
            if let Err(e) = self.queue.ack(receipt).await {
                tracing::warn!(receipt = %receipt, error = %e, "ack failed");
            }
        }

        tracing::info!(stored = records.len(), "classified and stored batch");
        Ok(records.len())
    }

    async fn process_message(
        &self,
        message: &QueueMessage,
    ) -> Result<ClassifiedRecord, MessageError> {
        let request = ClassificationRequest::from_body(&message.body)
            .map_err(|e| MessageError::Malformed(e.to_string()))?;
        let key = strip_s3_uri(&request.s3_metadata_path);

        tracing::debug!(key, "downloading metadata record");
        let record = self.blob.get_json(key).await?;

        let fields = RecordFields::from_metadata(&record).ok_or_else(|| {
            MessageError::Malformed(format!("metadata record at {key} has no usable post fields"))
        })?;

        tracing::info!(tweet_id = %fields.tweet_id, "classifying post");
        let outcome = self
            .classifier
            .classify(&fields.tweet_id, &fields.text)
            .await;

        if outcome.level1 == UNCERTAIN {
            tracing::debug!(tweet_id = %fields.tweet_id, "classification uncertain");
        }

        self.annotate_metadata(record, key, &outcome).await;

        Ok(ClassifiedRecord {
            tweet_id: fields.tweet_id,
            author_id: fields.author_id,
            author_username: fields.author_username,
            tweet_text: fields.text,
            created_at: fields.created_at,
            classification_result: ClassificationResult {
                l1_topics: outcome.level1,
                l1_raw_response: outcome.raw_l1,
                l2_topic: outcome.level2.first().cloned(),
                l2_raw_response: outcome.raw_l2,
            },
            ai_models_used: AiModelsUsed {
                classification: outcome.model,
            },
            screenshot_s3_path: fields.first_screenshot,
            classified_at: chrono::Utc::now(),
        })
    }

    /// Append classification keys to the metadata record in place.
    ///
    /// The record is the capture item's source of truth, so the outcome is
    /// mirrored there as well as in the record store. The stage contract
    /// is write-only-if-absent: a record that already carries
    /// `L1_category` (a redelivery, or another worker won the race) is
    /// left untouched. A failed write is only logged; the record store
    /// remains authoritative for downstream consumers.
    async fn annotate_metadata(
        &self,
        mut record: serde_json::Value,
        key: &str,
        outcome: &crate::classify::ClassificationOutcome,
    ) {
        if record.get("L1_category").is_some() {
            tracing::debug!(key, "metadata already annotated, skipping");
            return;
        }
        let Some(map) = record.as_object_mut() else {
            return;
        };

        let now = serde_json::Value::String(chrono::Utc::now().to_rfc3339());
        map.insert(
            "L1_category".to_string(),
            serde_json::Value::String(outcome.level1.clone()),
        );
        map.insert(
            "L1_categorization_confidence".to_string(),
            serde_json::json!(outcome.conf_l1),
        );
        map.insert(
            "L1_categorization_reasoning".to_string(),
            serde_json::Value::String(outcome.raw_l1.clone()),
        );
        map.insert("L1_categorization_timestamp".to_string(), now.clone());

        if let Some(l2) = outcome.level2.first() {
            map.insert(
                "L2_category".to_string(),
                serde_json::Value::String(l2.clone()),
            );
            map.insert(
                "L2_categorization_confidence".to_string(),
                serde_json::json!(outcome.conf_l2),
            );
            if let Some(raw_l2) = &outcome.raw_l2 {
                map.insert(
                    "L2_categorization_reasoning".to_string(),
                    serde_json::Value::String(raw_l2.clone()),
                );
            }
            map.insert("L2_categorization_timestamp".to_string(), now);
        }

        if let Err(e) = self.blob.put_json(&record, key).await {
            tracing::warn!(key, error = %e, "failed to annotate metadata record");
        }
    }
}

/// Post fields pulled out of a metadata record (singleton or thread).
struct RecordFields {
    tweet_id: String,
    text: String,
    author_id: Option<String>,
    author_username: Option<String>,
    created_at: Option<String>,
    first_screenshot: Option<String>,
}

impl RecordFields {
    fn from_metadata(record: &serde_json::Value) -> Option<Self> {
        let as_string =
            |v: Option<&serde_json::Value>| v.and_then(|v| v.as_str()).map(ToString::to_string);

        let tweet_id = as_string(record.get("tweet_id"))
            .or_else(|| as_string(record.pointer("/thread_summary/id")))?;

        // The extracted screenshot text is authoritative once present;
        // otherwise fall back to the API-sourced body.
        let text = as_string(record.get("full_text"))
            .or_else(|| as_string(record.pointer("/tweet_metadata/text")))
            .or_else(|| as_string(record.pointer("/thread_summary/text")))?;

        let author_id = as_string(record.pointer("/tweet_metadata/author/id"))
            .or_else(|| as_string(record.pointer("/thread_summary/author/id")));
        let author_username = as_string(record.pointer("/tweet_metadata/author/username"))
            .or_else(|| as_string(record.pointer("/thread_summary/author/username")));
        let created_at = as_string(record.pointer("/tweet_metadata/created_at"))
            .or_else(|| as_string(record.pointer("/thread_summary/created_at")));

        let first_screenshot = as_string(record.pointer("/s3_screenshots/0"))
            .or_else(|| as_string(record.pointer("/ordered_tweets/0/s3_screenshots/0")));

        Some(Self {
            tweet_id,
            text,
            author_id,
            author_username,
            created_at,
            first_screenshot,
        })
    }
}

/// Queue messages may carry either a bare blob key or a full `s3://` URI.
fn strip_s3_uri(path: &str) -> &str {
    match path.strip_prefix("s3://") {
        Some(rest) => rest.split_once('/').map_or(rest, |(_, key)| key),
        None => path,
    }
}
