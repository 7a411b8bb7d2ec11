//! In-memory record store for tests and local runs.

use std::collections::HashMap;

use tokio::sync::Mutex;

use crate::error::StoreError;

use super::{ClassifiedRecord, RecordStore};

/// Record store backed by a process-local map.
#[derive(Default)]
pub struct InMemoryStore {
    records: Mutex<HashMap<String, ClassifiedRecord>>,
}

impl InMemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of distinct records stored.
    pub async fn len(&self) -> usize {
        self.records.lock().await.len()
    }

    /// Whether the store is empty.
    pub async fn is_empty(&self) -> bool {
        self.records.lock().await.is_empty()
    }

    /// Fetch one record by post ID.
    pub async fn get(&self, tweet_id: &str) -> Option<ClassifiedRecord> {
        self.records.lock().await.get(tweet_id).cloned()
    }

    /// Snapshot of all records (local-run manifest dump).
    pub async fn snapshot(&self) -> Vec<ClassifiedRecord> {
        self.records.lock().await.values().cloned().collect()
    }
}

#[async_trait::async_trait]
impl RecordStore for InMemoryStore {
    async fn put_batch(&self, records: &[ClassifiedRecord]) -> Result<(), StoreError> {
        let mut map = self.records.lock().await;
        for record in records {
            map.insert(record.tweet_id.clone(), record.clone());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{AiModelsUsed, ClassificationResult};

    fn record(tweet_id: &str, l1: &str) -> ClassifiedRecord {
        ClassifiedRecord {
            tweet_id: tweet_id.to_string(),
            author_id: Some("u1".to_string()),
            author_username: Some("tester".to_string()),
            tweet_text: "text".to_string(),
            created_at: Some("2026-07-01T00:00:00Z".to_string()),
            classification_result: ClassificationResult {
                l1_topics: l1.to_string(),
                l1_raw_response: "{}".to_string(),
                l2_topic: None,
                l2_raw_response: None,
            },
            ai_models_used: AiModelsUsed {
                classification: "stub".to_string(),
            },
            screenshot_s3_path: None,
            classified_at: chrono::Utc::now(),
        }
    }

    #[tokio::test]
    async fn upsert_is_idempotent_by_tweet_id() {
        let store = InMemoryStore::new();
        let r = record("1", "Model Releases");

        store.put_batch(&[r.clone()]).await.unwrap();
        store.put_batch(&[r]).await.unwrap();

        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn rewrite_is_last_write_wins() {
        let store = InMemoryStore::new();
        store.put_batch(&[record("1", "Model Releases")]).await.unwrap();
        store
            .put_batch(&[record("1", "Breakthrough Research")])
            .await
            .unwrap();

        let stored = store.get("1").await.unwrap();
        assert_eq!(stored.classification_result.l1_topics, "Breakthrough Research");
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn batch_stores_all_records() {
        let store = InMemoryStore::new();
        store
            .put_batch(&[record("1", "a"), record("2", "b"), record("3", "c")])
            .await
            .unwrap();
        assert_eq!(store.len().await, 3);
        assert!(store.get("2").await.is_some());
        assert!(store.get("9").await.is_none());
    }
}
