//! DynamoDB-backed record store for production runs.

use aws_sdk_dynamodb::types::AttributeValue;

use crate::error::StoreError;

use super::{ClassifiedRecord, RecordStore};

/// Record store over a hosted DynamoDB table partitioned by `tweet_id`.
#[derive(Debug, Clone)]
pub struct DynamoStore {
    client: aws_sdk_dynamodb::Client,
    table_name: String,
}

impl DynamoStore {
    /// Create a store over an existing SDK client.
    pub fn new(client: aws_sdk_dynamodb::Client, table_name: String) -> Self {
        Self { client, table_name }
    }

    /// Create a store using ambient AWS credentials and region.
    pub async fn from_env(table_name: String) -> Self {
        let config = aws_config::load_from_env().await;
        Self::new(aws_sdk_dynamodb::Client::new(&config), table_name)
    }

    fn item_for(record: &ClassifiedRecord) -> Vec<(String, AttributeValue)> {
        let mut item = vec![
            (
                "tweet_id".to_string(),
                AttributeValue::S(record.tweet_id.clone()),
            ),
            (
                "tweet_text".to_string(),
                AttributeValue::S(record.tweet_text.clone()),
            ),
            (
                "l1_topic".to_string(),
                AttributeValue::S(record.classification_result.l1_topics.clone()),
            ),
            (
                "l1_raw_response".to_string(),
                AttributeValue::S(record.classification_result.l1_raw_response.clone()),
            ),
            (
                "classification_model".to_string(),
                AttributeValue::S(record.ai_models_used.classification.clone()),
            ),
            (
                "classified_at".to_string(),
                AttributeValue::S(record.classified_at.to_rfc3339()),
            ),
        ];

        let optional = [
            ("author_id", record.author_id.as_ref()),
            ("author_username", record.author_username.as_ref()),
            ("created_at", record.created_at.as_ref()),
            ("l2_topic", record.classification_result.l2_topic.as_ref()),
            (
                "l2_raw_response",
                record.classification_result.l2_raw_response.as_ref(),
            ),
            ("screenshot_s3_path", record.screenshot_s3_path.as_ref()),
        ];
        for (name, value) in optional {
            if let Some(value) = value {
                item.push((name.to_string(), AttributeValue::S(value.clone())));
            }
        }
        item
    }
}

#[async_trait::async_trait]
impl RecordStore for DynamoStore {
    async fn put_batch(&self, records: &[ClassifiedRecord]) -> Result<(), StoreError> {
        // PutItem replaces the whole item per key, which gives the
        // last-write-wins upsert the contract requires.
        for record in records {
            let mut put = self.client.put_item().table_name(&self.table_name);
            for (name, value) in Self::item_for(record) {
                put = put.item(name, value);
            }
            put.send().await.map_err(|e| StoreError::Service {
                message: e.to_string(),
            })?;
        }
        tracing::debug!(table = %self.table_name, count = records.len(), "stored records");
        Ok(())
    }
}
