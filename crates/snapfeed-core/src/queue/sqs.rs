//! SQS-backed classification queue for production runs.

use crate::error::QueueError;

use super::{ClassificationQueue, QueueMessage};

/// Classification queue over a hosted SQS queue.
#[derive(Debug, Clone)]
pub struct SqsQueue {
    client: aws_sdk_sqs::Client,
    queue_url: String,
    visibility_secs: i32,
}

impl SqsQueue {
    /// Create a queue over an existing SDK client.
    pub fn new(client: aws_sdk_sqs::Client, queue_url: String, visibility_secs: u64) -> Self {
        Self {
            client,
            queue_url,
            visibility_secs: visibility_secs.min(i32::MAX as u64) as i32,
        }
    }

    /// Create a queue using ambient AWS credentials and region.
    pub async fn from_env(queue_url: String, visibility_secs: u64) -> Self {
        let config = aws_config::load_from_env().await;
        Self::new(aws_sdk_sqs::Client::new(&config), queue_url, visibility_secs)
    }
}

#[async_trait::async_trait]
impl ClassificationQueue for SqsQueue {
    async fn send(&self, body: &str) -> Result<(), QueueError> {
        self.client
            .send_message()
            .queue_url(&self.queue_url)
            .message_body(body)
            .send()
            .await
            .map_err(|e| QueueError::Service {
                message: e.to_string(),
            })?;
        Ok(())
    }

    async fn fetch_batch(&self, max: u32) -> Result<Vec<QueueMessage>, QueueError> {
        let output = self
            .client
            .receive_message()
            .queue_url(&self.queue_url)
            .max_number_of_messages(max.clamp(1, 10) as i32)
            .visibility_timeout(self.visibility_secs)
            .wait_time_seconds(1)
            .send()
            .await
            .map_err(|e| QueueError::Service {
                message: e.to_string(),
            })?;

        Ok(output
            .messages
            .unwrap_or_default()
            .into_iter()
            .filter_map(|m| {
                let receipt = m.receipt_handle?;
                let body = m.body?;
                Some(QueueMessage { receipt, body })
            })
            .collect())
    }

    async fn ack(&self, receipt: &str) -> Result<(), QueueError> {
        self.client
            .delete_message()
            .queue_url(&self.queue_url)
            .receipt_handle(receipt)
            .send()
            .await
            .map_err(|e| QueueError::Service {
                message: e.to_string(),
            })?;
        Ok(())
    }
}
