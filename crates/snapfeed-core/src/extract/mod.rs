//! Authoritative text extraction from captured screenshots.
//!
//! The rendered page, not the API payload, is the source of truth for what
//! a post actually showed. The extractor feeds a capture's ordered
//! screenshots to a vision-capable LLM and writes `full_text`, `summary`,
//! and `extraction_timestamp` back into the metadata record in place.
//! Records that already carry `full_text` are left untouched without an
//! LLM call.

use std::sync::Arc;

use serde::Deserialize;

use crate::blob::BlobStore;
use crate::error::ExtractError;
use crate::llm::{GenerationParams, ImageInput, LlmProvider};

const SYSTEM_PROMPT: &str =
    "You read screenshots of social-media posts and transcribe them faithfully. \
     You answer with a single JSON object and nothing else.";

/// What an extraction call did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractOutcome {
    /// The record was enriched by this call.
    Extracted,
    /// The record already had `full_text`; nothing was done.
    AlreadyExtracted,
}

/// Enriches metadata records with OCR'd text.
pub struct TextExtractor {
    blob: Arc<dyn BlobStore>,
    llm: Arc<dyn LlmProvider>,
}

impl TextExtractor {
    /// Create an extractor over the given blob store and vision model.
    pub fn new(blob: Arc<dyn BlobStore>, llm: Arc<dyn LlmProvider>) -> Self {
        Self { blob, llm }
    }

    /// Extract text for the metadata record at `metadata_key`, updating it
    /// in place.
    pub async fn extract(&self, metadata_key: &str) -> Result<ExtractOutcome, ExtractError> {
        let mut record = self.blob.get_json(metadata_key).await?;

        if record
            .get("full_text")
            .is_some_and(|v| !v.is_null())
        {
            tracing::debug!(metadata_key, "record already extracted, skipping");
            return Ok(ExtractOutcome::AlreadyExtracted);
        }

        let tweet_id = record_tweet_id(&record).unwrap_or("unknown").to_string();
        let screenshot_keys = screenshot_keys(&record, metadata_key)?;

        let mut images = Vec::with_capacity(screenshot_keys.len());
        for key in &screenshot_keys {
            let bytes = self.blob.get_bytes(key).await?;
            images.push(ImageInput::png(&bytes));
        }

        tracing::info!(
            metadata_key,
            tweet_id,
            screenshots = images.len(),
            "extracting text from screenshots"
        );

        let response = self
            .llm
            .complete_with_images(
                SYSTEM_PROMPT,
                EXTRACTION_PROMPT,
                &images,
                &GenerationParams {
                    max_tokens: 2048,
                    temperature: 0.0,
                },
            )
            .await?;

        let (full_text, summary) = parse_extraction(&response.text)
            .ok_or_else(|| ExtractError::NoText {
                tweet_id: tweet_id.clone(),
            })?;

        let now = chrono::Utc::now().to_rfc3339();
        let map = record
            .as_object_mut()
            .ok_or_else(|| ExtractError::MalformedRecord {
                key: metadata_key.to_string(),
                message: "record is not a JSON object".to_string(),
            })?;
        map.insert("full_text".to_string(), serde_json::Value::String(full_text));
        map.insert("summary".to_string(), serde_json::Value::String(summary));
        map.insert(
            "extraction_timestamp".to_string(),
            serde_json::Value::String(now),
        );

        self.blob.put_json(&record, metadata_key).await?;
        tracing::info!(metadata_key, tweet_id, "extraction written");
        Ok(ExtractOutcome::Extracted)
    }
}

const EXTRACTION_PROMPT: &str =
    "The attached screenshots show one post (or thread) from top to bottom, \
     possibly with overlapping regions. Transcribe the complete visible text of \
     the post itself, excluding UI labels, metrics, and replies by other \
     authors. Then summarize it in one or two sentences.\n\n\
     Answer with only a JSON object of the form\n\
     {\"full_text\": \"<the transcribed text>\", \"summary\": \"<1-2 sentences>\"}";

#[derive(Deserialize)]
struct ExtractionAnswer {
    #[serde(default)]
    full_text: String,
    #[serde(default)]
    summary: String,
}

/// Parse the model's answer. Empty or whitespace-only text is a failure,
/// never an empty success.
fn parse_extraction(raw: &str) -> Option<(String, String)> {
    let trimmed = strip_code_fence(raw);
    if trimmed.trim().is_empty() {
        return None;
    }

    if let Ok(answer) = serde_json::from_str::<ExtractionAnswer>(trimmed) {
        if answer.full_text.trim().is_empty() {
            return None;
        }
        let summary = if answer.summary.trim().is_empty() {
            first_sentences(&answer.full_text)
        } else {
            answer.summary
        };
        return Some((answer.full_text, summary));
    }

    // Some models answer with the bare transcription despite the contract.
    Some((trimmed.to_string(), first_sentences(trimmed)))
}

fn strip_code_fence(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(inner) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let inner = inner.strip_prefix("json").unwrap_or(inner);
    inner.strip_suffix("```").unwrap_or(inner).trim()
}

fn first_sentences(text: &str) -> String {
    let mut out = String::new();
    for (i, sentence) in text.split_inclusive(['.', '!', '?']).enumerate() {
        if i >= 2 {
            break;
        }
        out.push_str(sentence);
    }
    if out.is_empty() {
        text.chars().take(200).collect()
    } else {
        out.trim().to_string()
    }
}

fn record_tweet_id(record: &serde_json::Value) -> Option<&str> {
    record
        .get("tweet_id")
        .or_else(|| record.pointer("/thread_summary/id"))
        .or_else(|| record.get("conversation_id"))
        .and_then(|v| v.as_str())
}

/// The ordered screenshot keys of a record: `s3_screenshots` for
/// singletons, the concatenation of each `ordered_tweets` entry's
/// screenshots for threads.
fn screenshot_keys(
    record: &serde_json::Value,
    metadata_key: &str,
) -> Result<Vec<String>, ExtractError> {
    let collect = |value: &serde_json::Value| -> Vec<String> {
        value
            .as_array()
            .map(|arr| {
                arr.iter()
                    .filter_map(|v| v.as_str().map(ToString::to_string))
                    .collect()
            })
            .unwrap_or_default()
    };

    let keys = if let Some(screenshots) = record.get("s3_screenshots") {
        collect(screenshots)
    } else if let Some(ordered) = record.get("ordered_tweets").and_then(|v| v.as_array()) {
        ordered
            .iter()
            .flat_map(|entry| collect(entry.get("s3_screenshots").unwrap_or(&serde_json::Value::Null)))
            .collect()
    } else {
        Vec::new()
    };

    if keys.is_empty() {
        return Err(ExtractError::MalformedRecord {
            key: metadata_key.to_string(),
            message: "record lists no screenshots".to_string(),
        });
    }
    Ok(keys)
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    use super::*;
    use crate::blob::FsBlobStore;
    use crate::error::LlmError;
    use crate::llm::{LlmResponse, TokenUsage};

    struct StubVision {
        response: Mutex<String>,
        calls: AtomicUsize,
    }

    impl StubVision {
        fn new(response: &str) -> Arc<Self> {
            Arc::new(Self {
                response: Mutex::new(response.to_string()),
                calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait::async_trait]
    impl LlmProvider for StubVision {
        fn name(&self) -> &str {
            "stub-vision"
        }

        async fn complete(
            &self,
            _system: &str,
            _user_message: &str,
            _params: &GenerationParams,
        ) -> Result<LlmResponse, LlmError> {
            unreachable!("extractor only uses the vision call")
        }

        async fn complete_with_images(
            &self,
            _system: &str,
            _user_message: &str,
            images: &[ImageInput],
            _params: &GenerationParams,
        ) -> Result<LlmResponse, LlmError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            assert!(!images.is_empty());
            Ok(LlmResponse {
                text: self.response.lock().unwrap().clone(),
                usage: TokenUsage::default(),
                model: "stub-vision-model".to_string(),
            })
        }
    }

    async fn put_image_bytes(blob: &FsBlobStore, key: &str) {
        let path = blob.path_for(key);
        tokio::fs::create_dir_all(path.parent().unwrap())
            .await
            .unwrap();
        tokio::fs::write(path, b"png-bytes").await.unwrap();
    }

    async fn seed_record(blob: &FsBlobStore) -> &'static str {
        let key = "visual_captures/2026-08-01/x/tweet_1/capture_metadata.json";
        blob.put_json(
            &serde_json::json!({
                "tweet_id": "1",
                "tweet_url": "https://twitter.com/x/status/1",
                "content_type": "tweet",
                "screenshot_count": 1,
                "s3_screenshots": ["visual_captures/2026-08-01/x/tweet_1/shot_00.png"],
                "s3_bucket": "local"
            }),
            key,
        )
        .await
        .unwrap();
        put_image_bytes(blob, "visual_captures/2026-08-01/x/tweet_1/shot_00.png").await;
        key
    }

    #[tokio::test]
    async fn extraction_writes_full_text_and_summary() {
        let dir = tempfile::tempdir().unwrap();
        let blob = Arc::new(FsBlobStore::new(dir.path()));
        let key = seed_record(&blob).await;

        let llm = StubVision::new(
            r#"{"full_text": "Announcing a new LoRA training trick.", "summary": "A VRAM-saving LoRA trick."}"#,
        );
        let extractor = TextExtractor::new(blob.clone(), llm.clone());

        let outcome = extractor.extract(key).await.unwrap();
        assert_eq!(outcome, ExtractOutcome::Extracted);

        let record = blob.get_json(key).await.unwrap();
        assert_eq!(record["full_text"], "Announcing a new LoRA training trick.");
        assert_eq!(record["summary"], "A VRAM-saving LoRA trick.");
        assert!(record["extraction_timestamp"].is_string());
        // Original capture fields survive the in-place update.
        assert_eq!(record["tweet_id"], "1");
        assert_eq!(record["screenshot_count"], 1);
    }

    #[tokio::test]
    async fn already_extracted_record_is_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let blob = Arc::new(FsBlobStore::new(dir.path()));
        let key = seed_record(&blob).await;

        let llm = StubVision::new(r#"{"full_text": "first pass", "summary": "s"}"#);
        let extractor = TextExtractor::new(blob.clone(), llm.clone());

        extractor.extract(key).await.unwrap();
        let before = blob.get_bytes(key).await.unwrap();

        let outcome = extractor.extract(key).await.unwrap();
        assert_eq!(outcome, ExtractOutcome::AlreadyExtracted);
        assert_eq!(llm.calls.load(Ordering::SeqCst), 1, "no second LLM call");
        assert_eq!(blob.get_bytes(key).await.unwrap(), before, "record unchanged");
    }

    #[tokio::test]
    async fn whitespace_only_answer_is_a_failure() {
        let dir = tempfile::tempdir().unwrap();
        let blob = Arc::new(FsBlobStore::new(dir.path()));
        let key = seed_record(&blob).await;

        let llm = StubVision::new("   \n  ");
        let extractor = TextExtractor::new(blob.clone(), llm);

        let err = extractor.extract(key).await.unwrap_err();
        assert!(matches!(err, ExtractError::NoText { .. }));

        let record = blob.get_json(key).await.unwrap();
        assert!(record.get("full_text").is_none());
    }

    #[tokio::test]
    async fn empty_full_text_in_json_is_a_failure() {
        let dir = tempfile::tempdir().unwrap();
        let blob = Arc::new(FsBlobStore::new(dir.path()));
        let key = seed_record(&blob).await;

        let llm = StubVision::new(r#"{"full_text": "  ", "summary": "something"}"#);
        let extractor = TextExtractor::new(blob.clone(), llm);

        assert!(matches!(
            extractor.extract(key).await,
            Err(ExtractError::NoText { .. })
        ));
    }

    #[tokio::test]
    async fn bare_text_answer_is_accepted() {
        let dir = tempfile::tempdir().unwrap();
        let blob = Arc::new(FsBlobStore::new(dir.path()));
        let key = seed_record(&blob).await;

        let llm = StubVision::new("Just the transcribed text. Nothing else.");
        let extractor = TextExtractor::new(blob.clone(), llm);

        extractor.extract(key).await.unwrap();
        let record = blob.get_json(key).await.unwrap();
        assert_eq!(record["full_text"], "Just the transcribed text. Nothing else.");
        assert!(!record["summary"].as_str().unwrap().is_empty());
    }

    #[tokio::test]
    async fn thread_record_gathers_screenshots_across_posts() {
        let dir = tempfile::tempdir().unwrap();
        let blob = Arc::new(FsBlobStore::new(dir.path()));
        let key = "visual_captures/2026-08-01/x/convo_1/metadata.json";
        blob.put_json(
            &serde_json::json!({
                "conversation_id": "1",
                "thread_summary": {"id": "1"},
                "ordered_tweets": [
                    {"tweet_id": "1", "s3_screenshots": ["a/p1.png"]},
                    {"tweet_id": "2", "s3_screenshots": ["a/p2.png", "a/p3.png"]}
                ]
            }),
            key,
        )
        .await
        .unwrap();
        for shot in ["a/p1.png", "a/p2.png", "a/p3.png"] {
            put_image_bytes(&blob, shot).await;
        }

        let llm = StubVision::new(r#"{"full_text": "[1/2] one [2/2] two", "summary": "s"}"#);
        let extractor = TextExtractor::new(blob.clone(), llm.clone());

        extractor.extract(key).await.unwrap();
        let record = blob.get_json(key).await.unwrap();
        assert_eq!(record["full_text"], "[1/2] one [2/2] two");
    }

    #[tokio::test]
    async fn record_without_screenshots_is_malformed() {
        let dir = tempfile::tempdir().unwrap();
        let blob = Arc::new(FsBlobStore::new(dir.path()));
        let key = "r.json";
        blob.put_json(&serde_json::json!({"tweet_id": "1"}), key)
            .await
            .unwrap();

        let llm = StubVision::new("{}");
        let extractor = TextExtractor::new(blob.clone(), llm);
        assert!(matches!(
            extractor.extract(key).await,
            Err(ExtractError::MalformedRecord { .. })
        ));
    }
}
