//! Blob storage for screenshots and metadata records.
//!
//! A flat key namespace with a deterministic, content-typed layout:
//!
//! ```text
//! visual_captures/<date>/<handle>/convo_<primary_id>/tweet_<post_id>/<files>
//! visual_captures/<date>/<handle>/tweet_<post_id>/<files>
//! visual_captures/<date>/<handle>/retweet_<post_id>/<files>
//! visual_captures/<date>/<handle>/capture_summary.json
//! ```
//!
//! Handles are lowercased in keys; re-running a capture for the same
//! account and day overwrites the prior objects for the same IDs. Writes
//! are idempotent by key and the store never performs read-modify-write.

mod fs;
mod s3;

pub use fs::FsBlobStore;
pub use s3::S3BlobStore;

use std::path::Path;

use chrono::NaiveDate;

use crate::error::BlobError;
use crate::fetcher::ContentType;

/// Root prefix for all capture artifacts.
const CAPTURE_ROOT: &str = "visual_captures";

/// Capability set every blob backend provides.
///
/// `put_*` overwrite on re-upload of the same key. The read side exists
/// for the extractor and the classification worker, which load metadata
/// records and screenshots back out of the store.
#[async_trait::async_trait]
pub trait BlobStore: Send + Sync {
    /// Upload a local file under `key`.
    async fn put_image(&self, local_path: &Path, key: &str) -> Result<(), BlobError>;

    /// Serialize `value` as pretty JSON (2-space indent, stable key order)
    /// and upload it under `key`.
    async fn put_json(&self, value: &serde_json::Value, key: &str) -> Result<(), BlobError>;

    /// Download the raw bytes stored under `key`.
    async fn get_bytes(&self, key: &str) -> Result<Vec<u8>, BlobError>;

    /// Download and parse the JSON document stored under `key`.
    async fn get_json(&self, key: &str) -> Result<serde_json::Value, BlobError> {
        let bytes = self.get_bytes(key).await?;
        serde_json::from_slice(&bytes).map_err(|source| BlobError::Json {
            key: key.to_string(),
            source,
        })
    }
}

/// Key builder for one run day.
#[derive(Debug, Clone)]
pub struct BlobLayout {
    date_folder: String,
}

impl BlobLayout {
    /// Layout for today's date folder.
    pub fn for_today() -> Self {
        Self::for_date(chrono::Utc::now().date_naive())
    }

    /// Layout for an explicit date (tests and backfills).
    pub fn for_date(date: NaiveDate) -> Self {
        Self {
            date_folder: date.format("%Y-%m-%d").to_string(),
        }
    }

    /// The date folder name (`YYYY-MM-DD`).
    pub fn date_folder(&self) -> &str {
        &self.date_folder
    }

    /// `visual_captures/<date>/<handle>/` for a lowercased handle.
    pub fn account_prefix(&self, handle: &str) -> String {
        format!(
            "{CAPTURE_ROOT}/{}/{}/",
            self.date_folder,
            handle.to_lowercase()
        )
    }

    /// Folder for one capture item, prefixed by its content type.
    pub fn item_prefix(&self, handle: &str, content_type: ContentType, primary_id: &str) -> String {
        format!(
            "{}{}_{primary_id}/",
            self.account_prefix(handle),
            content_type.as_str()
        )
    }

    /// Per-post sub-folder inside a thread's `convo_` folder.
    pub fn thread_post_prefix(item_prefix: &str, post_id: &str) -> String {
        format!("{item_prefix}tweet_{post_id}/")
    }

    /// The account's per-run summary document.
    pub fn summary_key(&self, handle: &str) -> String {
        format!("{}capture_summary.json", self.account_prefix(handle))
    }
}

/// Render a JSON value the way every backend stores it.
pub(crate) fn to_stored_json(value: &serde_json::Value, key: &str) -> Result<String, BlobError> {
    serde_json::to_string_pretty(value).map_err(|source| BlobError::Json {
        key: key.to_string(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn layout() -> BlobLayout {
        BlobLayout::for_date(NaiveDate::from_ymd_opt(2026, 8, 1).unwrap())
    }

    #[test]
    fn account_prefix_lowercases_handle() {
        assert_eq!(
            layout().account_prefix("AndrewYNg"),
            "visual_captures/2026-08-01/andrewyng/"
        );
    }

    #[test]
    fn item_prefixes_carry_content_type() {
        let l = layout();
        assert_eq!(
            l.item_prefix("karpathy", ContentType::Convo, "1000000000000000001"),
            "visual_captures/2026-08-01/karpathy/convo_1000000000000000001/"
        );
        assert_eq!(
            l.item_prefix("karpathy", ContentType::Tweet, "42"),
            "visual_captures/2026-08-01/karpathy/tweet_42/"
        );
        assert_eq!(
            l.item_prefix("karpathy", ContentType::Retweet, "43"),
            "visual_captures/2026-08-01/karpathy/retweet_43/"
        );
    }

    #[test]
    fn thread_post_prefix_nests_under_item() {
        let l = layout();
        let item = l.item_prefix("karpathy", ContentType::Convo, "100");
        assert_eq!(
            BlobLayout::thread_post_prefix(&item, "101"),
            "visual_captures/2026-08-01/karpathy/convo_100/tweet_101/"
        );
    }

    #[test]
    fn summary_key_sits_beside_items() {
        assert_eq!(
            layout().summary_key("Karpathy"),
            "visual_captures/2026-08-01/karpathy/capture_summary.json"
        );
    }

    #[test]
    fn stored_json_is_pretty_with_two_space_indent() {
        let value = serde_json::json!({"b": 1, "a": {"nested": true}});
        let stored = to_stored_json(&value, "k").unwrap();
        assert!(stored.contains("\n  \"a\""));
        // Keys serialize in stable (sorted) order.
        assert!(stored.find("\"a\"").unwrap() < stored.find("\"b\"").unwrap());
    }
}
