//! Metadata record shapes persisted alongside screenshots.
//!
//! The metadata record is the single source of truth for a capture item:
//! the text extractor and the classification worker read and update it in
//! place (append-only key additions). Thread records carry an
//! `ordered_tweets` array with per-post capture info instead of a
//! duplicated `thread_tweets` array.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::fetcher::{AuthorRef, ContentType, EngagementMetrics, Post, Thread, ThreadPost};
use crate::render::CropConfig;

/// How a thread's posts were captured.
pub const CAPTURE_STRATEGY: &str = "individual_tweet_capture";

/// Order of `ordered_tweets` within a thread record.
pub const SORT_ORDER: &str = "by_tweet_id_increasing";

/// Crop section of a metadata record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CroppingInfo {
    /// Whether cropping was applied.
    pub enabled: bool,
    /// Crop rectangle; absent when disabled.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub coordinates: Option<CropCoordinates>,
}

/// Percent crop rectangle as stored in metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CropCoordinates {
    /// Left boundary percent.
    pub x1_percent: u32,
    /// Top boundary percent.
    pub y1_percent: u32,
    /// Right boundary percent.
    pub x2_percent: u32,
    /// Bottom boundary percent.
    pub y2_percent: u32,
}

impl CroppingInfo {
    /// Record form of an optional crop config.
    pub fn from_crop(crop: Option<&CropConfig>) -> Self {
        match crop {
            Some(c) => Self {
                enabled: true,
                coordinates: Some(CropCoordinates {
                    x1_percent: c.x1(),
                    y1_percent: c.y1(),
                    x2_percent: c.x2(),
                    y2_percent: c.y2(),
                }),
            },
            None => Self {
                enabled: false,
                coordinates: None,
            },
        }
    }
}

/// `capture_metadata.json` for a singleton post or retweet.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SingleMetadata {
    /// The post ID.
    pub tweet_id: String,
    /// Canonical post URL.
    pub tweet_url: String,
    /// `tweet` or `retweet`.
    pub content_type: ContentType,
    /// When the capture finished.
    pub capture_timestamp: DateTime<Utc>,
    /// Number of uploaded screenshots.
    pub screenshot_count: usize,
    /// Uploaded screenshot keys, top of page first.
    pub s3_screenshots: Vec<String>,
    /// Bucket the artifacts live in.
    pub s3_bucket: String,
    /// The item's folder prefix.
    pub s3_folder_prefix: String,
    /// Zoom applied during capture, e.g. `60_percent`.
    pub browser_zoom: String,
    /// Crop settings applied during capture.
    pub cropping: CroppingInfo,
    /// The post itself.
    pub tweet_metadata: Post,
}

/// One captured post inside a thread record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CapturedThreadPost {
    /// The post ID.
    pub tweet_id: String,
    /// Canonical post URL.
    pub tweet_url: String,
    /// The post's fields as fetched.
    pub tweet_metadata: ThreadPost,
    /// 1-based position in ascending-ID capture order (distinct from the
    /// thread's chronological display order).
    pub id_order: usize,
    /// Number of uploaded screenshots for this post.
    pub screenshot_count: usize,
    /// Uploaded screenshot keys for this post.
    pub s3_screenshots: Vec<String>,
    /// The post's sub-folder location.
    pub s3_folder: String,
    /// When this post's capture finished.
    pub capture_timestamp: DateTime<Utc>,
}

/// Thread fields carried in the record, minus the per-post array.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThreadSummary {
    /// Primary (earliest) post ID.
    pub id: String,
    /// URL of the primary post.
    pub url: String,
    /// Combined `[i/N]`-prefixed text.
    pub text: String,
    /// The thread's author.
    pub author: AuthorRef,
    /// Creation time of the earliest post.
    pub created_at: DateTime<Utc>,
    /// Shared conversation ID.
    pub conversation_id: String,
    /// Always true.
    pub is_thread: bool,
    /// Number of posts the thread had when fetched.
    pub total_tweets_in_thread: usize,
    /// Aggregate engagement across the thread.
    pub metrics: EngagementMetrics,
}

impl From<&Thread> for ThreadSummary {
    fn from(thread: &Thread) -> Self {
        Self {
            id: thread.id.clone(),
            url: thread.url.clone(),
            text: thread.text.clone(),
            author: thread.author.clone(),
            created_at: thread.created_at,
            conversation_id: thread.conversation_id.clone(),
            is_thread: thread.is_thread,
            total_tweets_in_thread: thread.thread_tweet_count,
            metrics: thread.metrics,
        }
    }
}

/// `metadata.json` covering a whole thread.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThreadMetadata {
    /// Shared conversation ID.
    pub conversation_id: String,
    /// When the thread capture finished.
    pub capture_timestamp: DateTime<Utc>,
    /// Thread fields without the duplicated per-post array.
    pub thread_summary: ThreadSummary,
    /// Number of posts the thread had when fetched.
    pub total_tweets_in_thread: usize,
    /// How many posts were actually captured.
    pub successfully_captured: usize,
    /// Per-post capture entries in ascending-ID order.
    pub ordered_tweets: Vec<CapturedThreadPost>,
    /// Bucket the artifacts live in.
    pub s3_bucket: String,
    /// The thread's folder prefix.
    pub s3_folder_prefix: String,
    /// Zoom applied during capture.
    pub browser_zoom: String,
    /// Crop settings applied during capture.
    pub cropping: CroppingInfo,
    /// Always [`CAPTURE_STRATEGY`].
    pub capture_strategy: String,
    /// Always [`SORT_ORDER`].
    pub sort_order: String,
}

/// Per-item entry in the account's `capture_summary.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItemReport {
    /// `thread` or `individual_tweet`.
    #[serde(rename = "type")]
    pub kind: String,
    /// Folder content type.
    pub content_type: ContentType,
    /// Primary post ID of the item.
    pub primary_id: String,
    /// Whether the item produced a metadata record.
    pub success: bool,
    /// Screenshots uploaded (singletons).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub screenshot_count: Option<usize>,
    /// Posts in the thread (threads).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_tweets: Option<usize>,
    /// Posts captured (threads).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub captured_tweets: Option<usize>,
    /// `s3://` location of the item's folder.
    pub s3_location: String,
    /// `s3://` location of the metadata record.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata_s3_location: Option<String>,
    /// Failure description for unsuccessful items.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Aggregate counters of the account's `capture_summary.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SummaryCounts {
    /// Items the fetcher returned.
    pub total_items_found: usize,
    /// Items that produced a metadata record.
    pub total_items_captured: usize,
    /// Threads found.
    pub threads_found: usize,
    /// Threads captured.
    pub threads_captured: usize,
    /// Singletons/retweets found.
    pub individual_tweets_found: usize,
    /// Singletons/retweets captured.
    pub individual_tweets_captured: usize,
    /// Captured over found (0.0 when nothing was found).
    pub success_rate: f64,
}

/// Capture settings echoed into the summary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Zoom percentage used.
    pub zoom_percent: u32,
    /// Bucket written to.
    pub s3_bucket: String,
}

/// `capture_summary.json` for one account invocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountCaptureSummary {
    /// The handle (as given).
    pub account: String,
    /// When the invocation finished.
    pub capture_timestamp: DateTime<Utc>,
    /// Capture settings used.
    pub service_config: ServiceConfig,
    /// Aggregate counters.
    pub summary: SummaryCounts,
    /// Per-item reports, failures included.
    pub captured_content: Vec<ItemReport>,
}

impl AccountCaptureSummary {
    /// Number of items that produced a metadata record.
    pub fn captured(&self) -> usize {
        self.summary.total_items_captured
    }
}
