//! The capture orchestrator.
//!
//! For one account: fetch and group recent content, drive the renderer
//! over each item, upload screenshots and the item's metadata record, and
//! hand the record's key to the classification queue. Failures are
//! isolated per item (and per post inside a thread); the account summary
//! records them and the loop moves on.

pub mod metadata;


use std::sync::Arc;

use chrono::Utc;

use crate::blob::{BlobLayout, BlobStore};
use crate::error::CaptureError;
use crate::fetcher::{post_url, ContentItem, ContentType, Post, PostSource, Thread, ThreadPost};
use crate::queue::{ClassificationQueue, ClassificationRequest};
use crate::render::{CropConfig, Renderer};

use metadata::{
    AccountCaptureSummary, CapturedThreadPost, CroppingInfo, ItemReport, ServiceConfig,
    SingleMetadata, SummaryCounts, ThreadMetadata, ThreadSummary, CAPTURE_STRATEGY, SORT_ORDER,
};

/// Capture behavior knobs the orchestrator needs beyond its collaborators.
#[derive(Debug, Clone)]
pub struct CaptureSettings {
    /// Zoom percentage, echoed into metadata records.
    pub zoom_percent: u32,
    /// Crop applied by the renderer, echoed into metadata records.
    pub crop: Option<CropConfig>,
    /// Screenshot budget for singleton captures.
    pub max_screenshots: u32,
    /// Screenshot budget per post inside a thread.
    pub thread_max_screenshots: u32,
}

impl Default for CaptureSettings {
    fn default() -> Self {
        Self {
            zoom_percent: 60,
            crop: None,
            max_screenshots: 10,
            thread_max_screenshots: 6,
        }
    }
}

/// Drives fetch → render → store for one account at a time.
pub struct CaptureOrchestrator {
    source: Arc<dyn PostSource>,
    renderer: Arc<dyn Renderer>,
    blob: Arc<dyn BlobStore>,
    queue: Option<Arc<dyn ClassificationQueue>>,
    layout: BlobLayout,
    bucket: String,
    settings: CaptureSettings,
}

impl CaptureOrchestrator {
    /// Wire an orchestrator from its collaborators.
    ///
    /// `queue` is optional: capture-only runs skip classification hand-off.
    pub fn new(
        source: Arc<dyn PostSource>,
        renderer: Arc<dyn Renderer>,
        blob: Arc<dyn BlobStore>,
        queue: Option<Arc<dyn ClassificationQueue>>,
        layout: BlobLayout,
        bucket: String,
        settings: CaptureSettings,
    ) -> Self {
        Self {
            source,
            renderer,
            blob,
            queue,
            layout,
            bucket,
            settings,
        }
    }

    /// Capture all recent content for one account.
    ///
    /// Captures within the account are strictly sequential: the browser is
    /// the scarce resource and each capture owns its session exclusively.
    pub async fn capture_account(
        &self,
        handle: &str,
        days_back: u32,
        max_items: u32,
    ) -> Result<AccountCaptureSummary, CaptureError> {
        tracing::info!(handle, days_back, max_items, "starting account capture");

        let items = self.source.group_threads(handle, days_back, max_items).await?;

        let (threads, singles): (Vec<ContentItem>, Vec<ContentItem>) =
            items.into_iter().partition(ContentItem::is_thread);
        tracing::info!(
            handle,
            threads = threads.len(),
            singles = singles.len(),
            "grouped content"
        );

        if threads.is_empty() && singles.is_empty() {
            return Ok(self.build_summary(handle, Vec::new()));
        }

        let workspace = tempfile::Builder::new()
            .prefix(&format!("snapfeed_{}_", handle.to_lowercase()))
            .tempdir()
            .map_err(|source| CaptureError::Workspace { source })?;

        let mut reports = Vec::new();
        for item in &threads {
            let ContentItem::Thread(thread) = item else {
                continue;
            };
            reports.push(self.capture_thread(handle, thread, workspace.path()).await);
        }
        for item in &singles {
            let ContentItem::Single(post) = item else {
                continue;
            };
            reports.push(
                self.capture_single(handle, post, item.content_type(), workspace.path())
                    .await,
            );
        }

        let summary = self.build_summary(handle, reports);
        let summary_key = self.layout.summary_key(handle);
        match serde_json::to_value(&summary) {
            Ok(value) => {
                if let Err(e) = self.blob.put_json(&value, &summary_key).await {
                    tracing::warn!(handle, error = %e, "failed to upload capture summary");
                }
            }
            Err(e) => tracing::warn!(handle, error = %e, "failed to serialize capture summary"),
        }

        tracing::info!(
            handle,
            captured = summary.summary.total_items_captured,
            found = summary.summary.total_items_found,
            "account capture complete"
        );
        Ok(summary)
    }

    async fn capture_thread(
        &self,
        handle: &str,
        thread: &Thread,
        workspace: &std::path::Path,
    ) -> ItemReport {
        let item_prefix = self
            .layout
            .item_prefix(handle, ContentType::Convo, &thread.id);
        tracing::info!(
            conversation_id = %thread.conversation_id,
            posts = thread.thread_tweet_count,
            "capturing thread"
        );

        // Capture order is ascending post ID, which for these all-digit IDs
        // is length-then-lexicographic. Display order stays chronological in
        // the thread summary.
        let mut sorted: Vec<ThreadPost> = thread.thread_tweets.clone();
        sorted.sort_by(|a, b| (a.id.len(), &a.id).cmp(&(b.id.len(), &b.id)));

        let mut captured: Vec<CapturedThreadPost> = Vec::new();
        for (index, post) in sorted.iter().enumerate() {
            let url = post_url(&thread.author.username, &post.id);
            match self
                .renderer
                .capture(
                    &url,
                    &post.id,
                    workspace,
                    self.settings.thread_max_screenshots,
                )
                .await
            {
                Ok(capture) => {
                    let folder = BlobLayout::thread_post_prefix(&item_prefix, &post.id);
                    let uploaded = self.upload_screenshots(&capture.screenshots, &folder).await;
                    captured.push(CapturedThreadPost {
                        tweet_id: post.id.clone(),
                        tweet_url: url,
                        tweet_metadata: post.clone(),
                        id_order: index + 1,
                        screenshot_count: uploaded.len(),
                        s3_screenshots: uploaded,
                        s3_folder: self.s3_uri(&folder),
                        capture_timestamp: capture.timestamp,
                    });
                }
                Err(e) => {
                    tracing::warn!(
                        post_id = %post.id,
                        error = %e,
                        "thread post capture failed, continuing with remaining posts"
                    );
                }
            }
        }

        if captured.is_empty() {
            return self.failed_report(
                "thread",
                ContentType::Convo,
                &thread.id,
                &item_prefix,
                "no posts in the thread could be captured",
            );
        }

        let record = ThreadMetadata {
            conversation_id: thread.conversation_id.clone(),
            capture_timestamp: Utc::now(),
            thread_summary: ThreadSummary::from(thread),
            total_tweets_in_thread: sorted.len(),
            successfully_captured: captured.len(),
            ordered_tweets: captured,
            s3_bucket: self.bucket.clone(),
            s3_folder_prefix: item_prefix.clone(),
            browser_zoom: self.zoom_label(),
            cropping: CroppingInfo::from_crop(self.settings.crop.as_ref()),
            capture_strategy: CAPTURE_STRATEGY.to_string(),
            sort_order: SORT_ORDER.to_string(),
        };

        let metadata_key = format!("{item_prefix}metadata.json");
        let captured_count = record.successfully_captured;
        let total = record.total_tweets_in_thread;
        if let Err(e) = self.write_record(&record, &metadata_key).await {
            return self.failed_report("thread", ContentType::Convo, &thread.id, &item_prefix, &e);
        }

        ItemReport {
            kind: "thread".to_string(),
            content_type: ContentType::Convo,
            primary_id: thread.id.clone(),
            success: true,
            screenshot_count: None,
            total_tweets: Some(total),
            captured_tweets: Some(captured_count),
            s3_location: self.s3_uri(&item_prefix),
            metadata_s3_location: Some(self.s3_uri(&metadata_key)),
            error: None,
        }
    }

    async fn capture_single(
        &self,
        handle: &str,
        post: &Post,
        content_type: ContentType,
        workspace: &std::path::Path,
    ) -> ItemReport {
        let item_prefix = self.layout.item_prefix(handle, content_type, &post.id);
        tracing::info!(post_id = %post.id, %content_type, "capturing post");

        let capture = match self
            .renderer
            .capture(&post.url, &post.id, workspace, self.settings.max_screenshots)
            .await
        {
            Ok(capture) => capture,
            Err(e) => {
                tracing::warn!(post_id = %post.id, error = %e, "post capture failed");
                return self.failed_report(
                    "individual_tweet",
                    content_type,
                    &post.id,
                    &item_prefix,
                    &e.to_string(),
                );
            }
        };

        let uploaded = self
            .upload_screenshots(&capture.screenshots, &item_prefix)
            .await;
        if uploaded.is_empty() {
            return self.failed_report(
                "individual_tweet",
                content_type,
                &post.id,
                &item_prefix,
                "no screenshots could be uploaded",
            );
        }

        let record = SingleMetadata {
            tweet_id: post.id.clone(),
            tweet_url: post.url.clone(),
            content_type,
            capture_timestamp: capture.timestamp,
            screenshot_count: uploaded.len(),
            s3_screenshots: uploaded,
            s3_bucket: self.bucket.clone(),
            s3_folder_prefix: item_prefix.clone(),
            browser_zoom: self.zoom_label(),
            cropping: CroppingInfo::from_crop(self.settings.crop.as_ref()),
            tweet_metadata: post.clone(),
        };

        let metadata_key = format!("{item_prefix}capture_metadata.json");
        let screenshot_count = record.screenshot_count;
        if let Err(e) = self.write_record(&record, &metadata_key).await {
            return self.failed_report(
                "individual_tweet",
                content_type,
                &post.id,
                &item_prefix,
                &e,
            );
        }

        ItemReport {
            kind: "individual_tweet".to_string(),
            content_type,
            primary_id: post.id.clone(),
            success: true,
            screenshot_count: Some(screenshot_count),
            total_tweets: None,
            captured_tweets: None,
            s3_location: self.s3_uri(&item_prefix),
            metadata_s3_location: Some(self.s3_uri(&metadata_key)),
            error: None,
        }
    }

    /// Upload screenshots one by one; a failed upload is logged and
    /// skipped so the metadata lists only keys that exist.
    async fn upload_screenshots(
        &self,
        screenshots: &[std::path::PathBuf],
        folder: &str,
    ) -> Vec<String> {
        let mut uploaded = Vec::new();
        for path in screenshots {
            let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
                tracing::warn!(path = %path.display(), "screenshot has no usable file name");
                continue;
            };
            let key = format!("{folder}{name}");
            match self.blob.put_image(path, &key).await {
                Ok(()) => uploaded.push(key),
                Err(e) => {
                    tracing::warn!(key, error = %e, "screenshot upload failed, skipping file");
                }
            }
        }
        uploaded
    }

    async fn write_record<T: serde::Serialize>(
        &self,
        record: &T,
        metadata_key: &str,
    ) -> Result<(), String> {
        let value = serde_json::to_value(record).map_err(|e| e.to_string())?;
        self.blob
            .put_json(&value, metadata_key)
            .await
            .map_err(|e| e.to_string())?;

        if let Some(queue) = &self.queue {
            let request = ClassificationRequest::new(metadata_key);
            match request.to_body() {
                Ok(body) => {
                    if let Err(e) = queue.send(&body).await {
                        tracing::warn!(metadata_key, error = %e, "failed to enqueue classification request");
                    }
                }
                Err(e) => {
                    tracing::warn!(metadata_key, error = %e, "failed to serialize classification request");
                }
            }
        }
        Ok(())
    }

    fn failed_report(
        &self,
        kind: &str,
        content_type: ContentType,
        primary_id: &str,
        item_prefix: &str,
        error: &str,
    ) -> ItemReport {
        ItemReport {
            kind: kind.to_string(),
            content_type,
            primary_id: primary_id.to_string(),
            success: false,
            screenshot_count: None,
            total_tweets: None,
            captured_tweets: None,
            s3_location: self.s3_uri(item_prefix),
            metadata_s3_location: None,
            error: Some(error.to_string()),
        }
    }

    fn build_summary(&self, handle: &str, reports: Vec<ItemReport>) -> AccountCaptureSummary {
        let threads_found = reports.iter().filter(|r| r.kind == "thread").count();
        let threads_captured = reports
            .iter()
            .filter(|r| r.kind == "thread" && r.success)
            .count();
        let singles_found = reports.len() - threads_found;
        let singles_captured = reports
            .iter()
            .filter(|r| r.kind == "individual_tweet" && r.success)
            .count();
        let found = reports.len();
        let captured = threads_captured + singles_captured;

        AccountCaptureSummary {
            account: handle.to_string(),
            capture_timestamp: Utc::now(),
            service_config: ServiceConfig {
                zoom_percent: self.settings.zoom_percent,
                s3_bucket: self.bucket.clone(),
            },
            summary: SummaryCounts {
                total_items_found: found,
                total_items_captured: captured,
                threads_found,
                threads_captured,
                individual_tweets_found: singles_found,
                individual_tweets_captured: singles_captured,
                success_rate: if found == 0 {
                    0.0
                } else {
                    captured as f64 / found as f64
                },
            },
            captured_content: reports,
        }
    }

    fn zoom_label(&self) -> String {
        format!("{}_percent", self.settings.zoom_percent)
    }

    fn s3_uri(&self, key: &str) -> String {
        format!("s3://{}/{key}", self.bucket)
    }
}
