//! The `capture` subcommand: capture without classification.
//!
//! Captures one account's recent content, or a single post/thread by ID
//! or URL, and writes screenshots plus metadata records. No classification
//! queue is attached.

use std::sync::Arc;

use anyhow::Context as _;
use snapfeed_core::blob::BlobLayout;
use snapfeed_core::capture::{CaptureOrchestrator, CaptureSettings};
use snapfeed_core::config::Config;
use snapfeed_core::error::XApiError;
use snapfeed_core::fetcher::{ContentItem, PostFetcher, PostSource};
use snapfeed_core::render::CropConfig;

use super::wiring;

/// Arguments for `snapfeed capture`.
#[derive(clap::Args)]
pub struct CaptureArgs {
    /// Handle to capture (without @)
    #[arg(long, required_unless_present = "post", conflicts_with = "post")]
    pub account: Option<String>,

    /// A single post ID or URL; the whole thread is captured when the
    /// post belongs to one
    #[arg(long)]
    pub post: Option<String>,

    /// Trailing window of days to fetch
    #[arg(long, default_value_t = 7)]
    pub days: u32,

    /// Maximum posts to fetch
    #[arg(long, default_value_t = 20)]
    pub max: u32,

    /// Output directory for local artifacts
    #[arg(long, default_value = "run_artifacts")]
    pub output: String,

    /// Use the hosted bucket when configured
    #[arg(long)]
    pub aws: bool,
}

/// Source that yields one pre-fetched item, for single-post captures.
struct FixedSource {
    item: ContentItem,
}

#[async_trait::async_trait]
impl PostSource for FixedSource {
    async fn group_threads(
        &self,
        _handle: &str,
        _days_back: u32,
        _max_items: u32,
    ) -> Result<Vec<ContentItem>, XApiError> {
        Ok(vec![self.item.clone()])
    }
}

pub async fn execute(args: CaptureArgs, config: Config) -> anyhow::Result<()> {
    std::fs::create_dir_all(&args.output)
        .with_context(|| format!("cannot create output directory {}", args.output))?;

    let client = wiring::x_api_client(&config)?;
    let fetcher = PostFetcher::new(client);
    let renderer = wiring::renderer(&config)?;
    let blob = wiring::blob(&config, args.aws, &args.output).await;

    let settings = CaptureSettings {
        zoom_percent: config.capture.zoom_percent,
        crop: CropConfig::from_settings(&config.capture.crop)?,
        max_screenshots: config.capture.max_screenshots,
        thread_max_screenshots: config.capture.thread_max_screenshots,
    };

    let (source, handle): (Arc<dyn PostSource>, String) = match (&args.account, &args.post) {
        (Some(account), None) => (Arc::new(fetcher), account.clone()),
        (None, Some(post)) => {
            let id = snapfeed_core::fetcher::extract_post_id(post)
                .with_context(|| format!("'{post}' is not a post ID or URL"))?;
            let item = fetcher
                .fetch_thread_by_id(&id)
                .await
                .context("post lookup failed")?
                .with_context(|| format!("post {id} not found"))?;
            let handle = item.author().username.clone();
            (Arc::new(FixedSource { item }), handle)
        }
        _ => anyhow::bail!("exactly one of --account or --post is required"),
    };

    let orchestrator = CaptureOrchestrator::new(
        source,
        renderer,
        blob.store,
        None,
        BlobLayout::for_today(),
        blob.bucket,
        settings,
    );

    let summary = orchestrator
        .capture_account(&handle, args.days, args.max)
        .await
        .context("capture failed")?;

    println!("{}", serde_json::to_string_pretty(&summary)?);
    anyhow::ensure!(
        summary.captured() > 0 || summary.summary.total_items_found == 0,
        "all items failed to capture"
    );
    Ok(())
}
