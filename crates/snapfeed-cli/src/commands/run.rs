//! The `run` subcommand: the end-to-end pipeline driver.
//!
//! Captures every requested account (bounded fan-out, accounts are
//! independent), runs text extraction over the captured metadata records,
//! drains the classification queue in-process when running locally, and
//! writes a run manifest to the output directory. The run exits non-zero
//! only when no account could be processed at all.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context as _;
use chrono::Utc;
use snapfeed_core::blob::BlobLayout;
use snapfeed_core::capture::metadata::AccountCaptureSummary;
use snapfeed_core::capture::{CaptureOrchestrator, CaptureSettings};
use snapfeed_core::classify::Classifier;
use snapfeed_core::config::Config;
use snapfeed_core::extract::TextExtractor;
use snapfeed_core::fetcher::{PostFetcher, PostSource};
use snapfeed_core::render::CropConfig;
use snapfeed_core::worker::{ClassificationWorker, WorkerConfig};

use super::wiring;

/// Arguments for `snapfeed run`.
#[derive(clap::Args)]
pub struct RunArgs {
    /// Handles to process (without @)
    #[arg(long, num_args = 1.., required = true)]
    pub accounts: Vec<String>,

    /// Trailing window of days to fetch
    #[arg(long, default_value_t = 7)]
    pub days: u32,

    /// Maximum posts per account
    #[arg(long, default_value_t = 20)]
    pub max: u32,

    /// Output directory for local artifacts
    #[arg(long, default_value = "run_artifacts")]
    pub output: String,

    /// Use hosted queue/store/bucket when configured
    #[arg(long)]
    pub aws: bool,
}

pub async fn execute(args: RunArgs, mut config: Config) -> anyhow::Result<()> {
    let started = Utc::now();
    config.pipeline.accounts = args.accounts.clone();
    config.pipeline.days_back = args.days;
    config.pipeline.max_items = args.max;
    config.validate().context("invalid run parameters")?;

    std::fs::create_dir_all(&args.output)
        .with_context(|| format!("cannot create output directory {}", args.output))?;

    // Collaborators, wired once at startup.
    let client = wiring::x_api_client(&config)?;
    let fetcher: Arc<dyn PostSource> = Arc::new(PostFetcher::new(client));
    let renderer = wiring::renderer(&config)?;
    let blob = wiring::blob(&config, args.aws, &args.output).await;
    let queue = wiring::queue(&config, args.aws).await;
    let stores = wiring::record_store(&config, args.aws).await;
    let classifier = wiring::classifier(&config)?;
    let extractor = Arc::new(TextExtractor::new(
        blob.store.clone(),
        wiring::vision_provider(&config)?,
    ));

    let settings = CaptureSettings {
        zoom_percent: config.capture.zoom_percent,
        crop: CropConfig::from_settings(&config.capture.crop)?,
        max_screenshots: config.capture.max_screenshots,
        thread_max_screenshots: config.capture.thread_max_screenshots,
    };
    let orchestrator = Arc::new(CaptureOrchestrator::new(
        fetcher,
        renderer,
        blob.store.clone(),
        Some(queue.queue.clone()),
        BlobLayout::for_today(),
        blob.bucket.clone(),
        settings,
    ));

    // Per-account fan-out. Accounts are independent; concurrency is
    // bounded because each in-flight account holds a browser.
    let semaphore = Arc::new(tokio::sync::Semaphore::new(
        config.pipeline.account_concurrency.max(1),
    ));
    let mut tasks = tokio::task::JoinSet::new();
    for handle in config.pipeline.accounts.clone() {
        let orchestrator = orchestrator.clone();
        let extractor = extractor.clone();
        let semaphore = semaphore.clone();
        let days = config.pipeline.days_back;
        let max = config.pipeline.max_items;
        tasks.spawn(async move {
            let _permit = semaphore.acquire_owned().await.expect("semaphore never closes");

            let summary = match orchestrator.capture_account(&handle, days, max).await {
                Ok(summary) => summary,
                Err(e) => {
                    tracing::error!(handle = %handle, error = %e, "account capture failed");
                    return (handle, None);
                }
            };

            // Enrich each captured record with extracted text before the
            // classifier reads it.
            for report in &summary.captured_content {
                let Some(location) = &report.metadata_s3_location else {
                    continue;
                };
                let key = blob_key(location);
                if let Err(e) = extractor.extract(key).await {
                    tracing::warn!(handle = %handle, key, error = %e, "text extraction failed");
                }
            }

            (handle, Some(summary))
        });
    }

    let mut results: Vec<(String, Option<AccountCaptureSummary>)> = Vec::new();
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok(result) => results.push(result),
            Err(e) => tracing::error!(error = %e, "account task panicked"),
        }
    }

    // Local runs drain the queue in-process; hosted runs leave it to the
    // worker service.
    if let Some(local_queue) = &queue.local {
        let worker = ClassificationWorker::new(
            queue.queue.clone(),
            blob.store.clone(),
            classifier.clone() as Arc<dyn Classifier>,
            stores.store.clone(),
            WorkerConfig {
                batch_size: config.pipeline.worker_batch_size,
                idle_sleep: Duration::from_secs(config.pipeline.worker_idle_secs),
            },
        );

        tracing::info!("draining local classification queue");
        loop {
            let stored = worker.process_once().await?;
            if stored > 0 {
                continue;
            }
            if local_queue.is_empty().await {
                break;
            }
            tracing::warn!(
                remaining = local_queue.len().await,
                "unprocessable messages remain in the local queue"
            );
            break;
        }
    }

    let finished = Utc::now();
    let processed = results.iter().filter(|(_, s)| s.is_some()).count();

    let mut manifest = serde_json::json!({
        "started_at": started.to_rfc3339(),
        "finished_at": finished.to_rfc3339(),
        "duration_seconds": (finished - started).num_seconds(),
        "mode": if args.aws { "aws" } else { "local" },
        "accounts_requested": config.pipeline.accounts.len(),
        "accounts_processed": processed,
        "accounts": results
            .iter()
            .map(|(handle, summary)| {
                serde_json::json!({
                    "account": handle,
                    "processed": summary.is_some(),
                    "summary": summary,
                })
            })
            .collect::<Vec<_>>(),
    });

    if let Some(store) = &stores.local {
        let records = store.snapshot().await;
        manifest["classified_count"] = serde_json::json!(records.len());
        let classified_path = std::path::Path::new(&args.output).join("classified.json");
        std::fs::write(&classified_path, serde_json::to_string_pretty(&records)?)
            .with_context(|| format!("cannot write {}", classified_path.display()))?;
        tracing::info!(path = %classified_path.display(), count = records.len(), "classified records written");
    }

    let manifest_path = std::path::Path::new(&args.output).join("run_manifest.json");
    std::fs::write(&manifest_path, serde_json::to_string_pretty(&manifest)?)
        .with_context(|| format!("cannot write {}", manifest_path.display()))?;
    tracing::info!(path = %manifest_path.display(), "run manifest written");

    anyhow::ensure!(processed > 0, "no accounts could be processed");
    Ok(())
}

/// Item reports carry `s3://bucket/key` URIs; the blob store wants keys.
fn blob_key(location: &str) -> &str {
    match location.strip_prefix("s3://") {
        Some(rest) => rest.split_once('/').map_or(rest, |(_, key)| key),
        None => location,
    }
}
