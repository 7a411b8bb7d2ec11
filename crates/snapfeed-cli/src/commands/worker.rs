//! The `worker` subcommand: the long-lived classification worker.
//!
//! Polls the classification queue, classifies referenced metadata
//! records, and upserts the results into the record store. Runs until
//! ctrl-c, at which point the in-flight batch is drained and the process
//! exits cleanly. Multiple instances may run side by side; they
//! coordinate only through the queue and the store.

use std::sync::Arc;

use snapfeed_core::classify::Classifier;
use snapfeed_core::config::Config;
use snapfeed_core::worker::{ClassificationWorker, WorkerConfig};
use tokio_util::sync::CancellationToken;

use super::wiring;

/// Arguments for `snapfeed worker`.
#[derive(clap::Args)]
pub struct WorkerArgs {
    /// Use hosted queue/store/bucket when configured
    #[arg(long)]
    pub aws: bool,

    /// Output directory backing the local blob store (local runs)
    #[arg(long, default_value = "run_artifacts")]
    pub output: String,
}

pub async fn execute(args: WorkerArgs, config: Config) -> anyhow::Result<()> {
    let blob = wiring::blob(&config, args.aws, &args.output).await;
    let queue = wiring::queue(&config, args.aws).await;
    let stores = wiring::record_store(&config, args.aws).await;
    let classifier = wiring::classifier(&config)?;

    let worker = ClassificationWorker::new(
        queue.queue,
        blob.store,
        classifier as Arc<dyn Classifier>,
        stores.store,
        WorkerConfig {
            batch_size: config.pipeline.worker_batch_size,
            idle_sleep: std::time::Duration::from_secs(config.pipeline.worker_idle_secs),
        },
    );

    let cancel = CancellationToken::new();
    let signal_cancel = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("shutdown signal received, draining in-flight work");
            signal_cancel.cancel();
        }
    });

    worker.run(cancel).await;
    Ok(())
}
