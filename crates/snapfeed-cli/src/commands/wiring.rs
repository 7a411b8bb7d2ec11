//! Shared collaborator wiring.
//!
//! Hosted backends (S3, SQS, DynamoDB) are selected only when `--aws` is
//! given and the corresponding value is configured; everything else falls
//! back to the filesystem blob store and the in-memory queue/store so a
//! local run needs no cloud credentials.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context as _;
use snapfeed_core::blob::{BlobStore, FsBlobStore, S3BlobStore};
use snapfeed_core::classify::HierarchicalClassifier;
use snapfeed_core::config::Config;
use snapfeed_core::llm::anthropic::AnthropicProvider;
use snapfeed_core::queue::{ClassificationQueue, InMemoryQueue, SqsQueue};
use snapfeed_core::render::{BrowserRenderer, Renderer, RendererConfig, WebDriverSessionFactory};
use snapfeed_core::store::{DynamoStore, InMemoryStore, RecordStore};
use snapfeed_core::taxonomy::TaxonomyRegistry;
use snapfeed_core::x_api::XApiClient;

/// Blob backend plus the bucket label echoed into metadata records.
pub struct BlobWiring {
    pub store: Arc<dyn BlobStore>,
    pub bucket: String,
}

pub async fn blob(config: &Config, aws: bool, output_dir: &str) -> BlobWiring {
    if aws {
        if let Some(bucket) = &config.storage.s3_bucket {
            tracing::info!(bucket, "using S3 blob store");
            let bucket = bucket.clone();
            return BlobWiring {
                store: Arc::new(S3BlobStore::from_env(bucket.clone()).await),
                bucket,
            };
        }
        tracing::warn!("--aws given but no S3 bucket configured, using local blob store");
    }
    BlobWiring {
        store: Arc::new(FsBlobStore::new(output_dir)),
        bucket: "local".to_string(),
    }
}

/// Queue backend, plus a handle to the in-memory queue when local (the
/// run command drains it in-process).
pub struct QueueWiring {
    pub queue: Arc<dyn ClassificationQueue>,
    pub local: Option<Arc<InMemoryQueue>>,
}

pub async fn queue(config: &Config, aws: bool) -> QueueWiring {
    if aws {
        if let Some(url) = &config.storage.queue_url {
            tracing::info!(queue_url = %url, "using SQS classification queue");
            let queue =
                SqsQueue::from_env(url.clone(), config.pipeline.queue_visibility_secs).await;
            return QueueWiring {
                queue: Arc::new(queue),
                local: None,
            };
        }
        tracing::warn!("--aws given but no queue URL configured, using in-memory queue");
    }
    let local = Arc::new(InMemoryQueue::new(Duration::from_secs(
        config.pipeline.queue_visibility_secs,
    )));
    QueueWiring {
        queue: local.clone(),
        local: Some(local),
    }
}

/// Record-store backend, plus a handle to the in-memory store when local
/// (the run command dumps it into the manifest).
pub struct StoreWiring {
    pub store: Arc<dyn RecordStore>,
    pub local: Option<Arc<InMemoryStore>>,
}

pub async fn record_store(config: &Config, aws: bool) -> StoreWiring {
    if aws {
        if let Some(table) = &config.storage.table_name {
            tracing::info!(table, "using DynamoDB record store");
            let store = DynamoStore::from_env(table.clone()).await;
            return StoreWiring {
                store: Arc::new(store),
                local: None,
            };
        }
        tracing::warn!("--aws given but no table configured, using in-memory record store");
    }
    let local = Arc::new(InMemoryStore::new());
    StoreWiring {
        store: local.clone(),
        local: Some(local),
    }
}

pub fn x_api_client(config: &Config) -> anyhow::Result<Arc<XApiClient>> {
    anyhow::ensure!(
        !config.api.bearer_token.is_empty(),
        "no X API bearer token configured (set X_BEARER_TOKEN or [api].bearer_token)"
    );
    Ok(Arc::new(XApiClient::new(config.api.bearer_token.clone())))
}

pub fn renderer(config: &Config) -> anyhow::Result<Arc<dyn Renderer>> {
    let factory = Arc::new(WebDriverSessionFactory::new(
        config.capture.webdriver_url.clone(),
    ));
    let renderer_config = RendererConfig::from_capture_config(&config.capture)
        .context("invalid capture configuration")?;
    Ok(Arc::new(BrowserRenderer::new(factory, renderer_config)))
}

pub fn taxonomy(config: &Config) -> anyhow::Result<TaxonomyRegistry> {
    match &config.llm.taxonomy_path {
        Some(path) => TaxonomyRegistry::load(std::path::Path::new(path))
            .map_err(|e| anyhow::anyhow!("failed to load taxonomy registry: {e}")),
        None => Ok(TaxonomyRegistry::builtin()),
    }
}

pub fn classifier(config: &Config) -> anyhow::Result<Arc<HierarchicalClassifier>> {
    anyhow::ensure!(
        !config.llm.api_key.is_empty(),
        "no LLM API key configured (set ANTHROPIC_API_KEY or [llm].api_key)"
    );
    let provider = Arc::new(AnthropicProvider::new(
        config.llm.api_key.clone(),
        config.llm.classification_model.clone(),
    ));
    Ok(Arc::new(HierarchicalClassifier::new(
        provider,
        taxonomy(config)?,
        config.llm.l1_confidence_threshold,
        config.llm.classify_max_attempts,
    )))
}

pub fn vision_provider(config: &Config) -> anyhow::Result<Arc<AnthropicProvider>> {
    anyhow::ensure!(
        !config.llm.api_key.is_empty(),
        "no LLM API key configured (set ANTHROPIC_API_KEY or [llm].api_key)"
    );
    Ok(Arc::new(AnthropicProvider::new(
        config.llm.api_key.clone(),
        config.llm.extraction_model.clone(),
    )))
}
