//! Configuration management for Snapfeed.
//!
//! Supports three-layer configuration loading:
//! 1. Built-in defaults
//! 2. TOML config file
//! 3. Environment variable overrides (`SNAPFEED_` prefix, plus the
//!    conventional `X_BEARER_TOKEN` / `ANTHROPIC_API_KEY` / `S3_BUCKET` /
//!    `QUEUE_URL` / `DDB_TABLE` names)
//!
//! CLI flag overrides are applied by the binary crate after loading.
//! Validation failures are fatal at startup.

mod defaults;


use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::env;
use std::path::Path;

/// Top-level configuration for the Snapfeed pipeline.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    /// X API credentials.
    #[serde(default)]
    pub api: ApiConfig,

    /// Browser capture settings.
    #[serde(default)]
    pub capture: CaptureConfig,

    /// LLM provider configuration.
    #[serde(default)]
    pub llm: LlmConfig,

    /// Blob / queue / table storage configuration.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Pipeline-run settings.
    #[serde(default)]
    pub pipeline: PipelineConfig,
}

/// X API credentials.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ApiConfig {
    /// OAuth 2.0 app-only bearer token.
    #[serde(default)]
    pub bearer_token: String,
}

/// Browser capture settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CaptureConfig {
    /// Page zoom percentage applied before screenshots (25–200).
    #[serde(default = "defaults::zoom_percent")]
    pub zoom_percent: u32,

    /// Optional percentage crop applied to every screenshot.
    #[serde(default)]
    pub crop: CropSettings,

    /// Screenshot cap per singleton capture.
    #[serde(default = "defaults::max_screenshots")]
    pub max_screenshots: u32,

    /// Screenshot cap per post when capturing inside a thread.
    #[serde(default = "defaults::thread_max_screenshots")]
    pub thread_max_screenshots: u32,

    /// Browser session construction attempts before falling back.
    #[serde(default = "defaults::max_browser_retries")]
    pub max_browser_retries: u32,

    /// Base delay between session retries, in seconds.
    #[serde(default = "defaults::retry_delay_secs")]
    pub retry_delay_secs: f64,

    /// Multiplier applied to the retry delay per attempt.
    #[serde(default = "defaults::retry_backoff")]
    pub retry_backoff: f64,

    /// Timeout waiting for the main article element, in seconds.
    #[serde(default = "defaults::nav_timeout_secs")]
    pub nav_timeout_secs: u64,

    /// Navigation attempts per capture (session rebuilt between attempts).
    #[serde(default = "defaults::nav_retries")]
    pub nav_retries: u32,

    /// Fixed dwell after the article element appears, in seconds.
    #[serde(default = "defaults::post_load_dwell_secs")]
    pub post_load_dwell_secs: u64,

    /// Wait after each scroll step for dynamic content, in seconds.
    #[serde(default = "defaults::scroll_settle_secs")]
    pub scroll_settle_secs: u64,

    /// WebDriver endpoint the renderer connects to.
    #[serde(default = "defaults::webdriver_url")]
    pub webdriver_url: String,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            zoom_percent: defaults::zoom_percent(),
            crop: CropSettings::default(),
            max_screenshots: defaults::max_screenshots(),
            thread_max_screenshots: defaults::thread_max_screenshots(),
            max_browser_retries: defaults::max_browser_retries(),
            retry_delay_secs: defaults::retry_delay_secs(),
            retry_backoff: defaults::retry_backoff(),
            nav_timeout_secs: defaults::nav_timeout_secs(),
            nav_retries: defaults::nav_retries(),
            post_load_dwell_secs: defaults::post_load_dwell_secs(),
            scroll_settle_secs: defaults::scroll_settle_secs(),
            webdriver_url: defaults::webdriver_url(),
        }
    }
}

/// Percentage crop rectangle applied to screenshots.
///
/// Coordinates are percentages of the image dimensions. When enabled they
/// must satisfy `0 <= x1 < x2 <= 100` and `0 <= y1 < y2 <= 100`.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CropSettings {
    /// Whether cropping is applied at all.
    #[serde(default)]
    pub enabled: bool,

    /// Left boundary percent.
    #[serde(default)]
    pub x1: u32,

    /// Top boundary percent.
    #[serde(default)]
    pub y1: u32,

    /// Right boundary percent.
    #[serde(default = "defaults::crop_x2")]
    pub x2: u32,

    /// Bottom boundary percent.
    #[serde(default = "defaults::crop_y2")]
    pub y2: u32,
}

impl Default for CropSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            x1: 0,
            y1: 0,
            x2: defaults::crop_x2(),
            y2: defaults::crop_y2(),
        }
    }
}

/// LLM provider configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LlmConfig {
    /// Anthropic API key.
    #[serde(default)]
    pub api_key: String,

    /// Model used for OCR text extraction from screenshots.
    #[serde(default = "defaults::extraction_model")]
    pub extraction_model: String,

    /// Model used for hierarchical classification.
    #[serde(default = "defaults::classification_model")]
    pub classification_model: String,

    /// Level-1 confidence below which level-2 classification is skipped.
    #[serde(default = "defaults::l1_confidence_threshold")]
    pub l1_confidence_threshold: f32,

    /// Identical-prompt attempts before the classifier gives up.
    #[serde(default = "defaults::classify_max_attempts")]
    pub classify_max_attempts: u32,

    /// Path to a taxonomy registry JSON document; the built-in taxonomy
    /// is used when absent.
    #[serde(default)]
    pub taxonomy_path: Option<String>,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            extraction_model: defaults::extraction_model(),
            classification_model: defaults::classification_model(),
            l1_confidence_threshold: defaults::l1_confidence_threshold(),
            classify_max_attempts: defaults::classify_max_attempts(),
            taxonomy_path: None,
        }
    }
}

/// Blob, queue, and table storage configuration.
///
/// Hosted backends are selected only when their value is present; otherwise
/// the pipeline falls back to the filesystem blob store and the in-memory
/// queue/store.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StorageConfig {
    /// S3 bucket for screenshots and metadata records.
    #[serde(default)]
    pub s3_bucket: Option<String>,

    /// Root directory for local-run artifacts and the filesystem blob store.
    #[serde(default = "defaults::output_dir")]
    pub output_dir: String,

    /// Hosted classification queue URL.
    #[serde(default)]
    pub queue_url: Option<String>,

    /// Hosted record-store table name.
    #[serde(default)]
    pub table_name: Option<String>,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            s3_bucket: None,
            output_dir: defaults::output_dir(),
            queue_url: None,
            table_name: None,
        }
    }
}

/// Pipeline-run settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PipelineConfig {
    /// Handles to process (without @).
    #[serde(default)]
    pub accounts: Vec<String>,

    /// Trailing window of days to fetch.
    #[serde(default = "defaults::days_back")]
    pub days_back: u32,

    /// Maximum posts fetched per account.
    #[serde(default = "defaults::max_items")]
    pub max_items: u32,

    /// Accounts captured concurrently.
    #[serde(default = "defaults::account_concurrency")]
    pub account_concurrency: usize,

    /// Messages pulled per worker iteration.
    #[serde(default = "defaults::worker_batch_size")]
    pub worker_batch_size: u32,

    /// Worker sleep between empty polls, in seconds.
    #[serde(default = "defaults::worker_idle_secs")]
    pub worker_idle_secs: u64,

    /// Queue visibility window for in-flight messages, in seconds.
    #[serde(default = "defaults::queue_visibility_secs")]
    pub queue_visibility_secs: u64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            accounts: Vec::new(),
            days_back: defaults::days_back(),
            max_items: defaults::max_items(),
            account_concurrency: defaults::account_concurrency(),
            worker_batch_size: defaults::worker_batch_size(),
            worker_idle_secs: defaults::worker_idle_secs(),
            queue_visibility_secs: defaults::queue_visibility_secs(),
        }
    }
}

impl Config {
    /// Load configuration from an optional TOML file, apply environment
    /// overrides, and validate.
    pub fn load(path: Option<&str>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(p) => {
                let file = Path::new(p);
                if !file.exists() {
                    return Err(ConfigError::FileNotFound {
                        path: p.to_string(),
                    });
                }
                let raw = std::fs::read_to_string(file).map_err(|_| ConfigError::FileNotFound {
                    path: p.to_string(),
                })?;
                toml::from_str(&raw).map_err(|source| ConfigError::ParseError { source })?
            }
            None => Self::default(),
        };

        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Apply environment variable overrides on top of file/default values.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(v) = env::var("SNAPFEED_API_BEARER_TOKEN").or_else(|_| env::var("X_BEARER_TOKEN"))
        {
            self.api.bearer_token = v;
        }
        if let Ok(v) = env::var("SNAPFEED_LLM_API_KEY").or_else(|_| env::var("ANTHROPIC_API_KEY")) {
            self.llm.api_key = v;
        }
        if let Ok(v) = env::var("SNAPFEED_S3_BUCKET").or_else(|_| env::var("S3_BUCKET")) {
            self.storage.s3_bucket = Some(v);
        }
        if let Ok(v) = env::var("SNAPFEED_QUEUE_URL").or_else(|_| env::var("QUEUE_URL")) {
            self.storage.queue_url = Some(v);
        }
        if let Ok(v) = env::var("SNAPFEED_DDB_TABLE").or_else(|_| env::var("DDB_TABLE")) {
            self.storage.table_name = Some(v);
        }
        if let Ok(v) = env::var("SNAPFEED_WEBDRIVER_URL") {
            self.capture.webdriver_url = v;
        }
    }

    /// Validate field values. Called automatically by [`Config::load`];
    /// fatal at startup on failure.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(25..=200).contains(&self.capture.zoom_percent) {
            return Err(ConfigError::InvalidValue {
                field: "capture.zoom_percent".to_string(),
                message: "must be between 25 and 200".to_string(),
            });
        }

        if self.capture.crop.enabled {
            let c = &self.capture.crop;
            if !(c.x1 < c.x2 && c.x2 <= 100) {
                return Err(ConfigError::InvalidValue {
                    field: "capture.crop".to_string(),
                    message: format!(
                        "invalid X coordinates: x1={}, x2={}; need 0 <= x1 < x2 <= 100",
                        c.x1, c.x2
                    ),
                });
            }
            if !(c.y1 < c.y2 && c.y2 <= 100) {
                return Err(ConfigError::InvalidValue {
                    field: "capture.crop".to_string(),
                    message: format!(
                        "invalid Y coordinates: y1={}, y2={}; need 0 <= y1 < y2 <= 100",
                        c.y1, c.y2
                    ),
                });
            }
        }

        if self.pipeline.max_items == 0 {
            return Err(ConfigError::InvalidValue {
                field: "pipeline.max_items".to_string(),
                message: "must be at least 1".to_string(),
            });
        }

        if self.pipeline.days_back == 0 {
            return Err(ConfigError::InvalidValue {
                field: "pipeline.days_back".to_string(),
                message: "must be at least 1".to_string(),
            });
        }

        if !(0.0..=1.0).contains(&self.llm.l1_confidence_threshold) {
            return Err(ConfigError::InvalidValue {
                field: "llm.l1_confidence_threshold".to_string(),
                message: "must be between 0.0 and 1.0".to_string(),
            });
        }

        if self.llm.classify_max_attempts == 0 {
            return Err(ConfigError::InvalidValue {
                field: "llm.classify_max_attempts".to_string(),
                message: "must be at least 1".to_string(),
            });
        }

        Ok(())
    }
}
