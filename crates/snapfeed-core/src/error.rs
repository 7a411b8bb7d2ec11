//! Error types for the Snapfeed core library.
//!
//! Each pipeline stage has its own error enum to provide clear error
//! boundaries. The library uses `thiserror` for structured, typed errors;
//! errors never cross a capture-item boundary (the orchestrator logs them
//! and moves on to the next item).

/// Errors related to configuration loading, parsing, and validation.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// A required configuration field is absent.
    #[error("missing required config field: {field}")]
    MissingField {
        /// The name of the missing field.
        field: String,
    },

    /// A configuration field has an unacceptable value.
    #[error("invalid value for config field '{field}': {message}")]
    InvalidValue {
        /// The name of the invalid field.
        field: String,
        /// A description of why the value is invalid.
        message: String,
    },

    /// The configuration file does not exist at the specified path.
    #[error("config file not found: {path}")]
    FileNotFound {
        /// The path that was searched.
        path: String,
    },

    /// TOML deserialization failed.
    #[error("failed to parse config file: {source}")]
    ParseError {
        /// The underlying TOML parse error.
        #[source]
        source: toml::de::Error,
    },
}

/// Errors from interacting with the X (Twitter) API.
#[derive(Debug, thiserror::Error)]
pub enum XApiError {
    /// X API returned HTTP 429 (rate limited). The current handle's fetch
    /// is aborted; there is no in-process retry.
    #[error("X API rate limited{}", match .retry_after {
        Some(secs) => format!(", retry after {secs}s"),
        None => String::new(),
    })]
    RateLimited {
        /// Seconds to wait before retrying, if provided by the API.
        retry_after: Option<u64>,
    },

    /// Bearer token rejected.
    #[error("X API authentication failed, check the bearer token")]
    AuthFailed,

    /// The requested user or tweet does not exist.
    #[error("X API resource not found: {what}")]
    NotFound {
        /// Description of the missing resource.
        what: String,
    },

    /// Network-level failure communicating with the X API.
    #[error("X API network error: {source}")]
    Network {
        /// The underlying HTTP client error.
        #[source]
        source: reqwest::Error,
    },

    /// Any other X API error response.
    #[error("X API error (HTTP {status}): {message}")]
    ApiError {
        /// The HTTP status code.
        status: u16,
        /// The error message from the API.
        message: String,
    },
}

/// Errors from the browser renderer.
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    /// Browser session could not be created.
    #[error("browser session failed: {message}")]
    Session {
        /// The driver's error message (used for failure categorization).
        message: String,
    },

    /// Page navigation failed or timed out waiting for the article element.
    #[error("navigation failed for {url}: {message}")]
    Navigation {
        /// The URL being loaded.
        url: String,
        /// Details of the failure.
        message: String,
    },

    /// In-page script execution failed.
    #[error("browser script failed: {message}")]
    Script {
        /// Details of the failure.
        message: String,
    },

    /// Screenshot capture or file write failed.
    #[error("screenshot failed: {source}")]
    Screenshot {
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Image decoding or re-encoding failed (cropping).
    #[error("image processing failed: {message}")]
    Image {
        /// Details of the failure.
        message: String,
    },
}

/// Errors that abort a whole account's capture (item-level failures are
/// absorbed into the account summary instead).
#[derive(Debug, thiserror::Error)]
pub enum CaptureError {
    /// The account's content could not be fetched at all.
    #[error("capture fetch failed: {0}")]
    Fetch(#[from] XApiError),

    /// The local screenshot workspace could not be created.
    #[error("capture workspace error: {source}")]
    Workspace {
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },
}

/// Errors from blob storage operations.
#[derive(Debug, thiserror::Error)]
pub enum BlobError {
    /// Local file read/write failed.
    #[error("blob I/O error for key '{key}': {source}")]
    Io {
        /// The blob key involved.
        key: String,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// JSON (de)serialization failed.
    #[error("blob JSON error for key '{key}': {source}")]
    Json {
        /// The blob key involved.
        key: String,
        /// The underlying serde error.
        #[source]
        source: serde_json::Error,
    },

    /// The object store rejected the request.
    #[error("blob service error for key '{key}': {message}")]
    Service {
        /// The blob key involved.
        key: String,
        /// The service's error message.
        message: String,
    },

    /// The requested key does not exist.
    #[error("blob not found: {key}")]
    NotFound {
        /// The missing key.
        key: String,
    },
}

/// Errors from interacting with LLM providers.
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    /// HTTP request to the LLM endpoint failed.
    #[error("LLM HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// LLM API returned an error response.
    #[error("LLM API error (status {status}): {message}")]
    Api {
        /// The HTTP status code.
        status: u16,
        /// The error message from the API.
        message: String,
    },

    /// LLM provider rate limit hit.
    #[error("LLM rate limited, retry after {retry_after_secs} seconds")]
    RateLimited {
        /// Seconds to wait before retrying.
        retry_after_secs: u64,
    },

    /// LLM response could not be parsed.
    #[error("failed to parse LLM response: {0}")]
    Parse(String),

    /// The provider returned an empty or whitespace-only completion.
    #[error("LLM returned an empty response")]
    Empty,
}

/// Errors from the hierarchical classifier.
#[derive(Debug, thiserror::Error)]
pub enum ClassifyError {
    /// The underlying LLM call failed.
    #[error("classifier LLM call failed: {0}")]
    Llm(#[from] LlmError),

    /// The model answered with a topic outside the closed enumeration.
    #[error("classifier returned unknown {level} topic: {topic}")]
    UnknownTopic {
        /// "level-1" or "level-2".
        level: &'static str,
        /// The offending topic string.
        topic: String,
    },

    /// The model's output was not the expected JSON shape.
    #[error("malformed classifier response: {0}")]
    Malformed(String),
}

/// Errors from the text extractor.
#[derive(Debug, thiserror::Error)]
pub enum ExtractError {
    /// The metadata record could not be read or written.
    #[error("extractor blob error: {0}")]
    Blob(#[from] BlobError),

    /// The vision LLM call failed.
    #[error("extractor LLM call failed: {0}")]
    Llm(#[from] LlmError),

    /// The model produced no usable text for the screenshots.
    #[error("could not extract text from screenshots for {tweet_id}")]
    NoText {
        /// The tweet the screenshots belong to.
        tweet_id: String,
    },

    /// The metadata record is missing fields the extractor needs.
    #[error("malformed metadata record at {key}: {message}")]
    MalformedRecord {
        /// The blob key of the record.
        key: String,
        /// What was missing or wrong.
        message: String,
    },
}

/// Errors from the classification queue transport.
#[derive(Debug, thiserror::Error)]
pub enum QueueError {
    /// The queue service rejected the request.
    #[error("queue service error: {message}")]
    Service {
        /// The service's error message.
        message: String,
    },

    /// Message body (de)serialization failed.
    #[error("queue message JSON error: {source}")]
    Json {
        /// The underlying serde error.
        #[source]
        source: serde_json::Error,
    },
}

/// Errors from the classified-record store.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The table service rejected the write.
    #[error("record store error: {message}")]
    Service {
        /// The service's error message.
        message: String,
    },
}
