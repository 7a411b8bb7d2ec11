//! LLM provider abstraction and implementations.
//!
//! A trait-based abstraction over chat-completion providers with typed
//! responses and token usage tracking. Two call shapes are needed by the
//! pipeline: plain text completion (classification) and multi-image
//! completion (OCR text extraction from screenshots).

pub mod anthropic;

use crate::error::LlmError;

/// Token usage information from an LLM completion.
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct TokenUsage {
    /// Number of tokens in the input/prompt.
    pub input_tokens: u32,
    /// Number of tokens in the output/completion.
    pub output_tokens: u32,
}

impl TokenUsage {
    /// Accumulate token counts from another usage record (e.g. across retries).
    pub fn accumulate(&mut self, other: &TokenUsage) {
        self.input_tokens += other.input_tokens;
        self.output_tokens += other.output_tokens;
    }
}

/// Response from an LLM completion request.
#[derive(Debug, Clone)]
pub struct LlmResponse {
    /// The generated text content.
    pub text: String,
    /// Token usage for this completion.
    pub usage: TokenUsage,
    /// The model that produced this response.
    pub model: String,
}

/// Parameters controlling LLM generation behavior.
#[derive(Debug, Clone)]
pub struct GenerationParams {
    /// Maximum number of tokens to generate.
    pub max_tokens: u32,
    /// Sampling temperature (0.0 = deterministic). Classification always
    /// runs at 0.
    pub temperature: f32,
}

impl Default for GenerationParams {
    fn default() -> Self {
        Self {
            max_tokens: 1024,
            temperature: 0.0,
        }
    }
}

/// An image attached to a vision completion request.
#[derive(Debug, Clone)]
pub struct ImageInput {
    /// MIME type, e.g. `image/png`.
    pub media_type: String,
    /// Base64-encoded image bytes.
    pub data: String,
}

impl ImageInput {
    /// Encode raw PNG bytes for attachment.
    pub fn png(bytes: &[u8]) -> Self {
        use base64::Engine as _;
        Self {
            media_type: "image/png".to_string(),
            data: base64::engine::general_purpose::STANDARD.encode(bytes),
        }
    }
}

/// Trait abstracting LLM provider operations.
///
/// The trait is object-safe for use as `Arc<dyn LlmProvider>`; test stubs
/// implement it directly.
#[async_trait::async_trait]
pub trait LlmProvider: Send + Sync {
    /// Returns the display name of this provider.
    fn name(&self) -> &str;

    /// Send a text completion request.
    async fn complete(
        &self,
        system: &str,
        user_message: &str,
        params: &GenerationParams,
    ) -> Result<LlmResponse, LlmError>;

    /// Send a completion request with images preceding the text prompt.
    async fn complete_with_images(
        &self,
        system: &str,
        user_message: &str,
        images: &[ImageInput],
        params: &GenerationParams,
    ) -> Result<LlmResponse, LlmError>;
}
