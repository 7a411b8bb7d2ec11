//! Hierarchical two-pass topic classification.
//!
//! Pass one assigns a coarse level-1 topic with a confidence score; only
//! when that confidence clears the gate is a second, level-1-scoped pass
//! issued for fine level-2 topics. Both passes run at temperature 0 and
//! retain the raw model responses for auditability. Classification never
//! fails the caller: persistent model trouble degrades to the `Uncertain`
//! sentinel.

mod parser;

#[cfg(test)]
mod tests;

use std::sync::Arc;

use crate::error::ClassifyError;
use crate::llm::{GenerationParams, LlmProvider};
use crate::taxonomy::{TaxonomyRegistry, UNCERTAIN};

/// Result of classifying one post.
#[derive(Debug, Clone)]
pub struct ClassificationOutcome {
    /// Level-1 topic, or [`UNCERTAIN`].
    pub level1: String,
    /// Level-2 topics (empty when gated or uncertain).
    pub level2: Vec<String>,
    /// Level-1 confidence.
    pub conf_l1: f32,
    /// Level-2 confidence (0.0 when no level-2 call was made).
    pub conf_l2: f32,
    /// Model that produced the classification.
    pub model: String,
    /// Raw level-1 response body.
    pub raw_l1: String,
    /// Raw level-2 response body, when a level-2 call was made.
    pub raw_l2: Option<String>,
}

impl ClassificationOutcome {
    fn uncertain(model: String, raw_l1: String) -> Self {
        Self {
            level1: UNCERTAIN.to_string(),
            level2: Vec::new(),
            conf_l1: 0.0,
            conf_l2: 0.0,
            model,
            raw_l1,
            raw_l2: None,
        }
    }
}

/// Port for the worker's view of classification.
#[async_trait::async_trait]
pub trait Classifier: Send + Sync {
    /// Classify one post's text.
    async fn classify(&self, post_id: &str, text: &str) -> ClassificationOutcome;
}

/// Two-pass LLM classifier over a closed taxonomy.
pub struct HierarchicalClassifier {
    llm: Arc<dyn LlmProvider>,
    registry: TaxonomyRegistry,
    confidence_threshold: f32,
    max_attempts: u32,
}

impl HierarchicalClassifier {
    /// Create a classifier.
    ///
    /// `confidence_threshold` gates the level-2 call; `max_attempts` bounds
    /// identical-prompt retries per pass when the model answers outside the
    /// contract.
    pub fn new(
        llm: Arc<dyn LlmProvider>,
        registry: TaxonomyRegistry,
        confidence_threshold: f32,
        max_attempts: u32,
    ) -> Self {
        Self {
            llm,
            registry,
            confidence_threshold,
            max_attempts: max_attempts.max(1),
        }
    }

    /// Classify one post's text.
    pub async fn classify(&self, post_id: &str, text: &str) -> ClassificationOutcome {
        let (level1, conf_l1, raw_l1, model) = match self.level1_pass(text).await {
            Ok(result) => result,
            Err(e) => {
                tracing::warn!(post_id, error = %e, "level-1 classification failed");
                return ClassificationOutcome::uncertain(String::new(), String::new());
            }
        };

        if conf_l1 < self.confidence_threshold {
            tracing::info!(
                post_id,
                level1 = %level1,
                conf_l1,
                threshold = self.confidence_threshold,
                "confidence below gate, skipping level-2"
            );
            return ClassificationOutcome {
                level1: UNCERTAIN.to_string(),
                level2: Vec::new(),
                conf_l1,
                conf_l2: 0.0,
                model,
                raw_l1,
                raw_l2: None,
            };
        }

        match self.level2_pass(&level1, text).await {
            Ok((level2, conf_l2, raw_l2)) => {
                tracing::debug!(post_id, %level1, ?level2, "classification complete");
                ClassificationOutcome {
                    level1,
                    level2,
                    conf_l1,
                    conf_l2,
                    model,
                    raw_l1,
                    raw_l2: Some(raw_l2),
                }
            }
            Err(e) => {
                tracing::warn!(post_id, error = %e, "level-2 classification failed");
                ClassificationOutcome::uncertain(model, raw_l1)
            }
        }
    }

    async fn level1_pass(
        &self,
        text: &str,
    ) -> Result<(String, f32, String, String), ClassifyError> {
        let prompt = self.level1_prompt(text);
        let mut last_err: Option<ClassifyError> = None;

        for attempt in 1..=self.max_attempts {
            let response = match self.complete(&prompt).await {
                Ok(r) => r,
                Err(e) => {
                    tracing::warn!(attempt, error = %e, "level-1 call failed");
                    last_err = Some(e);
                    continue;
                }
            };

            match parser::parse_level1(&response.text) {
                Ok((topic, confidence)) if self.registry.contains_level1(&topic) => {
                    return Ok((topic, confidence, response.text, response.model));
                }
                Ok((topic, _)) => {
                    tracing::warn!(attempt, %topic, "level-1 answer outside taxonomy");
                    last_err = Some(ClassifyError::UnknownTopic {
                        level: "level-1",
                        topic,
                    });
                }
                Err(e) => {
                    tracing::warn!(attempt, error = %e, "malformed level-1 answer");
                    last_err = Some(e);
                }
            }
        }

        Err(last_err.unwrap_or_else(|| ClassifyError::Malformed("no attempts made".into())))
    }

    async fn level2_pass(
        &self,
        level1: &str,
        text: &str,
    ) -> Result<(Vec<String>, f32, String), ClassifyError> {
        let scoped = self
            .registry
            .level2_for(level1)
            .ok_or_else(|| ClassifyError::UnknownTopic {
                level: "level-1",
                topic: level1.to_string(),
            })?;
        let prompt = level2_prompt(level1, scoped, text);
        let mut last_err: Option<ClassifyError> = None;

        for attempt in 1..=self.max_attempts {
            let response = match self.complete(&prompt).await {
                Ok(r) => r,
                Err(e) => {
                    tracing::warn!(attempt, error = %e, "level-2 call failed");
                    last_err = Some(e);
                    continue;
                }
            };

            match parser::parse_level2(&response.text) {
                Ok((topics, confidence)) => {
                    let filtered: Vec<String> = topics
                        .into_iter()
                        .filter(|t| scoped.iter().any(|s| s == t))
                        .collect();
                    return Ok((filtered, confidence, response.text));
                }
                Err(e) => {
                    tracing::warn!(attempt, error = %e, "malformed level-2 answer");
                    last_err = Some(e);
                }
            }
        }

        Err(last_err.unwrap_or_else(|| ClassifyError::Malformed("no attempts made".into())))
    }

    async fn complete(&self, prompt: &str) -> Result<crate::llm::LlmResponse, ClassifyError> {
        let params = GenerationParams {
            max_tokens: 256,
            temperature: 0.0,
        };
        Ok(self.llm.complete(SYSTEM_PROMPT, prompt, &params).await?)
    }

    fn level1_prompt(&self, text: &str) -> String {
        let topics = bullet_list(&self.registry.level1);
        format!(
            "LEVEL-1 CLASSIFICATION\n\n\
             Assign exactly one topic from this list to the post below:\n{topics}\n\
             Post:\n\"{text}\"\n\n\
             Answer with only a JSON object of the form\n\
             {{\"level1\": \"<topic>\", \"confidence\": <number between 0 and 1>}}"
        )
    }
}

#[async_trait::async_trait]
impl Classifier for HierarchicalClassifier {
    async fn classify(&self, post_id: &str, text: &str) -> ClassificationOutcome {
        HierarchicalClassifier::classify(self, post_id, text).await
    }
}

const SYSTEM_PROMPT: &str =
    "You are a precise topic classifier for social-media posts about generative AI. \
     You always answer with a single JSON object and nothing else.";

fn level2_prompt(level1: &str, scoped: &[String], text: &str) -> String {
    let topics = bullet_list(scoped);
    format!(
        "LEVEL-2 CLASSIFICATION\n\n\
         The post below is about \"{level1}\". Pick the fine topic(s) that apply, \
         only from this list:\n{topics}\n\
         Post:\n\"{text}\"\n\n\
         Answer with only a JSON object of the form\n\
         {{\"level2\": [\"<topic>\", ...], \"confidence\": <number between 0 and 1>}}"
    )
}

fn bullet_list(topics: &[String]) -> String {
    topics
        .iter()
        .map(|t| format!("- {t}\n"))
        .collect::<String>()
}
