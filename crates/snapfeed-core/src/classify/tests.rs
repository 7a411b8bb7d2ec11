use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use super::*;
use crate::error::LlmError;
use crate::llm::{GenerationParams, ImageInput, LlmResponse, TokenUsage};
use crate::taxonomy::{TaxonomyRegistry, UNCERTAIN};

/// Stub provider that answers level-1 and level-2 prompts from scripted
/// response queues, keyed off the prompt's pass marker.
struct ScriptedLlm {
    level1: Mutex<Vec<String>>,
    level2: Mutex<Vec<String>>,
    l1_calls: AtomicUsize,
    l2_calls: AtomicUsize,
}

impl ScriptedLlm {
    fn new(level1: Vec<&str>, level2: Vec<&str>) -> Self {
        Self {
            level1: Mutex::new(level1.into_iter().rev().map(String::from).collect()),
            level2: Mutex::new(level2.into_iter().rev().map(String::from).collect()),
            l1_calls: AtomicUsize::new(0),
            l2_calls: AtomicUsize::new(0),
        }
    }

    fn total_calls(&self) -> usize {
        self.l1_calls.load(Ordering::SeqCst) + self.l2_calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl LlmProvider for ScriptedLlm {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn complete(
        &self,
        _system: &str,
        user_message: &str,
        _params: &GenerationParams,
    ) -> Result<LlmResponse, LlmError> {
        let queue = if user_message.contains("LEVEL-1") {
            self.l1_calls.fetch_add(1, Ordering::SeqCst);
            &self.level1
        } else {
            self.l2_calls.fetch_add(1, Ordering::SeqCst);
            &self.level2
        };
        let text = queue
            .lock()
            .unwrap()
            .pop()
            .ok_or_else(|| LlmError::Parse("scripted responses exhausted".into()))?;
        Ok(LlmResponse {
            text,
            usage: TokenUsage::default(),
            model: "stub-model".to_string(),
        })
    }

    async fn complete_with_images(
        &self,
        system: &str,
        user_message: &str,
        _images: &[ImageInput],
        params: &GenerationParams,
    ) -> Result<LlmResponse, LlmError> {
        self.complete(system, user_message, params).await
    }
}

fn classifier(llm: Arc<ScriptedLlm>) -> HierarchicalClassifier {
    HierarchicalClassifier::new(llm, TaxonomyRegistry::builtin(), 0.5, 3)
}

#[tokio::test]
async fn happy_path_issues_two_calls() {
    let llm = Arc::new(ScriptedLlm::new(
        vec![r#"{"level1": "Breakthrough Research", "confidence": 0.94}"#],
        vec![r#"{"level2": ["Training Methods"], "confidence": 0.88}"#],
    ));
    let result = classifier(llm.clone())
        .classify("t1", "Announcing a new LoRA training trick that cuts VRAM by 40%.")
        .await;

    assert_eq!(result.level1, "Breakthrough Research");
    assert_eq!(result.level2, vec!["Training Methods"]);
    assert!((result.conf_l1 - 0.94).abs() < f32::EPSILON);
    assert!((result.conf_l2 - 0.88).abs() < f32::EPSILON);
    assert_eq!(result.model, "stub-model");
    assert!(result.raw_l1.contains("Breakthrough Research"));
    assert!(result.raw_l2.as_deref().unwrap().contains("Training Methods"));
    assert_eq!(llm.total_calls(), 2);
}

#[tokio::test]
async fn low_confidence_gates_level2() {
    let llm = Arc::new(ScriptedLlm::new(
        vec![r#"{"level1": "Breakthrough Research", "confidence": 0.10}"#],
        vec![r#"{"level2": ["Training Methods"], "confidence": 0.9}"#],
    ));
    let result = classifier(llm.clone()).classify("t2", "Test tweet").await;

    assert_eq!(result.level1, UNCERTAIN);
    assert!(result.level2.is_empty());
    assert!((result.conf_l2 - 0.0).abs() < f32::EPSILON);
    assert!(result.raw_l2.is_none());
    // Exactly one LLM call: the gate suppresses the level-2 pass.
    assert_eq!(llm.total_calls(), 1);
    assert_eq!(llm.l1_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn confidence_at_threshold_proceeds_to_level2() {
    let llm = Arc::new(ScriptedLlm::new(
        vec![r#"{"level1": "Tools & Resources", "confidence": 0.5}"#],
        vec![r#"{"level2": ["Datasets"], "confidence": 0.6}"#],
    ));
    let result = classifier(llm.clone()).classify("t3", "New dataset drop").await;

    assert_eq!(result.level1, "Tools & Resources");
    assert_eq!(result.level2, vec!["Datasets"]);
    assert_eq!(llm.total_calls(), 2);
}

#[tokio::test]
async fn malformed_level1_is_retried_with_identical_prompt() {
    let llm = Arc::new(ScriptedLlm::new(
        vec![
            "the topic is research, trust me",
            r#"{"level1": "Breakthrough Research", "confidence": 0.8}"#,
        ],
        vec![r#"{"level2": [], "confidence": 0.4}"#],
    ));
    let result = classifier(llm.clone()).classify("t4", "text").await;

    assert_eq!(result.level1, "Breakthrough Research");
    assert_eq!(llm.l1_calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn persistent_malformed_level1_yields_uncertain() {
    let llm = Arc::new(ScriptedLlm::new(
        vec!["nope", "still nope", "never json"],
        vec![],
    ));
    let result = classifier(llm.clone()).classify("t5", "text").await;

    assert_eq!(result.level1, UNCERTAIN);
    assert!(result.level2.is_empty());
    assert_eq!(llm.l1_calls.load(Ordering::SeqCst), 3);
    assert_eq!(llm.l2_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn level1_outside_taxonomy_is_rejected_and_retried() {
    let llm = Arc::new(ScriptedLlm::new(
        vec![
            r#"{"level1": "Astrology", "confidence": 0.99}"#,
            r#"{"level1": "Model Releases", "confidence": 0.9}"#,
        ],
        vec![r#"{"level2": ["Open Weights"], "confidence": 0.8}"#],
    ));
    let result = classifier(llm.clone()).classify("t6", "weights released").await;

    assert_eq!(result.level1, "Model Releases");
    assert_eq!(llm.l1_calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn level2_answers_are_filtered_to_scoped_enumeration() {
    let llm = Arc::new(ScriptedLlm::new(
        vec![r#"{"level1": "Breakthrough Research", "confidence": 0.9}"#],
        // "Open Weights" belongs to Model Releases, not Breakthrough Research.
        vec![r#"{"level2": ["Training Methods", "Open Weights"], "confidence": 0.7}"#],
    ));
    let result = classifier(llm.clone()).classify("t7", "text").await;

    assert_eq!(result.level2, vec!["Training Methods"]);
}

#[tokio::test]
async fn string_confidence_is_accepted() {
    let llm = Arc::new(ScriptedLlm::new(
        vec![r#"{"level1": "Breakthrough Research", "confidence": "0.95"}"#,],
        vec![r#"{"level2": ["Training Methods"], "confidence": "0.9"}"#],
    ));
    let result = classifier(llm.clone()).classify("t8", "New LoRA trick").await;

    assert_eq!(result.level1, "Breakthrough Research");
    assert!((result.conf_l1 - 0.95).abs() < f32::EPSILON);
    assert_eq!(result.level2, vec!["Training Methods"]);
}
