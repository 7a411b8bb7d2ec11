//! Parsing of classifier LLM responses.
//!
//! The models are instructed to answer with a bare JSON object, but some
//! wrap it in a markdown fence and some emit the confidence as a quoted
//! string. Both are tolerated; anything else is malformed and triggers a
//! retry upstream.

use serde::Deserialize;

use crate::error::ClassifyError;

/// Parsed level-1 answer.
#[derive(Debug, Deserialize)]
pub struct Level1Answer {
    /// The chosen coarse topic.
    pub level1: String,
    /// Model confidence in the choice.
    #[serde(default)]
    pub confidence: Confidence,
}

/// Parsed level-2 answer.
#[derive(Debug, Deserialize)]
pub struct Level2Answer {
    /// The chosen fine topics.
    #[serde(default)]
    pub level2: Vec<String>,
    /// Model confidence in the choice.
    #[serde(default)]
    pub confidence: Confidence,
}

/// A confidence value that may arrive as a number or a quoted string.
#[derive(Debug, Default, Deserialize)]
#[serde(untagged)]
pub enum Confidence {
    /// Numeric confidence.
    Number(f32),
    /// Quoted confidence, e.g. `"0.95"`.
    Text(String),
    /// Absent.
    #[default]
    Missing,
}

impl Confidence {
    /// Numeric value, if one can be recovered.
    pub fn value(&self) -> Option<f32> {
        match self {
            Confidence::Number(n) => Some(*n),
            Confidence::Text(s) => s.trim().parse().ok(),
            Confidence::Missing => None,
        }
    }
}

/// Parse a level-1 response body.
pub fn parse_level1(raw: &str) -> Result<(String, f32), ClassifyError> {
    let answer: Level1Answer = parse_json(raw)?;
    let confidence = answer
        .confidence
        .value()
        .ok_or_else(|| ClassifyError::Malformed("level-1 confidence is not a number".into()))?;
    Ok((answer.level1, confidence))
}

/// Parse a level-2 response body.
pub fn parse_level2(raw: &str) -> Result<(Vec<String>, f32), ClassifyError> {
    let answer: Level2Answer = parse_json(raw)?;
    let confidence = answer
        .confidence
        .value()
        .ok_or_else(|| ClassifyError::Malformed("level-2 confidence is not a number".into()))?;
    Ok((answer.level2, confidence))
}

fn parse_json<T: serde::de::DeserializeOwned>(raw: &str) -> Result<T, ClassifyError> {
    let trimmed = strip_code_fence(raw);
    if trimmed.is_empty() {
        return Err(ClassifyError::Malformed("empty response".into()));
    }
    serde_json::from_str(trimmed).map_err(|e| ClassifyError::Malformed(e.to_string()))
}

/// Strip a surrounding markdown code fence, with or without a language tag.
fn strip_code_fence(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(inner) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let inner = inner.strip_prefix("json").unwrap_or(inner);
    inner.strip_suffix("```").unwrap_or(inner).trim()
}
