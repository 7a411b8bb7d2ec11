//! The two-level topic taxonomy.
//!
//! A versioned JSON document defines a closed level-1 enumeration of
//! coarse topics and, per level-1 topic, a closed enumeration of fine
//! level-2 topics. Loaded once at startup; the classifier validates every
//! model answer against it.

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Sentinel level-1 value used when classification is below the
/// confidence gate or permanently failed.
pub const UNCERTAIN: &str = "Uncertain";

/// A versioned two-level topic taxonomy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaxonomyRegistry {
    /// Document version, bumped whenever topics change.
    pub version: u32,
    /// Closed enumeration of coarse topics.
    pub level1: Vec<String>,
    /// Fine topics per level-1 topic.
    pub level2: HashMap<String, Vec<String>>,
}

impl TaxonomyRegistry {
    /// The taxonomy compiled into the binary, used when no registry file
    /// is configured.
    pub fn builtin() -> Self {
        serde_json::from_str(include_str!("taxonomy.json"))
            .expect("embedded taxonomy document is valid")
    }

    /// Load a registry document from a JSON file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|_| ConfigError::FileNotFound {
            path: path.display().to_string(),
        })?;
        let registry: Self =
            serde_json::from_str(&raw).map_err(|e| ConfigError::InvalidValue {
                field: "taxonomy".to_string(),
                message: e.to_string(),
            })?;
        registry.check()?;
        Ok(registry)
    }

    /// Validate internal consistency: every level-2 key must be a known
    /// level-1 topic and no enumeration may be empty.
    pub fn check(&self) -> Result<(), ConfigError> {
        if self.level1.is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "taxonomy.level1".to_string(),
                message: "must list at least one topic".to_string(),
            });
        }
        for (key, topics) in &self.level2 {
            if !self.contains_level1(key) {
                return Err(ConfigError::InvalidValue {
                    field: "taxonomy.level2".to_string(),
                    message: format!("'{key}' is not a level-1 topic"),
                });
            }
            if topics.is_empty() {
                return Err(ConfigError::InvalidValue {
                    field: "taxonomy.level2".to_string(),
                    message: format!("'{key}' has no fine topics"),
                });
            }
        }
        Ok(())
    }

    /// Whether `topic` is in the level-1 enumeration.
    pub fn contains_level1(&self, topic: &str) -> bool {
        self.level1.iter().any(|t| t == topic)
    }

    /// The fine topics scoped to a level-1 topic, if any.
    pub fn level2_for(&self, level1: &str) -> Option<&[String]> {
        self.level2.get(level1).map(Vec::as_slice)
    }
}
