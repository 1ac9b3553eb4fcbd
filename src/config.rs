//! Engine configuration, loaded from an optional `engine.toml`.
//!
//! No config file present is not an error: a project that never wrote
//! `engine.toml` runs on defaults, the same accommodation the teacher's proof
//! registry makes for a missing `proofs.toml`.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{EngineError, Result};

/// Hash algorithm selection for the pluggable fingerprint hasher.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum HashAlgorithm {
    #[default]
    Sha256,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub hash_algorithm: HashAlgorithm,

    /// Default skip-warning budget for stages that don't declare their own
    /// `max_warnings`. See DESIGN.md's decision on Open Question 3.
    pub default_max_warnings: u32,

    /// Project-relative root under which session trees are created.
    pub session_root: String,

    /// Canonical affirmative vocabulary for phase-jump confirmation.
    pub affirmative_words: Vec<String>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            hash_algorithm: HashAlgorithm::default(),
            default_max_warnings: 3,
            session_root: "data".to_string(),
            affirmative_words: vec![
                "yes".to_string(),
                "y".to_string(),
                "confirm".to_string(),
                "ok".to_string(),
                "affirmative".to_string(),
            ],
        }
    }
}

impl EngineConfig {
    /// Load `engine.toml` from `project_root`, falling back to defaults when
    /// the file is absent.
    pub fn load(project_root: &Path) -> Result<Self> {
        let config_path = project_root.join("engine.toml");
        if !config_path.exists() {
            return Ok(EngineConfig::default());
        }
        let content = std::fs::read_to_string(&config_path)?;
        toml::from_str(&content).map_err(EngineError::from)
    }

    pub fn is_affirmative(&self, input: &str) -> bool {
        let lowered = input.trim().to_lowercase();
        self.affirmative_words.iter().any(|w| *w == lowered)
    }
}
