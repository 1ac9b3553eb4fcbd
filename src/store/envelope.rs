//! Artifact envelopes: the unit the store reads and writes (§3, §6).

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::backend::StorageBackend;
use crate::error::Result;

/// `content` is either the plugin's opaque payload or the skip sentinel for
/// a declined optional stage (§3 "Skip sentinel").
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum EnvelopeContent {
    Skip { skipped: bool, reason: String },
    Regular(serde_json::Value),
}

impl EnvelopeContent {
    pub fn skip(reason: impl Into<String>) -> Self {
        EnvelopeContent::Skip {
            skipped: true,
            reason: reason.into(),
        }
    }

    pub fn is_skip(&self) -> bool {
        matches!(self, EnvelopeContent::Skip { skipped: true, .. })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArtifactEnvelope {
    pub stage: String,
    pub timestamp: String,
    pub parameters_used: serde_json::Value,
    pub content: EnvelopeContent,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub materialized: Option<Vec<String>>,
    #[serde(rename = "_fingerprint")]
    pub fingerprint: String,
    #[serde(rename = "_parent_fingerprints")]
    pub parent_fingerprints: BTreeMap<String, String>,
}

/// The path a stage's envelope lives at, given the directory it materialized
/// under.
pub fn envelope_path(stage_dir: &str, stage_id: &str) -> String {
    format!("{stage_dir}/meta/{stage_id}.json")
}

pub fn artifact_write(
    backend: &dyn StorageBackend,
    stage_dir: &str,
    stage_id: &str,
    envelope: &ArtifactEnvelope,
) -> Result<()> {
    let bytes = serde_json::to_vec_pretty(envelope)?;
    backend.write(&envelope_path(stage_dir, stage_id), &bytes)
}

pub fn artifact_read(
    backend: &dyn StorageBackend,
    stage_dir: &str,
    stage_id: &str,
) -> Result<Option<ArtifactEnvelope>> {
    let Some(bytes) = backend.read(&envelope_path(stage_dir, stage_id))? else {
        return Ok(None);
    };
    Ok(Some(serde_json::from_slice(&bytes)?))
}

pub fn artifact_exists(backend: &dyn StorageBackend, stage_dir: &str, stage_id: &str) -> Result<bool> {
    backend.exists(&envelope_path(stage_dir, stage_id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::MemoryBackend;

    fn sample() -> ArtifactEnvelope {
        ArtifactEnvelope {
            stage: "alpha".into(),
            timestamp: "2026-08-01T00:00:00Z".into(),
            parameters_used: serde_json::json!({}),
            content: EnvelopeContent::Regular(serde_json::json!({"v": 1})),
            materialized: None,
            fingerprint: "fp-1".into(),
            parent_fingerprints: BTreeMap::new(),
        }
    }

    #[test]
    fn write_then_read_round_trips() {
        let backend = MemoryBackend::new();
        artifact_write(&backend, "alpha", "alpha", &sample()).unwrap();
        assert!(artifact_exists(&backend, "alpha", "alpha").unwrap());
        let read = artifact_read(&backend, "alpha", "alpha").unwrap().unwrap();
        assert_eq!(read.fingerprint, "fp-1");
    }

    #[test]
    fn missing_envelope_reads_as_none() {
        let backend = MemoryBackend::new();
        assert!(artifact_read(&backend, "nope", "nope").unwrap().is_none());
        assert!(!artifact_exists(&backend, "nope", "nope").unwrap());
    }

    #[test]
    fn overwrite_represents_re_execution() {
        let backend = MemoryBackend::new();
        artifact_write(&backend, "alpha", "alpha", &sample()).unwrap();
        let mut second = sample();
        second.fingerprint = "fp-2".into();
        artifact_write(&backend, "alpha", "alpha", &second).unwrap();
        let read = artifact_read(&backend, "alpha", "alpha").unwrap().unwrap();
        assert_eq!(read.fingerprint, "fp-2");
    }

    #[test]
    fn skip_content_round_trips_as_skip() {
        let mut env = sample();
        env.content = EnvelopeContent::skip("Auto-declined: user proceeded to harmonize");
        let backend = MemoryBackend::new();
        artifact_write(&backend, "rename", "rename", &env).unwrap();
        let read = artifact_read(&backend, "rename", "rename").unwrap().unwrap();
        assert!(read.content.is_skip());
    }
}
