//! Script overlays: a named manifest reference plus per-stage parameter
//! overrides and `skip:true` markers (§3 "Script overlay", §4.3).

use std::collections::HashMap;

use serde::Deserialize;

use crate::error::{EngineError, Result};

use super::manifest::build_dag;
use super::model::{Dag, SKIP_SENTINEL_KEY};

#[derive(Debug, Deserialize)]
struct RawOverride {
    id: String,
    #[serde(default)]
    parameters: serde_json::Value,
    #[serde(default)]
    skip: bool,
}

#[derive(Debug, Deserialize)]
struct RawScript {
    manifest: String,
    #[serde(default)]
    stages: Vec<RawOverride>,
}

/// Clone `manifest`'s stages, apply the script's per-stage overrides, and
/// rebuild a fresh `Dag`. A reference to a stage absent from the manifest is
/// a fatal parse error (§3).
pub fn script_parse(text: &str, manifest: &Dag) -> Result<Dag> {
    let raw: RawScript =
        toml::from_str(text).map_err(|e| EngineError::Parse(format!("malformed script: {e}")))?;

    let mut stages = manifest.stages.clone();
    let by_id: HashMap<String, usize> = stages
        .iter()
        .enumerate()
        .map(|(i, s)| (s.id.clone(), i))
        .collect();

    for over in raw.stages {
        let Some(&idx) = by_id.get(&over.id) else {
            return Err(EngineError::Parse(format!(
                "script references stage '{}' absent from manifest '{}'",
                over.id, raw.manifest
            )));
        };
        let stage = &mut stages[idx];
        if let (Some(existing), Some(overrides)) =
            (stage.parameters.as_object_mut(), over.parameters.as_object())
        {
            for (k, v) in overrides {
                existing.insert(k.clone(), v.clone());
            }
        } else if !over.parameters.is_null() {
            stage.parameters = over.parameters;
        }
        if over.skip {
            if !stage.parameters.is_object() {
                stage.parameters = serde_json::json!({});
            }
            stage
                .parameters
                .as_object_mut()
                .unwrap()
                .insert(SKIP_SENTINEL_KEY.to_string(), serde_json::Value::Bool(true));
        }
    }

    build_dag(manifest.header.clone(), stages)
}
