//! Manifest parsing: TOML text in, a `Dag` out (§4.3, §6).
//!
//! The manifest format is TOML, matching the configuration format already
//! used elsewhere in the ambient stack (`EngineConfig`, the teacher's
//! `proofs.toml`). `#[serde(deny_unknown_fields)]` on the raw structs gives
//! us "unknown fields are rejected" for free.

use std::collections::{HashMap, HashSet};

use serde::Deserialize;

use crate::error::{EngineError, Result};

use super::model::{Dag, ManifestHeader, RawStage, StageDef};
use super::topo::topological_order;

#[derive(Debug, Deserialize)]
struct RawManifest {
    header: ManifestHeader,
    #[serde(default, rename = "stages")]
    stages: Vec<RawStage>,
}

/// Parse a manifest document, rejecting unknown handler references.
/// `known_handlers` is the set of handler ids registered with the plugin
/// registry at the call site (§4.3: "Rejects: ... unknown or unsafe handler
/// references").
pub fn manifest_parse(text: &str, known_handlers: &HashSet<String>) -> Result<Dag> {
    let raw: RawManifest =
        toml::from_str(text).map_err(|e| EngineError::Parse(format!("malformed manifest: {e}")))?;

    if raw.stages.is_empty() {
        return build_dag(raw.header, Vec::new());
    }

    let mut seen_ids = HashSet::new();
    let mut stages = Vec::with_capacity(raw.stages.len());
    for raw_stage in raw.stages {
        if !seen_ids.insert(raw_stage.id.clone()) {
            return Err(EngineError::Parse(format!(
                "duplicate stage id '{}'",
                raw_stage.id
            )));
        }
        if raw_stage.produces.is_empty() {
            return Err(EngineError::Parse(format!(
                "stage '{}' has empty produces",
                raw_stage.id
            )));
        }
        if let Some(handler) = &raw_stage.handler
            && !known_handlers.contains(handler)
        {
            return Err(EngineError::Parse(format!(
                "stage '{}' references unknown handler '{}'",
                raw_stage.id, handler
            )));
        }
        stages.push(StageDef::from_raw(raw_stage));
    }

    for stage in &stages {
        for parent in stage.previous.parent_ids() {
            if !seen_ids.contains(&parent) {
                return Err(EngineError::Parse(format!(
                    "stage '{}' references absent parent '{}'",
                    stage.id, parent
                )));
            }
        }
    }

    build_dag(raw.header, stages)
}

pub(crate) fn build_dag(header: ManifestHeader, stages: Vec<StageDef>) -> Result<Dag> {
    let index: HashMap<String, usize> = stages
        .iter()
        .enumerate()
        .map(|(i, s)| (s.id.clone(), i))
        .collect();

    let mut edges = Vec::new();
    let mut has_incoming = HashSet::new();
    for stage in &stages {
        for parent in stage.previous.parent_ids() {
            edges.push((parent, stage.id.clone()));
            has_incoming.insert(stage.id.clone());
        }
    }

    let roots: Vec<String> = stages
        .iter()
        .filter(|s| matches!(s.previous, super::model::Previous::Root))
        .map(|s| s.id.clone())
        .collect();

    let has_outgoing: HashSet<&String> = edges.iter().map(|(p, _)| p).collect();
    let terminals: Vec<String> = stages
        .iter()
        .filter(|s| !has_outgoing.contains(&s.id))
        .map(|s| s.id.clone())
        .collect();

    let topo_order = topological_order(&stages, &edges);

    Ok(Dag {
        header,
        stages,
        index,
        edges,
        roots,
        terminals,
        topo_order,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const LINEAR: &str = r#"
[header]
name = "linear"
persona = "test"
version = "1"

[[stages]]
id = "alpha"
name = "Alpha"
produces = ["out"]
commands = ["alpha"]

[[stages]]
id = "beta"
name = "Beta"
previous = "alpha"
produces = ["out"]
commands = ["beta"]
"#;

    #[test]
    fn parses_linear_manifest() {
        let dag = manifest_parse(LINEAR, &HashSet::new()).unwrap();
        assert_eq!(dag.stages.len(), 2);
        assert_eq!(dag.roots, vec!["alpha".to_string()]);
        assert_eq!(dag.topo_order, vec!["alpha".to_string(), "beta".to_string()]);
    }

    #[test]
    fn rejects_empty_produces() {
        let text = r#"
[header]
name = "bad"
persona = "test"
version = "1"

[[stages]]
id = "alpha"
name = "Alpha"
produces = []
"#;
        let err = manifest_parse(text, &HashSet::new()).unwrap_err();
        assert!(matches!(err, EngineError::Parse(_)));
    }

    #[test]
    fn rejects_reference_to_absent_stage() {
        let text = r#"
[header]
name = "bad"
persona = "test"
version = "1"

[[stages]]
id = "beta"
name = "Beta"
previous = "missing"
produces = ["out"]
"#;
        let err = manifest_parse(text, &HashSet::new()).unwrap_err();
        assert!(matches!(err, EngineError::Parse(_)));
    }

    #[test]
    fn rejects_unknown_handler() {
        let text = r#"
[header]
name = "bad"
persona = "test"
version = "1"

[[stages]]
id = "alpha"
name = "Alpha"
produces = ["out"]
handler = "nonexistent"
"#;
        let err = manifest_parse(text, &HashSet::new()).unwrap_err();
        assert!(matches!(err, EngineError::Parse(_)));
    }

    #[test]
    fn accepts_known_handler() {
        let mut known = HashSet::new();
        known.insert("echo".to_string());
        let text = r#"
[header]
name = "ok"
persona = "test"
version = "1"

[[stages]]
id = "alpha"
name = "Alpha"
produces = ["out"]
handler = "echo"
"#;
        assert!(manifest_parse(text, &known).is_ok());
    }

    #[test]
    fn parses_join_from_sequence_previous() {
        let text = r#"
[header]
name = "join"
persona = "test"
version = "1"

[[stages]]
id = "gather"
name = "Gather"
produces = ["out"]

[[stages]]
id = "rename"
name = "Rename"
previous = "gather"
produces = ["out"]

[[stages]]
id = "harmonize"
name = "Harmonize"
previous = ["rename", "gather"]
produces = ["out"]
"#;
        let dag = manifest_parse(text, &HashSet::new()).unwrap();
        let harmonize = dag.get("harmonize").unwrap();
        assert!(harmonize.previous.is_join());
        assert_eq!(
            harmonize.previous.parent_ids(),
            vec!["rename".to_string(), "gather".to_string()]
        );
    }

    #[test]
    fn rejects_duplicate_ids() {
        let text = r#"
[header]
name = "dup"
persona = "test"
version = "1"

[[stages]]
id = "alpha"
name = "Alpha"
produces = ["out"]

[[stages]]
id = "alpha"
name = "Alpha2"
produces = ["out"]
"#;
        let err = manifest_parse(text, &HashSet::new()).unwrap_err();
        assert!(matches!(err, EngineError::Parse(_)));
    }
}
