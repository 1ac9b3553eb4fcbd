//! Materialization on success: hashing, envelope writes, join
//! materialization, and auto-advance through handler-less stages (§4.5).

use std::collections::BTreeMap;

use crate::backend::StorageBackend;
use crate::error::Result;
use crate::fingerprint::Hasher;
use crate::graph::Dag;
use crate::store::envelope::{artifact_read, artifact_write, ArtifactEnvelope, EnvelopeContent};
use crate::store::join::materialize_join;
use crate::store::position::{resolve_position, WorkflowPosition};
use crate::store::session::touch;
use crate::store::Session;
use crate::time::now_rfc3339;

use super::plugin::{PluginContext, PluginOutcome, PluginRegistry, PluginStatus};
use super::response::{ResponseEnvelope, StatusCode};

fn parent_fingerprints(
    backend: &dyn StorageBackend,
    stage_paths: &BTreeMap<String, String>,
    parent_ids: &[String],
) -> Result<BTreeMap<String, String>> {
    let mut out = BTreeMap::new();
    for parent in parent_ids {
        if let Some(dir) = stage_paths.get(parent)
            && let Some(envelope) = artifact_read(backend, dir, parent)?
        {
            out.insert(parent.clone(), envelope.fingerprint);
        }
    }
    Ok(out)
}

fn write_skip(
    backend: &dyn StorageBackend,
    hasher: &dyn Hasher,
    stage_dir: &str,
    stage_id: &str,
    parents: &BTreeMap<String, String>,
    reason: &str,
) -> Result<()> {
    let content = EnvelopeContent::skip(reason.to_string());
    let bytes = serde_json::to_vec(&content)?;
    let envelope = ArtifactEnvelope {
        stage: stage_id.to_string(),
        timestamp: now_rfc3339(),
        parameters_used: serde_json::Value::Null,
        content,
        materialized: None,
        fingerprint: hasher.fingerprint(&bytes, parents),
        parent_fingerprints: parents.clone(),
    };
    artifact_write(backend, stage_dir, stage_id, &envelope)
}

/// Write the skip envelope for a stage the transition gate auto-declined on
/// the caller's behalf (§4.5 "Auto-declined: user proceeded to ...").
pub fn auto_decline_stage(
    backend: &dyn StorageBackend,
    hasher: &dyn Hasher,
    dag: &Dag,
    stage_paths: &BTreeMap<String, String>,
    stage_id: &str,
    reason: &str,
) -> Result<()> {
    let stage_dir = stage_paths
        .get(stage_id)
        .expect("stage_paths covers every stage in the dag");
    backend.make_dir(stage_dir)?;
    let parent_ids = dag
        .get(stage_id)
        .map(|s| s.previous.parent_ids())
        .unwrap_or_default();
    let parents = parent_fingerprints(backend, stage_paths, &parent_ids)?;
    write_skip(backend, hasher, stage_dir, stage_id, &parents, reason)
}

/// Run `stage_id`'s handler (or, for a handler-less stage, materialize an
/// empty structural artifact) and write its envelope.
fn materialize_stage(
    backend: &dyn StorageBackend,
    hasher: &dyn Hasher,
    registry: &PluginRegistry,
    dag: &Dag,
    stage_paths: &BTreeMap<String, String>,
    stage_id: &str,
    input: &str,
) -> Result<PluginOutcome> {
    let stage = dag
        .get(stage_id)
        .expect("dispatch only targets stages that exist in the dag");
    let stage_dir = stage_paths
        .get(stage_id)
        .expect("stage_paths covers every stage in the dag")
        .clone();

    backend.make_dir(&stage_dir)?;
    if stage.previous.is_join() {
        materialize_join(backend, &stage_dir, &stage.previous.parent_ids(), stage_paths)?;
    }

    let parents = parent_fingerprints(backend, stage_paths, &stage.previous.parent_ids())?;

    if stage.is_script_skipped() {
        let reason = stage
            .skip_warning
            .as_ref()
            .map(|w| w.reason.clone())
            .unwrap_or_else(|| "Skipped by script".to_string());
        write_skip(backend, hasher, &stage_dir, stage_id, &parents, &reason)?;
        return Ok(PluginOutcome::ok("skipped", serde_json::Value::Null));
    }

    let outcome = match &stage.handler {
        None => PluginOutcome::ok("materialized", serde_json::json!({})),
        Some(handler_id) => {
            let plugin = registry
                .get(handler_id)
                .expect("unknown handlers are rejected at manifest_parse time");
            let ctx = PluginContext {
                stage_id,
                parameters: &stage.parameters,
                input,
            };
            plugin.call(&ctx)?
        }
    };

    if outcome.status == PluginStatus::Ok {
        let content = EnvelopeContent::Regular(outcome.artifact_data.clone().unwrap_or(serde_json::Value::Null));
        let bytes = serde_json::to_vec(&content)?;
        let envelope = ArtifactEnvelope {
            stage: stage_id.to_string(),
            timestamp: now_rfc3339(),
            parameters_used: stage.parameters.clone(),
            content,
            materialized: outcome.materialized.clone(),
            fingerprint: hasher.fingerprint(&bytes, &parents),
            parent_fingerprints: parents,
        };
        artifact_write(backend, &stage_dir, stage_id, &envelope)?;
    }

    Ok(outcome)
}

fn status_code_for(status: PluginStatus) -> StatusCode {
    match status {
        PluginStatus::Ok => StatusCode::Ok,
        PluginStatus::Blocked => StatusCode::Blocked,
        PluginStatus::BlockedMissing => StatusCode::BlockedMissing,
        PluginStatus::BlockedStale => StatusCode::BlockedStale,
        PluginStatus::Conversational => StatusCode::Conversational,
        PluginStatus::Error => StatusCode::Error,
        PluginStatus::Unknown => StatusCode::Unknown,
    }
}

/// Dispatch a resolved command to `stage_id`, then auto-advance through any
/// immediately following stages that have no handler of their own (§4.5
/// "auto-advance through structural stages").
pub fn dispatch_to_stage(
    backend: &dyn StorageBackend,
    hasher: &dyn Hasher,
    registry: &PluginRegistry,
    dag: &Dag,
    session: &mut Session,
    stage_paths: &BTreeMap<String, String>,
    stage_id: &str,
    input: &str,
) -> Result<(ResponseEnvelope, WorkflowPosition)> {
    let outcome = materialize_stage(backend, hasher, registry, dag, stage_paths, stage_id, input)?;
    touch(backend, session)?;

    let mut position = resolve_position(dag, stage_paths, backend)?;

    if outcome.status == PluginStatus::Ok {
        while let Some(next_id) = position.current_stage.clone() {
            let next_stage = dag.get(&next_id).expect("current_stage always names a real stage");
            if next_stage.handler.is_some() || next_stage.is_script_skipped() {
                break;
            }
            materialize_stage(backend, hasher, registry, dag, stage_paths, &next_id, input)?;
            position = resolve_position(dag, stage_paths, backend)?;
        }
    }

    let response = ResponseEnvelope {
        message: outcome.message,
        actions: Vec::new(),
        success: outcome.status == PluginStatus::Ok,
        status_code: status_code_for(outcome.status),
        ui_hints: outcome.ui_hints,
    };

    Ok((response, position))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::MemoryBackend;
    use crate::config::EngineConfig;
    use crate::fingerprint::Sha256Hasher;
    use crate::store::paths::resolve_stage_paths;
    use crate::store::session::session_create;
    use std::collections::HashSet;

    fn dag() -> Dag {
        let text = r#"
[header]
name = "m"
persona = "test"
version = "1"

[[stages]]
id = "alpha"
name = "Alpha"
produces = ["out"]
commands = ["go"]
handler = "echo"

[[stages]]
id = "beta"
name = "Beta"
previous = "alpha"
produces = ["out"]
commands = ["go"]
"#;
        let mut known = HashSet::new();
        known.insert("echo".to_string());
        crate::graph::manifest_parse(text, &known).unwrap()
    }

    #[test]
    fn dispatch_materializes_and_auto_advances_handlerless_child() {
        let dag = dag();
        let backend = MemoryBackend::new();
        let config = EngineConfig::default();
        let hasher = Sha256Hasher;
        let mut registry = PluginRegistry::new();
        registry.register("echo", Box::new(super::super::plugin::EchoPlugin));
        let mut session = session_create(&backend, &config, "alice", "1.0").unwrap();
        let stage_paths = resolve_stage_paths(&dag, &session.root_path);

        let (response, position) = dispatch_to_stage(
            &backend, &hasher, &registry, &dag, &mut session, &stage_paths, "alpha", "go",
        )
        .unwrap();

        assert!(response.success);
        assert_eq!(position.completed_stages, vec!["alpha".to_string(), "beta".to_string()]);
        assert!(position.is_complete);
    }
}
