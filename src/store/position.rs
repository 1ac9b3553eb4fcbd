//! Workflow position: per-stage readiness, the staleness cascade, and
//! "what's next" — derived on every call, never persisted (§3, §4.3).

use std::collections::BTreeMap;

use crate::backend::StorageBackend;
use crate::error::Result;
use crate::graph::Dag;

use super::envelope::artifact_read;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Readiness {
    /// No artifact yet, and every parent is `Complete` (or there are no
    /// parents at all).
    Ready,
    /// No artifact yet, and at least one parent is not yet `Complete`.
    PendingParents,
    /// Materialized, and its recorded parent fingerprints still match its
    /// parents' current fingerprints.
    Complete,
    /// Materialized, but a parent was re-executed since: either this
    /// stage's recorded parent fingerprints no longer match, or a parent is
    /// itself `Stale` (the cascade).
    Stale,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Progress {
    pub completed: usize,
    pub total: usize,
}

#[derive(Debug, Clone)]
pub struct WorkflowPosition {
    pub completed_stages: Vec<String>,
    pub current_stage: Option<String>,
    pub stale_stages: Vec<String>,
    pub all_readiness: BTreeMap<String, Readiness>,
    pub progress: Progress,
    pub is_complete: bool,
}

/// Classify every stage's readiness, walking the topological order so a
/// parent is always classified before its children (§4.3 "readiness").
pub fn resolve_readiness(
    dag: &Dag,
    stage_paths: &BTreeMap<String, String>,
    backend: &dyn StorageBackend,
) -> Result<BTreeMap<String, Readiness>> {
    let mut readiness: BTreeMap<String, Readiness> = BTreeMap::new();
    let mut fingerprints: BTreeMap<String, String> = BTreeMap::new();

    for id in &dag.topo_order {
        let Some(stage) = dag.get(id) else { continue };
        let parent_ids = stage.previous.parent_ids();
        let Some(stage_dir) = stage_paths.get(id) else {
            readiness.insert(id.clone(), Readiness::PendingParents);
            continue;
        };

        if let Some(envelope) = artifact_read(backend, stage_dir, id)? {
            fingerprints.insert(id.clone(), envelope.fingerprint.clone());

            let any_parent_stale = parent_ids
                .iter()
                .any(|p| readiness.get(p) == Some(&Readiness::Stale));
            let parent_fingerprints_match = parent_ids
                .iter()
                .all(|p| envelope.parent_fingerprints.get(p) == fingerprints.get(p));

            let state = if any_parent_stale || !parent_fingerprints_match {
                Readiness::Stale
            } else {
                Readiness::Complete
            };
            readiness.insert(id.clone(), state);
        } else if parent_ids.is_empty() {
            readiness.insert(id.clone(), Readiness::Ready);
        } else {
            let all_parents_complete = parent_ids
                .iter()
                .all(|p| readiness.get(p) == Some(&Readiness::Complete));
            let state = if all_parents_complete {
                Readiness::Ready
            } else {
                Readiness::PendingParents
            };
            readiness.insert(id.clone(), state);
        }
    }

    Ok(readiness)
}

/// Resolve the full `WorkflowPosition`. `current_stage` is the first stage
/// in topological order that is `Ready` — the topo order already breaks
/// ties by manifest insertion order, so no separate tie-break is needed here
/// (§4.3 "position").
pub fn resolve_position(
    dag: &Dag,
    stage_paths: &BTreeMap<String, String>,
    backend: &dyn StorageBackend,
) -> Result<WorkflowPosition> {
    let all_readiness = resolve_readiness(dag, stage_paths, backend)?;

    let completed_stages: Vec<String> = dag
        .topo_order
        .iter()
        .filter(|id| all_readiness.get(*id) == Some(&Readiness::Complete))
        .cloned()
        .collect();

    let stale_stages: Vec<String> = dag
        .topo_order
        .iter()
        .filter(|id| all_readiness.get(*id) == Some(&Readiness::Stale))
        .cloned()
        .collect();

    let current_stage = dag
        .topo_order
        .iter()
        .find(|id| all_readiness.get(*id) == Some(&Readiness::Ready))
        .cloned();

    let total = dag.stages.len();
    let is_complete = completed_stages.len() == total && stale_stages.is_empty();

    Ok(WorkflowPosition {
        progress: Progress {
            completed: completed_stages.len(),
            total,
        },
        completed_stages,
        current_stage,
        stale_stages,
        all_readiness,
        is_complete,
    })
}
