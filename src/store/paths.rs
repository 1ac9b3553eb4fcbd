//! Materialized-path resolution: where each stage's directory lives on the
//! session tree, including the join-anchor rule (§4.4, §6).

use std::collections::BTreeMap;

use crate::graph::{Dag, Previous};

/// The deterministic join directory name: parent ids sorted alphabetically,
/// joined with `_` (§8 scenario: `_join_gather_rename`, never
/// `_join_rename_gather`, regardless of manifest order).
pub fn join_dir_name(parent_ids: &[String]) -> String {
    let mut sorted = parent_ids.to_vec();
    sorted.sort();
    format!("_join_{}", sorted.join("_"))
}

/// Compute every stage's materialized directory path, in topological order
/// so a parent's path is always resolved before any child needs it.
///
/// A join stage is anchored under the parent whose own path has the most
/// segments — the parent deepest in the session tree. When one of a join's
/// parents is itself an ancestor of the other, the descendant is always the
/// deeper one, so this rule picks it without any special-casing for that
/// boundary case.
pub fn resolve_stage_paths(dag: &Dag, session_root: &str) -> BTreeMap<String, String> {
    let mut paths: BTreeMap<String, String> = BTreeMap::new();

    for id in &dag.topo_order {
        let Some(stage) = dag.get(id) else { continue };
        let path = match &stage.previous {
            Previous::Root => format!("{session_root}/{id}"),
            Previous::Single(parent) => {
                let parent_path = paths
                    .get(parent)
                    .cloned()
                    .unwrap_or_else(|| format!("{session_root}/{parent}"));
                format!("{parent_path}/{id}")
            }
            Previous::Join(parent_ids) => {
                let anchor = parent_ids
                    .iter()
                    .max_by_key(|p| {
                        paths
                            .get(*p)
                            .map(|path: &String| path.matches('/').count())
                            .unwrap_or(0)
                    })
                    .expect("join stage always has at least one parent id");
                let anchor_path = paths
                    .get(anchor)
                    .cloned()
                    .unwrap_or_else(|| format!("{session_root}/{anchor}"));
                format!("{anchor_path}/{}", join_dir_name(parent_ids))
            }
        };
        paths.insert(id.clone(), path);
    }

    paths
}
