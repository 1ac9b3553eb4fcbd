//! Join-node materialization: the descriptor and parent reference links
//! written under `_join_<ids>/` (§3 "Join-node content", §4.4).

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::backend::StorageBackend;
use crate::error::Result;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JoinDescriptor {
    pub parents: Vec<String>,
    pub parent_paths: BTreeMap<String, String>,
}

fn descriptor_path(join_dir: &str) -> String {
    format!("{join_dir}/meta/join.json")
}

/// Materialize `join_dir`: write `meta/join.json` and a reference link to
/// each parent's materialized directory. Always materializes, even when one
/// parent is an ancestor of another (§4.4, §8 boundary case) — the
/// descriptor just ends up recording two paths with a prefix relationship.
/// Idempotent: re-running overwrites the descriptor and links in place.
pub fn materialize_join(
    backend: &dyn StorageBackend,
    join_dir: &str,
    parent_ids: &[String],
    stage_paths: &BTreeMap<String, String>,
) -> Result<()> {
    backend.make_dir(join_dir)?;

    let mut parent_paths = BTreeMap::new();
    for parent in parent_ids {
        let parent_path = stage_paths
            .get(parent)
            .cloned()
            .unwrap_or_else(|| parent.clone());
        backend.link(&format!("{join_dir}/{parent}"), &parent_path)?;
        parent_paths.insert(parent.clone(), parent_path);
    }

    let descriptor = JoinDescriptor {
        parents: parent_ids.to_vec(),
        parent_paths,
    };
    let bytes = serde_json::to_vec_pretty(&descriptor)?;
    backend.write(&descriptor_path(join_dir), &bytes)
}

pub fn read_join_descriptor(
    backend: &dyn StorageBackend,
    join_dir: &str,
) -> Result<Option<JoinDescriptor>> {
    let Some(bytes) = backend.read(&descriptor_path(join_dir))? else {
        return Ok(None);
    };
    Ok(Some(serde_json::from_slice(&bytes)?))
}
