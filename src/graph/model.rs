//! The DAG's static data model: stages, edges, and the manifest header.
//! Everything here is immutable after parse (§3: "Stages are immutable
//! after parse").

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Reserved parameter key a script overlay sets to mark a stage as
/// user-declined before the session ever reaches it (§4.3).
pub const SKIP_SENTINEL_KEY: &str = "__skip__";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PreviousSpec {
    Single(String),
    Multiple(Vec<String>),
}

/// A stage's resolved parent set: `Root` for no parents, `Single` for an
/// ordinary edge, `Join` for a multi-parent convergence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum Previous {
    Root,
    Single(String),
    Join(Vec<String>),
}

impl Previous {
    pub fn parent_ids(&self) -> Vec<String> {
        match self {
            Previous::Root => Vec::new(),
            Previous::Single(id) => vec![id.clone()],
            Previous::Join(ids) => ids.clone(),
        }
    }

    pub fn is_join(&self) -> bool {
        matches!(self, Previous::Join(ids) if ids.len() > 1)
    }

    fn from_spec(spec: Option<PreviousSpec>) -> Self {
        match spec {
            None => Previous::Root,
            Some(PreviousSpec::Single(id)) => Previous::Single(id),
            Some(PreviousSpec::Multiple(ids)) if ids.len() == 1 => {
                Previous::Single(ids.into_iter().next().unwrap())
            }
            Some(PreviousSpec::Multiple(ids)) => Previous::Join(ids),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SkipWarning {
    pub short: String,
    pub reason: String,
    #[serde(default)]
    pub max_warnings: Option<u32>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct RawStage {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub phase: Option<String>,
    #[serde(default)]
    pub previous: Option<PreviousSpec>,
    #[serde(default)]
    pub optional: bool,
    pub produces: Vec<String>,
    #[serde(default)]
    pub parameters: serde_json::Value,
    #[serde(default)]
    pub instruction: String,
    #[serde(default)]
    pub commands: Vec<String>,
    #[serde(default)]
    pub handler: Option<String>,
    #[serde(default)]
    pub skip_warning: Option<SkipWarning>,
}

#[derive(Debug, Clone, Serialize)]
pub struct StageDef {
    pub id: String,
    pub name: String,
    pub phase: Option<String>,
    pub previous: Previous,
    pub optional: bool,
    pub produces: Vec<String>,
    pub parameters: serde_json::Value,
    pub instruction: String,
    pub commands: Vec<String>,
    pub handler: Option<String>,
    pub skip_warning: Option<SkipWarning>,
}

impl StageDef {
    pub(crate) fn from_raw(raw: RawStage) -> Self {
        StageDef {
            id: raw.id,
            name: raw.name,
            phase: raw.phase,
            previous: Previous::from_spec(raw.previous),
            optional: raw.optional,
            produces: raw.produces,
            parameters: raw.parameters,
            instruction: raw.instruction,
            commands: raw.commands,
            handler: raw.handler,
            skip_warning: raw.skip_warning,
        }
    }

    /// Whether a script overlay declared this stage skipped before any
    /// execution reached it.
    pub fn is_script_skipped(&self) -> bool {
        self.parameters
            .get(SKIP_SENTINEL_KEY)
            .and_then(serde_json::Value::as_bool)
            .unwrap_or(false)
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct ManifestHeader {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    pub persona: String,
    pub version: String,
    #[serde(default)]
    pub locked: Option<bool>,
    #[serde(default)]
    pub authors: Vec<String>,
}

/// A parsed, structurally-built DAG. May be cyclic if built from a manifest
/// with a cycle; `validate` is what asserts acyclicity (§4.3 scenario 5:
/// `validate` reports, it does not panic).
#[derive(Debug, Clone)]
pub struct Dag {
    pub header: ManifestHeader,
    pub stages: Vec<StageDef>,
    pub(crate) index: HashMap<String, usize>,
    pub edges: Vec<(String, String)>,
    pub roots: Vec<String>,
    pub terminals: Vec<String>,
    /// Best-effort topological order. Partial (shorter than `stages`) when
    /// the graph contains a cycle.
    pub topo_order: Vec<String>,
}

impl Dag {
    pub fn get(&self, id: &str) -> Option<&StageDef> {
        self.index.get(id).map(|&i| &self.stages[i])
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    pub fn is_acyclic(&self) -> bool {
        self.topo_order.len() == self.stages.len()
    }

    /// All stages declaring `verb` among their `commands`.
    pub fn stages_with_command(&self, verb: &str) -> Vec<&StageDef> {
        self.stages
            .iter()
            .filter(|s| s.commands.iter().any(|c| c == verb))
            .collect()
    }
}
