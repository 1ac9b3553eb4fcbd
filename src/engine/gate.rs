//! The transition gate: whether advancing to a target stage is allowed, and
//! which of its optional, not-yet-complete parents get auto-declined along
//! the way (§4.5 "transition gate").

use std::collections::BTreeMap;

use crate::config::EngineConfig;
use crate::graph::Dag;
use crate::store::Readiness;
use crate::store::Session;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GateOutcome {
    pub allowed: bool,
    pub missing_parents: Vec<String>,
    pub stale_parents: Vec<String>,
    /// `(stage_id, reason)` for every optional parent auto-declined this
    /// call. The caller is responsible for writing each one's skip
    /// envelope.
    pub auto_declined: Vec<(String, String)>,
}

/// Evaluate whether `target` may run now, auto-declining optional pending
/// parents against their per-session `max_warnings` budget (§4.5,
/// DESIGN.md Open Question 3). Mutates `session.skip_warnings_remaining` in
/// place; the caller persists the session afterward.
pub fn evaluate_gate(
    dag: &Dag,
    config: &EngineConfig,
    target: &str,
    readiness: &BTreeMap<String, Readiness>,
    session: &mut Session,
) -> GateOutcome {
    let Some(stage) = dag.get(target) else {
        return GateOutcome::default();
    };

    let mut missing_parents = Vec::new();
    let mut stale_parents = Vec::new();
    let mut auto_declined = Vec::new();

    for parent_id in stage.previous.parent_ids() {
        match readiness.get(&parent_id) {
            Some(Readiness::Complete) => {}
            Some(Readiness::Stale) => stale_parents.push(parent_id),
            Some(Readiness::Ready) | Some(Readiness::PendingParents) | None => {
                let Some(parent_stage) = dag.get(&parent_id) else {
                    missing_parents.push(parent_id);
                    continue;
                };
                if !parent_stage.optional {
                    missing_parents.push(parent_id);
                    continue;
                }

                let default_budget = parent_stage
                    .skip_warning
                    .as_ref()
                    .and_then(|w| w.max_warnings)
                    .unwrap_or(config.default_max_warnings);
                let remaining = session
                    .skip_warnings_remaining
                    .entry(parent_id.clone())
                    .or_insert(default_budget);

                if *remaining > 0 {
                    *remaining -= 1;
                    let reason = format!("Auto-declined: user proceeded to {target}");
                    auto_declined.push((parent_id, reason));
                } else {
                    missing_parents.push(parent_id);
                }
            }
        }
    }

    GateOutcome {
        allowed: missing_parents.is_empty() && stale_parents.is_empty(),
        missing_parents,
        stale_parents,
        auto_declined,
    }
}
