//! Kahn's algorithm, with ties broken by manifest insertion order so results
//! are deterministic and match the "first root in insertion order" tie-break
//! rule (§4.3).

use std::collections::{HashMap, VecDeque};

use super::model::StageDef;

/// Returns the best-effort topological order: every node reachable by
/// repeatedly removing zero-indegree nodes. If the graph is cyclic, the
/// returned order is shorter than `stages.len()` — the caller (`validate`)
/// is responsible for surfacing that as an error.
pub fn topological_order(stages: &[StageDef], edges: &[(String, String)]) -> Vec<String> {
    let position: HashMap<&str, usize> = stages
        .iter()
        .enumerate()
        .map(|(i, s)| (s.id.as_str(), i))
        .collect();

    let mut indegree: HashMap<String, usize> = stages.iter().map(|s| (s.id.clone(), 0)).collect();
    let mut children: HashMap<String, Vec<String>> =
        stages.iter().map(|s| (s.id.clone(), Vec::new())).collect();

    for (parent, child) in edges {
        if let Some(entry) = indegree.get_mut(child) {
            *entry += 1;
        }
        if let Some(entry) = children.get_mut(parent) {
            entry.push(child.clone());
        }
    }

    let mut ready: Vec<String> = stages
        .iter()
        .filter(|s| indegree.get(&s.id).copied().unwrap_or(0) == 0)
        .map(|s| s.id.clone())
        .collect();
    ready.sort_by_key(|id| position.get(id.as_str()).copied().unwrap_or(usize::MAX));
    let mut queue: VecDeque<String> = ready.into();

    let mut order = Vec::with_capacity(stages.len());
    while let Some(id) = queue.pop_front() {
        order.push(id.clone());
        let mut unlocked = Vec::new();
        if let Some(kids) = children.get(&id) {
            for child in kids {
                if let Some(entry) = indegree.get_mut(child) {
                    *entry -= 1;
                    if *entry == 0 {
                        unlocked.push(child.clone());
                    }
                }
            }
        }
        unlocked.sort_by_key(|id| position.get(id.as_str()).copied().unwrap_or(usize::MAX));
        for id in unlocked {
            queue.push_back(id);
        }
    }

    order
}
