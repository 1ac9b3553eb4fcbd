//! Structural validation (§4.3): a total function that reports every
//! problem it finds rather than stopping at the first one.

use super::model::Dag;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationReport {
    pub valid: bool,
    pub errors: Vec<String>,
}

pub fn validate(dag: &Dag) -> ValidationReport {
    let mut errors = Vec::new();

    if dag.stages.is_empty() {
        errors.push("DAG has no stages".to_string());
    } else if dag.roots.is_empty() {
        errors.push("DAG has no root stage (every stage declares a previous)".to_string());
    }

    for stage in &dag.stages {
        if stage.produces.is_empty() {
            errors.push(format!("stage '{}' has empty produces", stage.id));
        }
        for parent in stage.previous.parent_ids() {
            if !dag.contains(&parent) {
                errors.push(format!(
                    "stage '{}' references absent parent '{}'",
                    stage.id, parent
                ));
            }
        }
    }

    if !dag.stages.is_empty() && !dag.is_acyclic() {
        let unreached: Vec<&str> = dag
            .stages
            .iter()
            .map(|s| s.id.as_str())
            .filter(|id| !dag.topo_order.iter().any(|t| t == id))
            .collect();
        errors.push(format!(
            "DAG contains a cycle involving stage(s): {}",
            unreached.join(", ")
        ));
    }

    ValidationReport {
        valid: errors.is_empty(),
        errors,
    }
}
