//! Command resolution: contextual verbs first, then a global lookup that
//! requires confirmation before jumping the user somewhere else in the DAG
//! (§4.5 "command resolution", §6 "affirmative vocabulary").

use crate::config::EngineConfig;
use crate::graph::Dag;

const CONFIRM_JUMP_PREFIX: &str = "CONFIRM_JUMP:";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouterDecision {
    /// The verb is one of the current stage's own commands.
    Contextual { stage_id: String, verb: String },
    /// The verb belongs to a different stage; dispatch is withheld pending
    /// a second, affirmative input.
    PhaseJumpPending {
        stage_id: String,
        verb: String,
        intent: String,
    },
    /// The user just confirmed a pending jump.
    ConfirmedJump { stage_id: String, verb: String },
    Unrecognized,
}

/// `last_intent` carries forward the `CONFIRM_JUMP:<targetId>|<input>`
/// marker from the previous turn, if any.
pub fn resolve(
    dag: &Dag,
    current_stage: Option<&str>,
    input: &str,
    last_intent: Option<&str>,
    config: &EngineConfig,
) -> RouterDecision {
    let verb = input.trim();

    if let Some(intent) = last_intent
        && let Some(rest) = intent.strip_prefix(CONFIRM_JUMP_PREFIX)
        && let Some((target, original)) = rest.split_once('|')
        && config.is_affirmative(verb)
        && let Some(stage) = dag.get(target)
        && let Some(matched) = stage.commands.iter().find(|c| c.as_str() == original)
    {
        return RouterDecision::ConfirmedJump {
            stage_id: target.to_string(),
            verb: matched.clone(),
        };
    }

    if let Some(current) = current_stage
        && let Some(stage) = dag.get(current)
        && stage.commands.iter().any(|c| c == verb)
    {
        return RouterDecision::Contextual {
            stage_id: current.to_string(),
            verb: verb.to_string(),
        };
    }

    if let Some(stage) = dag
        .stages_with_command(verb)
        .into_iter()
        .find(|s| Some(s.id.as_str()) != current_stage)
    {
        return RouterDecision::PhaseJumpPending {
            stage_id: stage.id.clone(),
            verb: verb.to_string(),
            intent: confirm_jump_intent(&stage.id, verb),
        };
    }

    RouterDecision::Unrecognized
}

pub fn confirm_jump_intent(target: &str, original_input: &str) -> String {
    format!("{CONFIRM_JUMP_PREFIX}{target}|{original_input}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn dag() -> Dag {
        let text = r#"
[header]
name = "m"
persona = "test"
version = "1"

[[stages]]
id = "search"
name = "Search"
produces = ["out"]
commands = ["search"]

[[stages]]
id = "gather"
name = "Gather"
previous = "search"
produces = ["out"]
commands = ["gather"]
"#;
        crate::graph::manifest_parse(text, &HashSet::new()).unwrap()
    }

    #[test]
    fn contextual_verb_resolves_at_current_stage() {
        let dag = dag();
        let config = EngineConfig::default();
        let decision = resolve(&dag, Some("search"), "search", None, &config);
        assert_eq!(
            decision,
            RouterDecision::Contextual {
                stage_id: "search".to_string(),
                verb: "search".to_string()
            }
        );
    }

    #[test]
    fn global_verb_requires_confirmation_first() {
        let dag = dag();
        let config = EngineConfig::default();
        let decision = resolve(&dag, Some("search"), "gather", None, &config);
        assert_eq!(
            decision,
            RouterDecision::PhaseJumpPending {
                stage_id: "gather".to_string(),
                verb: "gather".to_string(),
                intent: "CONFIRM_JUMP:gather|gather".to_string(),
            }
        );
    }

    #[test]
    fn affirmative_reply_confirms_the_pending_jump() {
        let dag = dag();
        let config = EngineConfig::default();
        let intent = confirm_jump_intent("gather", "gather");
        let decision = resolve(&dag, Some("search"), "yes", Some(&intent), &config);
        assert_eq!(
            decision,
            RouterDecision::ConfirmedJump {
                stage_id: "gather".to_string(),
                verb: "gather".to_string()
            }
        );
    }

    #[test]
    fn non_affirmative_reply_does_not_confirm() {
        let dag = dag();
        let config = EngineConfig::default();
        let intent = confirm_jump_intent("gather", "gather");
        let decision = resolve(&dag, Some("search"), "nope", Some(&intent), &config);
        assert_eq!(decision, RouterDecision::Unrecognized);
    }

    #[test]
    fn unknown_verb_is_unrecognized() {
        let dag = dag();
        let config = EngineConfig::default();
        let decision = resolve(&dag, Some("search"), "frobnicate", None, &config);
        assert_eq!(decision, RouterDecision::Unrecognized);
    }
}
