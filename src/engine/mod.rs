//! The execution engine: command routing, the transition gate, plugin
//! dispatch, and the `Engine::dispatch` entry point that ties them together
//! (§4.5).

pub mod dispatch;
pub mod gate;
pub mod plugin;
pub mod response;
pub mod router;

pub use gate::{evaluate_gate, GateOutcome};
pub use plugin::{
    BlockingPlugin, EchoPlugin, FailingPlugin, Plugin, PluginContext, PluginOutcome,
    PluginRegistry, PluginStatus,
};
pub use response::{ResponseEnvelope, StatusCode};
pub use router::{confirm_jump_intent, resolve as resolve_command, RouterDecision};

use tracing::{debug, warn};

use crate::backend::StorageBackend;
use crate::config::EngineConfig;
use crate::error::Result;
use crate::fingerprint::Hasher;
use crate::graph::Dag;
use crate::store::paths::resolve_stage_paths;
use crate::store::position::resolve_position;
use crate::store::session::touch;
use crate::store::Session;

use dispatch::{auto_decline_stage, dispatch_to_stage};

/// Ties the graph, store, and plugin layers together behind a single
/// `dispatch` call. Borrows everything it needs; it owns no state beyond
/// the per-turn `last_intent` the caller threads through.
pub struct Engine<'a> {
    pub backend: &'a dyn StorageBackend,
    pub config: &'a EngineConfig,
    pub hasher: &'a dyn Hasher,
    pub registry: &'a PluginRegistry,
    pub dag: &'a Dag,
}

impl<'a> Engine<'a> {
    pub fn new(
        backend: &'a dyn StorageBackend,
        config: &'a EngineConfig,
        hasher: &'a dyn Hasher,
        registry: &'a PluginRegistry,
        dag: &'a Dag,
    ) -> Self {
        Engine {
            backend,
            config,
            hasher,
            registry,
            dag,
        }
    }

    /// Resolve, gate, and execute one user input against `session`.
    /// `last_intent` is the confirmation marker carried across turns
    /// (§6 "CONFIRM_JUMP:<targetId>|<input>"); the caller owns its storage.
    pub fn dispatch(
        &self,
        session: &mut Session,
        last_intent: &mut Option<String>,
        input: &str,
    ) -> Result<ResponseEnvelope> {
        let stage_paths = resolve_stage_paths(self.dag, &session.root_path);
        let position = resolve_position(self.dag, &stage_paths, self.backend)?;

        let decision = router::resolve(
            self.dag,
            position.current_stage.as_deref(),
            input,
            last_intent.as_deref(),
            self.config,
        );

        let (target, verb) = match decision {
            RouterDecision::Unrecognized => {
                *last_intent = None;
                debug!(session = %session.id, %input, "unrecognized command");
                return Ok(ResponseEnvelope::unknown(input));
            }
            RouterDecision::PhaseJumpPending {
                stage_id, intent, ..
            } => {
                *last_intent = Some(intent);
                let affirmative = self
                    .config
                    .affirmative_words
                    .first()
                    .cloned()
                    .unwrap_or_else(|| "yes".to_string());
                debug!(session = %session.id, %input, target = %stage_id, "phase jump pending confirmation");
                return Ok(ResponseEnvelope::blocked(format!(
                    "PHASE JUMP DETECTED: '{input}' belongs to stage '{stage_id}'. Jump there? ({affirmative} to confirm)"
                )));
            }
            RouterDecision::Contextual { stage_id, verb } => (stage_id, verb),
            RouterDecision::ConfirmedJump { stage_id, verb } => (stage_id, verb),
        };
        *last_intent = None;

        let gate = evaluate_gate(self.dag, self.config, &target, &position.all_readiness, session);
        if !gate.stale_parents.is_empty() {
            warn!(session = %session.id, target = %target, stale = ?gate.stale_parents, "dispatch blocked on stale ancestors");
            return Ok(ResponseEnvelope::blocked_stale(&gate.stale_parents));
        }
        if !gate.allowed {
            warn!(session = %session.id, target = %target, missing = ?gate.missing_parents, "dispatch blocked on missing prerequisites");
            return Ok(ResponseEnvelope::blocked_missing(&gate.missing_parents));
        }

        for (declined_id, reason) in &gate.auto_declined {
            auto_decline_stage(self.backend, self.hasher, self.dag, &stage_paths, declined_id, reason)?;
        }
        touch(self.backend, session)?;

        let (response, _position) = dispatch_to_stage(
            self.backend,
            self.hasher,
            self.registry,
            self.dag,
            session,
            &stage_paths,
            &target,
            &verb,
        )?;
        debug!(session = %session.id, stage = %target, status = ?response.status_code, "stage dispatched");
        Ok(response)
    }
}
