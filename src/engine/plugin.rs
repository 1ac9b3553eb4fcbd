//! Plugin dispatch: a handler id maps to exactly one fixed-signature
//! function (§9 "plugin registry is id→function mapping, handlers rejected
//! at parse if unknown").

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::error::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PluginStatus {
    Ok,
    Blocked,
    BlockedMissing,
    BlockedStale,
    Conversational,
    Error,
    Unknown,
}

pub struct PluginContext<'a> {
    pub stage_id: &'a str,
    pub parameters: &'a serde_json::Value,
    pub input: &'a str,
}

#[derive(Debug, Clone)]
pub struct PluginOutcome {
    pub message: String,
    pub status: PluginStatus,
    pub artifact_data: Option<serde_json::Value>,
    pub materialized: Option<Vec<String>>,
    pub ui_hints: Option<serde_json::Value>,
}

impl PluginOutcome {
    pub fn ok(message: impl Into<String>, artifact_data: serde_json::Value) -> Self {
        PluginOutcome {
            message: message.into(),
            status: PluginStatus::Ok,
            artifact_data: Some(artifact_data),
            materialized: None,
            ui_hints: None,
        }
    }
}

pub trait Plugin: Send + Sync {
    fn call(&self, ctx: &PluginContext) -> Result<PluginOutcome>;
}

/// The id→function mapping. A handler id absent here is rejected at parse
/// time by `graph::manifest_parse`, never at dispatch time.
#[derive(Default)]
pub struct PluginRegistry {
    handlers: HashMap<String, Box<dyn Plugin>>,
}

impl PluginRegistry {
    pub fn new() -> Self {
        PluginRegistry::default()
    }

    pub fn register(&mut self, id: impl Into<String>, plugin: Box<dyn Plugin>) {
        self.handlers.insert(id.into(), plugin);
    }

    pub fn known_handlers(&self) -> HashSet<String> {
        self.handlers.keys().cloned().collect()
    }

    pub fn get(&self, id: &str) -> Option<&dyn Plugin> {
        self.handlers.get(id).map(|b| b.as_ref())
    }
}

/// Test double: echoes its input back as artifact content. Stands in for a
/// real domain plugin in tests and examples.
pub struct EchoPlugin;

impl Plugin for EchoPlugin {
    fn call(&self, ctx: &PluginContext) -> Result<PluginOutcome> {
        Ok(PluginOutcome::ok(
            format!("echoed '{}'", ctx.input),
            serde_json::json!({ "echo": ctx.input }),
        ))
    }
}

/// Test double: always reports itself blocked, regardless of input.
pub struct BlockingPlugin;

impl Plugin for BlockingPlugin {
    fn call(&self, _ctx: &PluginContext) -> Result<PluginOutcome> {
        Ok(PluginOutcome {
            message: "not ready yet".to_string(),
            status: PluginStatus::Blocked,
            artifact_data: None,
            materialized: None,
            ui_hints: None,
        })
    }
}

/// Test double: always fails, to exercise the plugin-error path.
pub struct FailingPlugin;

impl Plugin for FailingPlugin {
    fn call(&self, ctx: &PluginContext) -> Result<PluginOutcome> {
        Err(crate::error::EngineError::Plugin(format!(
            "handler for '{}' always fails",
            ctx.stage_id
        )))
    }
}
