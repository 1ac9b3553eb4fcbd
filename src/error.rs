//! Crate-wide error type.
//!
//! Mirrors the taxonomy kinds of the error handling design: one variant per
//! fatal or non-fatal condition the engine can hit. Fatal (`Parse`,
//! `Validation`) errors are raised by the load path and must be handled by
//! the caller; the rest are captured by the engine and turned into a
//! `ResponseEnvelope` before they ever cross the public boundary.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum EngineError {
    /// Malformed manifest or script: missing required field, unknown
    /// handler, empty `produces`, or a reference to an absent stage.
    #[error("parse error: {0}")]
    Parse(String),

    /// Cycle, orphan reference, no root, duplicate id, or missing parent at
    /// a join. Reported as a list by `validate`, but a direct construction
    /// failure surfaces a single message here.
    #[error("validation error: {0}")]
    Validation(String),

    /// Target stage's required parents are not all complete.
    #[error("blocked: missing prerequisites: {0:?}")]
    BlockedMissing(Vec<String>),

    /// Dispatch or read involves a stale ancestor.
    #[error("blocked: stale ancestor: {0}")]
    BlockedStale(String),

    /// A phase jump requires a second affirmative input.
    #[error("blocked: confirmation required: {0}")]
    BlockedConfirmation(String),

    /// A plugin returned a non-OK status.
    #[error("plugin error: {0}")]
    Plugin(String),

    /// Storage backend read/write/list failure.
    #[error("storage error: {0}")]
    Storage(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
}

pub type Result<T> = std::result::Result<T, EngineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blocked_missing_display_lists_parents() {
        let err = EngineError::BlockedMissing(vec!["gather".into(), "rename".into()]);
        assert!(format!("{err}").contains("gather"));
    }

    #[test]
    fn io_error_converts_via_from() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err: EngineError = io.into();
        assert!(matches!(err, EngineError::Io(_)));
    }
}
