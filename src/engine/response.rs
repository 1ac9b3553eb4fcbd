//! The response envelope every dispatch call returns (§6, §7). Runtime
//! errors are captured here rather than propagated across the public
//! boundary — only `Parse`/`Validation` errors at load time are real `Err`s.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StatusCode {
    Ok,
    Blocked,
    BlockedMissing,
    BlockedStale,
    Conversational,
    Error,
    Unknown,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResponseEnvelope {
    pub message: String,
    #[serde(default)]
    pub actions: Vec<String>,
    pub success: bool,
    pub status_code: StatusCode,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ui_hints: Option<serde_json::Value>,
}

impl ResponseEnvelope {
    pub fn ok(message: impl Into<String>, actions: Vec<String>) -> Self {
        ResponseEnvelope {
            message: message.into(),
            actions,
            success: true,
            status_code: StatusCode::Ok,
            ui_hints: None,
        }
    }

    pub fn conversational(message: impl Into<String>) -> Self {
        ResponseEnvelope {
            message: message.into(),
            actions: Vec::new(),
            success: true,
            status_code: StatusCode::Conversational,
            ui_hints: None,
        }
    }

    pub fn blocked(message: impl Into<String>) -> Self {
        ResponseEnvelope {
            message: message.into(),
            actions: Vec::new(),
            success: false,
            status_code: StatusCode::Blocked,
            ui_hints: None,
        }
    }

    pub fn blocked_missing(missing: &[String]) -> Self {
        ResponseEnvelope {
            message: format!("Blocked: missing prerequisites {}", missing.join(", ")),
            actions: Vec::new(),
            success: false,
            status_code: StatusCode::BlockedMissing,
            ui_hints: None,
        }
    }

    pub fn blocked_stale(stale: &[String]) -> Self {
        ResponseEnvelope {
            message: format!("Blocked: stale ancestor(s) {}", stale.join(", ")),
            actions: Vec::new(),
            success: false,
            status_code: StatusCode::BlockedStale,
            ui_hints: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        ResponseEnvelope {
            message: message.into(),
            actions: Vec::new(),
            success: false,
            status_code: StatusCode::Error,
            ui_hints: None,
        }
    }

    pub fn unknown(input: &str) -> Self {
        ResponseEnvelope {
            message: format!("Unrecognized command: '{input}'"),
            actions: Vec::new(),
            success: false,
            status_code: StatusCode::Unknown,
            ui_hints: None,
        }
    }
}
