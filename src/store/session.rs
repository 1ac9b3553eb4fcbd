//! Session lifecycle: creation, resume, and listing (§4.4, §5 "reset
//! allocates a fresh session rather than mutating in place").

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::backend::StorageBackend;
use crate::config::EngineConfig;
use crate::error::{EngineError, Result};
use crate::time::{new_id, now_rfc3339};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub id: String,
    pub persona: String,
    pub manifest_version: String,
    pub created: String,
    pub last_active: String,
    pub root_path: String,
    /// Remaining auto-decline budget per optional stage, scoped to this
    /// session (DESIGN.md Open Question 3). Absent entries fall back to the
    /// stage's own `skip_warning.max_warnings` or the engine default.
    #[serde(default)]
    pub skip_warnings_remaining: BTreeMap<String, u32>,
}

impl Session {
    pub fn session_file(&self) -> String {
        format!("{}/session.json", self.root_path)
    }
}

/// Create a new session and persist `session.json` at its freshly allocated
/// root path. Never mutates an existing session tree.
pub fn session_create(
    backend: &dyn StorageBackend,
    config: &EngineConfig,
    persona: &str,
    manifest_version: &str,
) -> Result<Session> {
    let id = new_id();
    let root_path = format!("{}/{}/{}", config.session_root, persona, id);
    let now = now_rfc3339();
    let session = Session {
        id,
        persona: persona.to_string(),
        manifest_version: manifest_version.to_string(),
        created: now.clone(),
        last_active: now,
        root_path,
        skip_warnings_remaining: BTreeMap::new(),
    };
    persist(backend, &session)?;
    Ok(session)
}

/// Resume a session by id under `persona`, refreshing `last_active`.
pub fn session_resume(
    backend: &dyn StorageBackend,
    config: &EngineConfig,
    persona: &str,
    id: &str,
) -> Result<Session> {
    let root_path = format!("{}/{}/{}", config.session_root, persona, id);
    let mut session = read_session_at(backend, &root_path)?
        .ok_or_else(|| EngineError::Storage(format!("no session '{id}' for persona '{persona}'")))?;
    session.last_active = now_rfc3339();
    persist(backend, &session)?;
    Ok(session)
}

/// Record activity without a full resume, used when a stage re-execution
/// should also refresh `last_active` (DESIGN.md Open Question 1).
pub fn touch(backend: &dyn StorageBackend, session: &mut Session) -> Result<()> {
    session.last_active = now_rfc3339();
    persist(backend, session)
}

/// All sessions for `persona`, most recently active first.
pub fn sessions_list(
    backend: &dyn StorageBackend,
    config: &EngineConfig,
    persona: &str,
) -> Result<Vec<Session>> {
    let persona_dir = format!("{}/{}", config.session_root, persona);
    let ids = backend.list_children(&persona_dir).unwrap_or_default();
    let mut sessions = Vec::new();
    for id in ids {
        let root_path = format!("{persona_dir}/{id}");
        if let Some(session) = read_session_at(backend, &root_path)? {
            sessions.push(session);
        }
    }
    sessions.sort_by(|a, b| b.last_active.cmp(&a.last_active));
    Ok(sessions)
}

fn read_session_at(backend: &dyn StorageBackend, root_path: &str) -> Result<Option<Session>> {
    let path = format!("{root_path}/session.json");
    let Some(bytes) = backend.read(&path)? else {
        return Ok(None);
    };
    Ok(Some(serde_json::from_slice(&bytes)?))
}

fn persist(backend: &dyn StorageBackend, session: &Session) -> Result<()> {
    let bytes = serde_json::to_vec_pretty(session)?;
    backend.write(&session.session_file(), &bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::MemoryBackend;

    #[test]
    fn create_then_resume_refreshes_last_active() {
        let backend = MemoryBackend::new();
        let config = EngineConfig::default();
        let session = session_create(&backend, &config, "alice", "1.0").unwrap();
        let created_at = session.last_active.clone();

        std::thread::sleep(std::time::Duration::from_millis(10));
        let resumed = session_resume(&backend, &config, "alice", &session.id).unwrap();
        assert_eq!(resumed.id, session.id);
        assert!(resumed.last_active >= created_at);
    }

    #[test]
    fn list_orders_by_last_active_descending() {
        let backend = MemoryBackend::new();
        let config = EngineConfig::default();
        let first = session_create(&backend, &config, "alice", "1.0").unwrap();
        let second = session_create(&backend, &config, "alice", "1.0").unwrap();
        session_resume(&backend, &config, "alice", &first.id).unwrap();

        let sessions = sessions_list(&backend, &config, "alice").unwrap();
        assert_eq!(sessions.len(), 2);
        assert_eq!(sessions[0].id, first.id);
        assert_eq!(sessions[1].id, second.id);
    }
}
