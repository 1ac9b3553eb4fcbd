use std::collections::{BTreeMap, BTreeSet};
use std::sync::Mutex;

use crate::error::{EngineError, Result};

use super::{LinkRecord, join_path};

/// In-memory tree backend, used by the engine's own test suite and by
/// callers who don't need durability (e.g. scratch sessions).
pub struct MemoryBackend {
    files: Mutex<BTreeMap<String, Vec<u8>>>,
    dirs: Mutex<BTreeSet<String>>,
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryBackend {
    pub fn new() -> Self {
        MemoryBackend {
            files: Mutex::new(BTreeMap::new()),
            dirs: Mutex::new(BTreeSet::new()),
        }
    }

    fn ensure_parents(&self, path: &str) {
        let mut dirs = self.dirs.lock().unwrap();
        let mut components: Vec<&str> = path.split('/').collect();
        components.pop();
        let mut built = String::new();
        for comp in components {
            built = join_path(&built, comp);
            dirs.insert(built.clone());
        }
    }
}

impl super::StorageBackend for MemoryBackend {
    fn write(&self, path: &str, bytes: &[u8]) -> Result<()> {
        self.ensure_parents(path);
        self.files.lock().unwrap().insert(path.to_string(), bytes.to_vec());
        Ok(())
    }

    fn read(&self, path: &str) -> Result<Option<Vec<u8>>> {
        Ok(self.files.lock().unwrap().get(path).cloned())
    }

    fn exists(&self, path: &str) -> Result<bool> {
        let files = self.files.lock().unwrap();
        let dirs = self.dirs.lock().unwrap();
        Ok(files.contains_key(path) || dirs.contains(path))
    }

    fn list_children(&self, path: &str) -> Result<Vec<String>> {
        let prefix = if path.is_empty() {
            String::new()
        } else {
            format!("{path}/")
        };
        let files = self.files.lock().unwrap();
        let dirs = self.dirs.lock().unwrap();
        let mut names = BTreeSet::new();
        for key in files.keys().chain(dirs.iter()) {
            if let Some(rest) = key.strip_prefix(&prefix) {
                if rest.is_empty() {
                    continue;
                }
                let first = rest.split('/').next().unwrap();
                names.insert(first.to_string());
            }
        }
        Ok(names.into_iter().collect())
    }

    fn make_dir(&self, path: &str) -> Result<()> {
        self.ensure_parents(path);
        self.dirs.lock().unwrap().insert(path.to_string());
        Ok(())
    }

    fn link(&self, source: &str, target: &str) -> Result<()> {
        let record = LinkRecord {
            target: target.to_string(),
        };
        let bytes = serde_json::to_vec(&record)?;
        self.write(source, &bytes)
    }

    fn resolve_link(&self, source: &str) -> Result<Option<String>> {
        let Some(bytes) = self.read(source)? else {
            return Ok(None);
        };
        let record: LinkRecord = serde_json::from_slice(&bytes)
            .map_err(|e| EngineError::Storage(format!("'{source}' is not a link: {e}")))?;
        Ok(Some(record.target))
    }
}
