use std::path::PathBuf;

use crate::error::{EngineError, Result};

use super::LinkRecord;

/// Host-filesystem backend. Reference links are stored as small JSON
/// marker files rather than OS symlinks, so sessions stay portable across
/// platforms and deterministic under test.
pub struct FilesystemBackend {
    root: PathBuf,
}

impl FilesystemBackend {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        FilesystemBackend { root: root.into() }
    }

    fn resolve(&self, path: &str) -> PathBuf {
        self.root.join(path)
    }
}

impl super::StorageBackend for FilesystemBackend {
    fn write(&self, path: &str, bytes: &[u8]) -> Result<()> {
        let full = self.resolve(path);
        if let Some(parent) = full.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(full, bytes)?;
        Ok(())
    }

    fn read(&self, path: &str) -> Result<Option<Vec<u8>>> {
        let full = self.resolve(path);
        match std::fs::read(&full) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn exists(&self, path: &str) -> Result<bool> {
        Ok(self.resolve(path).exists())
    }

    fn list_children(&self, path: &str) -> Result<Vec<String>> {
        let full = self.resolve(path);
        if !full.exists() {
            return Ok(Vec::new());
        }
        if !full.is_dir() {
            return Err(EngineError::Storage(format!("'{path}' is not a directory")));
        }
        let mut names = Vec::new();
        for entry in std::fs::read_dir(&full)? {
            let entry = entry?;
            names.push(entry.file_name().to_string_lossy().to_string());
        }
        names.sort();
        Ok(names)
    }

    fn make_dir(&self, path: &str) -> Result<()> {
        std::fs::create_dir_all(self.resolve(path))?;
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
