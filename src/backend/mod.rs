//! The storage backend: a small byte-addressable tree abstraction.
//!
//! Six operations are enough for everything above this layer to build on:
//! write, read, exists, list_children, make_dir, link. Paths are `/`
//! separated virtual paths, independent of the concrete backend.

mod filesystem;
mod memory;

pub use filesystem::FilesystemBackend;
pub use memory::MemoryBackend;

use crate::error::Result;

pub trait StorageBackend: Send + Sync {
    /// Write `bytes` at `path`, creating parent directories as needed.
    /// Overwrites any existing content at `path` in its entirety.
    fn write(&self, path: &str, bytes: &[u8]) -> Result<()>;

    /// Read the bytes at `path`, or `None` if `path` does not exist.
    fn read(&self, path: &str) -> Result<Option<Vec<u8>>>;

    /// Whether anything (file or directory) exists at `path`.
    fn exists(&self, path: &str) -> Result<bool>;

    /// Names of direct children of the directory at `path`.
    fn list_children(&self, path: &str) -> Result<Vec<String>>;

    /// Create the directory at `path`, including any missing ancestors.
    fn make_dir(&self, path: &str) -> Result<()>;

    /// Establish a reference at `source` pointing at `target`.
    fn link(&self, source: &str, target: &str) -> Result<()>;

    /// Resolve a reference previously created with `link`, returning the
    /// `target` it points at, or `None` if `source` is not a link.
    fn resolve_link(&self, source: &str) -> Result<Option<String>>;
}

fn join_path(base: &str, child: &str) -> String {
    if base.is_empty() {
        child.to_string()
    } else {
        format!("{base}/{child}")
    }
}

#[derive(serde::Serialize, serde::Deserialize)]
struct LinkRecord {
    target: String,
}
