//! Source storage used by the flattener to read units by canonical path

use std::{
    collections::BTreeMap,
    io,
    path::{Component, Path, PathBuf},
};

/// Error returned when a unit can't be read from storage
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("File not found: {}", .0.display())]
    FileMissing(PathBuf),

    #[error("Failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Synchronous source storage.
///
/// Implementations must be safe to share between threads so independent
/// flatten passes can run concurrently against one store.
pub trait SourceStore: Send + Sync {
    /// Returns the canonical identity of `path` if a file exists there
    fn canonicalize(&self, path: &Path) -> Option<PathBuf>;

    /// Reads the raw text of a unit by canonical path
    fn read(&self, path: &Path) -> Result<String, StoreError>;
}

/// Filesystem-backed store
#[derive(Debug, Clone, Copy, Default)]
pub struct FsStore;

impl SourceStore for FsStore {
    fn canonicalize(&self, path: &Path) -> Option<PathBuf> {
        if !path.is_file() {
            return None;
        }
        std::fs::canonicalize(path).ok()
    }

    fn read(&self, path: &Path) -> Result<String, StoreError> {
        std::fs::read_to_string(path).map_err(|source| {
            if source.kind() == io::ErrorKind::NotFound {
                StoreError::FileMissing(path.to_path_buf())
            } else {
                StoreError::Io {
                    path: path.to_path_buf(),
                    source,
                }
            }
        })
    }
}

/// In-memory store keyed by lexically normalized absolute paths
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    files: BTreeMap<PathBuf, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces a file
    pub fn insert(&mut self, path: impl AsRef<Path>, content: impl Into<String>) {
        self.files
            .insert(normalize_path(path.as_ref()), content.into());
    }

    /// Builder-style variant of [`MemoryStore::insert`]
    pub fn with_file(mut self, path: impl AsRef<Path>, content: impl Into<String>) -> Self {
        self.insert(path, content);
        self
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

impl SourceStore for MemoryStore {
    fn canonicalize(&self, path: &Path) -> Option<PathBuf> {
        let normalized = normalize_path(path);
        self.files.contains_key(&normalized).then_some(normalized)
    }

    fn read(&self, path: &Path) -> Result<String, StoreError> {
        self.files
            .get(&normalize_path(path))
            .cloned()
            .ok_or_else(|| StoreError::FileMissing(path.to_path_buf()))
    }
}

/// Lexically normalizes a path, folding `.` and `..` without touching the filesystem
pub fn normalize_path(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    out.push("..");
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}
