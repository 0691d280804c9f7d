//! The storage backend contract and the backends shipped with the core.
//!
//! A backend performs raw I/O and nothing else: no validation, no policy.
//! Anything satisfying [`StorageBackend`] (local disk, an in-memory store for
//! tests, a browser-bridge backend) plugs into the workspace façade without
//! changes above it.

mod local;
mod memory;

use std::io;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub use local::LocalFsBackend;
pub use memory::MemoryBackend;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    File,
    Folder,
}

/// Metadata for a single entry, as reported by the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntryStat {
    #[serde(rename = "type")]
    pub kind: EntryKind,
    pub size: u64,
    pub created_at: Option<DateTime<Utc>>,
    pub modified_at: Option<DateTime<Utc>>,
}

/// One child of a listed directory. `path` is absolute, forward-slashed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DirEntry {
    pub name: String,
    pub path: String,
    #[serde(rename = "type")]
    pub kind: EntryKind,
}

/// Raw storage operations. All methods may suspend; all return
/// `std::io::Result` so the façade can wrap failures with operation context.
#[async_trait]
pub trait StorageBackend: Send + Sync {
    async fn exists(&self, path: &Path) -> io::Result<bool>;

    async fn stat(&self, path: &Path) -> io::Result<EntryStat>;

    async fn read(&self, path: &Path) -> io::Result<String>;

    async fn read_binary(&self, path: &Path) -> io::Result<Vec<u8>>;

    async fn write(&self, path: &Path, content: &str) -> io::Result<()>;

    async fn write_binary(&self, path: &Path, content: &[u8]) -> io::Result<()>;

    /// Remove a file, or a folder and everything under it.
    async fn delete(&self, path: &Path) -> io::Result<()>;

    async fn move_entry(&self, from: &Path, to: &Path) -> io::Result<()>;

    /// Copy a file, or a folder recursively.
    async fn copy(&self, from: &Path, to: &Path) -> io::Result<()>;

    /// Create a directory, including missing parents.
    async fn mkdir(&self, path: &Path) -> io::Result<()>;

    async fn list(&self, path: &Path) -> io::Result<Vec<DirEntry>>;

    /// Rename an entry in place; `new_name` is a single segment.
    async fn rename(&self, path: &Path, new_name: &str) -> io::Result<()>;

    async fn is_symlink(&self, path: &Path) -> io::Result<bool>;

    /// Fully resolve a symlink to its final absolute target, or `None` when
    /// the entry is not a symlink.
    async fn resolve_symlink(&self, path: &Path) -> io::Result<Option<PathBuf>>;
}
