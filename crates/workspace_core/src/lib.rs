//! Core types and traits for the workspace file layer.
//!
//! Everything that mutates the user's workspace on disk flows through the
//! pieces defined here: the [`PathValidator`] that decides whether a candidate
//! path is allowed to exist inside the workspace at all, and the
//! [`StorageBackend`] trait that performs the actual I/O once a path has been
//! proven safe.

pub mod backend;
pub mod error;
pub mod path;

pub use backend::{DirEntry, EntryKind, EntryStat, LocalFsBackend, MemoryBackend, StorageBackend};
pub use error::{Result, SecurityError, SecurityReason, WorkspaceError};
pub use path::{PathValidator, ValidatedPath};
