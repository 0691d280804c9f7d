//! The workspace façade.
//!
//! [`Workspace`] is the only surface the rest of the application mutates
//! files through: every call validates its path against the workspace root,
//! guards against symlink escapes, and only then delegates to the configured
//! [`workspace_core::StorageBackend`]. Successful mutations are announced on
//! a broadcast channel so the UI can refresh.

mod events;
mod manager;
mod tree;

pub use events::{ChangeEvent, ChangeKind};
pub use manager::{Workspace, WorkspaceOptions, DEFAULT_FOLDERS};
pub use tree::FileNode;
