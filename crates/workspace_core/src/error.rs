//! Error types shared across the workspace file-operation crates.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Machine-checkable reason attached to every [`SecurityError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SecurityReason {
    PathTraversal,
    AbsolutePathOutsideRoot,
    SymlinkEscape,
    InvalidName,
}

/// Rejection raised by path or name validation.
///
/// The `Display` form is deliberately generic: the exact `reason` and `detail`
/// are meant for logs and tests, not for an end user probing the workspace
/// boundary.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("operation not permitted")]
pub struct SecurityError {
    pub reason: SecurityReason,
    pub detail: String,
}

impl SecurityError {
    pub fn new(reason: SecurityReason, detail: impl Into<String>) -> Self {
        Self {
            reason,
            detail: detail.into(),
        }
    }
}

/// Errors surfaced by the workspace façade and the services layered on it.
#[derive(Debug, Error)]
pub enum WorkspaceError {
    /// A path or name failed validation. Never coerced, never repaired.
    #[error(transparent)]
    Security(#[from] SecurityError),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("already exists: {0}")]
    AlreadyExists(String),

    #[error("workspace is not initialized")]
    NotInitialized,

    /// A backend operation failed; `operation` carries caller-facing context
    /// so the raw I/O error never leaks without it.
    #[error("failed to {operation}: {source}")]
    OperationFailed {
        operation: String,
        #[source]
        source: std::io::Error,
    },

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl WorkspaceError {
    /// Wrap a backend I/O error with operation context, mapping `NotFound`
    /// onto the dedicated variant so callers can match on it.
    pub fn from_io(operation: impl Into<String>, path: &str, source: std::io::Error) -> Self {
        if source.kind() == std::io::ErrorKind::NotFound {
            WorkspaceError::NotFound(path.to_string())
        } else {
            WorkspaceError::OperationFailed {
                operation: operation.into(),
                source,
            }
        }
    }
}

pub type Result<T> = std::result::Result<T, WorkspaceError>;
