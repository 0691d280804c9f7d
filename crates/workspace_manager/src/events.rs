//! Change notifications emitted after successful mutations.

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeKind {
    Created,
    Modified,
    Deleted,
    Moved,
}

/// One mutation that reached storage. `destination` is set for moves and
/// renames; paths are workspace-absolute.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeEvent {
    pub kind: ChangeKind,
    pub path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub destination: Option<String>,
}

impl ChangeEvent {
    pub(crate) fn new(kind: ChangeKind, path: impl Into<String>) -> Self {
        Self {
            kind,
            path: path.into(),
            destination: None,
        }
    }

    pub(crate) fn moved(path: impl Into<String>, destination: impl Into<String>) -> Self {
        Self {
            kind: ChangeKind::Moved,
            path: path.into(),
            destination: Some(destination.into()),
        }
    }
}
