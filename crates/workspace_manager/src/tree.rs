//! Recursive file-tree view of a workspace directory.

use serde::Serialize;
use workspace_core::EntryKind;

/// One node of the visible workspace tree. Folders carry their children,
/// sorted folders-first then by name.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileNode {
    pub name: String,
    pub path: String,
    #[serde(rename = "type")]
    pub kind: EntryKind,
    pub children: Vec<FileNode>,
}

impl FileNode {
    pub fn is_folder(&self) -> bool {
        self.kind == EntryKind::Folder
    }

    /// Total number of nodes in this subtree, the node itself included.
    pub fn len(&self) -> usize {
        1 + self.children.iter().map(FileNode::len).sum::<usize>()
    }

    pub fn is_empty(&self) -> bool {
        false
    }

    pub(crate) fn sort_children(&mut self) {
        self.children.sort_by(|a, b| {
            b.is_folder()
                .cmp(&a.is_folder())
                .then_with(|| a.name.cmp(&b.name))
        });
    }
}
