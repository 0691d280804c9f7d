//! Delete a file, reversibly.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;
use workspace_core::Result;
use workspace_manager::Workspace;

use crate::command::Command;
use crate::record::{CommandPayload, CommandRecord};

use super::file_name;

/// Holding area for command-channel deletions. Disjoint from the trash
/// service's `.trash/files`, so the two reversal channels cannot consume
/// each other's copies.
const HOLDING_DIR: &str = ".trash/pending";

/// Deletes a file, capturing its content first. With `use_trash` (the
/// default) the file is relocated to a holding path instead of destroyed;
/// undo restores the captured content at the original path and removes the
/// holding copy if it is still around.
pub struct DeleteFileCommand {
    id: String,
    timestamp: DateTime<Utc>,
    workspace: Arc<Workspace>,
    path: String,
    use_trash: bool,
    previous_content: Option<String>,
    holding_path: Option<String>,
    captured: bool,
}

impl DeleteFileCommand {
    pub fn new(workspace: Arc<Workspace>, path: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            workspace,
            path: path.into(),
            use_trash: true,
            previous_content: None,
            holding_path: None,
            captured: false,
        }
    }

    /// Destructive variant: no holding copy is kept, undo relies solely on
    /// the captured content.
    pub fn destructive(workspace: Arc<Workspace>, path: impl Into<String>) -> Self {
        Self {
            use_trash: false,
            ..Self::new(workspace, path)
        }
    }

    pub(crate) fn from_snapshot(
        workspace: Arc<Workspace>,
        id: String,
        timestamp: DateTime<Utc>,
        path: String,
        use_trash: bool,
        previous_content: Option<String>,
        holding_path: Option<String>,
    ) -> Self {
        Self {
            id,
            timestamp,
            workspace,
            path,
            use_trash,
            previous_content,
            holding_path,
            captured: true,
        }
    }
}

#[async_trait]
impl Command for DeleteFileCommand {
    fn id(&self) -> &str {
        &self.id
    }

    fn description(&self) -> String {
        format!("Delete {}", self.path)
    }

    fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    async fn execute(&mut self) -> Result<()> {
        if !self.captured {
            self.previous_content = Some(self.workspace.read_file(&self.path).await?);
            if self.use_trash {
                // Fixed once so redo reuses the same holding slot.
                self.holding_path = Some(format!(
                    "{HOLDING_DIR}/{}_{}",
                    Utc::now().timestamp_millis(),
                    file_name(&self.path)
                ));
            }
            self.captured = true;
        }
        match &self.holding_path {
            Some(holding) => self.workspace.move_entry(&self.path, holding).await,
            None => self.workspace.delete(&self.path).await,
        }
    }

    async fn undo(&mut self) -> Result<()> {
        let content = self.previous_content.as_deref().unwrap_or_default();
        self.workspace.write_file(&self.path, content).await?;
        if let Some(holding) = &self.holding_path {
            // Already purged elsewhere is fine.
            if self.workspace.exists(holding).await? {
                self.workspace.delete(holding).await?;
            }
        }
        Ok(())
    }

    fn record(&self) -> CommandRecord {
        CommandRecord {
            id: self.id.clone(),
            description: self.description(),
            timestamp: self.timestamp,
            payload: CommandPayload::DeleteFile {
                path: self.path.clone(),
                use_trash: self.use_trash,
                previous_content: self.previous_content.clone(),
                holding_path: self.holding_path.clone(),
            },
        }
    }
}
