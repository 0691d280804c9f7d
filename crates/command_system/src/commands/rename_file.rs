//! Rename an entry in place, reversibly.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;
use workspace_core::Result;
use workspace_manager::Workspace;

use crate::command::Command;
use crate::record::{CommandPayload, CommandRecord};

use super::file_name;

/// Renames `path` to `new_name` within its parent; undo renames back to the
/// old name, which is captured from the path at construction.
pub struct RenameFileCommand {
    id: String,
    timestamp: DateTime<Utc>,
    workspace: Arc<Workspace>,
    path: String,
    new_name: String,
    old_name: String,
}

impl RenameFileCommand {
    pub fn new(
        workspace: Arc<Workspace>,
        path: impl Into<String>,
        new_name: impl Into<String>,
    ) -> Self {
        let path = path.into();
        let old_name = file_name(&path).to_string();
        Self {
            id: Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            workspace,
            path,
            new_name: new_name.into(),
            old_name,
        }
    }

    pub(crate) fn from_snapshot(
        workspace: Arc<Workspace>,
        id: String,
        timestamp: DateTime<Utc>,
        path: String,
        new_name: String,
        old_name: String,
    ) -> Self {
        Self {
            id,
            timestamp,
            workspace,
            path,
            new_name,
            old_name,
        }
    }

    fn renamed_path(&self) -> String {
        match self.path.rsplit_once('/') {
            Some((parent, _)) => format!("{parent}/{}", self.new_name),
            None => self.new_name.clone(),
        }
    }
}

#[async_trait]
impl Command for RenameFileCommand {
    fn id(&self) -> &str {
        &self.id
    }

    fn description(&self) -> String {
        format!("Rename {} to {}", self.path, self.new_name)
    }

    fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    async fn execute(&mut self) -> Result<()> {
        self.workspace.rename(&self.path, &self.new_name).await
    }

    async fn undo(&mut self) -> Result<()> {
        self.workspace
            .rename(&self.renamed_path(), &self.old_name)
            .await
    }

    fn record(&self) -> CommandRecord {
        CommandRecord {
            id: self.id.clone(),
            description: self.description(),
            timestamp: self.timestamp,
            payload: CommandPayload::RenameFile {
                path: self.path.clone(),
                new_name: self.new_name.clone(),
                old_name: self.old_name.clone(),
            },
        }
    }
}
