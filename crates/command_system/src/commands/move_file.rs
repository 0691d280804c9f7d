//! Move an entry, reversibly.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;
use workspace_core::Result;
use workspace_manager::Workspace;

use crate::command::Command;
use crate::record::{CommandPayload, CommandRecord};

/// Moves `from` to `to`; undo moves it back. Works for files and folders.
pub struct MoveFileCommand {
    id: String,
    timestamp: DateTime<Utc>,
    workspace: Arc<Workspace>,
    from: String,
    to: String,
}

impl MoveFileCommand {
    pub fn new(workspace: Arc<Workspace>, from: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            workspace,
            from: from.into(),
            to: to.into(),
        }
    }

    pub(crate) fn from_snapshot(
        workspace: Arc<Workspace>,
        id: String,
        timestamp: DateTime<Utc>,
        from: String,
        to: String,
    ) -> Self {
        Self {
            id,
            timestamp,
            workspace,
            from,
            to,
        }
    }
}

#[async_trait]
impl Command for MoveFileCommand {
    fn id(&self) -> &str {
        &self.id
    }

    fn description(&self) -> String {
        format!("Move {} to {}", self.from, self.to)
    }

    fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    async fn execute(&mut self) -> Result<()> {
        self.workspace.move_entry(&self.from, &self.to).await
    }

    async fn undo(&mut self) -> Result<()> {
        self.workspace.move_entry(&self.to, &self.from).await
    }

    fn record(&self) -> CommandRecord {
        CommandRecord {
            id: self.id.clone(),
            description: self.description(),
            timestamp: self.timestamp,
            payload: CommandPayload::MoveFile {
                from: self.from.clone(),
                to: self.to.clone(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use workspace_core::MemoryBackend;
    use workspace_manager::WorkspaceOptions;

    #[tokio::test]
    async fn move_round_trips_through_undo() {
        let ws = Arc::new(
            Workspace::initialize(
                Arc::new(MemoryBackend::new()),
                "/ws",
                WorkspaceOptions {
                    create_if_missing: true,
                    create_default_structure: false,
                },
            )
            .await
            .unwrap(),
        );
        ws.write_file("docs/a.md", "x").await.unwrap();

        let mut cmd = MoveFileCommand::new(Arc::clone(&ws), "docs/a.md", "archive/a.md");
        cmd.execute().await.unwrap();
        assert_eq!(ws.read_file("archive/a.md").await.unwrap(), "x");
        assert!(!ws.exists("docs/a.md").await.unwrap());

        cmd.undo().await.unwrap();
        assert_eq!(ws.read_file("docs/a.md").await.unwrap(), "x");
        assert!(!ws.exists("archive/a.md").await.unwrap());
    }
}
