//! Write (create or update) a file, reversibly.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;
use workspace_core::Result;
use workspace_manager::Workspace;

use crate::command::Command;
use crate::record::{CommandPayload, CommandRecord};

/// Writes `content` to `path`. The prior content (or prior absence) is
/// captured on first execution, which makes create and update symmetric:
/// undoing a create deletes the file, undoing an update restores what was
/// there before.
pub struct WriteFileCommand {
    id: String,
    timestamp: DateTime<Utc>,
    workspace: Arc<Workspace>,
    path: String,
    content: String,
    previous_content: Option<String>,
    file_existed: bool,
    captured: bool,
}

impl WriteFileCommand {
    pub fn new(
        workspace: Arc<Workspace>,
        path: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            workspace,
            path: path.into(),
            content: content.into(),
            previous_content: None,
            file_existed: false,
            captured: false,
        }
    }

    pub(crate) fn from_snapshot(
        workspace: Arc<Workspace>,
        id: String,
        timestamp: DateTime<Utc>,
        path: String,
        content: String,
        previous_content: Option<String>,
        file_existed: bool,
    ) -> Self {
        Self {
            id,
            timestamp,
            workspace,
            path,
            content,
            previous_content,
            file_existed,
            captured: true,
        }
    }
}

#[async_trait]
impl Command for WriteFileCommand {
    fn id(&self) -> &str {
        &self.id
    }

    fn description(&self) -> String {
        format!("Write {}", self.path)
    }

    fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    async fn execute(&mut self) -> Result<()> {
        if !self.captured {
            self.file_existed = self.workspace.exists(&self.path).await?;
            self.previous_content = if self.file_existed {
                Some(self.workspace.read_file(&self.path).await?)
            } else {
                None
            };
            self.captured = true;
        }
        self.workspace.write_file(&self.path, &self.content).await
    }

    async fn undo(&mut self) -> Result<()> {
        if self.file_existed {
            let previous = self.previous_content.as_deref().unwrap_or_default();
            self.workspace.write_file(&self.path, previous).await
        } else {
            self.workspace.delete(&self.path).await
        }
    }

    fn record(&self) -> CommandRecord {
        CommandRecord {
            id: self.id.clone(),
            description: self.description(),
            timestamp: self.timestamp,
            payload: CommandPayload::WriteFile {
                path: self.path.clone(),
                content: self.content.clone(),
                previous_content: self.previous_content.clone(),
                file_existed: self.file_existed,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use workspace_core::{MemoryBackend, WorkspaceError};
    use workspace_manager::WorkspaceOptions;

    async fn workspace() -> Arc<Workspace> {
        Arc::new(
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
        )
    }

    #[tokio::test]
    async fn undoing_an_update_restores_prior_content() {
        let ws = workspace().await;
        ws.write_file("a.md", "v1").await.unwrap();

        let mut cmd = WriteFileCommand::new(Arc::clone(&ws), "a.md", "v2");
        cmd.execute().await.unwrap();
        assert_eq!(ws.read_file("a.md").await.unwrap(), "v2");

        cmd.undo().await.unwrap();
        assert_eq!(ws.read_file("a.md").await.unwrap(), "v1");

        // Redo is a second execute against the captured state.
        cmd.execute().await.unwrap();
        assert_eq!(ws.read_file("a.md").await.unwrap(), "v2");
    }

    #[tokio::test]
    async fn undoing_a_create_deletes_the_file() {
        let ws = workspace().await;
        let mut cmd = WriteFileCommand::new(Arc::clone(&ws), "new.md", "hello");
        cmd.execute().await.unwrap();
        assert!(ws.exists("new.md").await.unwrap());

        cmd.undo().await.unwrap();
        assert!(matches!(
            ws.read_file("new.md").await,
            Err(WorkspaceError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn record_carries_the_captured_state() {
        let ws = workspace().await;
        ws.write_file("a.md", "v1").await.unwrap();
        let mut cmd = WriteFileCommand::new(Arc::clone(&ws), "a.md", "v2");
        cmd.execute().await.unwrap();

        match cmd.record().payload {
            CommandPayload::WriteFile {
                previous_content,
                file_existed,
                ..
            } => {
                assert_eq!(previous_content.as_deref(), Some("v1"));
                assert!(file_existed);
            }
            other => panic!("unexpected payload: {other:?}"),
        }
    }
}
