//! Serialized command snapshots.
//!
//! Each record holds exactly the fields needed to reconstruct undo behavior,
//! as a tagged union rather than anything reflective. Persistence is
//! optional: the in-process stack never round-trips through records.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use workspace_manager::Workspace;

use crate::command::Command;
use crate::commands::{
    BatchCommand, DeleteFileCommand, MoveFileCommand, RenameFileCommand, WriteFileCommand,
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandRecord {
    pub id: String,
    pub description: String,
    pub timestamp: DateTime<Utc>,
    #[serde(flatten)]
    pub payload: CommandPayload,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum CommandPayload {
    #[serde(rename_all = "camelCase")]
    WriteFile {
        path: String,
        content: String,
        previous_content: Option<String>,
        file_existed: bool,
    },
    #[serde(rename_all = "camelCase")]
    DeleteFile {
        path: String,
        use_trash: bool,
        previous_content: Option<String>,
        holding_path: Option<String>,
    },
    #[serde(rename_all = "camelCase")]
    MoveFile { from: String, to: String },
    #[serde(rename_all = "camelCase")]
    RenameFile {
        path: String,
        new_name: String,
        old_name: String,
    },
    Batch { commands: Vec<CommandRecord> },
}

/// Rebuild a command from its record. The result behaves as an
/// already-executed command: `undo` reverses the recorded effect, `execute`
/// re-applies it.
pub fn from_record(workspace: &Arc<Workspace>, record: CommandRecord) -> Box<dyn Command> {
    let CommandRecord {
        id,
        timestamp,
        description,
        payload,
    } = record;
    match payload {
        CommandPayload::WriteFile {
            path,
            content,
            previous_content,
            file_existed,
        } => Box::new(WriteFileCommand::from_snapshot(
            Arc::clone(workspace),
            id,
            timestamp,
            path,
            content,
            previous_content,
            file_existed,
        )),
        CommandPayload::DeleteFile {
            path,
            use_trash,
            previous_content,
            holding_path,
        } => Box::new(DeleteFileCommand::from_snapshot(
            Arc::clone(workspace),
            id,
            timestamp,
            path,
            use_trash,
            previous_content,
            holding_path,
        )),
        CommandPayload::MoveFile { from, to } => Box::new(MoveFileCommand::from_snapshot(
            Arc::clone(workspace),
            id,
            timestamp,
            from,
            to,
        )),
        CommandPayload::RenameFile {
            path,
            new_name,
            old_name,
        } => Box::new(RenameFileCommand::from_snapshot(
            Arc::clone(workspace),
            id,
            timestamp,
            path,
            new_name,
            old_name,
        )),
        CommandPayload::Batch { commands } => {
            let rebuilt = commands
                .into_iter()
                .map(|child| from_record(workspace, child))
                .collect();
            Box::new(BatchCommand::from_snapshot(id, timestamp, description, rebuilt))
        }
    }
}
