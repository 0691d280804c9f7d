//! An ordered group of commands treated as one undoable action.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use log::warn;
use uuid::Uuid;
use workspace_core::Result;

use crate::command::Command;
use crate::record::{CommandPayload, CommandRecord};

/// Executes its sub-commands in order and undoes them in strict reverse
/// order, since later commands may depend on earlier ones' side effects.
///
/// If a sub-command fails mid-batch, the already-executed prefix is left
/// applied (best-effort semantics): the error propagates, `undo` reverses
/// exactly that prefix, and callers needing atomicity wrap the batch in their
/// own compensating logic.
pub struct BatchCommand {
    id: String,
    timestamp: DateTime<Utc>,
    description: String,
    commands: Vec<Box<dyn Command>>,
    executed: usize,
}

impl BatchCommand {
    pub fn new(description: impl Into<String>, commands: Vec<Box<dyn Command>>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            description: description.into(),
            commands,
            executed: 0,
        }
    }

    pub(crate) fn from_snapshot(
        id: String,
        timestamp: DateTime<Utc>,
        description: String,
        commands: Vec<Box<dyn Command>>,
    ) -> Self {
        let executed = commands.len();
        Self {
            id,
            timestamp,
            description,
            commands,
            executed,
        }
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }
}

#[async_trait]
impl Command for BatchCommand {
    fn id(&self) -> &str {
        &self.id
    }

    fn description(&self) -> String {
        self.description.clone()
    }

    fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    async fn execute(&mut self) -> Result<()> {
        while self.executed < self.commands.len() {
            let index = self.executed;
            if let Err(err) = self.commands[index].execute().await {
                warn!(
                    "batch '{}' failed at sub-command {} of {}; executed prefix left applied",
                    self.description,
                    index + 1,
                    self.commands.len()
                );
                return Err(err);
            }
            self.executed = index + 1;
        }
        Ok(())
    }

    async fn undo(&mut self) -> Result<()> {
        while self.executed > 0 {
            let index = self.executed - 1;
            self.commands[index].undo().await?;
            self.executed = index;
        }
        Ok(())
    }

    fn record(&self) -> CommandRecord {
        CommandRecord {
            id: self.id.clone(),
            description: self.description.clone(),
            timestamp: self.timestamp,
            payload: CommandPayload::Batch {
                commands: self.commands.iter().map(|cmd| cmd.record()).collect(),
            },
        }
    }
}
