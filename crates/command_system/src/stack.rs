//! The undo/redo history.

use std::collections::VecDeque;

use log::debug;
use workspace_core::Result;

use crate::command::Command;
use crate::record::CommandRecord;

/// Default bound on the undo history. Entries evicted past the bound are no
/// longer undoable; that trade-off is surfaced to users as history depth.
pub const DEFAULT_MAX_UNDO: usize = 100;

/// Two ordered sequences of executed commands.
///
/// Invariants: executing a new command clears the redo sequence, and the undo
/// sequence never exceeds `max_size` (oldest dropped silently). Failed
/// operations leave both sequences untouched.
pub struct CommandStack {
    undo_stack: VecDeque<Box<dyn Command>>,
    redo_stack: Vec<Box<dyn Command>>,
    max_size: usize,
}

impl CommandStack {
    pub fn new() -> Self {
        Self::with_max_size(DEFAULT_MAX_UNDO)
    }

    pub fn with_max_size(max_size: usize) -> Self {
        Self {
            undo_stack: VecDeque::with_capacity(max_size.min(DEFAULT_MAX_UNDO)),
            redo_stack: Vec::new(),
            max_size,
        }
    }

    /// Run `command` and push it onto the undo history. Redo history is only
    /// valid until the next original action, so it is cleared here.
    pub async fn execute(&mut self, mut command: Box<dyn Command>) -> Result<()> {
        command.execute().await?;
        debug!("executed command: {}", command.description());
        self.redo_stack.clear();
        self.undo_stack.push_back(command);
        while self.undo_stack.len() > self.max_size {
            self.undo_stack.pop_front();
        }
        Ok(())
    }

    /// Undo the most recent command. `Ok(None)` when there is nothing to
    /// undo; a failed undo propagates and the command stays on the undo
    /// stack.
    pub async fn undo(&mut self) -> Result<Option<String>> {
        let Some(mut command) = self.undo_stack.pop_back() else {
            return Ok(None);
        };
        match command.undo().await {
            Ok(()) => {
                let description = command.description();
                debug!("undid command: {description}");
                self.redo_stack.push(command);
                Ok(Some(description))
            }
            Err(err) => {
                self.undo_stack.push_back(command);
                Err(err)
            }
        }
    }

    /// Re-apply the most recently undone command by re-invoking its
    /// `execute` against the state it captured.
    pub async fn redo(&mut self) -> Result<Option<String>> {
        let Some(mut command) = self.redo_stack.pop() else {
            return Ok(None);
        };
        match command.execute().await {
            Ok(()) => {
                let description = command.description();
                debug!("redid command: {description}");
                self.undo_stack.push_back(command);
                Ok(Some(description))
            }
            Err(err) => {
                self.redo_stack.push(command);
                Err(err)
            }
        }
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    pub fn undo_len(&self) -> usize {
        self.undo_stack.len()
    }

    pub fn redo_len(&self) -> usize {
        self.redo_stack.len()
    }

    pub fn clear(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
    }

    /// Snapshot of the undo history, oldest first. Audit surface; the stack
    /// itself never round-trips through records.
    pub fn history(&self) -> Vec<CommandRecord> {
        self.undo_stack.iter().map(|cmd| cmd.record()).collect()
    }
}

impl Default for CommandStack {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::{DateTime, Utc};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use uuid::Uuid;
    use workspace_core::WorkspaceError;

    use crate::record::CommandPayload;

    struct CounterCommand {
        id: String,
        label: String,
        counter: Arc<AtomicUsize>,
        fail_execute: bool,
        fail_undo: bool,
    }

    impl CounterCommand {
        fn boxed(label: impl Into<String>, counter: &Arc<AtomicUsize>) -> Box<dyn Command> {
            Box::new(Self {
                id: Uuid::new_v4().to_string(),
                label: label.into(),
                counter: Arc::clone(counter),
                fail_execute: false,
                fail_undo: false,
            })
        }

        fn failing_execute(counter: &Arc<AtomicUsize>) -> Box<dyn Command> {
            Box::new(Self {
                id: Uuid::new_v4().to_string(),
                label: "failing".to_string(),
                counter: Arc::clone(counter),
                fail_execute: true,
                fail_undo: false,
            })
        }

        fn failing_undo(counter: &Arc<AtomicUsize>) -> Box<dyn Command> {
            Box::new(Self {
                id: Uuid::new_v4().to_string(),
                label: "sticky".to_string(),
                counter: Arc::clone(counter),
                fail_execute: false,
                fail_undo: true,
            })
        }
    }

    #[async_trait]
    impl Command for CounterCommand {
        fn id(&self) -> &str {
            &self.id
        }

        fn description(&self) -> String {
            self.label.clone()
        }

        fn timestamp(&self) -> DateTime<Utc> {
            Utc::now()
        }

        async fn execute(&mut self) -> Result<()> {
            if self.fail_execute {
                return Err(WorkspaceError::NotFound(self.label.clone()));
            }
            self.counter.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        async fn undo(&mut self) -> Result<()> {
            if self.fail_undo {
                return Err(WorkspaceError::NotFound(self.label.clone()));
            }
            self.counter.fetch_sub(1, Ordering::SeqCst);
            Ok(())
        }

        fn record(&self) -> CommandRecord {
            CommandRecord {
                id: self.id.clone(),
                description: self.label.clone(),
                timestamp: Utc::now(),
                payload: CommandPayload::Batch { commands: vec![] },
            }
        }
    }

    #[tokio::test]
    async fn eviction_keeps_exactly_max_size_newest_entries() {
        let counter = Arc::new(AtomicUsize::new(0));
        let mut stack = CommandStack::with_max_size(3);

        for i in 0..5 {
            stack
                .execute(CounterCommand::boxed(format!("cmd-{i}"), &counter))
                .await
                .unwrap();
        }

        assert_eq!(stack.undo_len(), 3);
        assert_eq!(stack.redo_len(), 0);
        let labels: Vec<String> = stack.history().iter().map(|r| r.description.clone()).collect();
        assert_eq!(labels, vec!["cmd-2", "cmd-3", "cmd-4"]);
    }

    #[tokio::test]
    async fn a_new_action_clears_the_redo_stack() {
        let counter = Arc::new(AtomicUsize::new(0));
        let mut stack = CommandStack::new();

        stack.execute(CounterCommand::boxed("first", &counter)).await.unwrap();
        stack.undo().await.unwrap();
        assert!(stack.can_redo());

        stack.execute(CounterCommand::boxed("second", &counter)).await.unwrap();
        assert!(!stack.can_redo());
    }

    #[tokio::test]
    async fn undo_on_an_empty_stack_is_a_silent_no_op() {
        let mut stack = CommandStack::new();
        assert_eq!(stack.undo().await.unwrap(), None);
        assert_eq!(stack.redo().await.unwrap(), None);
    }

    #[tokio::test]
    async fn failed_execute_mutates_nothing() {
        let counter = Arc::new(AtomicUsize::new(0));
        let mut stack = CommandStack::new();
        stack.execute(CounterCommand::boxed("ok", &counter)).await.unwrap();
        stack.undo().await.unwrap();
        assert!(stack.can_redo());

        assert!(stack
            .execute(CounterCommand::failing_execute(&counter))
            .await
            .is_err());
        // Neither stack moved: the redo entry survives a failed execute.
        assert_eq!(stack.undo_len(), 0);
        assert!(stack.can_redo());
    }

    #[tokio::test]
    async fn failed_undo_keeps_the_command_on_the_undo_stack() {
        let counter = Arc::new(AtomicUsize::new(0));
        let mut stack = CommandStack::new();
        stack
            .execute(CounterCommand::failing_undo(&counter))
            .await
            .unwrap();

        assert!(stack.undo().await.is_err());
        assert_eq!(stack.undo_len(), 1);
        assert_eq!(stack.redo_len(), 0);
    }

    #[tokio::test]
    async fn undo_redo_round_trip_counts() {
        let counter = Arc::new(AtomicUsize::new(0));
        let mut stack = CommandStack::new();

        stack.execute(CounterCommand::boxed("a", &counter)).await.unwrap();
        stack.execute(CounterCommand::boxed("b", &counter)).await.unwrap();
        assert_eq!(counter.load(Ordering::SeqCst), 2);

        assert_eq!(stack.undo().await.unwrap().as_deref(), Some("b"));
        assert_eq!(counter.load(Ordering::SeqCst), 1);
        assert_eq!(stack.redo().await.unwrap().as_deref(), Some("b"));
        assert_eq!(counter.load(Ordering::SeqCst), 2);
    }
}
