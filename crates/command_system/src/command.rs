//! The [`Command`] trait.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use workspace_core::Result;

use crate::record::CommandRecord;

/// A reversible unit of work.
///
/// Lifecycle: `Created → Executed → (Undone ⇄ Redone)*`. The stack re-invokes
/// `execute` for redo, so implementations capture their prior state exactly
/// once (guarded by a flag) and must be idempotent given that captured state.
#[async_trait]
pub trait Command: Send + Sync {
    /// Opaque identifier, stable across undo/redo.
    fn id(&self) -> &str;

    /// Human-readable description for history UIs.
    fn description(&self) -> String;

    fn timestamp(&self) -> DateTime<Utc>;

    /// Apply the side effect. Called for the initial execution and again for
    /// every redo.
    async fn execute(&mut self) -> Result<()>;

    /// Apply the inverse side effect.
    async fn undo(&mut self) -> Result<()>;

    /// Snapshot for persistence or audit. Records are taken after execution,
    /// so they carry the captured prior state.
    fn record(&self) -> CommandRecord;
}
