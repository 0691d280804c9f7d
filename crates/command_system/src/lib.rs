//! Reversible units of work over the workspace.
//!
//! Every user-facing mutation is wrapped in a [`Command`] with paired
//! `execute`/`undo` behavior and tracked on a [`CommandStack`]. Commands
//! capture whatever prior state their inverse needs on first execution, which
//! is what makes redo (a second `execute`) safe.

mod command;
mod commands;
mod record;
mod stack;

pub use command::Command;
pub use commands::{
    BatchCommand, DeleteFileCommand, MoveFileCommand, RenameFileCommand, WriteFileCommand,
};
pub use record::{from_record, CommandPayload, CommandRecord};
pub use stack::{CommandStack, DEFAULT_MAX_UNDO};
