//! Soft deletion for the workspace.
//!
//! Deleting through the [`TrashService`] moves entries into a trash area
//! inside the workspace instead of destroying them. The set of trashed items
//! is durably recorded in a JSON manifest (rewritten in full on every
//! mutation), so the trash survives process restarts. It is a separate
//! reversal channel from the in-memory undo stack and shares no state with it.

mod item;
mod service;
mod settings;

pub use item::{TrashStats, TrashedItem};
pub use service::{TrashService, MANIFEST_PATH, TRASH_FILES_DIR};
pub use settings::{RetentionPolicy, TrashSettings, DEFAULT_CLEANUP_INTERVAL};
