//! Trash records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use workspace_core::EntryKind;

/// One soft-deleted entry. Paths are workspace-relative so the manifest
/// stays valid if the workspace root moves between sessions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrashedItem {
    pub id: String,
    pub original_path: String,
    pub trash_path: String,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: EntryKind,
    pub deleted_at: DateTime<Utc>,
    pub size: u64,
}

/// Derived view of the live trash set; recomputed, never stored.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrashStats {
    pub item_count: usize,
    pub total_size: u64,
    pub oldest_deleted_at: Option<DateTime<Utc>>,
}

impl TrashStats {
    pub(crate) fn from_items<'a>(items: impl Iterator<Item = &'a TrashedItem>) -> Self {
        let mut stats = TrashStats {
            item_count: 0,
            total_size: 0,
            oldest_deleted_at: None,
        };
        for item in items {
            stats.item_count += 1;
            stats.total_size += item.size;
            stats.oldest_deleted_at = match stats.oldest_deleted_at {
                Some(oldest) if oldest <= item.deleted_at => Some(oldest),
                _ => Some(item.deleted_at),
            };
        }
        stats
    }
}
