//! The [`TrashService`].

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::Utc;
use log::{debug, warn};
use tokio::task::JoinHandle;
use uuid::Uuid;
use workspace_core::{Result, WorkspaceError};
use workspace_manager::Workspace;

use crate::item::{TrashStats, TrashedItem};
use crate::settings::{TrashSettings, DEFAULT_CLEANUP_INTERVAL};

const TRASH_DIR: &str = ".trash";

/// Where trashed entries are parked, inside the workspace root.
pub const TRASH_FILES_DIR: &str = ".trash/files";

/// The durable record of the trash set, rewritten in full on every mutation.
pub const MANIFEST_PATH: &str = ".trash/manifest.json";

const SETTINGS_PATH: &str = ".trash/settings.json";

/// Soft-delete service layered on the workspace façade.
///
/// Owns the in-memory id → item map exclusively; shares no state with the
/// command stack. The manifest write after each mutation is the commit point:
/// until it succeeds, a moved file is in storage but not yet durably tracked.
pub struct TrashService {
    workspace: Arc<Workspace>,
    items: Mutex<BTreeMap<String, TrashedItem>>,
}

impl TrashService {
    pub fn new(workspace: Arc<Workspace>) -> Self {
        Self {
            workspace,
            items: Mutex::new(BTreeMap::new()),
        }
    }

    /// Ensure the trash area exists and adopt the persisted manifest. A
    /// missing or corrupt manifest starts an empty trash set rather than
    /// blocking workspace startup.
    pub async fn initialize(&self) -> Result<()> {
        self.workspace.mkdir(TRASH_FILES_DIR).await?;

        let manifest = match self.workspace.read_file(MANIFEST_PATH).await {
            Ok(content) => content,
            Err(WorkspaceError::NotFound(_)) => return Ok(()),
            Err(err) => return Err(err),
        };
        match serde_json::from_str::<Vec<TrashedItem>>(&manifest) {
            Ok(entries) => {
                let mut items = self.items.lock().unwrap();
                items.clear();
                for entry in entries {
                    items.insert(entry.id.clone(), entry);
                }
                debug!("loaded {} trashed item(s) from manifest", items.len());
            }
            Err(err) => {
                warn!("trash manifest is unreadable, starting empty: {err}");
            }
        }
        Ok(())
    }

    /// Soft-delete `path`. The returned item is already durably recorded.
    pub async fn move_to_trash(&self, path: &str) -> Result<TrashedItem> {
        let path = self.workspace_relative(path).await;
        if path.is_empty() || path == TRASH_DIR || path.starts_with(".trash/") {
            return Err(WorkspaceError::AlreadyExists(format!(
                "{path} is already in the trash area"
            )));
        }

        let stat = self.workspace.stat(&path).await?;
        let name = path.rsplit('/').next().unwrap_or(&path).to_string();
        let deleted_at = Utc::now();
        // Timestamp prefix keeps same-named deletions from colliding.
        let trash_path = format!(
            "{TRASH_FILES_DIR}/{}_{}",
            deleted_at.timestamp_millis(),
            name
        );

        self.workspace.move_entry(&path, &trash_path).await?;

        let item = TrashedItem {
            id: Uuid::new_v4().to_string(),
            original_path: path,
            trash_path,
            name,
            kind: stat.kind,
            deleted_at,
            size: stat.size,
        };
        self.items
            .lock()
            .unwrap()
            .insert(item.id.clone(), item.clone());
        self.persist_manifest().await?;
        Ok(item)
    }

    /// Move a trashed item back. If the original location is now occupied, a
    /// uniquely-suffixed sibling is used instead of overwriting. Returns the
    /// path the item ended up at.
    pub async fn restore(&self, id: &str) -> Result<String> {
        let item = self
            .items
            .lock()
            .unwrap()
            .get(id)
            .cloned()
            .ok_or_else(|| WorkspaceError::NotFound(format!("trash item {id}")))?;

        if !self.workspace.exists(&item.trash_path).await? {
            // Another channel already consumed the copy; drop the stale record.
            self.items.lock().unwrap().remove(id);
            self.persist_manifest().await?;
            return Err(WorkspaceError::NotFound(format!(
                "trash copy for item {id} is gone"
            )));
        }

        let target = if self.workspace.exists(&item.original_path).await? {
            restored_variant(&item.original_path, Utc::now().timestamp_millis())
        } else {
            item.original_path.clone()
        };

        // move_entry recreates missing parent directories.
        self.workspace.move_entry(&item.trash_path, &target).await?;

        self.items.lock().unwrap().remove(id);
        self.persist_manifest().await?;
        Ok(target)
    }

    /// Destroy one trashed item for good.
    pub async fn permanent_delete(&self, id: &str) -> Result<()> {
        let item = self
            .items
            .lock()
            .unwrap()
            .get(id)
            .cloned()
            .ok_or_else(|| WorkspaceError::NotFound(format!("trash item {id}")))?;

        if self.workspace.exists(&item.trash_path).await? {
            self.workspace.delete(&item.trash_path).await?;
        }
        self.items.lock().unwrap().remove(id);
        self.persist_manifest().await?;
        Ok(())
    }

    /// Destroy everything in the trash. Per-item failures are logged and
    /// skipped so one bad entry cannot block the rest; returns how many
    /// items were purged.
    pub async fn empty_trash(&self) -> Result<usize> {
        let snapshot: Vec<TrashedItem> = self.items.lock().unwrap().values().cloned().collect();
        let mut purged = 0;
        for item in snapshot {
            if !self.purge_item(&item).await {
                continue;
            }
            self.items.lock().unwrap().remove(&item.id);
            purged += 1;
        }
        if purged > 0 {
            self.persist_manifest().await?;
        }
        Ok(purged)
    }

    /// Purge items whose deletion is strictly older than the retention
    /// window. Re-reads the persisted settings so retention changes apply at
    /// the next run, and works on a snapshot so foreground trash operations
    /// are never blocked.
    pub async fn auto_cleanup(&self) -> Result<usize> {
        let settings = self.load_settings().await;
        let Some(cutoff) = settings.retention.cutoff(Utc::now()) else {
            return Ok(0);
        };

        let snapshot: Vec<TrashedItem> = self.items.lock().unwrap().values().cloned().collect();
        let mut purged = 0;
        for item in snapshot {
            if item.deleted_at >= cutoff {
                continue;
            }
            if !self.purge_item(&item).await {
                continue;
            }
            self.items.lock().unwrap().remove(&item.id);
            purged += 1;
        }
        if purged > 0 {
            self.persist_manifest().await?;
            debug!("auto-cleanup purged {purged} expired item(s)");
        }
        Ok(purged)
    }

    /// Background cleanup loop: fires once immediately, then on every tick.
    pub fn spawn_auto_cleanup(self: &Arc<Self>, period: Duration) -> JoinHandle<()> {
        let service = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period.max(Duration::from_secs(1)));
            loop {
                ticker.tick().await;
                if let Err(err) = service.auto_cleanup().await {
                    warn!("trash auto-cleanup failed: {err}");
                }
            }
        })
    }

    /// Convenience wrapper for the default hourly schedule.
    pub fn spawn_default_auto_cleanup(self: &Arc<Self>) -> JoinHandle<()> {
        self.spawn_auto_cleanup(DEFAULT_CLEANUP_INTERVAL)
    }

    /// All trashed items, most recently deleted first.
    pub fn list(&self) -> Vec<TrashedItem> {
        let mut items: Vec<TrashedItem> = self.items.lock().unwrap().values().cloned().collect();
        items.sort_by(|a, b| b.deleted_at.cmp(&a.deleted_at));
        items
    }

    pub fn stats(&self) -> TrashStats {
        TrashStats::from_items(self.items.lock().unwrap().values())
    }

    pub async fn is_in_trash(&self, path: &str) -> bool {
        let path = self.workspace_relative(path).await;
        self.items
            .lock()
            .unwrap()
            .values()
            .any(|item| item.trash_path == path)
    }

    pub async fn find_by_original_path(&self, path: &str) -> Option<TrashedItem> {
        let path = self.workspace_relative(path).await;
        self.items
            .lock()
            .unwrap()
            .values()
            .find(|item| item.original_path == path)
            .cloned()
    }

    /// Collapse caller input to the workspace-relative form items are stored
    /// in: forward slashes, no leading or trailing separators, and the root
    /// prefix stripped when an absolute in-workspace path is handed in.
    async fn workspace_relative(&self, path: &str) -> String {
        let normalized = path.replace('\\', "/");
        let trimmed = normalized.trim_matches('/');
        if let Ok(root) = self.workspace.root().await {
            let root = root.trim_matches('/');
            if let Some(rest) = trimmed.strip_prefix(root) {
                if rest.is_empty() || rest.starts_with('/') {
                    return rest.trim_start_matches('/').to_string();
                }
            }
        }
        trimmed.to_string()
    }

    pub async fn load_settings(&self) -> TrashSettings {
        match self.workspace.read_file(SETTINGS_PATH).await {
            Ok(content) => serde_json::from_str(&content).unwrap_or_else(|err| {
                warn!("trash settings are unreadable, using defaults: {err}");
                TrashSettings::default()
            }),
            Err(WorkspaceError::NotFound(_)) => TrashSettings::default(),
            Err(err) => {
                warn!("could not read trash settings, using defaults: {err}");
                TrashSettings::default()
            }
        }
    }

    pub async fn save_settings(&self, settings: &TrashSettings) -> Result<()> {
        let json = serde_json::to_string_pretty(settings)?;
        self.workspace.write_file(SETTINGS_PATH, &json).await
    }

    /// Delete one trash copy, tolerating that it may already be gone.
    /// Returns whether the record should be dropped.
    async fn purge_item(&self, item: &TrashedItem) -> bool {
        match self.workspace.exists(&item.trash_path).await {
            Ok(true) => match self.workspace.delete(&item.trash_path).await {
                Ok(()) => true,
                Err(err) => {
                    warn!("could not purge '{}': {err}", item.trash_path);
                    false
                }
            },
            Ok(false) => true,
            Err(err) => {
                warn!("could not inspect '{}': {err}", item.trash_path);
                false
            }
        }
    }

    async fn persist_manifest(&self) -> Result<()> {
        let mut entries: Vec<TrashedItem> = self.items.lock().unwrap().values().cloned().collect();
        entries.sort_by(|a, b| a.deleted_at.cmp(&b.deleted_at).then(a.id.cmp(&b.id)));
        let json = serde_json::to_string_pretty(&entries)?;
        self.workspace.write_file(MANIFEST_PATH, &json).await
    }
}

/// `docs/a.md` → `docs/a_restored_{ts}.md`; extension-less and dotfile names
/// get the suffix appended whole.
fn restored_variant(path: &str, timestamp_millis: i64) -> String {
    let (parent, name) = match path.rsplit_once('/') {
        Some((parent, name)) => (Some(parent), name),
        None => (None, path),
    };
    let renamed = match name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => {
            format!("{stem}_restored_{timestamp_millis}.{ext}")
        }
        _ => format!("{name}_restored_{timestamp_millis}"),
    };
    match parent {
        Some(parent) => format!("{parent}/{renamed}"),
        None => renamed,
    }
}
