//! The [`Workspace`] façade: validate, guard, delegate, notify.

use std::future::Future;
use std::path::Path;
use std::pin::Pin;
use std::sync::Arc;

use log::{debug, warn};
use tokio::sync::{broadcast, RwLock};
use workspace_core::{
    DirEntry, EntryKind, EntryStat, PathValidator, Result, SecurityError, StorageBackend,
    ValidatedPath, WorkspaceError,
};

use crate::events::{ChangeEvent, ChangeKind};
use crate::tree::FileNode;

/// Top-level folders created by `create_default_structure`.
pub const DEFAULT_FOLDERS: &[&str] = &["notes", "whiteboards", "recordings", "assets"];

/// The soft-delete area lives inside the workspace but is hidden from the
/// visible file tree.
const TRASH_DIR_NAME: &str = ".trash";

const EVENT_CHANNEL_CAPACITY: usize = 64;

#[derive(Debug, Clone, Copy, Default)]
pub struct WorkspaceOptions {
    pub create_if_missing: bool,
    pub create_default_structure: bool,
}

struct State {
    validator: PathValidator,
    backend: Arc<dyn StorageBackend>,
}

impl State {
    fn validate(&self, candidate: &str) -> Result<ValidatedPath> {
        self.validator.validate_path(candidate).map_err(log_rejection)
    }

    /// Refuse any symlink on the path whose fully-resolved target lands
    /// outside the root. Every entry between the root and the leaf is
    /// inspected: a symlinked ancestor re-points the whole subtree, so
    /// checking the leaf alone is not enough. Runs before any read or
    /// mutation touches the entry.
    async fn guard_symlink(&self, path: &ValidatedPath) -> Result<()> {
        let full = path.as_str();
        let mut end = self.validator.root().len();
        while end < full.len() {
            end = match full[end + 1..].find('/') {
                Some(i) => end + 1 + i,
                None => full.len(),
            };
            self.check_symlink(&full[..end]).await?;
        }
        Ok(())
    }

    async fn check_symlink(&self, entry: &str) -> Result<()> {
        let is_link = self
            .backend
            .is_symlink(Path::new(entry))
            .await
            .map_err(|err| WorkspaceError::from_io("inspect symlink", entry, err))?;
        if !is_link {
            return Ok(());
        }
        let resolved = self
            .backend
            .resolve_symlink(Path::new(entry))
            .await
            .map_err(|err| WorkspaceError::from_io("resolve symlink", entry, err))?;
        if let Some(target) = resolved {
            self.validator
                .validate_symlink_target(entry, &target.to_string_lossy())
                .map_err(log_rejection)?;
        }
        Ok(())
    }

    async fn ensure_parent(&self, path: &ValidatedPath) -> Result<()> {
        if let Some((parent, _)) = path.as_str().rsplit_once('/') {
            if parent.len() >= self.validator.root().len() {
                self.backend
                    .mkdir(Path::new(parent))
                    .await
                    .map_err(|err| WorkspaceError::from_io("create directory", parent, err))?;
            }
        }
        Ok(())
    }

    async fn exists(&self, path: &ValidatedPath) -> Result<bool> {
        self.backend
            .exists(path.as_path())
            .await
            .map_err(|err| WorkspaceError::from_io("check existence", path.as_str(), err))
    }
}

fn log_rejection(err: SecurityError) -> WorkspaceError {
    warn!("path validation rejected ({:?}): {}", err.reason, err.detail);
    err.into()
}

/// Uniform async file API over a validated workspace root.
///
/// The instance owns its validator and backend for the lifetime of a session;
/// [`Workspace::close`] clears that state, after which every call fails with
/// [`WorkspaceError::NotInitialized`].
pub struct Workspace {
    state: RwLock<Option<State>>,
    events: broadcast::Sender<ChangeEvent>,
}

impl Workspace {
    /// Open (or create) the workspace rooted at `root`.
    pub async fn initialize(
        backend: Arc<dyn StorageBackend>,
        root: &str,
        options: WorkspaceOptions,
    ) -> Result<Self> {
        let validator = PathValidator::new(root);
        let root_str = validator.root().to_string();

        let root_exists = backend
            .exists(Path::new(&root_str))
            .await
            .map_err(|err| WorkspaceError::from_io("stat workspace root", &root_str, err))?;

        if !root_exists {
            if !options.create_if_missing {
                return Err(WorkspaceError::NotFound(format!(
                    "workspace root {root_str}"
                )));
            }
            backend
                .mkdir(Path::new(&root_str))
                .await
                .map_err(|err| WorkspaceError::from_io("create workspace root", &root_str, err))?;
            debug!("created workspace root at {root_str}");
        }
        if options.create_default_structure {
            // mkdir is recursive and idempotent, so an existing root simply
            // gains whatever default folders it is missing.
            for folder in DEFAULT_FOLDERS {
                let path = format!("{root_str}/{folder}");
                backend
                    .mkdir(Path::new(&path))
                    .await
                    .map_err(|err| WorkspaceError::from_io("create directory", &path, err))?;
            }
        }

        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Ok(Self {
            state: RwLock::new(Some(State { validator, backend })),
            events,
        })
    }

    /// Receive a [`ChangeEvent`] for every mutation that reaches storage.
    pub fn subscribe(&self) -> broadcast::Receiver<ChangeEvent> {
        self.events.subscribe()
    }

    pub async fn is_initialized(&self) -> bool {
        self.state.read().await.is_some()
    }

    /// The normalized workspace root.
    pub async fn root(&self) -> Result<String> {
        let guard = self.state.read().await;
        let state = guard.as_ref().ok_or(WorkspaceError::NotInitialized)?;
        Ok(state.validator.root().to_string())
    }

    /// Drop all cached state. Every subsequent call fails with
    /// [`WorkspaceError::NotInitialized`] until a new instance is built.
    pub async fn close(&self) {
        if self.state.write().await.take().is_some() {
            debug!("workspace closed");
        }
    }

    pub async fn read_file(&self, path: &str) -> Result<String> {
        let guard = self.state.read().await;
        let state = guard.as_ref().ok_or(WorkspaceError::NotInitialized)?;
        let validated = state.validate(path)?;
        state.guard_symlink(&validated).await?;
        state
            .backend
            .read(validated.as_path())
            .await
            .map_err(|err| WorkspaceError::from_io("read file", validated.as_str(), err))
    }

    pub async fn read_file_binary(&self, path: &str) -> Result<Vec<u8>> {
        let guard = self.state.read().await;
        let state = guard.as_ref().ok_or(WorkspaceError::NotInitialized)?;
        let validated = state.validate(path)?;
        state.guard_symlink(&validated).await?;
        state
            .backend
            .read_binary(validated.as_path())
            .await
            .map_err(|err| WorkspaceError::from_io("read file", validated.as_str(), err))
    }

    pub async fn write_file(&self, path: &str, content: &str) -> Result<()> {
        self.write_inner(path, WritePayload::Text(content)).await
    }

    pub async fn write_file_binary(&self, path: &str, content: &[u8]) -> Result<()> {
        self.write_inner(path, WritePayload::Binary(content)).await
    }

    async fn write_inner(&self, path: &str, payload: WritePayload<'_>) -> Result<()> {
        let guard = self.state.read().await;
        let state = guard.as_ref().ok_or(WorkspaceError::NotInitialized)?;
        let validated = state.validate(path)?;
        state.guard_symlink(&validated).await?;
        let existed = state.exists(&validated).await?;
        state.ensure_parent(&validated).await?;
        let write = match payload {
            WritePayload::Text(content) => state.backend.write(validated.as_path(), content).await,
            WritePayload::Binary(content) => {
                state.backend.write_binary(validated.as_path(), content).await
            }
        };
        write.map_err(|err| WorkspaceError::from_io("write file", validated.as_str(), err))?;
        let kind = if existed { ChangeKind::Modified } else { ChangeKind::Created };
        self.emit(ChangeEvent::new(kind, validated.as_str()));
        Ok(())
    }

    /// Destructive delete of a file or folder. Soft deletion is the trash
    /// service's job; commands default to it.
    pub async fn delete(&self, path: &str) -> Result<()> {
        let guard = self.state.read().await;
        let state = guard.as_ref().ok_or(WorkspaceError::NotInitialized)?;
        let validated = state.validate(path)?;
        state.guard_symlink(&validated).await?;
        if !state.exists(&validated).await? {
            return Err(WorkspaceError::NotFound(validated.as_str().to_string()));
        }
        state
            .backend
            .delete(validated.as_path())
            .await
            .map_err(|err| WorkspaceError::from_io("delete", validated.as_str(), err))?;
        self.emit(ChangeEvent::new(ChangeKind::Deleted, validated.as_str()));
        Ok(())
    }

    pub async fn move_entry(&self, from: &str, to: &str) -> Result<()> {
        let guard = self.state.read().await;
        let state = guard.as_ref().ok_or(WorkspaceError::NotInitialized)?;
        let from_path = state.validate(from)?;
        let to_path = state.validate(to)?;
        state.guard_symlink(&from_path).await?;
        if !state.exists(&from_path).await? {
            return Err(WorkspaceError::NotFound(from_path.as_str().to_string()));
        }
        if state.exists(&to_path).await? {
            return Err(WorkspaceError::AlreadyExists(to_path.as_str().to_string()));
        }
        state.ensure_parent(&to_path).await?;
        state
            .backend
            .move_entry(from_path.as_path(), to_path.as_path())
            .await
            .map_err(|err| WorkspaceError::from_io("move", from_path.as_str(), err))?;
        self.emit(ChangeEvent::moved(from_path.as_str(), to_path.as_str()));
        Ok(())
    }

    pub async fn rename(&self, path: &str, new_name: &str) -> Result<()> {
        let guard = self.state.read().await;
        let state = guard.as_ref().ok_or(WorkspaceError::NotInitialized)?;
        let validated = state.validate(path)?;
        let name = state.validator.validate_name(new_name).map_err(log_rejection)?;
        state.guard_symlink(&validated).await?;
        if !state.exists(&validated).await? {
            return Err(WorkspaceError::NotFound(validated.as_str().to_string()));
        }
        let target = match validated.as_str().rsplit_once('/') {
            Some((parent, _)) => format!("{parent}/{name}"),
            None => name.clone(),
        };
        let target_path = state.validate(&target)?;
        if state.exists(&target_path).await? {
            return Err(WorkspaceError::AlreadyExists(target));
        }
        state
            .backend
            .rename(validated.as_path(), &name)
            .await
            .map_err(|err| WorkspaceError::from_io("rename", validated.as_str(), err))?;
        self.emit(ChangeEvent::moved(validated.as_str(), target_path.as_str()));
        Ok(())
    }

    pub async fn mkdir(&self, path: &str) -> Result<()> {
        let guard = self.state.read().await;
        let state = guard.as_ref().ok_or(WorkspaceError::NotInitialized)?;
        let validated = state.validate(path)?;
        state
            .backend
            .mkdir(validated.as_path())
            .await
            .map_err(|err| WorkspaceError::from_io("create directory", validated.as_str(), err))?;
        self.emit(ChangeEvent::new(ChangeKind::Created, validated.as_str()));
        Ok(())
    }

    pub async fn copy(&self, from: &str, to: &str) -> Result<()> {
        let guard = self.state.read().await;
        let state = guard.as_ref().ok_or(WorkspaceError::NotInitialized)?;
        let from_path = state.validate(from)?;
        let to_path = state.validate(to)?;
        state.guard_symlink(&from_path).await?;
        if !state.exists(&from_path).await? {
            return Err(WorkspaceError::NotFound(from_path.as_str().to_string()));
        }
        if state.exists(&to_path).await? {
            return Err(WorkspaceError::AlreadyExists(to_path.as_str().to_string()));
        }
        state.ensure_parent(&to_path).await?;
        state
            .backend
            .copy(from_path.as_path(), to_path.as_path())
            .await
            .map_err(|err| WorkspaceError::from_io("copy", from_path.as_str(), err))?;
        self.emit(ChangeEvent::new(ChangeKind::Created, to_path.as_str()));
        Ok(())
    }

    pub async fn exists(&self, path: &str) -> Result<bool> {
        let guard = self.state.read().await;
        let state = guard.as_ref().ok_or(WorkspaceError::NotInitialized)?;
        let validated = state.validate(path)?;
        state.exists(&validated).await
    }

    pub async fn stat(&self, path: &str) -> Result<EntryStat> {
        let guard = self.state.read().await;
        let state = guard.as_ref().ok_or(WorkspaceError::NotInitialized)?;
        let validated = state.validate(path)?;
        state.guard_symlink(&validated).await?;
        state
            .backend
            .stat(validated.as_path())
            .await
            .map_err(|err| WorkspaceError::from_io("stat", validated.as_str(), err))
    }

    pub async fn list(&self, path: &str) -> Result<Vec<DirEntry>> {
        let guard = self.state.read().await;
        let state = guard.as_ref().ok_or(WorkspaceError::NotInitialized)?;
        let validated = state.validate(path)?;
        state.guard_symlink(&validated).await?;
        state
            .backend
            .list(validated.as_path())
            .await
            .map_err(|err| WorkspaceError::from_io("list directory", validated.as_str(), err))
    }

    /// Recursive tree rooted at `path`. The trash area is excluded so
    /// soft-deleted entries never reappear in the UI tree.
    pub async fn file_tree(&self, path: &str) -> Result<FileNode> {
        let guard = self.state.read().await;
        let state = guard.as_ref().ok_or(WorkspaceError::NotInitialized)?;
        let validated = state.validate(path)?;
        state.guard_symlink(&validated).await?;
        let stat = state
            .backend
            .stat(validated.as_path())
            .await
            .map_err(|err| WorkspaceError::from_io("stat", validated.as_str(), err))?;

        let name = validated
            .as_str()
            .rsplit('/')
            .next()
            .unwrap_or(validated.as_str())
            .to_string();
        let mut node = FileNode {
            name,
            path: validated.as_str().to_string(),
            kind: stat.kind,
            children: Vec::new(),
        };
        if node.kind == EntryKind::Folder {
            let root = state.validator.root().to_string();
            build_children(state, &mut node, &root).await?;
        }
        Ok(node)
    }

    fn emit(&self, event: ChangeEvent) {
        // No subscribers is fine; the channel is best-effort UI plumbing.
        let _ = self.events.send(event);
    }
}

enum WritePayload<'a> {
    Text(&'a str),
    Binary(&'a [u8]),
}

fn build_children<'a>(
    state: &'a State,
    node: &'a mut FileNode,
    root: &'a str,
) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>> {
    Box::pin(async move {
        let entries = state
            .backend
            .list(Path::new(&node.path))
            .await
            .map_err(|err| WorkspaceError::from_io("list directory", &node.path, err))?;
        for entry in entries {
            if node.path == root && entry.name == TRASH_DIR_NAME {
                continue;
            }
            let mut child = FileNode {
                name: entry.name,
                path: entry.path,
                kind: entry.kind,
                children: Vec::new(),
            };
            if child.kind == EntryKind::Folder {
                build_children(state, &mut child, root).await?;
            }
            node.children.push(child);
        }
        node.sort_children();
        Ok(())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use workspace_core::{MemoryBackend, SecurityReason};

    const ROOT: &str = "/workspace/project";

    async fn open() -> Workspace {
        Workspace::initialize(
            Arc::new(MemoryBackend::new()),
            ROOT,
            WorkspaceOptions {
                create_if_missing: true,
                create_default_structure: false,
            },
        )
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn missing_root_fails_fast_without_create() {
        let result = Workspace::initialize(
            Arc::new(MemoryBackend::new()),
            ROOT,
            WorkspaceOptions::default(),
        )
        .await;
        assert!(matches!(result, Err(WorkspaceError::NotFound(_))));
    }

    #[tokio::test]
    async fn default_structure_creates_top_level_folders() {
        let ws = Workspace::initialize(
            Arc::new(MemoryBackend::new()),
            ROOT,
            WorkspaceOptions {
                create_if_missing: true,
                create_default_structure: true,
            },
        )
        .await
        .unwrap();

        for folder in DEFAULT_FOLDERS {
            assert!(ws.exists(folder).await.unwrap(), "missing {folder}");
        }
    }

    #[tokio::test]
    async fn write_creates_parents_and_read_round_trips() {
        let ws = open().await;
        ws.write_file("docs/sub/a.md", "hello").await.unwrap();
        assert!(ws.exists("docs/sub").await.unwrap());
        assert_eq!(ws.read_file("docs/sub/a.md").await.unwrap(), "hello");
    }

    #[tokio::test]
    async fn traversal_is_rejected_before_any_io() {
        let ws = open().await;
        let err = ws.read_file("../secrets").await.unwrap_err();
        match err {
            WorkspaceError::Security(sec) => assert_eq!(sec.reason, SecurityReason::PathTraversal),
            other => panic!("expected security error, got {other:?}"),
        }
        let err = ws.write_file("%2e%2e/x", "boom").await.unwrap_err();
        assert!(matches!(err, WorkspaceError::Security(_)));
    }

    #[tokio::test]
    async fn symlink_escape_is_rejected() {
        let backend = Arc::new(MemoryBackend::new());
        backend.insert_symlink(
            Path::new("/workspace/project/link.md"),
            Path::new("/outside/secret.md"),
        );
        let ws = Workspace::initialize(
            backend,
            ROOT,
            WorkspaceOptions {
                create_if_missing: true,
                create_default_structure: false,
            },
        )
        .await
        .unwrap();

        let err = ws.read_file("link.md").await.unwrap_err();
        match err {
            WorkspaceError::Security(sec) => assert_eq!(sec.reason, SecurityReason::SymlinkEscape),
            other => panic!("expected symlink escape, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn symlinked_parent_directory_cannot_escape() {
        let backend = Arc::new(MemoryBackend::new());
        backend.insert_symlink(
            Path::new("/workspace/project/notes/linkdir"),
            Path::new("/outside/dir"),
        );
        let ws = Workspace::initialize(
            backend,
            ROOT,
            WorkspaceOptions {
                create_if_missing: true,
                create_default_structure: false,
            },
        )
        .await
        .unwrap();

        // The leaf itself is not a link; the escape sits on an ancestor.
        let err = ws.read_file("notes/linkdir/secret.txt").await.unwrap_err();
        match err {
            WorkspaceError::Security(sec) => assert_eq!(sec.reason, SecurityReason::SymlinkEscape),
            other => panic!("expected symlink escape, got {other:?}"),
        }
        let err = ws
            .write_file("notes/linkdir/deep/new.txt", "boom")
            .await
            .unwrap_err();
        assert!(matches!(err, WorkspaceError::Security(_)));
    }

    #[tokio::test]
    async fn default_structure_fills_in_an_existing_root() {
        let backend = Arc::new(MemoryBackend::new());
        backend.mkdir(Path::new(ROOT)).await.unwrap();
        backend
            .mkdir(Path::new("/workspace/project/notes"))
            .await
            .unwrap();

        let ws = Workspace::initialize(
            backend,
            ROOT,
            WorkspaceOptions {
                create_if_missing: false,
                create_default_structure: true,
            },
        )
        .await
        .unwrap();

        for folder in DEFAULT_FOLDERS {
            assert!(ws.exists(folder).await.unwrap(), "missing {folder}");
        }
    }

    #[tokio::test]
    async fn in_workspace_symlink_is_allowed() {
        let backend = Arc::new(MemoryBackend::new());
        backend.insert_symlink(
            Path::new("/workspace/project/link.md"),
            Path::new("/workspace/project/docs/real.md"),
        );
        let ws = Workspace::initialize(
            backend,
            ROOT,
            WorkspaceOptions {
                create_if_missing: true,
                create_default_structure: false,
            },
        )
        .await
        .unwrap();

        // Guard passes; the read itself fails only because the memory backend
        // does not follow links for content.
        let err = ws.read_file("link.md").await.unwrap_err();
        assert!(!matches!(err, WorkspaceError::Security(_)));
    }

    #[tokio::test]
    async fn reading_a_missing_file_is_not_found() {
        let ws = open().await;
        let err = ws.read_file("docs/absent.md").await.unwrap_err();
        assert!(matches!(err, WorkspaceError::NotFound(_)));
    }

    #[tokio::test]
    async fn move_refuses_to_overwrite() {
        let ws = open().await;
        ws.write_file("a.md", "a").await.unwrap();
        ws.write_file("b.md", "b").await.unwrap();
        let err = ws.move_entry("a.md", "b.md").await.unwrap_err();
        assert!(matches!(err, WorkspaceError::AlreadyExists(_)));
        assert_eq!(ws.read_file("b.md").await.unwrap(), "b");
    }

    #[tokio::test]
    async fn rename_validates_the_new_name() {
        let ws = open().await;
        ws.write_file("docs/a.md", "x").await.unwrap();
        let err = ws.rename("docs/a.md", "../evil").await.unwrap_err();
        assert!(matches!(err, WorkspaceError::Security(_)));

        ws.rename("docs/a.md", "b.md").await.unwrap();
        assert_eq!(ws.read_file("docs/b.md").await.unwrap(), "x");
        assert!(!ws.exists("docs/a.md").await.unwrap());
    }

    #[tokio::test]
    async fn close_invalidates_the_instance() {
        let ws = open().await;
        ws.write_file("a.md", "x").await.unwrap();
        ws.close().await;
        assert!(!ws.is_initialized().await);
        assert!(matches!(
            ws.read_file("a.md").await,
            Err(WorkspaceError::NotInitialized)
        ));
        assert!(matches!(
            ws.write_file("a.md", "y").await,
            Err(WorkspaceError::NotInitialized)
        ));
    }

    #[tokio::test]
    async fn file_tree_skips_the_trash_area() {
        let ws = open().await;
        ws.write_file("notes/a.md", "a").await.unwrap();
        ws.write_file(".trash/files/123_old.md", "old").await.unwrap();

        let tree = ws.file_tree("").await.unwrap();
        let names: Vec<&str> = tree.children.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["notes"]);
        assert_eq!(tree.len(), 3);
    }

    #[tokio::test]
    async fn file_tree_sorts_folders_first() {
        let ws = open().await;
        ws.write_file("b.md", "").await.unwrap();
        ws.mkdir("a-folder").await.unwrap();
        ws.write_file("a.md", "").await.unwrap();

        let tree = ws.file_tree("").await.unwrap();
        let names: Vec<&str> = tree.children.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["a-folder", "a.md", "b.md"]);
    }

    #[tokio::test]
    async fn mutations_emit_change_events() {
        let ws = open().await;
        let mut events = ws.subscribe();

        ws.write_file("a.md", "1").await.unwrap();
        ws.write_file("a.md", "2").await.unwrap();
        ws.move_entry("a.md", "b.md").await.unwrap();
        ws.delete("b.md").await.unwrap();

        assert_eq!(events.recv().await.unwrap().kind, ChangeKind::Created);
        assert_eq!(events.recv().await.unwrap().kind, ChangeKind::Modified);
        let moved = events.recv().await.unwrap();
        assert_eq!(moved.kind, ChangeKind::Moved);
        assert_eq!(moved.destination.as_deref(), Some("/workspace/project/b.md"));
        assert_eq!(events.recv().await.unwrap().kind, ChangeKind::Deleted);
    }

    #[tokio::test]
    async fn rejected_operations_emit_nothing() {
        let ws = open().await;
        let mut events = ws.subscribe();
        assert!(ws.write_file("../x", "boom").await.is_err());
        assert!(events.try_recv().is_err());
    }

    #[tokio::test]
    async fn binary_round_trip() {
        let ws = open().await;
        let payload = vec![0u8, 159, 146, 150];
        ws.write_file_binary("blob.bin", &payload).await.unwrap();
        assert_eq!(ws.read_file_binary("blob.bin").await.unwrap(), payload);
    }
}
