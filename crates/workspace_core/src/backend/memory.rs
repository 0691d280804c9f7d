//! In-memory backend.
//!
//! The hermetic backend used by the test suites, and a reference for what the
//! contract requires of a real one. Paths are stored as normalized
//! forward-slashed strings; folders exist explicitly, and writing a file
//! implicitly materializes its ancestor folders.

use std::collections::BTreeMap;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::{DirEntry, EntryKind, EntryStat, StorageBackend};

#[derive(Debug, Clone)]
enum Node {
    File {
        content: Vec<u8>,
        created_at: DateTime<Utc>,
        modified_at: DateTime<Utc>,
    },
    Folder {
        created_at: DateTime<Utc>,
    },
    Symlink {
        target: String,
    },
}

#[derive(Debug, Default)]
pub struct MemoryBackend {
    nodes: Mutex<BTreeMap<String, Node>>,
}

fn key_of(path: &Path) -> String {
    let raw = path.to_string_lossy().replace('\\', "/");
    let trimmed = raw.trim_end_matches('/');
    if trimmed.is_empty() {
        "/".to_string()
    } else {
        trimmed.to_string()
    }
}

fn parent_of(key: &str) -> Option<String> {
    key.rsplit_once('/').map(|(parent, _)| {
        if parent.is_empty() {
            "/".to_string()
        } else {
            parent.to_string()
        }
    })
}

fn name_of(key: &str) -> String {
    key.rsplit('/').next().unwrap_or(key).to_string()
}

fn not_found(key: &str) -> io::Error {
    io::Error::new(io::ErrorKind::NotFound, format!("no such entry: {key}"))
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Plant a symlink node. Test hook: the contract has no symlink-creation
    /// operation, but the façade's escape guard needs links to exist.
    pub fn insert_symlink(&self, path: &Path, target: &Path) {
        let mut nodes = self.nodes.lock().unwrap();
        nodes.insert(
            key_of(path),
            Node::Symlink {
                target: key_of(target),
            },
        );
    }

    fn ensure_ancestors(nodes: &mut BTreeMap<String, Node>, key: &str) {
        let mut current = parent_of(key);
        while let Some(dir) = current {
            if dir == "/" || nodes.contains_key(&dir) {
                break;
            }
            nodes.insert(
                dir.clone(),
                Node::Folder {
                    created_at: Utc::now(),
                },
            );
            current = parent_of(&dir);
        }
    }

    fn subtree_keys(nodes: &BTreeMap<String, Node>, key: &str) -> Vec<String> {
        let prefix = format!("{key}/");
        nodes
            .keys()
            .filter(|k| k.as_str() == key || k.starts_with(&prefix))
            .cloned()
            .collect()
    }
}

#[async_trait]
impl StorageBackend for MemoryBackend {
    async fn exists(&self, path: &Path) -> io::Result<bool> {
        let nodes = self.nodes.lock().unwrap();
        Ok(nodes.contains_key(&key_of(path)))
    }

    async fn stat(&self, path: &Path) -> io::Result<EntryStat> {
        let key = key_of(path);
        let nodes = self.nodes.lock().unwrap();
        match nodes.get(&key).ok_or_else(|| not_found(&key))? {
            Node::File {
                content,
                created_at,
                modified_at,
            } => Ok(EntryStat {
                kind: EntryKind::File,
                size: content.len() as u64,
                created_at: Some(*created_at),
                modified_at: Some(*modified_at),
            }),
            Node::Folder { created_at } => Ok(EntryStat {
                kind: EntryKind::Folder,
                size: 0,
                created_at: Some(*created_at),
                modified_at: Some(*created_at),
            }),
            Node::Symlink { .. } => Ok(EntryStat {
                kind: EntryKind::File,
                size: 0,
                created_at: None,
                modified_at: None,
            }),
        }
    }

    async fn read(&self, path: &Path) -> io::Result<String> {
        let bytes = self.read_binary(path).await?;
        String::from_utf8(bytes)
            .map_err(|err| io::Error::new(io::ErrorKind::InvalidData, err))
    }

    async fn read_binary(&self, path: &Path) -> io::Result<Vec<u8>> {
        let key = key_of(path);
        let nodes = self.nodes.lock().unwrap();
        match nodes.get(&key).ok_or_else(|| not_found(&key))? {
            Node::File { content, .. } => Ok(content.clone()),
            _ => Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("not a file: {key}"),
            )),
        }
    }

    async fn write(&self, path: &Path, content: &str) -> io::Result<()> {
        self.write_binary(path, content.as_bytes()).await
    }

    async fn write_binary(&self, path: &Path, content: &[u8]) -> io::Result<()> {
        let key = key_of(path);
        let mut nodes = self.nodes.lock().unwrap();
        if matches!(nodes.get(&key), Some(Node::Folder { .. })) {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("is a folder: {key}"),
            ));
        }
        Self::ensure_ancestors(&mut nodes, &key);
        let now = Utc::now();
        let created_at = match nodes.get(&key) {
            Some(Node::File { created_at, .. }) => *created_at,
            _ => now,
        };
        nodes.insert(
            key,
            Node::File {
                content: content.to_vec(),
                created_at,
                modified_at: now,
            },
        );
        Ok(())
    }

    async fn delete(&self, path: &Path) -> io::Result<()> {
        let key = key_of(path);
        let mut nodes = self.nodes.lock().unwrap();
        if !nodes.contains_key(&key) {
            return Err(not_found(&key));
        }
        for k in Self::subtree_keys(&nodes, &key) {
            nodes.remove(&k);
        }
        Ok(())
    }

    async fn move_entry(&self, from: &Path, to: &Path) -> io::Result<()> {
        let from_key = key_of(from);
        let to_key = key_of(to);
        let mut nodes = self.nodes.lock().unwrap();
        if !nodes.contains_key(&from_key) {
            return Err(not_found(&from_key));
        }
        Self::ensure_ancestors(&mut nodes, &to_key);
        for old in Self::subtree_keys(&nodes, &from_key) {
            let new = format!("{}{}", to_key, &old[from_key.len()..]);
            if let Some(node) = nodes.remove(&old) {
                nodes.insert(new, node);
            }
        }
        Ok(())
    }

    async fn copy(&self, from: &Path, to: &Path) -> io::Result<()> {
        let from_key = key_of(from);
        let to_key = key_of(to);
        let mut nodes = self.nodes.lock().unwrap();
        if !nodes.contains_key(&from_key) {
            return Err(not_found(&from_key));
        }
        Self::ensure_ancestors(&mut nodes, &to_key);
        for old in Self::subtree_keys(&nodes, &from_key) {
            let new = format!("{}{}", to_key, &old[from_key.len()..]);
            if let Some(node) = nodes.get(&old).cloned() {
                nodes.insert(new, node);
            }
        }
        Ok(())
    }

    async fn mkdir(&self, path: &Path) -> io::Result<()> {
        let key = key_of(path);
        let mut nodes = self.nodes.lock().unwrap();
        Self::ensure_ancestors(&mut nodes, &key);
        nodes.entry(key).or_insert(Node::Folder {
            created_at: Utc::now(),
        });
        Ok(())
    }

    async fn list(&self, path: &Path) -> io::Result<Vec<DirEntry>> {
        let key = key_of(path);
        let nodes = self.nodes.lock().unwrap();
        if !nodes.contains_key(&key) && key != "/" {
            return Err(not_found(&key));
        }
        let mut out = Vec::new();
        for (child, node) in nodes.iter() {
            if parent_of(child).as_deref() != Some(key.as_str()) {
                continue;
            }
            out.push(DirEntry {
                name: name_of(child),
                path: child.clone(),
                kind: match node {
                    Node::Folder { .. } => EntryKind::Folder,
                    _ => EntryKind::File,
                },
            });
        }
        Ok(out)
    }

    async fn rename(&self, path: &Path, new_name: &str) -> io::Result<()> {
        let key = key_of(path);
        let parent = parent_of(&key)
            .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "path has no parent"))?;
        let target = if parent == "/" {
            format!("/{new_name}")
        } else {
            format!("{parent}/{new_name}")
        };
        self.move_entry(Path::new(&key), Path::new(&target)).await
    }

    async fn is_symlink(&self, path: &Path) -> io::Result<bool> {
        let nodes = self.nodes.lock().unwrap();
        Ok(matches!(nodes.get(&key_of(path)), Some(Node::Symlink { .. })))
    }

    async fn resolve_symlink(&self, path: &Path) -> io::Result<Option<PathBuf>> {
        let nodes = self.nodes.lock().unwrap();
        match nodes.get(&key_of(path)) {
            Some(Node::Symlink { target }) => Ok(Some(PathBuf::from(target))),
            _ => Ok(None),
        }
    }
}
