//! Local-disk backend on top of `tokio::fs`.

use std::io;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::fs;

use super::{DirEntry, EntryKind, EntryStat, StorageBackend};

#[derive(Debug, Clone, Default)]
pub struct LocalFsBackend;

impl LocalFsBackend {
    pub fn new() -> Self {
        Self
    }
}

fn to_datetime(time: io::Result<SystemTime>) -> Option<DateTime<Utc>> {
    time.ok().map(DateTime::<Utc>::from)
}

fn forward_slashed(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}

#[async_trait]
impl StorageBackend for LocalFsBackend {
    async fn exists(&self, path: &Path) -> io::Result<bool> {
        match fs::metadata(path).await {
            Ok(_) => Ok(true),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(err) => Err(err),
        }
    }

    async fn stat(&self, path: &Path) -> io::Result<EntryStat> {
        let meta = fs::metadata(path).await?;
        Ok(EntryStat {
            kind: if meta.is_dir() { EntryKind::Folder } else { EntryKind::File },
            size: if meta.is_dir() { 0 } else { meta.len() },
            created_at: to_datetime(meta.created()),
            modified_at: to_datetime(meta.modified()),
        })
    }

    async fn read(&self, path: &Path) -> io::Result<String> {
        fs::read_to_string(path).await
    }

    async fn read_binary(&self, path: &Path) -> io::Result<Vec<u8>> {
        fs::read(path).await
    }

    async fn write(&self, path: &Path, content: &str) -> io::Result<()> {
        fs::write(path, content).await
    }

    async fn write_binary(&self, path: &Path, content: &[u8]) -> io::Result<()> {
        fs::write(path, content).await
    }

    async fn delete(&self, path: &Path) -> io::Result<()> {
        let meta = fs::symlink_metadata(path).await?;
        if meta.is_dir() {
            fs::remove_dir_all(path).await
        } else {
            fs::remove_file(path).await
        }
    }

    async fn move_entry(&self, from: &Path, to: &Path) -> io::Result<()> {
        fs::rename(from, to).await
    }

    async fn copy(&self, from: &Path, to: &Path) -> io::Result<()> {
        let meta = fs::metadata(from).await?;
        if !meta.is_dir() {
            fs::copy(from, to).await?;
            return Ok(());
        }

        // Folder copy, iterative to keep the future `Send` without boxing.
        let mut pending = vec![(from.to_path_buf(), to.to_path_buf())];
        while let Some((src, dst)) = pending.pop() {
            fs::create_dir_all(&dst).await?;
            let mut entries = fs::read_dir(&src).await?;
            while let Some(entry) = entries.next_entry().await? {
                let child_src = entry.path();
                let child_dst = dst.join(entry.file_name());
                if entry.file_type().await?.is_dir() {
                    pending.push((child_src, child_dst));
                } else {
                    fs::copy(&child_src, &child_dst).await?;
                }
            }
        }
        Ok(())
    }

    async fn mkdir(&self, path: &Path) -> io::Result<()> {
        fs::create_dir_all(path).await
    }

    async fn list(&self, path: &Path) -> io::Result<Vec<DirEntry>> {
        let mut entries = fs::read_dir(path).await?;
        let mut out = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let kind = if entry.file_type().await?.is_dir() {
                EntryKind::Folder
            } else {
                EntryKind::File
            };
            out.push(DirEntry {
                name: entry.file_name().to_string_lossy().into_owned(),
                path: forward_slashed(&entry.path()),
                kind,
            });
        }
        out.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(out)
    }

    async fn rename(&self, path: &Path, new_name: &str) -> io::Result<()> {
        let parent = path
            .parent()
            .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "path has no parent"))?;
        fs::rename(path, parent.join(new_name)).await
    }

    async fn is_symlink(&self, path: &Path) -> io::Result<bool> {
        match fs::symlink_metadata(path).await {
            Ok(meta) => Ok(meta.file_type().is_symlink()),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(err) => Err(err),
        }
    }

    async fn resolve_symlink(&self, path: &Path) -> io::Result<Option<PathBuf>> {
        if !self.is_symlink(path).await? {
            return Ok(None);
        }
        match fs::canonicalize(path).await {
            Ok(resolved) => Ok(Some(resolved)),
            // Dangling link: fall back to the raw target so the caller can
            // still judge where it points.
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                let target = fs::read_link(path).await?;
                let resolved = if target.is_absolute() {
                    target
                } else {
                    path.parent().map(|p| p.join(&target)).unwrap_or(target)
                };
                Ok(Some(resolved))
            }
            Err(err) => Err(err),
        }
    }
}
