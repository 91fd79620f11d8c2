//! On-disk blob storage for variant bytes.
//!
//! Each variant lives at `<root>/<group_id>_<tag>`. Writes go to a hidden
//! sibling first and are renamed into place, so a reader never observes a
//! partially written blob.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use mc_core::{GroupId, Result};
use tokio::io::AsyncWriteExt;

/// A flat directory of variant blobs.
#[derive(Debug, Clone)]
pub struct AssetStore {
    root: PathBuf,
}

impl AssetStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Location of the blob for `tag` in `group`.
    pub fn blob_path(&self, group: GroupId, tag: &str) -> PathBuf {
        self.root.join(format!("{group}_{tag}"))
    }

    fn partial_path(&self, group: GroupId, tag: &str) -> PathBuf {
        self.root.join(format!(".{group}_{tag}.partial"))
    }

    /// Create the root directory if needed.
    pub async fn ensure_root(&self) -> Result<()> {
        tokio::fs::create_dir_all(&self.root).await?;
        Ok(())
    }

    /// Durably write `bytes` as the blob for `tag`. Returns the byte count.
    pub async fn write(&self, group: GroupId, tag: &str, bytes: &[u8]) -> Result<u64> {
        let partial = self.partial_path(group, tag);
        let result = async {
            let mut file = tokio::fs::File::create(&partial).await?;
            file.write_all(bytes).await?;
            file.sync_all().await?;
            drop(file);
            tokio::fs::rename(&partial, self.blob_path(group, tag)).await
        }
        .await;

        if let Err(e) = result {
            let _ = tokio::fs::remove_file(&partial).await;
            return Err(e.into());
        }
        Ok(bytes.len() as u64)
    }

    /// Move an already encoded file into place as the blob for `tag`.
    ///
    /// Falls back to copy-and-delete when `src` is on another filesystem.
    pub async fn persist_file(&self, group: GroupId, tag: &str, src: &Path) -> Result<u64> {
        let dest = self.blob_path(group, tag);
        if tokio::fs::rename(src, &dest).await.is_err() {
            let partial = self.partial_path(group, tag);
            if let Err(e) = tokio::fs::copy(src, &partial).await {
                let _ = tokio::fs::remove_file(&partial).await;
                return Err(e.into());
            }
            tokio::fs::rename(&partial, &dest).await?;
            if let Err(e) = tokio::fs::remove_file(src).await {
                tracing::warn!(path = %src.display(), error = %e, "Failed to remove encoded temp file");
            }
        }
        Ok(tokio::fs::metadata(&dest).await?.len())
    }

    /// Remove the blobs for `tags`. Missing blobs are skipped; returns how
    /// many were removed.
    pub async fn remove(&self, group: GroupId, tags: &[String]) -> usize {
        let mut removed = 0;
        for tag in tags {
            let path = self.blob_path(group, tag);
            match tokio::fs::remove_file(&path).await {
                Ok(()) => removed += 1,
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "Failed to remove blob");
                }
            }
        }
        removed
    }
}
