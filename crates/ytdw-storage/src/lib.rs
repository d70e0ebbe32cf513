//! Timestamp-keyed snapshot blob store for YTDW.
//!
//! Snapshots land on local disk as `{channel_handle}_{YYYYMMDD_HHMMSS}.json`.
//! Discovery of the newest snapshot happens exactly once per run and hands
//! back an explicit [`SnapshotHandle`]; the pipeline threads that handle
//! forward instead of re-globbing the directory mid-run.

use std::path::{Path, PathBuf};
use std::time::SystemTime;

use anyhow::Context;
use sha2::{Digest, Sha256};
use thiserror::Error;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::info;
use uuid::Uuid;
use ytdw_core::ChannelSnapshot;

pub const CRATE_NAME: &str = "ytdw-storage";

#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("reading snapshot {}: {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("malformed snapshot {}: {source}", path.display())]
    Malformed {
        path: PathBuf,
        source: serde_json::Error,
    },
}

/// Resolved pointer to one snapshot file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotHandle {
    pub path: PathBuf,
    pub modified: SystemTime,
}

#[derive(Debug, Clone)]
pub struct StoredSnapshot {
    pub path: PathBuf,
    pub content_hash: String,
    pub byte_size: usize,
    pub already_existed: bool,
}

#[derive(Debug, Clone)]
pub struct SnapshotStore {
    root: PathBuf,
}

impl SnapshotStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn sha256_hex(bytes: &[u8]) -> String {
        let mut hasher = Sha256::new();
        hasher.update(bytes);
        hex::encode(hasher.finalize())
    }

    /// Handles come from an external API; anything that could escape the
    /// store root (separators, dot segments) is squashed before joining.
    pub fn sanitize_handle(handle: &str) -> String {
        let cleaned: String = handle
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || matches!(c, '-' | '_') {
                    c
                } else {
                    '-'
                }
            })
            .collect();
        if cleaned.trim_matches('-').is_empty() {
            "channel".to_string()
        } else {
            cleaned
        }
    }

    pub fn snapshot_file_name(snapshot: &ChannelSnapshot) -> String {
        let stamp = snapshot.extraction_date.format("%Y%m%d_%H%M%S");
        format!("{}_{stamp}.json", Self::sanitize_handle(&snapshot.channel_handle))
    }

    /// Persist a snapshot using a temp-file write and atomic rename. The
    /// file name is keyed by channel handle and extraction timestamp, so
    /// re-storing the same cycle is a no-op.
    pub async fn store(&self, snapshot: &ChannelSnapshot) -> anyhow::Result<StoredSnapshot> {
        let bytes = serde_json::to_vec_pretty(snapshot).context("serializing snapshot")?;
        let content_hash = Self::sha256_hex(&bytes);
        let path = self.root.join(Self::snapshot_file_name(snapshot));

        fs::create_dir_all(&self.root)
            .await
            .with_context(|| format!("creating snapshot directory {}", self.root.display()))?;

        if fs::try_exists(&path)
            .await
            .with_context(|| format!("checking snapshot path {}", path.display()))?
        {
            return Ok(StoredSnapshot {
                path,
                content_hash,
                byte_size: bytes.len(),
                already_existed: true,
            });
        }

        let temp_path = self.root.join(format!(".{}.tmp", Uuid::new_v4()));
        let mut file = fs::OpenOptions::new()
            .create_new(true)
            .write(true)
            .open(&temp_path)
            .await
            .with_context(|| format!("opening temp snapshot file {}", temp_path.display()))?;
        file.write_all(&bytes)
            .await
            .with_context(|| format!("writing temp snapshot file {}", temp_path.display()))?;
        file.flush()
            .await
            .with_context(|| format!("flushing temp snapshot file {}", temp_path.display()))?;
        drop(file);

        match fs::rename(&temp_path, &path).await {
            Ok(()) => {
                info!(path = %path.display(), videos = snapshot.videos.len(), "stored snapshot");
                Ok(StoredSnapshot {
                    path,
                    content_hash,
                    byte_size: bytes.len(),
                    already_existed: false,
                })
            }
            Err(err) => {
                let _ = fs::remove_file(&temp_path).await;
                Err(err).with_context(|| {
                    format!(
                        "atomically renaming temp snapshot {} -> {}",
                        temp_path.display(),
                        path.display()
                    )
                })
            }
        }
    }

    /// Newest `*.json` under the root by modification time, file name as
    /// the tie-break. `None` when the directory is empty or missing.
    pub async fn latest(&self) -> anyhow::Result<Option<SnapshotHandle>> {
        let mut dir = match fs::read_dir(&self.root).await {
            Ok(dir) => dir,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(err) => {
                return Err(err)
                    .with_context(|| format!("reading snapshot directory {}", self.root.display()))
            }
        };

        let mut newest: Option<SnapshotHandle> = None;
        while let Some(entry) = dir
            .next_entry()
            .await
            .with_context(|| format!("listing snapshot directory {}", self.root.display()))?
        {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let metadata = entry
                .metadata()
                .await
                .with_context(|| format!("reading metadata for {}", path.display()))?;
            if !metadata.is_file() {
                continue;
            }
            let modified = metadata
                .modified()
                .with_context(|| format!("reading mtime for {}", path.display()))?;
            let candidate = SnapshotHandle { path, modified };
            let newer = match &newest {
                None => true,
                Some(current) => {
                    (candidate.modified, &candidate.path) > (current.modified, &current.path)
                }
            };
            if newer {
                newest = Some(candidate);
            }
        }
        Ok(newest)
    }

    pub async fn load(&self, handle: &SnapshotHandle) -> Result<ChannelSnapshot, SnapshotError> {
        let bytes = fs::read(&handle.path).await.map_err(|source| SnapshotError::Read {
            path: handle.path.clone(),
            source,
        })?;
        serde_json::from_slice(&bytes).map_err(|source| SnapshotError::Malformed {
            path: handle.path.clone(),
            source,
        })
    }
}
