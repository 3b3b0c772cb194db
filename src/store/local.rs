//! Filesystem-backed asset store.

use super::{AssetStore, CopyReport, StoreError, rekey, validate_key};
use crate::debug;
use async_trait::async_trait;
use bytes::Bytes;
use std::path::{Path, PathBuf};
use tokio::fs;

/// Stores objects as plain files under a root directory.
///
/// Writes go to a `.part` sibling first and are renamed into place, so a
/// crash mid-write never leaves a half-written object under its final key.
pub struct LocalStore {
    root: PathBuf,
}

impl LocalStore {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn object_path(&self, key: &str) -> Result<PathBuf, StoreError> {
        validate_key(key)?;
        Ok(self.root.join(key))
    }

    /// Collect every file under the root as a forward-slash relative key.
    async fn walk_keys(&self) -> Result<Vec<String>, StoreError> {
        let mut keys = Vec::new();
        let mut pending = vec![self.root.clone()];

        while let Some(dir) = pending.pop() {
            let mut entries = match fs::read_dir(&dir).await {
                Ok(entries) => entries,
                // A missing root just means nothing was stored yet.
                Err(err) if err.kind() == std::io::ErrorKind::NotFound => continue,
                Err(err) => return Err(StoreError::io(dir.display().to_string(), err)),
            };

            while let Some(entry) = entries
                .next_entry()
                .await
                .map_err(|err| StoreError::io(dir.display().to_string(), err))?
            {
                let path = entry.path();
                if path.is_dir() {
                    pending.push(path);
                    continue;
                }
                if let Ok(rel) = path.strip_prefix(&self.root) {
                    let key = rel
                        .components()
                        .map(|c| c.as_os_str().to_string_lossy())
                        .collect::<Vec<_>>()
                        .join("/");
                    // In-flight temp files are not objects.
                    if !key.ends_with(".part") {
                        keys.push(key);
                    }
                }
            }
        }

        keys.sort();
        Ok(keys)
    }
}

#[async_trait]
impl AssetStore for LocalStore {
    async fn put(&self, key: &str, data: Bytes) -> Result<(), StoreError> {
        let path = self.object_path(key)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|err| StoreError::io(key, err))?;
        }

        let mut staging = path.clone().into_os_string();
        staging.push(".part");
        let staging = PathBuf::from(staging);

        fs::write(&staging, &data)
            .await
            .map_err(|err| StoreError::io(key, err))?;
        if let Err(err) = fs::rename(&staging, &path).await {
            fs::remove_file(&staging).await.ok();
            return Err(StoreError::io(key, err));
        }

        debug!("store"; "wrote {} ({} bytes)", key, data.len());
        Ok(())
    }

    async fn read(&self, key: &str) -> Result<Bytes, StoreError> {
        let path = self.object_path(key)?;
        match fs::read(&path).await {
            Ok(data) => Ok(Bytes::from(data)),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                Err(StoreError::Missing(key.to_string()))
            }
            Err(err) => Err(StoreError::io(key, err)),
        }
    }

    async fn list(&self, prefix: &str) -> Result<Vec<String>, StoreError> {
        let mut keys = self.walk_keys().await?;
        if !prefix.is_empty() {
            keys.retain(|key| key.starts_with(prefix));
        }
        Ok(keys)
    }

    async fn copy(&self, src_prefix: &str, dst_prefix: &str) -> Result<CopyReport, StoreError> {
        let mut report = CopyReport::default();

        for key in self.list(src_prefix).await? {
            let target = rekey(&key, src_prefix, dst_prefix);
            let outcome = async {
                let data = self.read(&key).await?;
                self.put(&target, data).await
            }
            .await;

            match outcome {
                Ok(()) => report.copied.push(target),
                Err(err) => report.failed.push((target, err.to_string())),
            }
        }

        report.into_result()
    }
}

// =============================================================================
// Tests
// =============================================================================
