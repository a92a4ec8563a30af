use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use super::{KeyValueStore, StoreError};

/// Whole-file JSON map. Reads and writes are serialized through one lock so
/// concurrent `set` calls in this process never interleave.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read_all(&self) -> Result<BTreeMap<String, String>, StoreError> {
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(BTreeMap::new()),
            Err(source) => return Err(self.io_error(source)),
        };
        if content.trim().is_empty() {
            return Ok(BTreeMap::new());
        }
        Ok(serde_json::from_str(&content)?)
    }

    async fn write_all(&self, data: &BTreeMap<String, String>) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await.map_err(|source| StoreError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        // write a sibling file, then rename it over the store
        let content = serde_json::to_string_pretty(data)?;
        let tmp = self.tmp_path();
        tokio::fs::write(&tmp, content).await.map_err(|source| StoreError::Io {
            path: tmp.clone(),
            source,
        })?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            tokio::fs::set_permissions(&tmp, std::fs::Permissions::from_mode(0o600))
                .await
                .map_err(|source| StoreError::Io { path: tmp.clone(), source })?;
        }

        if let Err(e) = tokio::fs::rename(&tmp, &self.path).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(self.io_error(e));
        }

        debug!(path = %self.path.display(), "store written");
        Ok(())
    }

    fn tmp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "store".into());
        name.push(".tmp");
        self.path.with_file_name(name)
    }

    /// Content to rewrite. A file that does not parse is replaced, not kept.
    async fn read_for_update(&self) -> Result<BTreeMap<String, String>, StoreError> {
        match self.read_all().await {
            Err(StoreError::Serialization(e)) => {
                warn!(path = %self.path.display(), "store content is corrupt, overwriting: {}", e);
                Ok(BTreeMap::new())
            }
            other => other,
        }
    }

    fn io_error(&self, source: std::io::Error) -> StoreError {
        StoreError::Io {
            path: self.path.clone(),
            source,
        }
    }
}

#[async_trait]
impl KeyValueStore for FileStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let _guard = self.lock.lock().await;
        Ok(self.read_all().await?.remove(key))
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let _guard = self.lock.lock().await;
        let mut data = self.read_for_update().await?;
        data.insert(key.to_owned(), value.to_owned());
        self.write_all(&data).await
    }

    async fn remove(&self, key: &str) -> Result<(), StoreError> {
        let _guard = self.lock.lock().await;
        let mut data = match self.read_all().await {
            Ok(data) => data,
            Err(StoreError::Serialization(e)) => {
                // corrupt content holds no key, reset it
                warn!(path = %self.path.display(), "store content is corrupt, overwriting: {}", e);
                return self.write_all(&BTreeMap::new()).await;
            }
            Err(e) => return Err(e),
        };
        if data.remove(key).is_none() {
            return Ok(());
        }
        self.write_all(&data).await
    }

    fn name(&self) -> &str {
        "file"
    }
}
