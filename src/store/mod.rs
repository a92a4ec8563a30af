//! Key-value persistence for the credential and small client preferences.
//!
//! - [`FileStore`] - JSON map on disk, 0600 on unix
//! - [`MemoryStore`] - process memory, used by tests and `--no-store`

mod file;
mod memory;

use std::path::PathBuf;

use async_trait::async_trait;
use thiserror::Error;

pub use file::FileStore;
pub use memory::MemoryStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store io error at '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("store content is not a JSON string map: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// String-keyed persistence. Every call is independent; callers that treat
/// persistence as best-effort log the error and move on.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;

    async fn remove(&self, key: &str) -> Result<(), StoreError>;

    /// Name of this backend, used in logs.
    fn name(&self) -> &str {
        "unknown"
    }
}
