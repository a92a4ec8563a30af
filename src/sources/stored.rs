use std::sync::Arc;

use anyhow::Result;
use tracing::{debug, warn};

use crate::sources::host::HostBridge;
use crate::store::KeyValueStore;

/// Token left by an earlier session: host storage first when the host
/// offers it, then the local store.
#[derive(Clone)]
pub struct StoredSource {
    pub store: Arc<dyn KeyValueStore>,
    pub host: Option<Arc<dyn HostBridge>>,
    pub key: String,
}

impl StoredSource {
    pub fn new(store: Arc<dyn KeyValueStore>, key: impl Into<String>) -> Self {
        Self { store, host: None, key: key.into() }
    }

    pub fn with_host(mut self, host: Option<Arc<dyn HostBridge>>) -> Self {
        self.host = host;
        self
    }

    pub async fn fetch_token(&self) -> Result<Option<String>> {
        if let Some(host) = self.host.as_ref().filter(|h| h.has_local_data()) {
            match host.get_local_data(&self.key).await {
                Ok(Some(value)) if !value.trim().is_empty() => {
                    debug!(bridge = host.name(), "credential found in host storage");
                    return Ok(Some(value));
                }
                Ok(_) => {}
                Err(e) => warn!(bridge = host.name(), "reading host storage failed: {}", e),
            }
        }
        Ok(self.store.get(&self.key).await?)
    }
}
