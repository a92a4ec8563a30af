use std::sync::Arc;

use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::cache::credential::Credential;
use crate::config::settings::AuthConfig;
use crate::observability::metrics::get_metrics;
use crate::sources::command_bridge::CommandBridge;
use crate::sources::host::{HostBridge, HostSource};
use crate::sources::page_url::PageUrlSource;
use crate::sources::static_token::StaticSource;
use crate::sources::stored::StoredSource;
use crate::sources::{CredentialSource, ProviderChain, SourceKind};
use crate::store::{KeyValueStore, MemoryStore};
use crate::utils::constants::DEFAULT_CREDENTIAL_KEY;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CredentialError {
    /// no source yielded a token; authorized calls must not be attempted
    #[error("no credential available")]
    Unavailable,
    #[error("credential has no '{0}' claim")]
    MissingClaim(&'static str),
    #[error("credential contains characters not allowed in a header")]
    InvalidHeader,
}

/// Explicit session context: the provider chain, the stores it writes to,
/// and the memoized credential. Cloning shares the same cache.
#[derive(Clone)]
pub struct Session {
    inner: Arc<SessionInner>,
}

struct SessionInner {
    chain: ProviderChain,
    store: Arc<dyn KeyValueStore>,
    bridge: Option<Arc<dyn HostBridge>>,
    key: String,
    cached: RwLock<Option<Credential>>,
}

impl Session {
    pub fn builder() -> SessionBuilder {
        SessionBuilder::default()
    }

    pub fn chain(&self) -> &ProviderChain {
        &self.inner.chain
    }

    pub fn in_host(&self) -> bool {
        self.inner.bridge.is_some()
    }

    pub fn store(&self) -> Arc<dyn KeyValueStore> {
        self.inner.store.clone()
    }

    /// Memoized credential, resolving through the chain on first use.
    pub async fn resolve(&self) -> Result<Credential, CredentialError> {
        if let Some(credential) = self.cached().await {
            return Ok(credential);
        }

        let metrics = get_metrics().await;
        // concurrent first calls may both walk the chain, the last write wins with an equal value
        let resolved = match self.inner.chain.resolve().await {
            Some(resolved) => resolved,
            None => {
                metrics.credential_resolutions.with_label_values(&["unavailable"]).inc();
                warn!("no credential source yielded a token");
                return Err(CredentialError::Unavailable);
            }
        };
        let credential = Credential::new(&resolved.value).ok_or(CredentialError::Unavailable)?;
        metrics.credential_resolutions.with_label_values(&[resolved.kind.as_str()]).inc();
        info!(source = %resolved.kind, "credential resolved");

        *self.inner.cached.write().await = Some(credential.clone());
        if resolved.kind != SourceKind::Stored {
            self.persist_local(&credential).await;
        }
        Ok(credential)
    }

    pub async fn cached(&self) -> Option<Credential> {
        self.inner.cached.read().await.clone()
    }

    /// Install a credential and persist it wherever possible.
    pub async fn set(&self, value: &str) -> Result<Credential, CredentialError> {
        let credential = Credential::new(value).ok_or(CredentialError::Unavailable)?;
        *self.inner.cached.write().await = Some(credential.clone());
        self.persist_local(&credential).await;

        if let Some(bridge) = self.inner.bridge.as_ref().filter(|b| b.has_local_data()) {
            if let Err(e) = bridge.set_local_data(&self.inner.key, credential.as_str()).await {
                warn!(bridge = bridge.name(), "persisting credential to host failed: {}", e);
            }
        }
        info!("credential installed");
        Ok(credential)
    }

    /// Forget the credential everywhere. Each destination is best-effort.
    pub async fn clear(&self) {
        *self.inner.cached.write().await = None;

        if let Err(e) = self.inner.store.remove(&self.inner.key).await {
            warn!(store = self.inner.store.name(), "removing credential failed: {}", e);
        }
        if let Some(bridge) = self.inner.bridge.as_ref().filter(|b| b.has_local_data()) {
            if let Err(e) = bridge.remove_local_data(&self.inner.key).await {
                warn!(bridge = bridge.name(), "removing credential from host failed: {}", e);
            }
        }
        info!("credential cleared");
    }

    /// Display-only email of the current credential.
    pub async fn email(&self) -> Option<String> {
        self.resolve().await.ok()?.email()
    }

    async fn persist_local(&self, credential: &Credential) {
        match self.inner.store.set(&self.inner.key, credential.as_str()).await {
            Ok(()) => debug!(store = self.inner.store.name(), "credential persisted"),
            Err(e) => warn!(store = self.inner.store.name(), "persisting credential failed: {}", e),
        }
    }
}

#[derive(Default)]
pub struct SessionBuilder {
    store: Option<Arc<dyn KeyValueStore>>,
    bridge: Option<Arc<dyn HostBridge>>,
    static_token: Option<String>,
    page_url: Option<String>,
    key: Option<String>,
}

impl SessionBuilder {
    /// Sources named by the `auth` section. The store is set separately.
    pub fn from_auth_config(cfg: &AuthConfig) -> Self {
        let bridge = cfg
            .bridge
            .as_ref()
            .map(|b| Arc::new(CommandBridge::from_config(b)) as Arc<dyn HostBridge>);
        Self::default()
            .bridge(bridge)
            .static_token(cfg.static_token.clone())
            .page_url(cfg.page_url.clone())
            .key(cfg.store_key.clone())
    }

    pub fn store(mut self, store: Arc<dyn KeyValueStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn bridge(mut self, bridge: Option<Arc<dyn HostBridge>>) -> Self {
        self.bridge = bridge;
        self
    }

    pub fn static_token(mut self, token: Option<String>) -> Self {
        self.static_token = token;
        self
    }

    pub fn page_url(mut self, page_url: Option<String>) -> Self {
        self.page_url = page_url;
        self
    }

    pub fn key(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into());
        self
    }

    /// Chain order: host (when embedded) or static token (when not),
    /// then the local store, then the page address.
    pub fn build(self) -> Session {
        let store = self.store.unwrap_or_else(|| Arc::new(MemoryStore::new()));
        let key = self.key.unwrap_or_else(|| DEFAULT_CREDENTIAL_KEY.to_owned());

        let mut sources = Vec::with_capacity(3);
        match &self.bridge {
            Some(bridge) => sources.push(CredentialSource::Host(HostSource::new(bridge.clone()))),
            None => {
                if self.static_token.is_some() {
                    sources.push(CredentialSource::Static(StaticSource::new(self.static_token)));
                }
            }
        }
        sources.push(CredentialSource::Stored(
            StoredSource::new(store.clone(), key.clone()).with_host(self.bridge.clone()),
        ));
        if let Some(page_url) = self.page_url {
            sources.push(CredentialSource::PageUrl(PageUrlSource::new(page_url)));
        }

        let chain = ProviderChain::new(sources);
        debug!(order = ?chain.kinds(), "credential chain built");

        Session {
            inner: Arc::new(SessionInner {
                chain,
                store,
                bridge: self.bridge,
                key,
                cached: RwLock::new(None),
            }),
        }
    }
}
