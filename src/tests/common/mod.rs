// tests/common/mod.rs
pub use axum::Router;
pub use serde_json::json;
pub use tokio::task::JoinHandle;

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use reqwest::Client;

use crate::api::ApiClient;
use crate::cache::session::Session;
use crate::leaves::LeaveService;
use crate::sources::host::{BridgeError, HostBridge, HostToken};
use crate::store::{KeyValueStore, MemoryStore, StoreError};

/// Spawn an Axum router on an ephemeral port and return (JoinHandle, SocketAddr)
pub async fn spawn_axum(router: Router) -> (JoinHandle<()>, SocketAddr) {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.expect("bind failed");
    let addr = listener.local_addr().unwrap();
    let handle = tokio::spawn(async move {
        axum::serve(listener, router).await.expect("server failed");
    });
    (handle, addr)
}

/// Address nothing listens on: bind, read the port, drop the listener.
pub async fn closed_port_addr() -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.expect("bind failed");
    listener.local_addr().unwrap()
}

/// Unsigned JWT carrying only an email claim (tests only).
pub fn jwt_for(email: &str) -> String {
    let header = URL_SAFE_NO_PAD.encode(r#"{"alg":"none","typ":"JWT"}"#);
    let payload = URL_SAFE_NO_PAD.encode(json!({ "email": email }).to_string());
    format!("{}.{}.sig", header, payload)
}

pub fn api_client(base: &str, timeout: Duration) -> ApiClient {
    ApiClient::new(Client::new(), base, timeout)
}

pub fn service(base: &str, token: Option<&str>) -> LeaveService {
    let session = Session::builder().static_token(token.map(str::to_owned)).build();
    LeaveService::new(session, api_client(base, Duration::from_secs(5)))
}

/// Host bridge counting token requests, with optional in-memory storage.
#[derive(Default)]
pub struct CountingBridge {
    pub token: Option<String>,
    pub fail: bool,
    pub storage: Option<Mutex<HashMap<String, String>>>,
    pub token_calls: AtomicUsize,
}

impl CountingBridge {
    pub fn with_token(token: &str) -> Self {
        Self { token: Some(token.to_owned()), ..Self::default() }
    }

    pub fn with_storage(mut self) -> Self {
        self.storage = Some(Mutex::new(HashMap::new()));
        self
    }

    pub fn with_stored(self, key: &str, value: &str) -> Self {
        let bridge = self.with_storage();
        if let Some(storage) = &bridge.storage {
            storage.lock().unwrap().insert(key.to_owned(), value.to_owned());
        }
        bridge
    }

    pub fn calls(&self) -> usize {
        self.token_calls.load(Ordering::SeqCst)
    }

    pub fn stored(&self, key: &str) -> Option<String> {
        self.storage.as_ref()?.lock().unwrap().get(key).cloned()
    }
}

#[async_trait]
impl HostBridge for CountingBridge {
    async fn request_token(&self) -> Result<Option<HostToken>, BridgeError> {
        self.token_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(BridgeError::Command { command: "host".to_owned(), message: "denied".to_owned() });
        }
        Ok(self.token.clone().map(HostToken::Plain))
    }

    fn has_local_data(&self) -> bool {
        self.storage.is_some()
    }

    async fn get_local_data(&self, key: &str) -> Result<Option<String>, BridgeError> {
        Ok(self.stored(key))
    }

    async fn set_local_data(&self, key: &str, value: &str) -> Result<(), BridgeError> {
        let storage = self.storage.as_ref().ok_or(BridgeError::Unsupported("local data"))?;
        storage.lock().unwrap().insert(key.to_owned(), value.to_owned());
        Ok(())
    }

    async fn remove_local_data(&self, key: &str) -> Result<(), BridgeError> {
        let storage = self.storage.as_ref().ok_or(BridgeError::Unsupported("local data"))?;
        storage.lock().unwrap().remove(key);
        Ok(())
    }

    fn name(&self) -> &str {
        "counting"
    }
}

/// Memory store counting reads.
#[derive(Default)]
pub struct CountingStore {
    pub inner: MemoryStore,
    pub gets: AtomicUsize,
}

impl CountingStore {
    pub fn with_entry(key: &str, value: &str) -> Self {
        Self { inner: MemoryStore::with_entry(key, value), gets: AtomicUsize::new(0) }
    }

    pub fn reads(&self) -> usize {
        self.gets.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl KeyValueStore for CountingStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        self.gets.fetch_add(1, Ordering::SeqCst);
        self.inner.get(key).await
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.inner.set(key, value).await
    }

    async fn remove(&self, key: &str) -> Result<(), StoreError> {
        self.inner.remove(key).await
    }
}

/// Hit counter shared with an axum handler.
pub fn counter() -> Arc<AtomicUsize> {
    Arc::new(AtomicUsize::new(0))
}

pub fn hits(counter: &Arc<AtomicUsize>) -> usize {
    counter.load(Ordering::SeqCst)
}
