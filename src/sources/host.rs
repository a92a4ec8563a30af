use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BridgeError {
    #[error("host bridge does not support {0}")]
    Unsupported(&'static str),
    #[error("host bridge command '{command}' failed: {message}")]
    Command { command: String, message: String },
    #[error("host bridge io error: {0}")]
    Io(#[from] std::io::Error),
}

/// What a host token call may return: a bare string or `{ "token": "..." }`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum HostToken {
    Plain(String),
    Wrapped { token: String },
}

impl HostToken {
    /// Interpret raw host output. Text that is not JSON is taken as the token
    /// itself; JSON must be a string or `{ "token": "..." }`, anything else
    /// (`null`, `{}`, `{"token":null}`) means no token.
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        if raw.is_empty() {
            return None;
        }
        match serde_json::from_str::<Value>(raw) {
            Err(_) => Some(HostToken::Plain(raw.to_owned())),
            Ok(value) => HostToken::deserialize(value)
                .ok()
                .filter(|token| !token.as_str().trim().is_empty()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            HostToken::Plain(token) | HostToken::Wrapped { token } => token,
        }
    }

    pub fn into_value(self) -> String {
        match self {
            HostToken::Plain(token) | HostToken::Wrapped { token } => token,
        }
    }
}

/// Capability object of an embedding host shell.
///
/// Only `request_token` is mandatory. Storage operations are optional and
/// feature-detected with `has_local_data`.
#[async_trait]
pub trait HostBridge: Send + Sync {
    async fn request_token(&self) -> Result<Option<HostToken>, BridgeError>;

    fn has_local_data(&self) -> bool {
        false
    }

    async fn get_local_data(&self, _key: &str) -> Result<Option<String>, BridgeError> {
        Err(BridgeError::Unsupported("get_local_data"))
    }

    async fn set_local_data(&self, _key: &str, _value: &str) -> Result<(), BridgeError> {
        Err(BridgeError::Unsupported("set_local_data"))
    }

    async fn remove_local_data(&self, _key: &str) -> Result<(), BridgeError> {
        Err(BridgeError::Unsupported("remove_local_data"))
    }

    fn name(&self) -> &str {
        "host"
    }
}

#[derive(Clone)]
pub struct HostSource {
    pub bridge: Arc<dyn HostBridge>,
}

impl HostSource {
    pub fn new(bridge: Arc<dyn HostBridge>) -> Self {
        Self { bridge }
    }

    pub async fn fetch_token(&self) -> Result<Option<String>> {
        let token = self.bridge.request_token().await?;
        Ok(token.map(HostToken::into_value))
    }
}
