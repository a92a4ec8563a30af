/// Sources module
///
/// Ordered credential sources and the chain that walks them. The first
/// source yielding a non-empty value wins, later sources are not touched.

use std::fmt;

use anyhow::Result;
use tracing::{debug, warn};

pub mod command_bridge;
pub mod host;
pub mod page_url;
pub mod static_token;
pub mod stored;

use host::HostSource;
use page_url::PageUrlSource;
use static_token::StaticSource;
use stored::StoredSource;

#[derive(Clone)]
pub enum CredentialSource {
    Host(HostSource),
    Static(StaticSource),
    Stored(StoredSource),
    PageUrl(PageUrlSource),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    Host,
    Static,
    Stored,
    PageUrl,
}

impl SourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceKind::Host => "host",
            SourceKind::Static => "static",
            SourceKind::Stored => "stored",
            SourceKind::PageUrl => "page_url",
        }
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl CredentialSource {
    pub fn kind(&self) -> SourceKind {
        match self {
            CredentialSource::Host(_) => SourceKind::Host,
            CredentialSource::Static(_) => SourceKind::Static,
            CredentialSource::Stored(_) => SourceKind::Stored,
            CredentialSource::PageUrl(_) => SourceKind::PageUrl,
        }
    }

    /// `Ok(None)` means "nothing here, try the next source".
    pub async fn fetch_token(&self) -> Result<Option<String>> {
        match self {
            CredentialSource::Host(s) => s.fetch_token().await,
            CredentialSource::Static(s) => s.fetch_token().await,
            CredentialSource::Stored(s) => s.fetch_token().await,
            CredentialSource::PageUrl(s) => s.fetch_token().await,
        }
    }
}

/// A non-empty value and where it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolved {
    pub kind: SourceKind,
    pub value: String,
}

#[derive(Clone, Default)]
pub struct ProviderChain {
    sources: Vec<CredentialSource>,
}

impl ProviderChain {
    pub fn new(sources: Vec<CredentialSource>) -> Self {
        Self { sources }
    }

    pub fn kinds(&self) -> Vec<SourceKind> {
        self.sources.iter().map(CredentialSource::kind).collect()
    }

    /// Walk sources in order. Errors are logged and treated as empty.
    pub async fn resolve(&self) -> Option<Resolved> {
        for source in &self.sources {
            let kind = source.kind();
            match source.fetch_token().await {
                Ok(Some(value)) if !value.trim().is_empty() => {
                    debug!(source = %kind, "credential resolved");
                    return Some(Resolved { kind, value: value.trim().to_owned() });
                }
                Ok(_) => debug!(source = %kind, "source yielded nothing"),
                Err(e) => warn!(source = %kind, "source failed, trying next: {}", e),
            }
        }
        None
    }
}
