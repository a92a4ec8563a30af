use thiserror::Error;

use crate::api::payload::INVALID_JSON_MESSAGE;
use crate::cache::session::CredentialError;
use crate::leaves::validate::ValidationErrors;

/// Transport-level failure of a single request. Neither variant is retried.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("API request failed: timeout ({url})")]
    Timeout { url: String },
    #[error("API request failed: {source} ({url})")]
    Network {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("API request failed: invalid url '{url}': {message}")]
    InvalidUrl { url: String, message: String },
}

impl FetchError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, FetchError::Timeout { .. })
    }

    /// Timeouts count as network failures too, like dropped connections
    /// and refused or unreachable hosts.
    pub fn is_network(&self) -> bool {
        matches!(self, FetchError::Timeout { .. } | FetchError::Network { .. })
    }

    pub fn url(&self) -> &str {
        match self {
            FetchError::Timeout { url } | FetchError::Network { url, .. } | FetchError::InvalidUrl { url, .. } => url,
        }
    }

    pub(crate) fn reason(&self) -> &'static str {
        match self {
            FetchError::Timeout { .. } => "timeout",
            FetchError::Network { .. } => "network",
            FetchError::InvalidUrl { .. } => "invalid_url",
        }
    }
}

/// Failure of one user action, ready to be turned into a notification.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Credential(#[from] CredentialError),
    #[error(transparent)]
    Fetch(#[from] FetchError),
    /// backend answered with `status: error`; message passed through verbatim
    #[error("{message} (http {http_status})")]
    Rejected { http_status: u16, message: String },
    #[error("unexpected response data (http {http_status}): {source}")]
    Decode {
        http_status: u16,
        #[source]
        source: serde_json::Error,
    },
    #[error(transparent)]
    Validation(#[from] ValidationErrors),
}

impl ApiError {
    /// Short wording for the user-facing notification.
    pub fn user_message(&self) -> String {
        match self {
            ApiError::Credential(CredentialError::Unavailable) => "Missing auth token".to_owned(),
            ApiError::Credential(e) => e.to_string(),
            ApiError::Fetch(e) if e.is_timeout() => "Request timed out".to_owned(),
            ApiError::Fetch(FetchError::InvalidUrl { .. }) => "Invalid API address".to_owned(),
            ApiError::Fetch(_) => "Network error".to_owned(),
            ApiError::Rejected { message, .. } => message.clone(),
            ApiError::Decode { .. } => INVALID_JSON_MESSAGE.to_owned(),
            ApiError::Validation(_) => "Please fix the highlighted errors".to_owned(),
        }
    }
}
