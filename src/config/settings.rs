use serde::Deserialize;

use crate::utils::constants::{DEFAULT_API_TIMEOUT_MS, DEFAULT_CREDENTIAL_KEY};

/// ================================
/// Full client configuration
/// ================================
#[derive(Debug, Deserialize, Clone, Default)]
pub struct ServiceConfig {
    #[serde(default)]
    pub settings: SettingsConfig,
    #[serde(default)]
    pub auth: AuthConfig,
}

/// ================================
/// Global client-wide settings
/// ================================
#[derive(Debug, Deserialize, Clone)]
pub struct SettingsConfig {
    /// base address of the leave backend, without trailing slash.
    /// empty means same-origin (relative paths)
    #[serde(default)]
    pub api_base: String,
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    /// verbose request/response logging
    #[serde(default)]
    pub debug: bool,
    pub logging: Option<LoggingConfig>,
    #[serde(default)]
    pub metrics: MetricsConfig,
}

impl Default for SettingsConfig {
    fn default() -> Self {
        Self {
            api_base: String::new(),
            timeout_ms: DEFAULT_API_TIMEOUT_MS,
            debug: false,
            logging: None,
            metrics: MetricsConfig::default(),
        }
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct MetricsConfig {
    #[serde(default)]
    pub is_enabled: bool,
}

/// ================================
/// Credential sources
/// ================================
#[derive(Debug, Deserialize, Clone)]
pub struct AuthConfig {
    /// development-only token, ignored inside a host shell
    pub static_token: Option<String>,
    #[serde(default)]
    pub header_style: AuthHeaderStyle,
    /// local key-value store file; defaults to the user config dir
    pub store_path: Option<String>,
    #[serde(default = "default_credential_key")]
    pub store_key: String,
    /// address the client was opened with, may carry `?token=` or `#token=`
    pub page_url: Option<String>,
    pub bridge: Option<BridgeConfig>,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            static_token: None,
            header_style: AuthHeaderStyle::default(),
            store_path: None,
            store_key: default_credential_key(),
            page_url: None,
            bridge: None,
        }
    }
}

/// How the credential is attached to outgoing requests.
///
/// The backend gateway historically expected `x-jwt-assertion`, newer call
/// sites send `Authorization: Bearer`. Both are kept until the backend
/// contract is settled.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum AuthHeaderStyle {
    #[default]
    Bearer,
    JwtAssertion,
}

/// External host shell reachable through a helper command.
#[derive(Debug, Deserialize, Clone)]
pub struct BridgeConfig {
    /// program and args printing a token on stdout
    pub token_command: Vec<String>,
    /// program and args used for host key-value storage:
    /// invoked as `<cmd> get <key>`, `<cmd> set <key> <value>`, `<cmd> remove <key>`
    pub storage_command: Option<Vec<String>>,
}

/// ================================
/// Logging
/// ================================
#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    pub level: String, // allowed: trace, debug, info, warn, error
    pub format: LogFormat,
}

impl LoggingConfig {
    pub fn new (level: String, format: LogFormat) -> Self {
        Self { level, format }
    }
}

#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Json,
    Compact,
}

impl LogFormat {
    pub fn from_env() -> Self {
        match std::env::var("LOG_FORMAT")
            .unwrap_or_else(|_| "compact".to_string())
            .to_lowercase()
            .as_str()
        {
            "json" => LogFormat::Json,
            _ => LogFormat::Compact,
        }
    }
}

fn default_timeout_ms() -> u64 {
    DEFAULT_API_TIMEOUT_MS
}

fn default_credential_key() -> String {
    DEFAULT_CREDENTIAL_KEY.to_string()
}
