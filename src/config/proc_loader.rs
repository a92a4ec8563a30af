use std::path::Path;

use anyhow::{anyhow, Result};
use regex::Regex;
use tracing::{debug, error};

use crate::config::proc_validator;
use crate::config::settings::{LogFormat, LoggingConfig, ServiceConfig};
use crate::observability::metrics::get_metrics;
use crate::utils::constants::{ENV_API_BASE, ENV_API_TIMEOUT_MS, ENV_DEBUG_API, ENV_PAGE_URL, ENV_STATIC_TOKEN};

/// Load and validate config from YAML file
pub async fn file_to_config(path: &Path) -> Result<ServiceConfig> {
    let content = tokio::fs::read_to_string(path).await?;

    let expanded = expand_env_vars(&content);
    parse_config(expanded).await
}

pub async fn parse_config(content: String) -> Result<ServiceConfig> {
    let metrics = get_metrics().await;
    // an empty document means "all defaults"
    let mut service_config: ServiceConfig = if content.trim().is_empty() {
        ServiceConfig::default()
    } else {
        serde_yaml::from_str(&content).inspect_err(|e| {
            error!("parse config error: {}", e);
            metrics.parse_failures.inc();
        })?
    };

    apply_env_overrides(&mut service_config, |key| std::env::var(key).ok())?;

    // Apply defaults
    if service_config.settings.logging.is_none() {
        let level = if service_config.settings.debug { "debug" } else { "info" };
        service_config.settings.logging = Some(LoggingConfig::new(level.to_owned(), LogFormat::from_env()));
    }
    service_config.settings.api_base = normalize_base(&service_config.settings.api_base);

    debug!("validation config ...");
    proc_validator::validate_service_config(&service_config)
        .await
        .map_err(|errors| anyhow!("config is not valid, total errors: {}\n{}", errors.len(), errors.join("\n")))?;

    Ok(service_config)
}

/// Environment wins over the file; values are read once here and never again.
pub fn apply_env_overrides<F>(cfg: &mut ServiceConfig, lookup: F) -> Result<()>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(base) = lookup(ENV_API_BASE) {
        cfg.settings.api_base = base;
    }
    if let Some(timeout) = lookup(ENV_API_TIMEOUT_MS) {
        cfg.settings.timeout_ms = timeout
            .trim()
            .parse()
            .map_err(|e| anyhow!("{} '{}' is not a number: {}", ENV_API_TIMEOUT_MS, timeout, e))?;
    }
    if let Some(debug) = lookup(ENV_DEBUG_API) {
        cfg.settings.debug = debug.trim().eq_ignore_ascii_case("true");
    }
    if let Some(token) = lookup(ENV_STATIC_TOKEN).filter(|t| !t.trim().is_empty()) {
        cfg.auth.static_token = Some(token);
    }
    if let Some(page_url) = lookup(ENV_PAGE_URL).filter(|u| !u.trim().is_empty()) {
        cfg.auth.page_url = Some(page_url);
    }
    Ok(())
}

/// Drop a trailing slash so `base + "/path"` never doubles it.
pub fn normalize_base(base: &str) -> String {
    base.trim().trim_end_matches('/').to_owned()
}

fn expand_env_vars(input: &str) -> String {
    let re = Regex::new(r"\$\{(\w+)(?::([^\}]+))?\}").expect("static regex");
    re.replace_all(input, |caps: &regex::Captures| {
        let var = &caps[1];
        let default = caps.get(2).map(|m| m.as_str()).unwrap_or("");
        std::env::var(var).unwrap_or_else(|_| default.to_string())
    })
    .to_string()
}
