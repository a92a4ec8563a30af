//! Configuration validation with aggregated errors.
//! - Aggregates all issues into Vec<String>
//! - Checks base address, timeout, logging level and bridge commands

use tracing::{error, info};

use crate::config::settings::{AuthConfig, ServiceConfig, SettingsConfig};
use crate::observability::metrics::get_metrics;

/// Public entrypoint: returns Ok(()) or Err(Vec<String>) containing all issues.
pub async fn validate_service_config(cfg: &ServiceConfig) -> Result<(), Vec<String>> {
    let mut errors: Vec<String> = Vec::new();

    validate_settings(&cfg.settings, &mut errors);
    validate_auth(&cfg.auth, &mut errors);

    if errors.is_empty() {
        info!("config valid");
        Ok(())
    } else {
        error!("configuration validation errors ({}):", errors.len());
        for e in &errors {
            error!(" - {}", e);
        }
        get_metrics().await.config_validation_errors.inc();
        Err(errors)
    }
}

/// SETTINGS VALIDATION
fn validate_settings(settings: &SettingsConfig, errors: &mut Vec<String>) {
    // empty base is same-origin, anything else must be an absolute http(s) address
    let base = settings.api_base.trim();
    if !base.is_empty() {
        match url::Url::parse(base) {
            Ok(parsed) if parsed.scheme() == "http" || parsed.scheme() == "https" => {}
            Ok(parsed) => errors.push(format!(
                "settings.api_base '{}' has unsupported scheme '{}'",
                base,
                parsed.scheme()
            )),
            Err(e) => errors.push(format!("settings.api_base '{}' is not a valid URL: {}", base, e)),
        }
    }

    if settings.timeout_ms == 0 {
        errors.push("settings.timeout_ms must be > 0".to_string());
    }

    // logging level
    if let Some(logging) = &settings.logging {
        let valid = ["trace", "debug", "info", "warn", "error"];
        if !valid.contains(&logging.level.to_lowercase().as_str()) {
            errors.push(format!(
                "settings.logging.level '{}' invalid; allowed: {:?}",
                logging.level, valid
            ));
        }
    }
}

/// AUTH VALIDATION
fn validate_auth(auth: &AuthConfig, errors: &mut Vec<String>) {
    if auth.store_key.trim().is_empty() {
        errors.push("auth.store_key must not be empty".to_string());
    }

    if let Some(page_url) = &auth.page_url {
        if let Err(e) = url::Url::parse(page_url) {
            errors.push(format!("auth.page_url '{}' is not a valid URL: {}", page_url, e));
        }
    }

    if let Some(bridge) = &auth.bridge {
        if bridge.token_command.is_empty() {
            errors.push("auth.bridge.token_command must name a program".to_string());
        }
        if let Some(storage) = &bridge.storage_command {
            if storage.is_empty() {
                errors.push("auth.bridge.storage_command must name a program when present".to_string());
            }
        }
    }
}
