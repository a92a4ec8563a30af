use std::path::Path;
use anyhow::{anyhow, Result};
use tracing::debug;

use crate::config::proc_loader::{file_to_config, parse_config};
use crate::config::settings::ServiceConfig;

/// Load the config file when present, otherwise run on defaults plus env overrides.
pub async fn run(config_path: &str) -> Result<ServiceConfig> {
    let path = Path::new(config_path);
    if !path.exists() {
        debug!("config file '{}' not found, using defaults", config_path);
        return parse_config(String::new()).await;
    }
    file_to_config(path).await.map_err(|e| anyhow!(format!("Invalid config format: {}", e)))
}
