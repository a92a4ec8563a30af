use async_trait::async_trait;
use tokio::process::Command;
use tracing::debug;

use crate::config::settings::BridgeConfig;
use crate::sources::host::{BridgeError, HostBridge, HostToken};

/// Host bridge backed by helper programs of the embedding shell.
#[derive(Debug, Clone)]
pub struct CommandBridge {
    token_command: Vec<String>,
    storage_command: Option<Vec<String>>,
}

impl CommandBridge {
    pub fn new(token_command: Vec<String>, storage_command: Option<Vec<String>>) -> Self {
        Self { token_command, storage_command }
    }

    pub fn from_config(cfg: &BridgeConfig) -> Self {
        Self::new(cfg.token_command.clone(), cfg.storage_command.clone())
    }

    fn storage(&self) -> Result<&[String], BridgeError> {
        self.storage_command
            .as_deref()
            .filter(|cmd| !cmd.is_empty())
            .ok_or(BridgeError::Unsupported("local data"))
    }
}

/// Run `program args.. extra..` and return trimmed stdout.
async fn run(command: &[String], extra: &[&str]) -> Result<String, BridgeError> {
    let (program, args) = command.split_first().ok_or(BridgeError::Unsupported("empty command"))?;
    debug!(program = %program, "invoking host bridge command");
    let output = Command::new(program)
        .args(args)
        .args(extra)
        .kill_on_drop(true)
        .output()
        .await?;

    if !output.status.success() {
        return Err(BridgeError::Command {
            command: program.to_owned(),
            message: format!(
                "exit status {}: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            ),
        });
    }
    Ok(String::from_utf8_lossy(&output.stdout).trim().to_owned())
}

#[async_trait]
impl HostBridge for CommandBridge {
    async fn request_token(&self) -> Result<Option<HostToken>, BridgeError> {
        let stdout = run(&self.token_command, &[]).await?;
        Ok(HostToken::parse(&stdout))
    }

    fn has_local_data(&self) -> bool {
        self.storage().is_ok()
    }

    async fn get_local_data(&self, key: &str) -> Result<Option<String>, BridgeError> {
        let stdout = run(self.storage()?, &["get", key]).await?;
        Ok(Some(stdout).filter(|v| !v.is_empty()))
    }

    async fn set_local_data(&self, key: &str, value: &str) -> Result<(), BridgeError> {
        run(self.storage()?, &["set", key, value]).await.map(|_| ())
    }

    async fn remove_local_data(&self, key: &str) -> Result<(), BridgeError> {
        run(self.storage()?, &["remove", key]).await.map(|_| ())
    }

    fn name(&self) -> &str {
        "command"
    }
}
