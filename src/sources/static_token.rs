use anyhow::Result;

/// Token injected through configuration, meant for local development only.
#[derive(Debug, Clone)]
pub struct StaticSource {
    pub token: Option<String>,
}

impl StaticSource {
    pub fn new(token: Option<String>) -> Self {
        Self { token }
    }

    pub async fn fetch_token(&self) -> Result<Option<String>> {
        Ok(self.token.clone().filter(|t| !t.trim().is_empty()))
    }
}
