use anyhow::{anyhow, Result};
use url::{form_urlencoded, Url};

use crate::utils::constants::URL_TOKEN_PARAMS;

/// Token handed over in the address the client was opened with,
/// either `?token=...` or `#token=...`.
#[derive(Debug, Clone)]
pub struct PageUrlSource {
    pub page_url: String,
}

impl PageUrlSource {
    pub fn new(page_url: impl Into<String>) -> Self {
        Self { page_url: page_url.into() }
    }

    pub async fn fetch_token(&self) -> Result<Option<String>> {
        let url = Url::parse(&self.page_url)
            .map_err(|e| anyhow!("page url '{}' is invalid: {}", self.page_url, e))?;
        Ok(token_from_url(&url))
    }
}

/// Query parameters are checked before fragment parameters.
pub fn token_from_url(url: &Url) -> Option<String> {
    let from_query = find_param(url.query_pairs().into_owned().collect());
    from_query.or_else(|| {
        let fragment = url.fragment()?;
        let pairs = form_urlencoded::parse(fragment.trim_start_matches('#').as_bytes())
            .into_owned()
            .collect();
        find_param(pairs)
    })
}

fn find_param(pairs: Vec<(String, String)>) -> Option<String> {
    URL_TOKEN_PARAMS.iter().find_map(|name| {
        pairs
            .iter()
            .find(|(k, v)| k == name && !v.trim().is_empty())
            .map(|(_, v)| v.trim().to_owned())
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn token(url: &str) -> Option<String> {
        token_from_url(&Url::parse(url).unwrap())
    }

    #[test]
    fn reads_query_parameter() {
        assert_eq!(token("https://app.example.com/leaves?token=abc.def.ghi").as_deref(), Some("abc.def.ghi"));
    }

    #[test]
    fn reads_fragment_parameter() {
        assert_eq!(token("https://app.example.com/#/reports?x=1&jwt=frag").as_deref(), Some("frag"));
        assert_eq!(token("https://app.example.com/#access_token=frag&state=1").as_deref(), Some("frag"));
    }

    #[test]
    fn query_wins_over_fragment() {
        assert_eq!(token("https://app.example.com/?jwt=q#token=f").as_deref(), Some("q"));
    }

    #[test]
    fn empty_or_missing_parameter_is_nothing() {
        assert_eq!(token("https://app.example.com/?token="), None);
        assert_eq!(token("https://app.example.com/leaves"), None);
    }

    #[tokio::test]
    async fn invalid_page_url_is_an_error() {
        assert!(PageUrlSource::new("not a url").fetch_token().await.is_err());
    }
}
